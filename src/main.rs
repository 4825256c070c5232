//! ReAgent demo runner
//!
//! Drives the rule engine against a scripted in-memory world: monsters close
//! in on the player, life drains, and the demo rules react with overlay text,
//! flask presses and humanized cursor moves on a virtual pointer.
//!
//! Cursor tasks are handed to a worker task that owns the pointer, so the
//! tick loop keeps running while a move is in flight.

use clap::Parser;
use reagent::core::config::AgentConfig;
use reagent::core::error::Result;
use reagent::core::types::{EntityId, KeyCode, ScreenRect, Vec3};
use reagent::cursor::{HumanizedCursor, VirtualCursor};
use reagent::effects::SideEffect;
use reagent::engine::{Rule, RuleEngine, RuleGroup};
use reagent::state::{CursorReturn, CursorTask, Rarity};
use reagent::world::{Life, MemoryWorld, Pool, RawEntity, RawRarity};

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

const LIFE_FLASK: KeyCode = KeyCode(0x31);

#[derive(Parser, Debug)]
#[command(name = "reagent", about = "Run the rule engine against a scripted world")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 20)]
    ticks: u32,

    /// Time between ticks
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Seed for cursor paths and target jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final state dump and activation history as JSON
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("reagent=debug")
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };
    tracing::info!(ticks = args.ticks, tick_ms = args.tick_ms, "ReAgent starting...");

    let rt = Runtime::new()?;
    let window = ScreenRect::new(0.0, 0.0, 1280.0, 720.0);
    let world = MemoryWorld::new(window);
    let player = world.spawn_player(
        RawEntity::player("Exile", Vec3::ZERO)
            .with_life(Life { hp: Pool::new(1000, 1000), mana: Pool::new(300, 300), ..Life::default() }),
    );
    let monsters = spawn_pack(&world);

    let cursor = match args.seed {
        Some(seed) => HumanizedCursor::with_seed(
            VirtualCursor::new(window.center(), window),
            config.mouse_movement,
            seed,
        ),
        None => HumanizedCursor::new(VirtualCursor::new(window.center(), window), config.mouse_movement),
    };
    let mut engine = match args.seed {
        Some(seed) => RuleEngine::with_seed(config, seed),
        None => RuleEngine::new(config),
    };
    for group in demo_groups() {
        engine.add_group(group);
    }

    let (cursor_tx, mut cursor_rx) = mpsc::unbounded_channel::<CursorTask>();
    let cursor_worker = rt.spawn(async move {
        let mut cursor = cursor;
        while let Some(task) = cursor_rx.recv().await {
            match cursor.run(&task).await {
                Ok(report) => tracing::info!(
                    x = task.target.x,
                    y = task.target.y,
                    steps = report.steps_applied,
                    skipped = report.steps_skipped,
                    reached = report.reached_target,
                    "Cursor task done"
                ),
                Err(e) => tracing::warn!(error = %e, "Cursor task failed"),
            }
        }
    });

    let tick_interval = Duration::from_millis(args.tick_ms);
    for tick in 0..args.ticks {
        let now = Instant::now();
        advance_world(&world, player, &monsters);

        let requests = engine.tick(&world, now)?;
        for text in &requests.texts {
            println!("[{:>3}] overlay: {} ({})", tick, text.text, text.color);
        }
        if let Some(key) = requests.key_to_press {
            println!("[{:>3}] press key {:#x}", tick, key.0);
            if key == LIFE_FLASK {
                world.update(player, |p| {
                    if let Some(life) = p.life.as_mut() {
                        life.hp.current = life.hp.maximum;
                    }
                });
            }
        }
        for task in requests.cursor_tasks {
            println!("[{:>3}] cursor to ({:.0}, {:.0}) queued", tick, task.target.x, task.target.y);
            if cursor_tx.send(task).is_err() {
                tracing::warn!("Cursor worker gone, dropping task");
            }
        }

        std::thread::sleep(tick_interval.saturating_sub(now.elapsed()));
    }

    // Let in-flight moves finish before exiting
    drop(cursor_tx);
    if let Err(e) = rt.block_on(cursor_worker) {
        tracing::warn!(error = %e, "Cursor worker ended abnormally");
    }

    if args.dump {
        let now = Instant::now();
        println!("{}", engine.dump_state(&world, now)?);
        println!("{}", engine.history().to_json(now)?);
    }

    tracing::info!(activations = engine.history().len(), "ReAgent finished");
    Ok(())
}

fn spawn_pack(world: &MemoryWorld) -> Vec<EntityId> {
    let pack = [
        (Vec3::new(80.0, 10.0, 0.0), RawRarity::White),
        (Vec3::new(95.0, -20.0, 0.0), RawRarity::White),
        (Vec3::new(120.0, 40.0, 0.0), RawRarity::Magic),
        (Vec3::new(150.0, 0.0, 0.0), RawRarity::Rare),
    ];
    pack.into_iter()
        .map(|(position, rarity)| {
            world.insert(
                RawEntity::monster(position, rarity)
                    .with_life(Life { hp: Pool::new(200, 200), ..Life::default() }),
            )
        })
        .collect()
}

/// Monsters walk toward the player and hit for a little each tick once close
fn advance_world(world: &MemoryWorld, player: EntityId, monsters: &[EntityId]) {
    let mut damage = 0;
    for &id in monsters {
        world.update(id, |m| {
            if let Some(position) = m.position.as_mut() {
                let step = position.truncate().normalize_or_zero() * 8.0;
                if position.truncate().length() > 10.0 {
                    position.x -= step.x;
                    position.y -= step.y;
                } else {
                    damage += 40;
                }
            }
        });
    }
    world.update(player, |p| {
        if let Some(life) = p.life.as_mut() {
            life.hp.current = (life.hp.current - damage).max(1);
        }
    });
}

fn demo_groups() -> Vec<RuleGroup> {
    let overlay = RuleGroup::new("overlay").with_rule(
        Rule::new("pack_size", |s| s.monster_count_in_range(100) > 0).with_action(|s, _| {
            vec![SideEffect::display_text(
                format!("{} monsters within 100", s.monster_count_in_range(100)),
                20.0,
                20.0,
                "White",
            )]
        }),
    );

    let flasks = RuleGroup::new("flasks").with_rule(
        Rule::new("life_flask", |s| s.vitals().hp.percent() < 50.0 && s.since_last_activation(1.0))
            .with_effect(SideEffect::PressKey { key: LIFE_FLASK }),
    );

    let targeting = RuleGroup::new("targeting").with_rule(
        Rule::new("point_at_rare", |s| {
            !s.flag("pointed") && s.closest_monster(60, Rarity::RARE | Rarity::UNIQUE).is_some()
        })
        .with_action(|s, rng| {
            let mut effects = vec![SideEffect::set_flag("pointed", true)];
            if let Some(monster) = s.closest_monster(60, Rarity::RARE | Rarity::UNIQUE) {
                effects.push(SideEffect::move_cursor_to_monster(monster, CursorReturn::ScreenCenter, rng).delayed(150));
            }
            effects
        }),
    );

    vec![overlay, flasks, targeting]
}
