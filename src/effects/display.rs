//! Overlay side effects: append render requests to the scratch queues

use super::{ApplicationResult, SideEffect};
use crate::state::scratch::{
    push_unique, AdvancedTextRequest, GraphicRequest, ProgressBarRequest, ScratchState,
    TextRequest,
};

pub(super) fn apply(effect: &SideEffect, scratch: &mut ScratchState) -> ApplicationResult {
    let requests = &mut scratch.requests;
    let appended = match effect.clone() {
        SideEffect::DisplayText { text, position, color } => {
            push_unique(&mut requests.texts, TextRequest { text, position, color })
        }
        SideEffect::DisplayTextAdvanced { text, position, text_color, background_color, font_size } => {
            push_unique(
                &mut requests.advanced_texts,
                AdvancedTextRequest { text, position, text_color, background_color, font_size },
            )
        }
        SideEffect::DisplayGraphic {
            path,
            position,
            size,
            tint_color,
            text,
            text_color,
            font_size,
            background_color,
        } => push_unique(
            &mut requests.graphics,
            GraphicRequest {
                path,
                position,
                size,
                tint_color,
                text,
                text_color,
                font_size,
                background_color,
            },
        ),
        SideEffect::ProgressBar {
            text,
            position,
            size,
            fraction,
            color,
            background_color,
            text_color,
        } => push_unique(
            &mut requests.progress_bars,
            ProgressBarRequest {
                text,
                position,
                size,
                fraction: fraction.clamp(0.0, 1.0),
                color,
                background_color,
                text_color,
            },
        ),
        _ => return ApplicationResult::UnableToApply,
    };

    if appended {
        ApplicationResult::AppliedUnique
    } else {
        ApplicationResult::AppliedDuplicate
    }
}
