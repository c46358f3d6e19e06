//! Progress rendering for the in-flight status message.
//!
//! The engine reports progress as discrete steps. [`render`] turns a step into
//! the status text; [`ProgressReporter`] decides which reports deserve an edit
//! so the status message is edited at most once per step.

use crate::engine::{DownloadProgress, MAX_PROGRESS_STEP};

/// Glyph for a completed step.
pub const FILLED_GLYPH: char = '⣿';

/// Glyph for a remaining step.
pub const EMPTY_GLYPH: char = '⣀';

/// Text of the status message before the first progress report.
pub const DOWNLOADING_TEXT: &str = "⏳ Downloading";

/// Glyph bar for `step`, [`MAX_PROGRESS_STEP`] glyphs wide.
pub fn progress_bar(step: u8) -> String {
    let filled = step.min(MAX_PROGRESS_STEP) as usize;
    let empty = MAX_PROGRESS_STEP as usize - filled;
    let mut bar = String::with_capacity((filled + empty) * FILLED_GLYPH.len_utf8());
    bar.extend(std::iter::repeat(FILLED_GLYPH).take(filled));
    bar.extend(std::iter::repeat(EMPTY_GLYPH).take(empty));
    bar
}

/// Percentage shown next to the bar.
pub fn percent(step: u8) -> u32 {
    u32::from(step.min(MAX_PROGRESS_STEP)) * 10
}

/// Status message text for `step`.
pub fn render(step: u8) -> String {
    format!(
        "{}\n{} {}%\nThis may take a few minutes.",
        DOWNLOADING_TEXT,
        progress_bar(step),
        percent(step)
    )
}

/// Filters engine progress down to the reports that change the status text.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    last_step: Option<u8>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to show for `progress`, or `None` when the status is unchanged.
    ///
    /// Milestones and steps at or below the last rendered one are dropped.
    pub fn advance(&mut self, progress: DownloadProgress) -> Option<String> {
        let step = progress.step()?;
        if self.last_step.is_some_and(|last| step <= last) {
            return None;
        }
        self.last_step = Some(step);
        Some(render(step))
    }

    pub fn last_step(&self) -> Option<u8> {
        self.last_step
    }
}
