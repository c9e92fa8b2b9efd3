use ratatui::Frame;

use crate::{app::App, round::RoundPhase};

/// A UI Screen boundary: responsible for rendering one group of phases
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Idle, waiting, cue, early and per-round result views
pub struct RoundScreen;

impl Screen for RoundScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        crate::ui::render_round(app, f.area(), f.buffer_mut());
    }
}

/// End-of-session summary
pub struct SummaryScreen;

impl Screen for SummaryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        crate::ui::render_summary(app, f.area(), f.buffer_mut());
    }
}

/// Helper to construct the appropriate screen for the current phase
pub fn current_screen(phase: RoundPhase) -> Box<dyn Screen> {
    match phase {
        RoundPhase::SessionComplete => Box::new(SummaryScreen),
        _ => Box::new(RoundScreen),
    }
}
