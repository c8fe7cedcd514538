//! Progress reporting for batch runs.
//!
//! The batch driver emits a [`ProgressState`] before the first image and after
//! every completed one. Anything implementing [`ProgressListener`] can observe
//! it, including plain `FnMut(usize, usize)` closures.

use crate::constants::PROGRESS_BAR_TEMPLATE;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Completed items out of the run's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub current: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn start(total: usize) -> Self {
        Self { current: 0, total }
    }

    /// Marks one more item as done; never moves past `total`.
    pub fn advance(&mut self) {
        if self.current < self.total {
            self.current += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current == self.total
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.current as f64 / self.total as f64 * 100.0
    }
}

pub trait ProgressListener {
    fn on_progress(&mut self, state: ProgressState);

    /// Called when a run is abandoned so in-progress indicators can be cleared.
    fn reset(&mut self) {}

    /// Called once the archive has been finalized.
    fn finish(&mut self) {}
}

impl<F> ProgressListener for F
where
    F: FnMut(usize, usize),
{
    fn on_progress(&mut self, state: ProgressState) {
        self(state.current, state.total)
    }
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_progress(&mut self, _state: ProgressState) {}
}

/// Terminal progress bar for the CLI.
pub struct ProgressBarListener {
    bar: ProgressBar,
}

impl ProgressBarListener {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A listener that draws nothing, for quiet mode.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ProgressBarListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for ProgressBarListener {
    fn on_progress(&mut self, state: ProgressState) {
        self.bar.set_length(state.total as u64);
        self.bar.set_position(state.current as u64);
    }

    fn reset(&mut self) {
        self.bar.abandon_with_message("❌ aborted");
    }

    fn finish(&mut self) {
        self.bar.finish_with_message("✅ done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_state_advance_is_capped() {
        let mut state = ProgressState::start(2);
        assert_eq!(state.current, 0);

        state.advance();
        state.advance();
        state.advance();
        assert_eq!(state, ProgressState { current: 2, total: 2 });
        assert!(state.is_complete());
    }

    #[test]
    fn test_progress_state_percent() {
        let mut state = ProgressState::start(4);
        state.advance();
        assert_eq!(state.percent(), 25.0);
        assert_eq!(ProgressState::start(0).percent(), 100.0);
    }

    #[test]
    fn test_closure_listener() {
        let mut seen = Vec::new();
        {
            let mut listener = |current: usize, total: usize| seen.push((current, total));
            listener.on_progress(ProgressState { current: 1, total: 3 });
            listener.reset();
        }
        assert_eq!(seen, vec![(1, 3)]);
    }

    #[test]
    fn test_hidden_bar_tracks_position() {
        let mut listener = ProgressBarListener::hidden();
        listener.on_progress(ProgressState { current: 3, total: 5 });
        assert_eq!(listener.bar.position(), 3);
        assert_eq!(listener.bar.length(), Some(5));
    }
}
