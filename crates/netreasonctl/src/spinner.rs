//! Spinner driven by pipeline events.
//!
//! Only shown when stderr is a terminal and NO_COLOR is unset; otherwise
//! every call is a no-op, so piped output stays clean.

use indicatif::{ProgressBar, ProgressStyle};
use netreason_common::{EventSink, PipelineEvent};
use std::io::{self, IsTerminal};
use std::sync::Mutex;
use std::time::Duration;

const TICK_STRINGS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];

pub struct SpinnerSink {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl SpinnerSink {
    pub fn new() -> Self {
        let enabled = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::with_enabled(enabled)
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Show a fresh spinner for one query
    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_strings(TICK_STRINGS)
            .template("{spinner} {msg}")
        {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    pub fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl Default for SpinnerSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for SpinnerSink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_message(event.to_string());
            }
        }
    }
}
