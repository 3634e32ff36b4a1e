//! Tick-sampled debounced input with optional raw-sample capture.
//!
//! ## Debounce
//!
//! The input is sampled once per tick. Whenever the raw level disagrees
//! with the committed (debounced) level, a mismatch counter grows; any
//! agreeing sample resets it. Once the counter reaches
//! `required_stable_ticks` the raw level is committed.
//!
//! Edges are reported by [`DebouncedInput::rising_edge`], which compares
//! the committed level with the one it saw on its previous call, so each
//! false→true transition is reported exactly once.
//!
//! ## Raw capture
//!
//! Used on the ring input to diagnose noisy intercom lines. A raw-active
//! sample opens a window; every following sample (active or not) is
//! recorded until the window holds [`RAW_WINDOW_LEN`] samples. The full
//! window is rendered as `"<date time> 0011…"`, archived, and capture stops.
//! Active samples inside an open window do not restart it.

use crate::app::ports::WallClock;
use crate::config::{RAW_ARCHIVE_LEN, RAW_WINDOW_LEN};
use crate::ring_buffer::RingBuffer;

/// Open window plus archive of completed windows.
#[derive(Debug, Clone, Default)]
struct RawCapture {
    window: RingBuffer<bool, RAW_WINDOW_LEN>,
    capturing: bool,
    archive: RingBuffer<String, RAW_ARCHIVE_LEN>,
}

impl RawCapture {
    fn record(&mut self, raw_active: bool, clock: &dyn WallClock) {
        if raw_active {
            self.capturing = true;
        }
        if !self.capturing {
            return;
        }

        self.window.push(raw_active);
        if self.window.is_full() {
            let line = self.render(clock);
            self.archive.push(line);
            self.window.clear();
            self.capturing = false;
        }
    }

    fn render(&self, clock: &dyn WallClock) -> String {
        let mut line = clock.date_time();
        line.reserve(self.window.len() + 1);
        line.push(' ');
        for &sample in &self.window {
            line.push(if sample { '1' } else { '0' });
        }
        line
    }
}

#[derive(Debug, Clone)]
pub struct DebouncedInput {
    required_stable_ticks: u8,
    raw: bool,
    debounced: bool,
    /// Committed level seen by the previous `rising_edge` call.
    reported: bool,
    mismatch: u8,
    capture: Option<RawCapture>,
}

impl DebouncedInput {
    pub fn new(required_stable_ticks: u8) -> Self {
        Self {
            required_stable_ticks,
            raw: false,
            debounced: false,
            reported: false,
            mismatch: 0,
            capture: None,
        }
    }

    /// Enable raw-sample capture on this input.
    pub fn with_raw_capture(mut self) -> Self {
        self.capture = Some(RawCapture::default());
        self
    }

    /// Feed one raw sample. Call exactly once per tick.
    pub fn sample(&mut self, raw_active: bool, clock: &dyn WallClock) {
        self.raw = raw_active;

        if let Some(capture) = self.capture.as_mut() {
            capture.record(raw_active, clock);
        }

        if raw_active == self.debounced {
            self.mismatch = 0;
            return;
        }

        self.mismatch = self.mismatch.saturating_add(1);
        if self.mismatch >= self.required_stable_ticks {
            self.debounced = raw_active;
            self.mismatch = 0;
        }
    }

    /// True once per committed false→true transition.
    pub fn rising_edge(&mut self) -> bool {
        let rose = self.debounced && !self.reported;
        self.reported = self.debounced;
        rose
    }

    /// `sample` followed by `rising_edge`.
    pub fn poll(&mut self, raw_active: bool, clock: &dyn WallClock) -> bool {
        self.sample(raw_active, clock);
        self.rising_edge()
    }

    /// Committed level.
    pub fn is_active(&self) -> bool {
        self.debounced
    }

    /// Last raw sample.
    pub fn raw(&self) -> bool {
        self.raw
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.capturing)
    }

    /// Completed windows, oldest first.
    pub fn archived_windows(&self) -> impl Iterator<Item = &str> {
        self.capture
            .iter()
            .flat_map(|c| c.archive.iter())
            .map(String::as_str)
    }

    /// The partially filled window, if one is open.
    pub fn current_window(&self, clock: &dyn WallClock) -> Option<String> {
        self.capture
            .as_ref()
            .filter(|c| c.capturing)
            .map(|c| c.render(clock))
    }

    /// Archived windows followed by the open window, if any.
    pub fn raw_data_lines(&self, clock: &dyn WallClock) -> Vec<String> {
        let mut lines: Vec<String> = self.archived_windows().map(str::to_owned).collect();
        lines.extend(self.current_window(clock));
        lines
    }
}
