//! Keyboard matrix handling.
//!
//! The matrix is scanned one row at a time: select the row, give the lines a
//! moment to settle, read every column, deselect the row.  Every sample goes
//! through the [`DebounceStore`], and the results are reported through
//! [`MatrixHooks`].

use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use log::{info, warn};

use crate::debounce::{DebounceStore, Decision};
use crate::{config, Duration, Instant};

/// How often the scan rate is reported when counting is enabled.
const PERF_PERIOD: Duration = Duration::from_ticks(1_000_000);

/// Tunables for the scanner.
#[derive(Clone, Copy, Debug)]
pub struct MatrixConfig {
    /// Minimum time between two sweeps.  `None` sweeps on every call to
    /// [`Matrix::task`].
    pub scan_interval: Option<Duration>,
    /// Settle time after selecting a row, in microseconds.
    pub row_select_delay_us: u32,
    /// Minimum time between two accepted changes of the same key.
    pub debounce: Duration,
    /// Rows are selected by driving them low, and a pressed key pulls its
    /// column low.  When false, both are active high.
    pub active_low: bool,
    /// Log the number of sweeps per second.
    pub perf_count: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        config::matrix_config()
    }
}

/// Receiver for what the scanner sees.
///
/// Both callbacks are invoked from inside the sweep, with a row selected, so
/// they need to return quickly.
pub trait MatrixHooks {
    /// A key changed state, and the change got past the debounce window.
    fn on_confirmed_change(&mut self, _col: usize, _row: usize, _pressed: bool, _when: Instant) {}

    /// A key appeared to change state `elapsed` after its last real change at
    /// `last`, and was ignored.
    fn on_suppressed_chatter(
        &mut self,
        _col: usize,
        _row: usize,
        _pressed: bool,
        _when: Instant,
        _last: Instant,
        _elapsed: Duration,
    ) {
    }
}

/// Hooks that ignore everything.
impl MatrixHooks for () {}

/// A scanned `COLS` x `ROWS` switch matrix.
pub struct Matrix<R, C, D, const COLS: usize, const ROWS: usize> {
    rows: [R; ROWS],
    cols: [C; COLS],
    delay: D,
    config: MatrixConfig,
    store: DebounceStore<COLS, ROWS>,
    last_scan: Option<Instant>,
    perf: ScanCounter,
}

impl<R, C, D, const COLS: usize, const ROWS: usize> Matrix<R, C, D, COLS, ROWS>
where
    R: OutputPin,
    R::Error: Debug,
    C: InputPin,
    C::Error: Debug,
    D: DelayUs<u32>,
{
    /// Build a scanner over the given pins.  Call [`init`](Self::init) before
    /// the first [`task`](Self::task).
    pub fn new(rows: [R; ROWS], cols: [C; COLS], delay: D, config: MatrixConfig) -> Self {
        Matrix {
            rows,
            cols,
            delay,
            config,
            store: DebounceStore::new(),
            last_scan: None,
            perf: ScanCounter::new(),
        }
    }

    /// Put every row in the deselected state and forget all key state.
    pub fn init(&mut self) {
        for row in 0..ROWS {
            if let Err(e) = self.deselect(row) {
                warn!("matrix: cannot deselect row {}: {:?}", row, e);
            }
        }
        self.store.clear();
        self.last_scan = None;
        self.perf = ScanCounter::new();
    }

    /// Poll the matrix.  Does nothing if the scan interval hasn't passed yet,
    /// otherwise performs one full sweep.
    pub fn task(&mut self, now: Instant, hooks: &mut impl MatrixHooks) {
        if let (Some(interval), Some(last)) = (self.config.scan_interval, self.last_scan) {
            let due = match now.checked_duration_since(last) {
                Some(elapsed) => elapsed >= interval,
                None => false,
            };
            if !due {
                return;
            }
        }
        self.last_scan = Some(now);

        self.scan(now, hooks);

        if self.config.perf_count {
            self.perf.count(now);
        }
    }

    /// Copy the debounced key state into `buf`, one bit per key.  See
    /// [`DebounceStore::snapshot`] for the layout.
    pub fn get_state(&self, buf: &mut [u8]) {
        self.store.snapshot(buf);
    }

    /// Debounced state of a single key, `None` outside the matrix.
    pub fn is_pressed(&self, col: usize, row: usize) -> Option<bool> {
        self.store.is_pressed(col, row)
    }

    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    fn scan(&mut self, now: Instant, hooks: &mut impl MatrixHooks) {
        for row in 0..ROWS {
            if let Err(e) = self.select(row) {
                warn!("matrix: cannot select row {}: {:?}", row, e);
                // Leave it deselected as best we can, and try the others.
                if let Err(e) = self.deselect(row) {
                    warn!("matrix: cannot deselect row {}: {:?}", row, e);
                }
                continue;
            }
            self.delay.delay_us(self.config.row_select_delay_us);

            for col in 0..COLS {
                let pressed = match self.sample(col) {
                    Ok(pressed) => pressed,
                    Err(e) => {
                        warn!("matrix: cannot read col {}: {:?}", col, e);
                        continue;
                    }
                };

                match self.store.update(col, row, pressed, now, self.config.debounce) {
                    Decision::Unchanged => (),
                    Decision::Confirmed => hooks.on_confirmed_change(col, row, pressed, now),
                    Decision::Suppressed { last, elapsed } => {
                        hooks.on_suppressed_chatter(col, row, pressed, now, last, elapsed)
                    }
                }
            }

            if let Err(e) = self.deselect(row) {
                warn!("matrix: cannot deselect row {}: {:?}", row, e);
            }
        }
    }

    fn select(&mut self, row: usize) -> Result<(), R::Error> {
        if self.config.active_low {
            self.rows[row].set_low()
        } else {
            self.rows[row].set_high()
        }
    }

    fn deselect(&mut self, row: usize) -> Result<(), R::Error> {
        if self.config.active_low {
            self.rows[row].set_high()
        } else {
            self.rows[row].set_low()
        }
    }

    fn sample(&self, col: usize) -> Result<bool, C::Error> {
        if self.config.active_low {
            self.cols[col].is_low()
        } else {
            self.cols[col].is_high()
        }
    }
}

/// Counts sweeps, and logs the count once a second.
struct ScanCounter {
    count: u32,
    since: Option<Instant>,
}

impl ScanCounter {
    fn new() -> ScanCounter {
        ScanCounter { count: 0, since: None }
    }

    /// Count one sweep.  Returns the total when a period closes.
    fn count(&mut self, now: Instant) -> Option<u32> {
        let since = *self.since.get_or_insert(now);
        self.count += 1;
        let elapsed = now.checked_duration_since(since)?;
        if elapsed < PERF_PERIOD {
            return None;
        }
        let total = self.count;
        info!("matrix: {} scans/sec", total);
        self.count = 0;
        self.since = Some(now);
        Some(total)
    }
}
