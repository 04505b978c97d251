//! Per-key debounce state.
//!
//! Each key remembers its debounced level and when that level last changed.
//! A new level is only believed once the debounce window has passed since the
//! previous confirmed change.  This is a time gate rather than a count of
//! consistent samples, so it behaves the same regardless of how often, or how
//! regularly, the matrix gets scanned.

use crate::{Duration, Instant};

/// Stored state of a single key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Cell {
    /// Debounced level.
    pressed: bool,
    /// Time of the last confirmed transition.
    changed_at: Instant,
}

impl Cell {
    const fn new() -> Cell {
        Cell {
            pressed: false,
            changed_at: Instant::from_ticks(0),
        }
    }
}

/// The verdict on one sample of one key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Sample matches the debounced level.
    Unchanged,
    /// The level changed and has been committed.
    Confirmed,
    /// The level changed too soon after the last confirmed change.  Nothing
    /// was committed.
    Suppressed {
        /// When the key last changed.
        last: Instant,
        /// How long ago that was.
        elapsed: Duration,
    },
}

/// Debounced state of a `COLS` x `ROWS` matrix.
pub struct DebounceStore<const COLS: usize, const ROWS: usize> {
    cells: [[Cell; COLS]; ROWS],
}

impl<const COLS: usize, const ROWS: usize> DebounceStore<COLS, ROWS> {
    pub const fn new() -> Self {
        DebounceStore {
            cells: [[Cell::new(); COLS]; ROWS],
        }
    }

    /// Forget everything: all keys released, no transitions seen.
    pub fn clear(&mut self) {
        self.cells = [[Cell::new(); COLS]; ROWS];
    }

    /// Feed one sample of the key at (`col`, `row`) taken at `now`.
    ///
    /// A change is accepted once at least `window` has passed since the
    /// previous accepted change on this key.
    pub fn update(
        &mut self,
        col: usize,
        row: usize,
        pressed: bool,
        now: Instant,
        window: Duration,
    ) -> Decision {
        let cell = &mut self.cells[row][col];
        if cell.pressed == pressed {
            return Decision::Unchanged;
        }

        // A clock that appears to run backwards counts as no time passing.
        let elapsed = now
            .checked_duration_since(cell.changed_at)
            .unwrap_or(Duration::from_ticks(0));
        if elapsed < window {
            return Decision::Suppressed {
                last: cell.changed_at,
                elapsed,
            };
        }

        cell.pressed = pressed;
        cell.changed_at = now;
        Decision::Confirmed
    }

    fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Debounced level of a key, `None` outside the matrix.
    pub fn is_pressed(&self, col: usize, row: usize) -> Option<bool> {
        self.cell(col, row).map(|c| c.pressed)
    }

    /// When the key at (`col`, `row`) last changed.
    pub fn changed_at(&self, col: usize, row: usize) -> Option<Instant> {
        self.cell(col, row).map(|c| c.changed_at)
    }

    /// Copy the debounced levels into `buf`, one bit per key.
    ///
    /// Key `col + row * COLS` lands in bit `n % 8` of byte `n / 8`.  Keys that
    /// don't fit in `buf` are left out, and bytes past the last key are zero.
    pub fn snapshot(&self, buf: &mut [u8]) {
        buf.fill(0);
        let levels = self.cells.iter().flat_map(|row| row.iter().map(|c| c.pressed));
        for (n, pressed) in levels.enumerate() {
            let Some(byte) = buf.get_mut(n / 8) else {
                break;
            };
            if pressed {
                *byte |= 1 << (n % 8);
            }
        }
    }
}

impl<const COLS: usize, const ROWS: usize> Default for DebounceStore<COLS, ROWS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_ticks(500);

    fn at(us: u64) -> Instant {
        Instant::from_ticks(us)
    }

    #[test]
    fn first_press_after_window_is_confirmed() {
        let mut store = DebounceStore::<2, 2>::new();
        assert_eq!(store.update(0, 0, true, at(1000), WINDOW), Decision::Confirmed);
        assert_eq!(store.is_pressed(0, 0), Some(true));
        assert_eq!(store.changed_at(0, 0), Some(at(1000)));
    }

    #[test]
    fn bounce_is_suppressed() {
        let mut store = DebounceStore::<2, 2>::new();
        store.update(1, 0, true, at(1000), WINDOW);
        assert_eq!(
            store.update(1, 0, false, at(1200), WINDOW),
            Decision::Suppressed {
                last: at(1000),
                elapsed: Duration::from_ticks(200),
            }
        );
        // The level did not move, so the same sample again is still chatter.
        assert_eq!(store.is_pressed(1, 0), Some(true));
        assert_eq!(store.changed_at(1, 0), Some(at(1000)));
    }

    #[test]
    fn window_boundary_is_accepted() {
        let mut store = DebounceStore::<2, 2>::new();
        store.update(0, 1, true, at(1000), WINDOW);
        assert_eq!(store.update(0, 1, false, at(1499), WINDOW), Decision::Suppressed {
            last: at(1000),
            elapsed: Duration::from_ticks(499),
        });
        assert_eq!(store.update(0, 1, false, at(1500), WINDOW), Decision::Confirmed);
        assert_eq!(store.is_pressed(0, 1), Some(false));
    }

    #[test]
    fn keys_are_independent() {
        let mut store = DebounceStore::<2, 2>::new();
        store.update(0, 0, true, at(1000), WINDOW);
        assert_eq!(store.update(1, 1, true, at(1100), WINDOW), Decision::Confirmed);
        assert_eq!(store.update(0, 0, true, at(1100), WINDOW), Decision::Unchanged);
    }

    #[test]
    fn snapshot_packs_bits() {
        let mut store = DebounceStore::<5, 2>::new();
        store.update(0, 0, true, at(1000), WINDOW);
        store.update(3, 0, true, at(1000), WINDOW);
        store.update(4, 1, true, at(1000), WINDOW);

        let mut buf = [0xffu8; 3];
        store.snapshot(&mut buf);
        // Key 9 is (4, 1).  The spare byte is cleared.
        assert_eq!(buf, [0b0000_1001, 0b0000_0010, 0]);

        let mut short = [0u8; 1];
        store.snapshot(&mut short);
        assert_eq!(short, [0b0000_1001]);
    }

    #[test]
    fn change_right_after_boot_is_chatter() {
        let mut store = DebounceStore::<2, 2>::new();
        assert_eq!(
            store.update(0, 0, true, at(100), WINDOW),
            Decision::Suppressed {
                last: at(0),
                elapsed: Duration::from_ticks(100),
            }
        );
        assert_eq!(store.is_pressed(0, 0), Some(false));
        assert_eq!(store.update(0, 0, true, at(500), WINDOW), Decision::Confirmed);
    }

    #[test]
    fn outside_matrix_is_none() {
        let store = DebounceStore::<2, 2>::new();
        assert_eq!(store.is_pressed(2, 0), None);
        assert_eq!(store.changed_at(0, 2), None);
    }
}
