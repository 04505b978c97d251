//! Key state tracking.
//!
//! Turns confirmed matrix changes into key actions.  The keycode for a key is
//! looked up once, when it goes down, and remembered.  The release reuses that
//! code, so a key that was pressed on one layer is released on the same layer
//! even if the active layer changed while it was held.

use log::warn;

use crate::{Instant, Keyboard};

/// Maps a matrix position to the keycode it currently produces.
pub trait Layers {
    fn keycode(&self, col: usize, row: usize) -> Keyboard;
}

/// Receives key actions.  Called synchronously for every confirmed change;
/// implementations must finish their work before returning.
pub trait Actions {
    fn perform(&mut self, when: Instant, event: &ActionEvent);
}

/// A key going down or up, with the keycode it stands for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionEvent {
    pub col: usize,
    pub row: usize,
    pub pressed: bool,
    pub keycode: Keyboard,
}

#[derive(Clone, Copy, Debug)]
struct KeyState {
    /// Code resolved at the last press.
    code: Keyboard,
    /// Time of the last event on this key.
    when: Instant,
}

impl KeyState {
    const fn new() -> KeyState {
        KeyState {
            code: Keyboard::NoEventIndicated,
            when: Instant::from_ticks(0),
        }
    }
}

/// Per key memory of resolved keycodes for a `COLS` x `ROWS` matrix.
pub struct KeyTracker<const COLS: usize, const ROWS: usize> {
    states: [[KeyState; COLS]; ROWS],
}

impl<const COLS: usize, const ROWS: usize> KeyTracker<COLS, ROWS> {
    pub const fn new() -> Self {
        KeyTracker {
            states: [[KeyState::new(); COLS]; ROWS],
        }
    }

    /// Forget all resolved keycodes.
    pub fn clear(&mut self) {
        self.states = [[KeyState::new(); COLS]; ROWS];
    }

    /// Handle a confirmed change of the key at (`col`, `row`).
    pub fn matrix_changed(
        &mut self,
        col: usize,
        row: usize,
        pressed: bool,
        when: Instant,
        layers: &impl Layers,
        actions: &mut impl Actions,
    ) {
        let Some(state) = self.states.get_mut(row).and_then(|r| r.get_mut(col)) else {
            warn!("tracker: key ({}, {}) outside matrix", col, row);
            return;
        };

        let keycode = if pressed {
            layers.keycode(col, row)
        } else {
            state.code
        };
        actions.perform(
            when,
            &ActionEvent {
                col,
                row,
                pressed,
                keycode,
            },
        );
        state.code = keycode;
        state.when = when;
    }

    fn state(&self, col: usize, row: usize) -> Option<&KeyState> {
        self.states.get(row).and_then(|r| r.get(col))
    }

    /// The code the key was last pressed with.
    pub fn keycode(&self, col: usize, row: usize) -> Option<Keyboard> {
        self.state(col, row).map(|s| s.code)
    }

    /// Time of the last event on the key.
    pub fn last_event(&self, col: usize, row: usize) -> Option<Instant> {
        self.state(col, row).map(|s| s.when)
    }
}

impl<const COLS: usize, const ROWS: usize> Default for KeyTracker<COLS, ROWS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use std::vec::Vec;

    use super::*;

    /// A two layer map where every key is the same code.
    struct TwoLayers {
        upper: Cell<bool>,
    }

    impl Layers for TwoLayers {
        fn keycode(&self, _col: usize, _row: usize) -> Keyboard {
            if self.upper.get() {
                Keyboard::Keyboard1
            } else {
                Keyboard::Q
            }
        }
    }

    #[derive(Default)]
    struct Log(Vec<(u64, ActionEvent)>);

    impl Actions for Log {
        fn perform(&mut self, when: Instant, event: &ActionEvent) {
            self.0.push((when.ticks(), *event));
        }
    }

    fn at(us: u64) -> Instant {
        Instant::from_ticks(us)
    }

    #[test]
    fn release_uses_press_keycode() {
        let layers = TwoLayers {
            upper: Cell::new(false),
        };
        let mut log = Log::default();
        let mut tracker = KeyTracker::<2, 2>::new();

        tracker.matrix_changed(1, 0, true, at(1000), &layers, &mut log);
        layers.upper.set(true);
        tracker.matrix_changed(1, 0, false, at(2000), &layers, &mut log);

        let ev = |pressed| ActionEvent {
            col: 1,
            row: 0,
            pressed,
            keycode: Keyboard::Q,
        };
        assert_eq!(log.0, [(1000, ev(true)), (2000, ev(false))]);
        assert_eq!(tracker.last_event(1, 0), Some(at(2000)));

        // The next press sees the new layer.
        tracker.matrix_changed(1, 0, true, at(3000), &layers, &mut log);
        assert_eq!(log.0[2].1.keycode, Keyboard::Keyboard1);
        assert_eq!(tracker.keycode(1, 0), Some(Keyboard::Keyboard1));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let layers = TwoLayers {
            upper: Cell::new(false),
        };
        let mut log = Log::default();
        let mut tracker = KeyTracker::<2, 2>::new();

        tracker.matrix_changed(2, 0, true, at(1000), &layers, &mut log);
        tracker.matrix_changed(0, 5, true, at(1000), &layers, &mut log);
        assert!(log.0.is_empty());
        assert_eq!(tracker.keycode(2, 0), None);
        assert_eq!(tracker.last_event(0, 5), None);
    }
}
