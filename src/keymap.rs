//! Static layered keymap.
//!
//! A stack of layers, each a full `COLS` x `ROWS` grid of keycodes.  One layer
//! is active at a time; an empty entry (`NoEventIndicated`) on the active layer
//! falls through to the layers below it.

use crate::tracker::Layers;
use crate::Keyboard;

/// One layer of a keymap, indexed `[row][col]`.
pub type Layer<const COLS: usize, const ROWS: usize> = [[Keyboard; COLS]; ROWS];

pub struct Keymap<const COLS: usize, const ROWS: usize> {
    layers: &'static [Layer<COLS, ROWS>],
    active: usize,
}

impl<const COLS: usize, const ROWS: usize> Keymap<COLS, ROWS> {
    /// A keymap over `layers`, with layer 0 active.
    pub const fn new(layers: &'static [Layer<COLS, ROWS>]) -> Self {
        Keymap { layers, active: 0 }
    }

    /// Make `layer` the active layer.  Layers past the end are ignored.
    pub fn set_layer(&mut self, layer: usize) {
        if layer < self.layers.len() {
            self.active = layer;
        } else {
            log::warn!("keymap: no layer {}", layer);
        }
    }

    pub fn layer(&self) -> usize {
        self.active
    }
}

impl<const COLS: usize, const ROWS: usize> Layers for Keymap<COLS, ROWS> {
    fn keycode(&self, col: usize, row: usize) -> Keyboard {
        if col >= COLS || row >= ROWS {
            return Keyboard::NoEventIndicated;
        }
        self.layers[..self.layers.len().min(self.active + 1)]
            .iter()
            .rev()
            .map(|layer| layer[row][col])
            .find(|&code| code != Keyboard::NoEventIndicated)
            .unwrap_or(Keyboard::NoEventIndicated)
    }
}
