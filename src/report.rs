//! Boot protocol keyboard report composition.
//!
//! The [`Composer`] keeps the one authoritative view of which modifiers and
//! keys are held, and ships it to the host as the standard 8 byte boot
//! report: a modifier byte, a reserved byte, and six key slots.  Anything
//! beyond six simultaneous keys is dropped.

use arrayvec::ArrayVec;
use bitflags::bitflags;
use log::{debug, trace};

use crate::tracker::{ActionEvent, Actions};
use crate::{config, Instant, Keyboard};

/// Number of key slots in a boot report.
pub const KEY_SLOTS: usize = 6;

/// The code that marks a slot as empty.
const EMPTY: Keyboard = Keyboard::NoEventIndicated;

bitflags! {
    /// The modifier byte of a boot report.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Modifiers: u8 {
        const LEFT_CTRL = 0b0000_0001;
        const LEFT_SHIFT = 0b0000_0010;
        const LEFT_ALT = 0b0000_0100;
        const LEFT_GUI = 0b0000_1000;
        const RIGHT_CTRL = 0b0001_0000;
        const RIGHT_SHIFT = 0b0010_0000;
        const RIGHT_ALT = 0b0100_0000;
        const RIGHT_GUI = 0b1000_0000;
    }
}

impl Modifiers {
    /// The modifier bit for a keycode, if the keycode is a modifier.
    pub fn from_keycode(code: Keyboard) -> Option<Modifiers> {
        match code {
            Keyboard::LeftControl => Some(Modifiers::LEFT_CTRL),
            Keyboard::LeftShift => Some(Modifiers::LEFT_SHIFT),
            Keyboard::LeftAlt => Some(Modifiers::LEFT_ALT),
            Keyboard::LeftGUI => Some(Modifiers::LEFT_GUI),
            Keyboard::RightControl => Some(Modifiers::RIGHT_CTRL),
            Keyboard::RightShift => Some(Modifiers::RIGHT_SHIFT),
            Keyboard::RightAlt => Some(Modifiers::RIGHT_ALT),
            Keyboard::RightGUI => Some(Modifiers::RIGHT_GUI),
            _ => None,
        }
    }
}

/// Why a key slot operation didn't happen.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotError {
    /// All slots are in use.
    Full,
    /// The key isn't in any slot.
    NotFound,
}

/// Result of a successful insert.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Inserted {
    /// The key now occupies this slot.
    Added(usize),
    /// The key was already held in this slot.
    Present(usize),
}

/// The six key slots of a boot report.
///
/// Slots are positional: a released key leaves a hole that the next press
/// fills, until [`compact`](KeySlots::compact) packs them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeySlots {
    slots: [Keyboard; KEY_SLOTS],
}

impl KeySlots {
    pub const fn new() -> KeySlots {
        KeySlots {
            slots: [EMPTY; KEY_SLOTS],
        }
    }

    /// Place `code` in the first empty slot, unless it is already held.
    pub fn insert(&mut self, code: Keyboard) -> Result<Inserted, SlotError> {
        let mut vacant = None;
        let mut found = None;
        for (i, &slot) in self.slots.iter().enumerate() {
            if vacant.is_none() && slot == EMPTY {
                vacant = Some(i);
            }
            if found.is_none() && slot == code {
                found = Some(i);
            }
        }

        match (found, vacant) {
            (Some(i), _) => Ok(Inserted::Present(i)),
            (None, Some(i)) => {
                self.slots[i] = code;
                Ok(Inserted::Added(i))
            }
            (None, None) => Err(SlotError::Full),
        }
    }

    /// Empty the slot holding `code`, returning which slot it was.
    pub fn remove(&mut self, code: Keyboard) -> Result<usize, SlotError> {
        let pos = self
            .slots
            .iter()
            .position(|&slot| slot == code)
            .ok_or(SlotError::NotFound)?;
        self.slots[pos] = EMPTY;
        Ok(pos)
    }

    /// Move all held keys to the front, keeping their order.  Returns true if
    /// anything moved.
    pub fn compact(&mut self) -> bool {
        let held: ArrayVec<Keyboard, KEY_SLOTS> =
            self.slots.iter().copied().filter(|&k| k != EMPTY).collect();
        let mut packed = [EMPTY; KEY_SLOTS];
        packed[..held.len()].copy_from_slice(&held);

        let moved = packed != self.slots;
        self.slots = packed;
        moved
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|&&k| k != EMPTY).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, code: Keyboard) -> bool {
        code != EMPTY && self.slots.contains(&code)
    }

    /// The slots as report bytes.
    pub fn bytes(&self) -> [u8; KEY_SLOTS] {
        self.slots.map(|k| k as u8)
    }
}

impl Default for KeySlots {
    fn default() -> Self {
        Self::new()
    }
}

/// A boot protocol keyboard report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BootReport {
    pub modifiers: Modifiers,
    pub keys: [u8; KEY_SLOTS],
}

impl BootReport {
    /// Build a report from a modifier set and up to six keys.  Extra keys are
    /// ignored.
    pub fn new(modifiers: Modifiers, keys: &[Keyboard]) -> BootReport {
        let mut bytes = [0u8; KEY_SLOTS];
        for (byte, &key) in bytes.iter_mut().zip(keys) {
            *byte = key as u8;
        }
        BootReport {
            modifiers,
            keys: bytes,
        }
    }

    /// The 8 bytes as they go over the wire.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut report = [0u8; 8];
        report[0] = self.modifiers.bits();
        report[2..].copy_from_slice(&self.keys);
        report
    }
}

/// The host facing side of the HID stack.
pub trait Transport {
    /// Can a report be queued on `interface` right now?  Must not block.
    fn ready(&self, interface: u8) -> bool;

    /// Queue a keyboard report.  Only called after [`ready`](Self::ready)
    /// returned true.
    fn send_keyboard_report(
        &mut self,
        interface: u8,
        report_id: u8,
        modifiers: u8,
        keys: &[u8; KEY_SLOTS],
    );
}

/// Accumulates key events into a boot report, and sends it when something
/// changed and the host side is ready.
pub struct Composer {
    interface: u8,
    report_id: u8,
    dirty: bool,
    modifiers: Modifiers,
    slots: KeySlots,
    reported_at: Option<Instant>,
}

impl Composer {
    /// A composer sending on `interface` with the given keyboard report id.
    pub const fn new(interface: u8, report_id: u8) -> Composer {
        Composer {
            interface,
            report_id,
            dirty: false,
            modifiers: Modifiers::empty(),
            slots: KeySlots::new(),
            reported_at: None,
        }
    }

    /// Release everything.  If anything was held, or a report is still
    /// pending, an empty report goes out on the next flush.
    pub fn clear(&mut self) {
        let held = !self.modifiers.is_empty() || !self.slots.is_empty();
        self.modifiers = Modifiers::empty();
        self.slots = KeySlots::new();
        self.dirty |= held;
    }

    /// Account for a key going down or up.
    ///
    /// Modifiers only touch the modifier byte.  Other keys take a slot on
    /// press, and silently get dropped if all six slots are taken.
    pub fn record_key_event(&mut self, code: Keyboard, pressed: bool) {
        if let Some(bit) = Modifiers::from_keycode(code) {
            self.modifiers.set(bit, pressed);
            self.dirty = true;
            return;
        }

        if code == EMPTY {
            return;
        }

        if pressed {
            match self.slots.insert(code) {
                Ok(Inserted::Added(_)) => self.dirty = true,
                Ok(Inserted::Present(_)) => (),
                Err(_) => debug!("report: rollover, dropping {:?}", code),
            }
        } else if self.slots.remove(code).is_ok() {
            self.dirty = true;
        }
    }

    /// Send the report if it changed since the last send.
    ///
    /// When the transport isn't ready the report stays pending, and goes out
    /// on a later call with whatever has accumulated by then.  Returns true
    /// if a report was sent.
    pub fn flush(&mut self, now: Instant, transport: &mut impl Transport) -> bool {
        if !self.dirty {
            return false;
        }

        self.slots.compact();

        if !transport.ready(self.interface) {
            return false;
        }

        let keys = self.slots.bytes();
        trace!(
            "report: {:02x} {:02x?} at {}",
            self.modifiers.bits(),
            keys,
            now.ticks()
        );
        transport.send_keyboard_report(self.interface, self.report_id, self.modifiers.bits(), &keys);
        self.dirty = false;
        self.reported_at = Some(now);
        true
    }

    /// The report as it stands.
    pub fn report(&self) -> BootReport {
        BootReport {
            modifiers: self.modifiers,
            keys: self.slots.bytes(),
        }
    }

    /// True if there are changes the host hasn't seen.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// When a report was last handed to the transport.
    pub fn last_flush(&self) -> Option<Instant> {
        self.reported_at
    }
}

/// Sends on the board's keyboard interface and report id.
impl Default for Composer {
    fn default() -> Self {
        Self::new(config::ITF_NUM_HID, config::REPORT_ID_KEYBOARD)
    }
}

/// Without an action layer in between, every key just reports its keycode.
impl Actions for Composer {
    fn perform(&mut self, _when: Instant, event: &ActionEvent) {
        self.record_key_event(event.keycode, event.pressed);
    }
}
