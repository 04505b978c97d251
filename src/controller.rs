//! The whole keyboard pipeline in one place.
//!
//! [`Controller`] owns the matrix scanner, the key tracker, the keymap and the
//! report composer, and wires them together.  The main loop calls
//! [`task`](Controller::task) with the current time as often as it can.

use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::host::{HidReportType, HostReports, IndicatorHooks, Indicators};
use crate::matrix::{Matrix, MatrixHooks};
use crate::report::{Composer, Transport};
use crate::tracker::{KeyTracker, Layers};
use crate::{Duration, Instant};

pub struct Controller<R, C, D, L, const COLS: usize, const ROWS: usize> {
    matrix: Matrix<R, C, D, COLS, ROWS>,
    tracker: KeyTracker<COLS, ROWS>,
    layers: L,
    composer: Composer,
    host: HostReports,
}

impl<R, C, D, L, const COLS: usize, const ROWS: usize> Controller<R, C, D, L, COLS, ROWS>
where
    R: OutputPin,
    R::Error: Debug,
    C: InputPin,
    C::Error: Debug,
    D: DelayUs<u32>,
    L: Layers,
{
    /// Assemble a controller.  Reports go out, and LED reports are accepted,
    /// on `interface` with `report_id`.
    pub fn new(matrix: Matrix<R, C, D, COLS, ROWS>, layers: L, interface: u8, report_id: u8) -> Self {
        Controller {
            matrix,
            tracker: KeyTracker::new(),
            layers,
            composer: Composer::new(interface, report_id),
            host: HostReports::new(interface, report_id),
        }
    }

    /// Set up the matrix lines and clear all key state.  Keys the host
    /// still thinks are held get released with the next report.
    pub fn init(&mut self) {
        self.matrix.init();
        self.tracker.clear();
        self.composer.clear();
    }

    /// One pass of the main loop: scan (if due), then send the report (if
    /// changed and the transport can take it).
    pub fn task(&mut self, now: Instant, transport: &mut impl Transport) {
        self.task_with_hooks(now, transport, &mut ());
    }

    /// Like [`task`](Self::task), but also tells `hooks` about every change
    /// and every suppressed bounce the scanner sees.
    pub fn task_with_hooks(
        &mut self,
        now: Instant,
        transport: &mut impl Transport,
        hooks: &mut impl MatrixHooks,
    ) {
        let mut dispatch = Dispatch {
            tracker: &mut self.tracker,
            layers: &self.layers,
            composer: &mut self.composer,
            hooks,
        };
        self.matrix.task(now, &mut dispatch);
        self.composer.flush(now, transport);
    }

    /// Handle a SET_REPORT from the host.
    pub fn set_report(
        &mut self,
        instance: u8,
        report_id: u8,
        report_type: HidReportType,
        buf: &[u8],
        hooks: &mut impl IndicatorHooks,
    ) {
        self.host.set_report(instance, report_id, report_type, buf, hooks);
    }

    /// Handle a GET_REPORT from the host.
    pub fn get_report(
        &self,
        instance: u8,
        report_id: u8,
        report_type: HidReportType,
        buf: &[u8],
        reqlen: u16,
    ) -> u16 {
        self.host.get_report(instance, report_id, report_type, buf, reqlen)
    }

    pub fn indicators(&self) -> Indicators {
        self.host.indicators()
    }

    /// Bit-packed copy of the debounced matrix.
    pub fn get_state(&self, buf: &mut [u8]) {
        self.matrix.get_state(buf);
    }

    pub fn matrix(&self) -> &Matrix<R, C, D, COLS, ROWS> {
        &self.matrix
    }

    pub fn tracker(&self) -> &KeyTracker<COLS, ROWS> {
        &self.tracker
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn layers(&self) -> &L {
        &self.layers
    }

    /// The keymap, for switching layers.
    pub fn layers_mut(&mut self) -> &mut L {
        &mut self.layers
    }
}

/// Routes matrix events through the tracker into the composer.
struct Dispatch<'a, L, H, const COLS: usize, const ROWS: usize> {
    tracker: &'a mut KeyTracker<COLS, ROWS>,
    layers: &'a L,
    composer: &'a mut Composer,
    hooks: &'a mut H,
}

impl<L: Layers, H: MatrixHooks, const COLS: usize, const ROWS: usize> MatrixHooks
    for Dispatch<'_, L, H, COLS, ROWS>
{
    fn on_confirmed_change(&mut self, col: usize, row: usize, pressed: bool, when: Instant) {
        self.hooks.on_confirmed_change(col, row, pressed, when);
        self.tracker
            .matrix_changed(col, row, pressed, when, self.layers, &mut *self.composer);
    }

    fn on_suppressed_chatter(
        &mut self,
        col: usize,
        row: usize,
        pressed: bool,
        when: Instant,
        last: Instant,
        elapsed: Duration,
    ) {
        self.hooks
            .on_suppressed_chatter(col, row, pressed, when, last, elapsed);
    }
}
