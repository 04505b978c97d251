//! Board configuration.
//!
//! These are fixed at build time for the YUIOP60Pi, a 60% board on a
//! Raspberry Pi Pico.  Other boards supply their own values when building
//! a [`Matrix`](crate::Matrix) and [`Composer`](crate::Composer).

use crate::matrix::{Matrix, MatrixConfig};
use crate::Duration;

pub const VENDOR_ID: u16 = 0x7890;
pub const PRODUCT_ID: u16 = 0x000a;
pub const DEVICE_VER: u16 = 0x0001;
pub const MANUFACTURER: &str = "koron";
pub const PRODUCT: &str = "YUIOP60Pi";

/// Number of columns in the switch matrix.
pub const COL_NUM: usize = 15;
/// Number of rows in the switch matrix.
pub const ROW_NUM: usize = 5;

/// GPIO numbers for the columns, in column order.
pub const COL_PINS: [u8; COL_NUM] = [24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10];
/// GPIO numbers for the rows, in row order.
pub const ROW_PINS: [u8; ROW_NUM] = [8, 7, 6, 5, 4];

/// The scanner for this board's matrix, over whatever pin types the HAL
/// provides for [`ROW_PINS`] and [`COL_PINS`].
pub type BoardMatrix<R, C, D> = Matrix<R, C, D, COL_NUM, ROW_NUM>;

/// Minimum time between two matrix sweeps.  `None` scans on every call.
pub const SCAN_INTERVAL: Option<Duration> = None;

/// Settle time after selecting a row, in microseconds.
pub const ROW_SELECT_DELAY_US: u32 = 1;

/// Inhibition window for changing the state of a key.
pub const DEBOUNCE: Duration = Duration::from_ticks(10 * 1000);

/// The HID interface the keyboard report goes out on.
pub const ITF_NUM_HID: u8 = 0;

/// Report id of the keyboard report.
pub const REPORT_ID_KEYBOARD: u8 = 1;

/// Matrix configuration built from the constants above.
pub const fn matrix_config() -> MatrixConfig {
    MatrixConfig {
        scan_interval: SCAN_INTERVAL,
        row_select_delay_us: ROW_SELECT_DELAY_US,
        debounce: DEBOUNCE,
        active_low: true,
        perf_count: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matrix_config() {
        let config = MatrixConfig::default();
        assert!(config.scan_interval.is_none());
        assert_eq!(config.row_select_delay_us, 1);
        assert_eq!(config.debounce, Duration::from_ticks(10_000));
        assert!(config.active_low);
    }

    #[test]
    fn pins_are_distinct() {
        let mut used = [false; 32];
        for &pin in ROW_PINS.iter().chain(COL_PINS.iter()) {
            assert!(!used[pin as usize], "GPIO {} used twice", pin);
            used[pin as usize] = true;
        }
    }
}
