//! Reports coming from the host.
//!
//! The only host to device report a boot keyboard understands is the LED
//! output report.  Everything else gets dumped to the log and otherwise
//! ignored.

use bitflags::bitflags;
use log::info;

use crate::config;

bitflags! {
    /// Indicator LEDs, as set by the host.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Indicators: u8 {
        const NUM_LOCK = 0b0000_0001;
        const CAPS_LOCK = 0b0000_0010;
        const SCROLL_LOCK = 0b0000_0100;
        const COMPOSE = 0b0000_1000;
        const KANA = 0b0001_0000;
    }
}

/// The HID report types, as carried in GET_REPORT/SET_REPORT requests.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReportType {
    Invalid,
    Input,
    Output,
    Feature,
}

impl From<u8> for HidReportType {
    fn from(value: u8) -> Self {
        match value {
            1 => HidReportType::Input,
            2 => HidReportType::Output,
            3 => HidReportType::Feature,
            _ => HidReportType::Invalid,
        }
    }
}

/// Told about indicator changes from the host.
pub trait IndicatorHooks {
    fn indicators_changed(&mut self, leds: Indicators) {
        info!(
            "indicators: num={} caps={} scroll={} compose={} kana={}",
            leds.contains(Indicators::NUM_LOCK),
            leds.contains(Indicators::CAPS_LOCK),
            leds.contains(Indicators::SCROLL_LOCK),
            leds.contains(Indicators::COMPOSE),
            leds.contains(Indicators::KANA),
        );
    }
}

/// Just log the indicators.
impl IndicatorHooks for () {}

/// Decoder for host to device reports on the keyboard interface.
pub struct HostReports {
    interface: u8,
    report_id: u8,
    indicators: Indicators,
}

impl HostReports {
    pub const fn new(interface: u8, report_id: u8) -> HostReports {
        HostReports {
            interface,
            report_id,
            indicators: Indicators::empty(),
        }
    }

    /// Handle a SET_REPORT request, or data on the OUT endpoint.
    pub fn set_report(
        &mut self,
        instance: u8,
        report_id: u8,
        report_type: HidReportType,
        buf: &[u8],
        hooks: &mut impl IndicatorHooks,
    ) {
        if instance == self.interface
            && report_id == self.report_id
            && report_type == HidReportType::Output
        {
            let status = buf.first().copied().unwrap_or(0);
            self.indicators = Indicators::from_bits_truncate(status);
            hooks.indicators_changed(self.indicators);
            return;
        }

        info!(
            "unknown HID set report: instance={} id={} type={:?} size={}",
            instance,
            report_id,
            report_type,
            buf.len()
        );
        for line in buf.chunks(16) {
            info!(" {:02x?}", line);
        }
    }

    /// Handle a GET_REPORT request.  Nothing is supported, so the buffer is
    /// left alone and the requested length is returned.
    pub fn get_report(
        &self,
        instance: u8,
        report_id: u8,
        report_type: HidReportType,
        buf: &[u8],
        reqlen: u16,
    ) -> u16 {
        info!(
            "unhandled HID get report: instance={} id={} type={:?} buf[0]={:02x?} len={}",
            instance,
            report_id,
            report_type,
            buf.first(),
            reqlen
        );
        reqlen
    }

    /// The indicators as last set by the host.
    pub fn indicators(&self) -> Indicators {
        self.indicators
    }
}

/// Listens on the board's keyboard interface and report id.
impl Default for HostReports {
    fn default() -> Self {
        Self::new(config::ITF_NUM_HID, config::REPORT_ID_KEYBOARD)
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct Leds(Vec<Indicators>);

    impl IndicatorHooks for Leds {
        fn indicators_changed(&mut self, leds: Indicators) {
            self.0.push(leds);
        }
    }

    #[test]
    fn led_report() {
        crate::testlog::setup();
        let mut host = HostReports::new(0, 1);
        let mut leds = Leds::default();

        host.set_report(0, 1, HidReportType::Output, &[0x03], &mut leds);
        host.set_report(0, 1, HidReportType::Output, &[0xff], &mut leds);
        host.set_report(0, 1, HidReportType::Output, &[], &mut leds);

        assert_eq!(
            leds.0,
            [
                Indicators::NUM_LOCK | Indicators::CAPS_LOCK,
                Indicators::all(),
                Indicators::empty(),
            ]
        );
    }

    #[test]
    fn unknown_report_changes_nothing() {
        crate::testlog::setup();
        let mut host = HostReports::new(0, 1);
        let mut leds = Leds::default();

        host.set_report(0, 1, HidReportType::Output, &[0x04], &mut leds);
        let data: Vec<u8> = (0..40).collect();
        host.set_report(0, 2, HidReportType::Output, &data, &mut leds);
        host.set_report(1, 1, HidReportType::Output, &[0x01], &mut leds);
        host.set_report(0, 1, HidReportType::Feature, &[0x01], &mut leds);

        assert_eq!(leds.0, [Indicators::SCROLL_LOCK]);
        assert_eq!(host.indicators(), Indicators::SCROLL_LOCK);
    }

    #[test]
    fn get_report_echoes_length() {
        let host = HostReports::new(0, 1);
        assert_eq!(host.get_report(0, 1, HidReportType::from(1), &[], 8), 8);
    }

    #[test]
    fn default_listens_on_board_interface() {
        let mut host = HostReports::default();
        host.set_report(0, 1, HidReportType::Output, &[0x01], &mut ());
        assert_eq!(host.indicators(), Indicators::NUM_LOCK);
    }

    #[test]
    fn report_types() {
        assert_eq!(HidReportType::from(2), HidReportType::Output);
        assert_eq!(HidReportType::from(9), HidReportType::Invalid);
    }
}
