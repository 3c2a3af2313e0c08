//! ODROID SmartPower USB power meter
//!
//! The meter is a Microchip PIC HID device answering fixed 65-byte frames
//! (see [`protocol`]). The sensor logic is written against [`FrameTransport`]
//! so it does not depend on the USB stack; the hidapi binding lives in
//! `device` and is only built with the `smartpower` feature.

pub mod locale;
pub mod protocol;

#[cfg(all(target_os = "linux", feature = "smartpower"))]
mod device;

#[cfg(all(target_os = "linux", feature = "smartpower"))]
pub use device::{probe, HidTransport};

use crate::error::{Result, SamplerError};
use crate::sensor::Sensor;
use log::{debug, info, warn};
use protocol::{build_request, parse_response, Frame, RequestCode, Response, FRAME_SIZE};
use std::io::{self, Write};

/// Name of the meter's printed lines
pub const SENSOR_NAME: &str = "smartpower";

/// Moves whole frames to and from the meter
pub trait FrameTransport {
    fn send(&mut self, frame: &Frame) -> Result<()>;

    /// Fill `frame` with the next response; returns the number of bytes read
    fn receive(&mut self, frame: &mut Frame) -> Result<usize>;
}

/// The SmartPower meter
pub struct SmartPowerSensor<T: FrameTransport> {
    transport: Option<T>,
    voltage: f64,
    current: f64,
    power: f64,
    is_started: bool,
    is_on: bool,
}

impl<T: FrameTransport> SmartPowerSensor<T> {
    /// Query the meter status over an opened transport; the transport is
    /// dropped on failure
    pub fn connect(transport: T) -> Result<Self> {
        let mut sensor = Self {
            transport: Some(transport),
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            is_started: false,
            is_on: false,
        };

        sensor.request(RequestCode::Status)?;
        debug!(
            "{}: output {}, {}",
            SENSOR_NAME,
            if sensor.is_on { "on" } else { "off" },
            if sensor.is_started { "started" } else { "stopped" }
        );

        // firmware string is informational only
        if let Err(e) = sensor.request(RequestCode::Version) {
            debug!("{}: no version reply: {}", SENSOR_NAME, e);
            if !sensor.is_connected() {
                return Err(e);
            }
        }
        Ok(sensor)
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// Last reading in volts, amperes and watts
    pub fn last(&self) -> (f64, f64, f64) {
        (self.voltage, self.current, self.power)
    }

    /// Send one request and apply its response.
    ///
    /// Transport failures and unexpected response codes disconnect the
    /// meter. A garbled DATA value only fails this read; the previous sample
    /// is kept.
    fn request(&mut self, code: RequestCode) -> Result<()> {
        let result = self.exchange(code);
        if let Err(e) = &result {
            let tolerated = match e {
                SamplerError::Parse(_) => true,
                SamplerError::Protocol(_) => code == RequestCode::Version,
                _ => false,
            };
            if self.transport.is_some() && !tolerated {
                warn!("{}: {}, disconnecting", SENSOR_NAME, e);
                self.transport = None;
            }
        }
        result
    }

    fn exchange(&mut self, code: RequestCode) -> Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| SamplerError::DeviceNotFound(format!("{} is closed", SENSOR_NAME)))?;

        transport.send(&build_request(code))?;

        let mut frame = receive_frame(transport)?;
        if frame[0] == RequestCode::Version as u8 && code != RequestCode::Version {
            // late reply to the VERSION request sent at connect
            debug!("{}: dropping stale version reply", SENSOR_NAME);
            frame = receive_frame(transport)?;
        }
        if frame[0] != code as u8 {
            return Err(SamplerError::Protocol(format!(
                "response 0x{:02x} to request 0x{:02x}",
                frame[0], code as u8
            )));
        }

        match parse_response(&frame)? {
            Response::Status { started, on } => {
                self.is_started = started;
                self.is_on = on;
            }
            Response::Data {
                voltage,
                current,
                power,
            } => {
                self.voltage = voltage;
                self.current = current;
                self.power = power;
            }
            Response::Version(version) => info!("{}: firmware {}", SENSOR_NAME, version),
        }
        Ok(())
    }
}

fn receive_frame<T: FrameTransport>(transport: &mut T) -> Result<Frame> {
    let mut frame = [0u8; FRAME_SIZE];
    if transport.receive(&mut frame)? == 0 {
        return Err(SamplerError::Protocol("empty response".to_string()));
    }
    Ok(frame)
}

fn micro(value: f64) -> i64 {
    (value * 1_000_000.0) as i64
}

impl<T: FrameTransport> Sensor for SmartPowerSensor<T> {
    fn name(&self) -> &str {
        SENSOR_NAME
    }

    fn read(&mut self) -> Result<()> {
        self.request(RequestCode::Data)
    }

    fn print_last(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}_uV {}", SENSOR_NAME, micro(self.voltage))?;
        writeln!(out, "{}_uA {}", SENSOR_NAME, micro(self.current))?;
        writeln!(out, "{}_uW {}", SENSOR_NAME, micro(self.power))
    }

    fn close(&mut self) {
        self.transport.take();
    }
}

/// Without USB support the meter is always absent
#[cfg(not(all(target_os = "linux", feature = "smartpower")))]
pub fn probe(_config: &crate::config::SmartPowerConfig) -> Option<Box<dyn Sensor>> {
    debug!("{}: built without USB HID support", SENSOR_NAME);
    None
}

#[cfg(test)]
mod tests {
    use super::protocol::tests::data_frame;
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned responses and records requests
    #[derive(Default)]
    struct ScriptedTransport {
        sent: Vec<u8>,
        responses: VecDeque<Result<Option<Frame>>>,
    }

    impl ScriptedTransport {
        fn reply(mut self, frame: Frame) -> Self {
            self.responses.push_back(Ok(Some(frame)));
            self
        }

        /// Read that times out without data
        fn silence(mut self) -> Self {
            self.responses.push_back(Ok(None));
            self
        }

        fn fail(mut self) -> Self {
            self.responses.push_back(Err(SamplerError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "unplugged",
            ))));
            self
        }
    }

    impl FrameTransport for ScriptedTransport {
        fn send(&mut self, frame: &Frame) -> Result<()> {
            self.sent.push(frame[1]);
            Ok(())
        }

        fn receive(&mut self, frame: &mut Frame) -> Result<usize> {
            let next = self
                .responses
                .pop_front()
                .unwrap_or_else(|| Err(SamplerError::Protocol("no reply".to_string())))?;
            match next {
                Some(next) => {
                    *frame = next;
                    Ok(FRAME_SIZE)
                }
                None => Ok(0),
            }
        }
    }

    fn status_frame(started: bool, on: bool) -> Frame {
        let mut frame = [0u8; FRAME_SIZE];
        frame[0] = RequestCode::Status as u8;
        frame[1] = u8::from(started);
        frame[2] = u8::from(on);
        frame
    }

    fn version_frame() -> Frame {
        let mut frame = [0u8; FRAME_SIZE];
        frame[0] = RequestCode::Version as u8;
        frame[1..4].copy_from_slice(b"1.0");
        frame
    }

    #[test]
    fn test_connect_reads_status() {
        let transport = ScriptedTransport::default()
            .reply(status_frame(false, true))
            .reply(version_frame());
        let sensor = SmartPowerSensor::connect(transport).unwrap();
        assert!(sensor.is_on());
        assert!(!sensor.is_started());
        assert!(sensor.is_connected());
    }

    #[test]
    fn test_connect_tolerates_missing_version() {
        let transport = ScriptedTransport::default()
            .reply(status_frame(true, true))
            .reply(data_frame("005.0", "000.5", "002.5"));
        let sensor = SmartPowerSensor::connect(transport).unwrap();
        assert!(sensor.is_connected());
    }

    #[test]
    fn test_connect_fails_on_bad_status() {
        let mut bogus = [0u8; FRAME_SIZE];
        bogus[0] = 0x55;
        let transport = ScriptedTransport::default().reply(bogus);
        assert!(SmartPowerSensor::connect(transport).is_err());

        let transport = ScriptedTransport::default().fail();
        assert!(SmartPowerSensor::connect(transport).is_err());
    }

    #[test]
    fn test_read_prints_micro_units() {
        let transport = ScriptedTransport::default()
            .reply(status_frame(false, true))
            .reply(version_frame())
            .reply(data_frame("012.5", "001.0", "012.5"));
        let mut sensor = SmartPowerSensor::connect(transport).unwrap();
        sensor.read().unwrap();

        let mut out = Vec::new();
        sensor.print_last(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "smartpower_uV 12500000\nsmartpower_uA 1000000\nsmartpower_uW 12500000\n"
        );
        let sent = &sensor.transport.as_ref().unwrap().sent;
        assert_eq!(sent, &[0x81, 0x83, 0x37]);
    }

    #[test]
    fn test_failed_read_disconnects_and_keeps_sample() {
        let transport = ScriptedTransport::default()
            .reply(status_frame(false, true))
            .reply(version_frame())
            .reply(data_frame("005.0", "000.4", "002.0"))
            .fail();
        let mut sensor = SmartPowerSensor::connect(transport).unwrap();
        sensor.read().unwrap();
        assert!(sensor.read().is_err());
        assert!(!sensor.is_connected());
        assert!(sensor.read().is_err());
        assert_eq!(sensor.last(), (5.0, 0.4, 2.0));
    }

    #[test]
    fn test_garbled_data_keeps_meter_connected() {
        let transport = ScriptedTransport::default()
            .reply(status_frame(false, true))
            .reply(version_frame())
            .reply(data_frame("005.0", "000.4", "002.0"))
            .reply(data_frame("005.0", "-.---", "002.0"))
            .reply(data_frame("005.1", "000.5", "002.1"));
        let mut sensor = SmartPowerSensor::connect(transport).unwrap();
        sensor.read().unwrap();

        assert!(matches!(sensor.read(), Err(SamplerError::Parse(_))));
        assert!(sensor.is_connected());
        assert_eq!(sensor.last(), (5.0, 0.4, 2.0));

        sensor.read().unwrap();
        assert_eq!(sensor.last(), (5.1, 0.5, 2.1));
    }

    #[test]
    fn test_late_version_reply_is_skipped() {
        let transport = ScriptedTransport::default()
            .reply(status_frame(false, true))
            .silence()
            .reply(version_frame())
            .reply(data_frame("012.5", "001.0", "012.5"));
        let mut sensor = SmartPowerSensor::connect(transport).unwrap();
        assert!(sensor.is_connected());

        sensor.read().unwrap();
        assert_eq!(sensor.last(), (12.5, 1.0, 12.5));
        let sent = &sensor.transport.as_ref().unwrap().sent;
        assert_eq!(sent, &[0x81, 0x83, 0x37]);
    }

    #[test]
    fn test_reply_to_other_request_disconnects() {
        let transport = ScriptedTransport::default()
            .reply(status_frame(false, true))
            .reply(version_frame())
            .reply(status_frame(true, true));
        let mut sensor = SmartPowerSensor::connect(transport).unwrap();

        assert!(matches!(sensor.read(), Err(SamplerError::Protocol(_))));
        assert!(!sensor.is_connected());
        assert!(!sensor.is_started());
    }
}
