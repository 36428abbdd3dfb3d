//! Line-oriented sources over `std::io` readers and serial ports.
use std::boxed::Box;
use std::io::{BufRead, BufReader, ErrorKind};
use std::string::String;
use std::time::Duration;
use std::vec::Vec;

use crate::config::MeasurementMode;
use crate::infra::source::parse_measurement;
use crate::protocol::transport::traits::measurement_source::MeasurementSource;

/// Serial port wrapped as a line source.
pub type SerialSource = LineSource<BufReader<Box<dyn serialport::SerialPort>>>;

/// Reads one measurement per line from any buffered reader.
///
/// The reader is dropped on [`close`](MeasurementSource::close), which
/// releases the underlying port or file.
pub struct LineSource<R: BufRead> {
    reader: Option<R>,
    mode: MeasurementMode,
    line: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R, mode: MeasurementMode) -> Self {
        Self {
            reader: Some(reader),
            mode,
            line: Vec::with_capacity(16),
        }
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl<R: BufRead> MeasurementSource for LineSource<R> {
    async fn read_one(&mut self) -> Option<i64> {
        let reader = self.reader.as_mut()?;
        self.line.clear();
        match reader.read_until(b'\n', &mut self.line) {
            // End of stream: nothing more will come, but it is still "no value".
            Ok(0) => None,
            Ok(_) => parse_measurement(&String::from_utf8_lossy(&self.line), self.mode),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                trace!("Measurement read timed out");
                None
            }
            Err(e) => {
                warn!("Measurement read failed: {}", e);
                None
            }
        }
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

/// Open a serial port delivering one measurement per line.
///
/// `read_timeout` bounds each [`read_one`](MeasurementSource::read_one).
pub fn open_serial(
    port: &str,
    baud: u32,
    read_timeout: Duration,
    mode: MeasurementMode,
) -> Result<SerialSource, serialport::Error> {
    let serial = serialport::new(port, baud).timeout(read_timeout).open()?;
    info!("Serial: {} @ {} ({:?})", port, baud, mode);
    Ok(LineSource::new(BufReader::new(serial), mode))
}
