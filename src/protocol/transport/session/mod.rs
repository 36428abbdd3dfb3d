//! Scoped ownership of the bus adapter and the measurement source.
//!
//! Each guard owns its handle for the whole run and releases it in `Drop`:
//! started channels are stopped once each, then the handle is closed. The
//! release happens on every exit path (completion, cancellation, fatal error).
use crate::protocol::transport::traits::{
    measurement_source::MeasurementSource, transport::Transport,
};

//==================================================================================BUS_SESSION
/// Adapter with its transmit and receive channels started.
pub struct BusSession<T: Transport> {
    transport: T,
    tx_channel: u8,
    rx_channel: u8,
}

impl<T: Transport> BusSession<T> {
    /// Start the transmit channel, then the receive channel when it differs.
    ///
    /// On failure every channel started so far is stopped and the adapter is
    /// closed before the error is returned.
    pub fn start(mut transport: T, tx_channel: u8, rx_channel: u8) -> Result<Self, T::Error> {
        if let Err(e) = transport.start(tx_channel) {
            error!("Failed to start TX channel {}", tx_channel);
            transport.close();
            return Err(e);
        }
        if rx_channel != tx_channel {
            if let Err(e) = transport.start(rx_channel) {
                error!("Failed to start RX channel {}", rx_channel);
                if transport.stop(tx_channel).is_err() {
                    warn!("Failed to stop TX channel {}", tx_channel);
                }
                transport.close();
                return Err(e);
            }
        }
        debug!("Channels started: TX={}, RX={}", tx_channel, rx_channel);
        Ok(Self {
            transport,
            tx_channel,
            rx_channel,
        })
    }

    pub fn tx_channel(&self) -> u8 {
        self.tx_channel
    }

    pub fn rx_channel(&self) -> u8 {
        self.rx_channel
    }

    /// Access the adapter for send/receive calls.
    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Drop for BusSession<T> {
    fn drop(&mut self) {
        if self.transport.stop(self.tx_channel).is_err() {
            warn!("Failed to stop TX channel {}", self.tx_channel);
        }
        if self.rx_channel != self.tx_channel && self.transport.stop(self.rx_channel).is_err() {
            warn!("Failed to stop RX channel {}", self.rx_channel);
        }
        self.transport.close();
        debug!("Bus adapter released");
    }
}

//==================================================================================SOURCE_SESSION
/// Measurement source closed when the guard goes out of scope.
pub struct SourceSession<S: MeasurementSource> {
    source: S,
}

impl<S: MeasurementSource> SourceSession<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: MeasurementSource> Drop for SourceSession<S> {
    fn drop(&mut self) {
        self.source.close();
        debug!("Measurement source released");
    }
}
