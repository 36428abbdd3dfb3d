//! # Loopback Demo
//!
//! Runs the echo test against an in-memory adapter that loops every frame
//! back, fed by a replayed sensor log (microsecond readings):
//! - Parse sensor lines with `LineSource`
//! - Time the cycles with `EmbassyTimer` (std time driver)
//! - Stop early on Ctrl-C through the shared `CancelFlag`
//! - Print the final summary
//!
//! ```bash
//! cargo run --example loopback --features std
//! ```

use std::collections::VecDeque;
use std::io::Cursor;

use embassy_time::Duration;
use korri_echo::{
    config::{HarnessConfig, MeasurementMode},
    infra::{source::LineSource, timer::EmbassyTimer},
    protocol::{
        harness::{CancelFlag, EchoTest},
        transport::{can_frame::CanFrame, traits::transport::Transport},
    },
};

static CANCEL: CancelFlag = CancelFlag::new();

/// Adapter whose TX channel is wired to its RX channel. Every fifth frame is lost.
struct LoopbackBus {
    queue: VecDeque<CanFrame>,
    sent: u32,
}

impl Transport for LoopbackBus {
    type Error = ();

    fn start(&mut self, channel: u8) -> Result<(), Self::Error> {
        println!("   start channel {}", channel);
        Ok(())
    }

    fn stop(&mut self, channel: u8) -> Result<(), Self::Error> {
        println!("   stop channel {}", channel);
        Ok(())
    }

    fn close(&mut self) {
        println!("   adapter closed");
    }

    async fn send<'a>(&'a mut self, _channel: u8, frame: &'a CanFrame) -> Result<(), Self::Error> {
        self.sent += 1;
        if self.sent % 5 != 0 {
            self.queue.push_back(*frame);
        }
        Ok(())
    }

    async fn receive<'a>(
        &'a mut self,
        _channel: u8,
        batch: &'a mut [CanFrame],
    ) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < batch.len() {
            match self.queue.pop_front() {
                Some(frame) => {
                    batch[count] = frame;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("=== korri-echo loopback ===\n");

    // Ultrasound round-trip times, one per line; garbage lines are skipped.
    let sensor_log = "580\n1160\n\nERR\n17400\n2320\n3800000\n5800\n640\n9000\n";
    let config = HarnessConfig::builder()
        .total_cycles(8)
        .measurement_mode(MeasurementMode::Us)
        .response_wait(Duration::from_millis(50))
        .pacing_delay(Duration::from_millis(10))
        .build()
        .expect("valid configuration");

    println!("1. Opening resources");
    let harness = EchoTest::launch(
        config,
        |mode| Ok::<_, ()>(LineSource::new(Cursor::new(sensor_log.as_bytes()), mode)),
        |bitrate| {
            println!("   adapter opened at {} bit/s", bitrate);
            Ok(LoopbackBus {
                queue: VecDeque::new(),
                sent: 0,
            })
        },
        EmbassyTimer,
        &CANCEL,
    );
    let mut harness = match harness {
        Ok(harness) => harness,
        Err(e) => {
            eprintln!("   {}", e);
            return;
        }
    };

    // Ctrl-C ends the run after the current cycle; the adapter is still released.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            CANCEL.cancel();
        }
    });

    println!("\n2. Running {} cycles (Ctrl-C to stop)", config.total_cycles);
    let result = harness.run().await;

    println!("\n3. Releasing resources");
    let stats = harness.finish();

    match result {
        Ok(_) => println!("\n{}", stats.summary()),
        Err(e) => {
            eprintln!("   run aborted: {}", e);
            if let Some(partial) = e.partial_stats() {
                println!("\n{}", partial.summary());
            }
        }
    }
}
