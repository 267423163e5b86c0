//! Transport task
//!
//! Owns the engine and the bus. Link resets, edges, send requests and
//! watchdog expiry are handled one at a time; each is followed by servicing
//! whatever bus transfer it queued, so the engine never sees two events at
//! once.

use defmt::*;
use embassy_futures::select::{select4, Either4};
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Async, Spi};
use embassy_time::{Instant, Timer};

use tandem_core::{Event, LinkStats, SharedBuffer, TransportEngine, WatchdogTimer};
use tandem_hal_rp2040::{LinePin, SelectPin, SpiBus};

use crate::channels::{EDGE_CHANNEL, LINK_RESET, SEND_ACCEPTED, SEND_DONE, SEND_REQUESTS};

/// Engine as wired on this board
pub type LinkEngine = TransportEngine<'static, SelectPin<Output<'static>>, LinePin>;

/// SPI bus as wired on this board
pub type LinkBus = SpiBus<Spi<'static, SPI0, Async>>;

#[embassy_executor::task]
pub async fn transport_task(mut engine: LinkEngine, mut bus: LinkBus) {
    info!("Transport task started");

    engine.set_receive_handler(log_message);

    let mut timer = WatchdogTimer::new();
    let mut last_stats = LinkStats::new();

    loop {
        let deadline = timer.deadline_ms();
        let watchdog = async {
            match deadline {
                Some(ms) => Timer::at(Instant::from_millis(ms)).await,
                None => core::future::pending::<()>().await,
            }
        };

        match select4(
            LINK_RESET.wait(),
            EDGE_CHANNEL.receive(),
            SEND_REQUESTS.receive(),
            watchdog,
        )
        .await
        {
            Either4::First(()) => {
                // Edges queued before the loss no longer line up with the
                // line's level
                while EDGE_CHANNEL.try_receive().is_ok() {}
                engine.reset();
            }
            Either4::Second(edge) => {
                engine.handle(Event::from(edge));
            }
            Either4::Third(request) => {
                let accepted = engine.send(request.port, request.data, |result| {
                    SEND_DONE.signal(result);
                });
                SEND_ACCEPTED.signal(accepted);
            }
            Either4::Fourth(()) => {
                if let Some(token) = timer.poll(Instant::now().as_millis()) {
                    engine.handle(Event::WatchdogExpired(token));
                }
            }
        }

        engine.service(&mut bus).await;
        timer.sync(engine.watchdog(), Instant::now().as_millis());

        let stats = *engine.stats();
        if stats != last_stats {
            if stats.failures() != last_stats.failures() {
                warn!("Link failures: {} total, {:?}", stats.failures(), stats);
            } else {
                debug!("Link stats: {:?}", stats);
            }
            last_stats = stats;
        }
    }
}

/// Receive handler: log the payload and let the buffer go
fn log_message(port: u16, buffer: SharedBuffer) {
    info!(
        "Received {} bytes on port {}: {=[u8]:02x}",
        buffer.len(),
        port,
        buffer.as_slice()
    );
}
