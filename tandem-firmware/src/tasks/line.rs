//! Signaling line task
//!
//! Plays the interrupt side of the link: it only records edges and never
//! touches the engine.

use defmt::*;

use tandem_hal_rp2040::LineWatcher;

use crate::channels::{EDGE_CHANNEL, LINK_RESET};

#[embassy_executor::task]
pub async fn line_task(mut watcher: LineWatcher<'static>) {
    info!("Line task started, line {:?}", watcher.level());

    loop {
        let edge = watcher.next_edge().await;
        trace!("Line edge: {:?}", edge);

        if EDGE_CHANNEL.try_send(edge).is_err() {
            warn!("Edge channel full, dropped {:?}, resetting link", edge);
            LINK_RESET.signal(());
        }
    }
}
