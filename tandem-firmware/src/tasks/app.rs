//! Demo application task
//!
//! Each button press streams a fixed 0..99 byte pattern to the peer,
//! starting every send only after the previous one completed.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use crate::channels::{SendRequest, SEND_ACCEPTED, SEND_DONE, SEND_REQUESTS};
use crate::config::{DEMO_PORT, DEMO_RETRY_MS, DEMO_ROUNDS};

const PATTERN_LEN: usize = 100;

static PATTERN: [u8; PATTERN_LEN] = {
    let mut pattern = [0u8; PATTERN_LEN];
    let mut i = 0;
    while i < PATTERN_LEN {
        pattern[i] = i as u8;
        i += 1;
    }
    pattern
};

#[embassy_executor::task]
pub async fn app_task(mut button: Input<'static>) {
    info!("App task started, press the button to send");

    loop {
        button.wait_for_falling_edge().await;
        info!("Sending {} messages to port {}", DEMO_ROUNDS, DEMO_PORT);

        let mut sent = 0u32;
        let mut failed = 0u32;
        for round in 0..DEMO_ROUNDS {
            submit(SendRequest {
                port: DEMO_PORT,
                data: &PATTERN,
            })
            .await;

            match SEND_DONE.wait().await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("Send {} failed: {:?}", round, e);
                    failed += 1;
                }
            }
        }

        info!("Burst done: {} sent, {} failed", sent, failed);
        button.wait_for_high().await;
    }
}

/// Hand a request to the transport task, retrying while the link is busy
async fn submit(request: SendRequest) {
    loop {
        SEND_REQUESTS.send(request).await;
        if SEND_ACCEPTED.wait().await {
            return;
        }
        trace!("Link busy, retrying in {} ms", DEMO_RETRY_MS);
        Timer::after_millis(DEMO_RETRY_MS).await;
    }
}
