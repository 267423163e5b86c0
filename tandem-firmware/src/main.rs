//! Tandem - SPI Link Master Firmware
//!
//! Runs the master side of the Tandem link on an RP2040: a half-duplex SPI
//! bus plus one shared signaling line, with a button-triggered demo that
//! streams messages to the peer and logs whatever the peer sends back.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::spi::Spi;
use embedded_alloc::LlffHeap as Heap;
use {defmt_rtt as _, panic_probe as _};

use tandem_core::TransportEngine;
use tandem_hal_rp2040::{spi_config, LinePin, LineWatcher, SelectPin, SpiBus};

mod channels;
mod config;
mod tasks;

// Heap for receive buffers and deferred callbacks
#[global_allocator]
static HEAP: Heap = Heap::empty();

/// GPIO carrying the signaling line
const LINE_GPIO: u8 = 20;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Tandem link master starting...");

    init_heap();

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let transport_config = config::transport_config();
    if let Err(e) = transport_config.validate() {
        defmt::panic!("Invalid link configuration: {:?}", e);
    }

    let bus_config = config::bus_config();
    let spi_config = match spi_config(&bus_config) {
        Ok(c) => c,
        Err(e) => defmt::panic!("Unsupported bus configuration: {:?}", e),
    };
    info!(
        "Link config: {} Hz, {:?}, max message {} bytes, watchdog {} ms",
        bus_config.frequency_hz,
        bus_config.mode,
        transport_config.max_message_len,
        transport_config.watchdog_timeout_ms
    );

    // Pin assignments are board-specific (Pico: SPI0 on GPIO16-19,
    // signaling line on GPIO20, demo button on GPIO21)
    let spi = Spi::new(
        p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, p.DMA_CH0, p.DMA_CH1, spi_config,
    );
    let select = SelectPin::new(Output::new(p.PIN_17, Level::High));
    let line = Input::new(p.PIN_20, Pull::Up);
    let button = Input::new(p.PIN_21, Pull::Up);

    let line_pin = match LinePin::new(LINE_GPIO) {
        Ok(pin) => pin,
        Err(e) => defmt::panic!("Signaling line not readable: {:?}", e),
    };

    let watcher = LineWatcher::new(line);
    let engine = TransportEngine::new(select, line_pin, transport_config);
    info!("Transport engine initialized");

    spawner.spawn(tasks::line_task(watcher)).unwrap();
    spawner
        .spawn(tasks::transport_task(engine, SpiBus::new(spi)))
        .unwrap();
    spawner.spawn(tasks::app_task(button)).unwrap();

    info!("All tasks spawned");
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; config::HEAP_SIZE] =
        [MaybeUninit::uninit(); config::HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, config::HEAP_SIZE)
    }
}
