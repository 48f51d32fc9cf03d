//! Example that runs on Linux using a serial-USB-adapter.
//!
//! Joins the given access point and runs a one-shot server on port 80. Each connection is closed after
//! receiving data, e.g. `echo PING | nc <ip> 80`.
use std::{env, io, thread, time::Duration};

use atat::{AtDigester, AtatIngress, Config, Ingress, ResponseSlot, UrcChannel};
use esp_at_server::{
    adapter::Adapter,
    esp::Esp,
    router::{LifecycleRouter, ServerRouter},
    server::ServerConfig,
    station::AccessPoint,
    urc::URCMessages,
};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

// Size of the ingress buffer and the largest receivable URC. Received data is chunked by this size.
const RX_SIZE: usize = 1024;

// Buffer size of encoded commands
const TX_SIZE: usize = 1024;

// Number of URC messages buffered until dispatched
const URC_CAPACITY: usize = 16;

// Timer frequency in Hz
const TIMER_HZ: u32 = 1000;

// Event loop period
const POLL_PERIOD_MS: u32 = 50;

static RES_SLOT: ResponseSlot<RX_SIZE> = ResponseSlot::new();
static URC_CHANNEL: UrcChannel<URCMessages<RX_SIZE>, URC_CAPACITY, 1> = UrcChannel::new();

fn main() {
    env_logger::init();

    // Parse args
    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        println!("Usage: {} <path-to-serial> <baudrate> <ssid> <psk>", args[0]);
        println!("Example: {} /dev/ttyUSB0 115200 mywifi hellopasswd123", args[0]);
        println!("\nNote: To run the example with debug logging, run it like this:");
        println!("\n  RUST_LOG=debug cargo run --example linux --features \"linux-example atat-log\" -- /dev/ttyUSB0 115200 mywifi hellopasswd123");
        std::process::exit(1);
    }
    let dev = &args[1];
    let baud_rate: u32 = args[2].parse().expect("Invalid baudrate");
    let ssid = &args[3];
    let psk = &args[4];

    println!("Starting (dev={}, baud={:?})...", dev, baud_rate);

    // Open serial port
    let serial_tx = serialport::new(dev, baud_rate)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(500))
        .open()
        .expect("Could not open serial port");
    let mut serial_rx = serial_tx.try_clone().expect("Could not clone serial port");

    // Flush serial RX buffer, to ensure that there isn't any remaining left
    // form previous sessions.
    flush_serial(&mut serial_rx);

    let ingress_buffer = Box::leak(Box::new([0u8; RX_SIZE]));
    let mut ingress = Ingress::new(
        AtDigester::<URCMessages<RX_SIZE>>::new(),
        ingress_buffer,
        &RES_SLOT,
        &URC_CHANNEL,
    );

    // Launch reading thread, to pass incoming data from serial to the atat ingress
    thread::Builder::new()
        .name("serial_read".to_string())
        .spawn(move || loop {
            let buffer = ingress.write_buf();
            match serial_rx.read(buffer) {
                Ok(0) => {}
                Ok(bytes_read) => {
                    if let Err(error) = ingress.try_advance(bytes_read) {
                        log::error!("Ingress error: {:?}", error);
                    }
                }
                Err(e) => match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
                        // Ignore
                    }
                    _ => {
                        log::error!("Serial reading thread error while reading: {}", e);
                    }
                },
            }
        })
        .expect("Could not spawn serial reading thread");

    let client_buffer = Box::leak(Box::new([0u8; TX_SIZE]));
    let client = atat::blocking::Client::new(
        serial::SerialWriter::new(serial_tx),
        &RES_SLOT,
        client_buffer,
        Config::default(),
    );
    let subscription = URC_CHANNEL.subscribe().expect("No free URC subscriber");

    let adapter: Adapter<_, _, TIMER_HZ, RX_SIZE, URC_CAPACITY> =
        Adapter::new(client, subscription, timer::SysTimer::new());

    println!("Initializing ESP-AT...");
    let mut esp = Esp::initialize(adapter, LifecycleRouter::new()).expect("Initialization failed");

    println!("Join WiFi \"{}\"...", ssid);
    let state = esp
        .connect_to_preferred_access_point(&[AccessPoint::new(ssid, psk)], true)
        .expect("Joining access point failed");
    assert!(state.connected);

    if let Some(ip) = esp.local_address().and_then(|address| address.ipv4) {
        println!("Station IP: {}", ip);
    }

    esp.start_server(ServerConfig::new(80), ServerRouter::new())
        .expect("Starting server failed");
    println!("Listening on port 80");

    let error = esp.run(POLL_PERIOD_MS).unwrap_err();
    panic!("Event loop failed: {:?}", error);
}

/// Flush the serial port receive buffer.
fn flush_serial(serial_rx: &mut Box<dyn SerialPort>) {
    let mut buf = [0; 32];
    loop {
        match serial_rx.read(&mut buf[..]) {
            Ok(0) => break,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => break,
            Ok(_) => continue,
            Err(e) => panic!("Error while flushing serial: {}", e),
        }
    }
}

mod serial {
    use serialport::SerialPort;
    use std::io;

    /// Serial port as blocking ATAT transport
    pub struct SerialWriter {
        port: Box<dyn SerialPort>,
    }

    impl SerialWriter {
        pub fn new(port: Box<dyn SerialPort>) -> Self {
            Self { port }
        }
    }

    impl embedded_io::ErrorType for SerialWriter {
        type Error = io::Error;
    }

    impl embedded_io::Write for SerialWriter {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            io::Write::write(&mut self.port, buf)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            io::Write::flush(&mut self.port)
        }
    }
}

mod timer {
    use std::{convert::TryInto, time::Instant as StdInstant};

    use fugit::Instant;
    use fugit_timer::Timer;

    /// A timer with millisecond precision.
    pub struct SysTimer {
        origin: StdInstant,
        start: StdInstant,
        duration_ms: u32,
        started: bool,
    }

    impl SysTimer {
        pub fn new() -> SysTimer {
            SysTimer {
                origin: StdInstant::now(),
                start: StdInstant::now(),
                duration_ms: 0,
                started: false,
            }
        }
    }

    impl Timer<1000> for SysTimer {
        type Error = &'static str;

        /// Milliseconds since creation
        fn now(&mut self) -> fugit::TimerInstantU32<1000> {
            let milliseconds = (StdInstant::now() - self.origin).as_millis();
            let ticks: u32 = milliseconds.try_into().unwrap_or(u32::MAX);
            Instant::<u32, 1, 1000>::from_ticks(ticks)
        }

        fn start(&mut self, duration: fugit::TimerDurationU32<1000>) -> Result<(), Self::Error> {
            self.start = StdInstant::now();
            self.duration_ms = duration.ticks();
            self.started = true;
            Ok(())
        }

        /// Fails if the timer was never started or already canceled
        fn cancel(&mut self) -> Result<(), Self::Error> {
            if !self.started {
                Err("cannot cancel stopped timer")
            } else {
                self.started = false;
                Ok(())
            }
        }

        /// Returns `nb::Error::WouldBlock` until the duration has expired
        fn wait(&mut self) -> nb::Result<(), Self::Error> {
            if (StdInstant::now() - self.start).as_millis() >= self.duration_ms.into() {
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }

}
