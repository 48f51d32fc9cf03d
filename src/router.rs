//! # Event routers
//!
//! Reference reactions to engine events:
//!
//! * [ServerRouter] handles connection events of a one-shot server: Every connection gets closed after
//!   receiving its first chunk of data.
//! * [LifecycleRouter] handles events of the engine itself.
//!
//! Both routers never fail the dispatch and report what happened to a [Reporter]. By default reports
//! are written to the [log] facade.
use crate::engine::{Engine, EventHandler};
use crate::event::{Event, FirmwareVersion, LengthMode, Status};
use core::fmt::{Display, Formatter};

/// Notification emitted by the routers
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Report {
    /// Connection with the given number is accepting traffic
    ConnectionActive { connection: usize },

    /// Given byte count was received on the connection
    DataReceived { connection: usize, length: usize },

    /// Connection was terminated
    ConnectionClosed { connection: usize },

    /// Closing the connection failed
    CloseFailed { connection: usize },

    /// Engine is ready for use
    Initialized,

    /// Device restarted unexpectedly
    DeviceReset,

    /// Current firmware is older then the minimum supported version
    UnsupportedFirmware {
        minimum: FirmwareVersion,
        current: FirmwareVersion,
    },
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Report::ConnectionActive { connection } => write!(f, "Connection {} active as server", connection),
            Report::DataReceived { connection, length } => {
                write!(f, "Server connection {} data received with {} bytes", connection, length)
            }
            Report::ConnectionClosed { connection } => write!(f, "Server connection {} closed", connection),
            Report::CloseFailed { connection } => write!(f, "Failed to close server connection {}", connection),
            Report::Initialized => write!(f, "Library initialized"),
            Report::DeviceReset => write!(f, "Device reset detected"),
            Report::UnsupportedFirmware { minimum, current } => write!(
                f,
                "Current AT version {} is not supported, minimum required AT version is {}",
                current, minimum
            ),
        }
    }
}

/// Sink for router reports
pub trait Reporter {
    fn report(&mut self, report: Report);
}

/// Writes reports to the [log] facade
#[derive(Copy, Clone, Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, report: Report) {
        match report {
            Report::UnsupportedFirmware { .. } => log::error!("{}", report),
            Report::DeviceReset | Report::CloseFailed { .. } => log::warn!("{}", report),
            _ => log::info!("{}", report),
        }
    }
}

/// Connection event router of a one-shot server
pub struct ServerRouter<R: Reporter> {
    reporter: R,
}

impl ServerRouter<LogReporter> {
    pub fn new() -> Self {
        Self::with_reporter(LogReporter)
    }
}

impl Default for ServerRouter<LogReporter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reporter> ServerRouter<R> {
    pub fn with_reporter(reporter: R) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Handles a single connection event, s. [EventHandler]
    pub fn handle_connection_event<E: Engine + ?Sized>(&mut self, engine: &mut E, event: &Event<'_>) -> Status {
        match event {
            Event::ConnectionActive(connection) => self.reporter.report(Report::ConnectionActive {
                connection: connection.number(),
            }),
            Event::DataReceived { connection, buffer } => {
                if let Some(buffer) = buffer {
                    self.reporter.report(Report::DataReceived {
                        connection: connection.number(),
                        length: buffer.length(LengthMode::Total),
                    });
                }

                if let Err(error) = engine.close_connection(connection, false) {
                    log::debug!("Closing connection {} failed: {:?}", connection.number(), error);
                    self.reporter.report(Report::CloseFailed {
                        connection: connection.number(),
                    });
                }
            }
            Event::ConnectionClosed(connection) => self.reporter.report(Report::ConnectionClosed {
                connection: connection.number(),
            }),
            _ => {}
        }

        Status::Ok
    }
}

impl<E: Engine + ?Sized, R: Reporter> EventHandler<E> for ServerRouter<R> {
    fn handle_event(&mut self, engine: &mut E, event: &Event<'_>) -> Status {
        self.handle_connection_event(engine, event)
    }
}

/// Router for engine lifecycle events
pub struct LifecycleRouter<R: Reporter> {
    reporter: R,
}

impl LifecycleRouter<LogReporter> {
    pub fn new() -> Self {
        Self::with_reporter(LogReporter)
    }
}

impl Default for LifecycleRouter<LogReporter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reporter> LifecycleRouter<R> {
    pub fn with_reporter(reporter: R) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Handles a single lifecycle event, s. [EventHandler]
    pub fn handle_lifecycle_event<E: Engine + ?Sized>(&mut self, engine: &mut E, event: &Event<'_>) -> Status {
        match event {
            Event::VersionNotSupported => {
                let minimum = engine.minimum_firmware_version();
                let current = engine.current_firmware_version();
                self.reporter.report(Report::UnsupportedFirmware { minimum, current });
            }
            Event::InitFinished => self.reporter.report(Report::Initialized),
            Event::Reset => self.reporter.report(Report::DeviceReset),
            _ => {}
        }

        Status::Ok
    }
}

impl<E: Engine + ?Sized, R: Reporter> EventHandler<E> for LifecycleRouter<R> {
    fn handle_event(&mut self, engine: &mut E, event: &Event<'_>) -> Status {
        self.handle_lifecycle_event(engine, event)
    }
}
