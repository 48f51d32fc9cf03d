//! # Engine contract
//!
//! The engine owns all connections and delivers [Event]s to installed [EventHandler]s. During a
//! callback the handler gets mutable access to the engine, which acts as context object for all
//! operations a handler may issue.
use crate::event::{Connection, Event, FirmwareVersion, Status};
use core::fmt::Debug;

/// Operations available to event handlers
pub trait Engine {
    /// Error of engine operations
    type Error: Debug;

    /// Closes the given connection
    ///
    /// If graceful is true, the call only succeeds once the close was confirmed by ESP-AT.
    fn close_connection(&mut self, connection: &Connection, graceful: bool) -> Result<(), Self::Error>;

    /// Returns the oldest firmware version supported by the engine
    fn minimum_firmware_version(&self) -> FirmwareVersion;

    /// Returns the firmware version detected during initialization
    fn current_firmware_version(&self) -> FirmwareVersion;
}

/// Callback receiving engine events
///
/// Called synchronously, one event at a time. Implementations must not block.
pub trait EventHandler<E: ?Sized> {
    fn handle_event(&mut self, engine: &mut E, event: &Event<'_>) -> Status;
}
