//! # Events delivered to application callbacks
//!
//! Every callback invocation receives exactly one [Event]. Events, the [Connection] they refer to and
//! the received [Buffer] are borrowed from the engine and only valid for the duration of the callback.
//! Data which needs to outlive the callback must be copied out, e.g. by [Buffer::copy_to()]. Connections
//! may be remembered by [Connection::number()].
use core::fmt::{Display, Formatter};

/// Handle of a single accepted network session
///
/// Instances are created by the engine only and are never handed out by value.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection {
    /// ESP-AT link id
    link_id: usize,

    /// False once the session has been terminated
    active: bool,
}

impl Connection {
    pub(crate) fn new(link_id: usize, active: bool) -> Self {
        Self { link_id, active }
    }

    /// Returns the numeric identifier of the connection
    pub fn number(&self) -> usize {
        self.link_id
    }

    /// Returns true if the session is still open
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Length calculation mode of [Buffer::length()]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LengthMode {
    /// Length of the first segment only
    Segment,

    /// Length of all segments
    Total,
}

/// Immutable view on received data
///
/// Data is split into segments, one per receive chunk fetched from ESP-AT.
#[derive(Copy, Clone, Debug)]
pub struct Buffer<'a> {
    segments: &'a [&'a [u8]],
}

impl<'a> Buffer<'a> {
    pub(crate) fn new(segments: &'a [&'a [u8]]) -> Self {
        Self { segments }
    }

    /// Returns the byte count of the first segment or of the whole buffer
    pub fn length(&self, mode: LengthMode) -> usize {
        match mode {
            LengthMode::Segment => self.segments.first().map_or(0, |segment| segment.len()),
            LengthMode::Total => self.segments.iter().map(|segment| segment.len()).sum(),
        }
    }

    /// Total byte count
    pub fn len(&self) -> usize {
        self.length(LengthMode::Total)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all data segments in receive order
    pub fn segments(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.segments.iter().copied()
    }

    /// Copies as many bytes as fit into the destination and returns the copied byte count
    pub fn copy_to(&self, destination: &mut [u8]) -> usize {
        let mut position = 0;

        for segment in self.segments {
            let length = segment.len().min(destination.len() - position);
            destination[position..position + length].copy_from_slice(&segment[..length]);
            position += length;

            if position == destination.len() {
                break;
            }
        }

        position
    }
}

/// Discriminant of an [Event]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    ConnectionActive,
    DataReceived,
    ConnectionClosed,
    InitFinished,
    Reset,
    VersionNotSupported,
}

/// Event reported by the engine
#[derive(Debug)]
pub enum Event<'a> {
    /// Remote peer connected to the listening port
    ConnectionActive(&'a Connection),

    /// Data was received on the given connection. Buffer is None if no data could be fetched.
    DataReceived {
        connection: &'a Connection,
        buffer: Option<Buffer<'a>>,
    },

    /// Connection was terminated, identifier is invalid from now on
    ConnectionClosed(&'a Connection),

    /// Engine is initialized and ready for connection and access point operations
    InitFinished,

    /// Device restarted unexpectedly
    Reset,

    /// Firmware of ESP-AT is older then the minimum supported version
    VersionNotSupported,
}

impl<'a> Event<'a> {
    /// Returns the discriminant of the event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ConnectionActive(_) => EventKind::ConnectionActive,
            Event::DataReceived { .. } => EventKind::DataReceived,
            Event::ConnectionClosed(_) => EventKind::ConnectionClosed,
            Event::InitFinished => EventKind::InitFinished,
            Event::Reset => EventKind::Reset,
            Event::VersionNotSupported => EventKind::VersionNotSupported,
        }
    }

    /// Returns the connection of connection related events
    pub fn connection(&self) -> Option<&'a Connection> {
        match self {
            Event::ConnectionActive(connection)
            | Event::ConnectionClosed(connection)
            | Event::DataReceived { connection, .. } => Some(*connection),
            _ => None,
        }
    }

    /// Returns the received buffer of [Event::DataReceived]
    pub fn received_buffer(&self) -> Option<&Buffer<'a>> {
        match self {
            Event::DataReceived { buffer, .. } => buffer.as_ref(),
            _ => None,
        }
    }
}

/// Semantic firmware version
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl FirmwareVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Result of a callback invocation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,

    /// Event handling failed. Gets logged by the engine, dispatching continues.
    Error,
}
