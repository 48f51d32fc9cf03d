//! # ESP-AT engine
//!
//! [Adapter] implements the [Engine] contract on top of an ATAT client. URC messages are collected
//! into a queue of pending events, which gets delivered by [Adapter::dispatch_events()] to the installed
//! [EventHandler]s in the order the URCs were received.
//!
//! ## Example
//!
//! ````
//! # use esp_at_server::adapter::Adapter;
//! # use esp_at_server::engine::Engine;
//! # use esp_at_server::event::FirmwareVersion;
//! # use esp_at_server::example::{ExampleAtClient, ExampleTimer};
//! # use esp_at_server::router::LifecycleRouter;
//! #
//! let channel = ExampleAtClient::urc_channel();
//! let client = ExampleAtClient::init(&channel);
//! let mut adapter: Adapter<_, _, 1_000_000, 128, 8> =
//!     Adapter::new(client, channel.subscriber().unwrap(), ExampleTimer::default());
//!
//! // Restarts ESP-AT and checks the firmware version
//! adapter.initialize(&mut LifecycleRouter::new()).unwrap();
//! assert_eq!(FirmwareVersion::new(2, 2, 0), adapter.current_firmware_version());
//! ````
use crate::commands::{CommandErrorHandler, FirmwareVersionCommand, RestartCommand};
use crate::engine::{Engine, EventHandler};
use crate::event::{Connection, Event, FirmwareVersion, Status};
use crate::server::{SocketState, MAX_CONNECTIONS};
use crate::urc::URCMessages;
use atat::blocking::AtatClient;
use atat::{AtatCmd, Error as AtError, UrcSubscription};
use fugit::{ExtU32, TimerDurationU32};
use fugit_timer::Timer;
use heapless::Deque;

/// Oldest AT firmware version supporting passive receiving mode
pub const MINIMUM_FIRMWARE_VERSION: FirmwareVersion = FirmwareVersion::new(1, 7, 0);

/// Max. number of events waiting for delivery
pub(crate) const PENDING_CAPACITY: usize = 16;

/// Central client for network communication
///
/// RX_SIZE: Chunk size in bytes when receiving data. Needs to match the size of [URCMessages].
///
/// URC_CAPACITY: Capacity of the URC channel
pub struct Adapter<
    'urc_sub,
    A: AtatClient,
    T: Timer<TIMER_HZ>,
    const TIMER_HZ: u32,
    const RX_SIZE: usize,
    const URC_CAPACITY: usize,
> {
    /// ATAT client
    pub(crate) client: A,

    /// URC message subscriber
    pub(crate) urc_subscription: UrcSubscription<'urc_sub, URCMessages<RX_SIZE>, URC_CAPACITY, 1>,

    /// Timer used for timeout measurement and delays
    pub(crate) timer: T,

    /// Network state
    pub(crate) session: Session<RX_SIZE>,

    /// Max. duration to wait for the ready message after restart
    pub(crate) ready_timeout: TimerDurationU32<TIMER_HZ>,

    /// Delay between two access point connection attempts
    pub(crate) join_retry_delay: TimerDurationU32<TIMER_HZ>,

    /// Firmware version required by this crate
    pub(crate) minimum_version: FirmwareVersion,

    /// Firmware version reported by ESP-AT during initialization
    pub(crate) firmware_version: FirmwareVersion,
}

/// Errors of the ESP-AT engine
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Restart command failed
    RestartFailed(AtError),

    /// ESP-AT did not signal readiness after restart in time
    ReadyTimeout,

    /// GMR command failed or response did not contain a valid version
    VersionQueryFailed(AtError),

    /// Error while sending CIPMUX command for enabling multiple connections
    EnablingMultiConnectionsFailed(AtError),

    /// Error while sending CIPRECVMODE command for enabling passive socket receiving mode
    EnablingPassiveSocketModeFailed(AtError),

    /// Setting max. connection count or timeout of the server failed
    ServerConfigurationFailed(AtError),

    /// Creating or deleting the server failed (CIPSERVER command)
    ServerCommandFailed(AtError),

    /// Max. connection count is outside of the supported range 1-5
    InvalidMaxConnections,

    /// Fetching received data failed
    ReceiveFailed(AtError),

    /// Socket close command failed
    CloseError(AtError),

    /// Close command was responded by OK, but was not confirmed by URC message.
    UnconfirmedSocketState,

    /// Connection is unknown or was already closed
    InvalidConnection,

    /// Upstream timer error
    TimerError,
}

/// Event waiting for delivery
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PendingEvent {
    Connected(usize),
    DataAvailable(usize),
    Closed(usize),
    Reset,
}

/// Network state, mainly updated by URC messages
pub(crate) struct Session<const RX_SIZE: usize> {
    /// Currently joined to WIFI network? Gets updated by URC messages.
    pub(crate) joined: bool,

    /// True if an IP was assigned by access point. Get updated by URC message.
    pub(crate) ip_assigned: bool,

    /// True if the ready message is expected, as a restart was requested
    pub(crate) awaiting_ready: bool,

    /// True once the expected ready message was received
    pub(crate) ready: bool,

    /// True if multiple connections have been enabled
    pub(crate) multi_connections_enabled: bool,

    /// True if socket passive receiving mode is enabled
    pub(crate) passive_mode_enabled: bool,

    /// True if the server was started and not stopped by a reset
    pub(crate) server_active: bool,

    /// True if an unexpected restart was delivered and not yet acknowledged
    pub(crate) reset_detected: bool,

    /// Current socket states, array index = link_id
    pub(crate) sockets: [SocketState; MAX_CONNECTIONS],

    /// Received socket data by URC message
    pub(crate) data: Option<atat::heapless::Vec<u8, RX_SIZE>>,

    /// Events waiting for delivery
    pub(crate) pending: Deque<PendingEvent, PENDING_CAPACITY>,
}

impl<const RX_SIZE: usize> Default for Session<RX_SIZE> {
    fn default() -> Self {
        Self {
            joined: false,
            ip_assigned: false,
            awaiting_ready: false,
            ready: false,
            multi_connections_enabled: false,
            passive_mode_enabled: false,
            server_active: false,
            reset_detected: false,
            sockets: [SocketState::default(); MAX_CONNECTIONS],
            data: None,
            pending: Deque::new(),
        }
    }
}

impl<const RX_SIZE: usize> Session<RX_SIZE> {
    /// Handles a single URC message
    pub(crate) fn handle_urc(&mut self, message: URCMessages<RX_SIZE>) {
        match message {
            URCMessages::WifiDisconnected => {
                self.joined = false;
                self.ip_assigned = false;
            }
            URCMessages::ReceivedIP => self.ip_assigned = true,
            URCMessages::WifiConnected => self.joined = true,
            URCMessages::Ready => {
                if self.awaiting_ready {
                    self.awaiting_ready = false;
                    self.ready = true;
                } else {
                    self.enqueue(PendingEvent::Reset);
                }
            }
            URCMessages::SocketConnected(link_id) => self.enqueue(PendingEvent::Connected(link_id)),
            URCMessages::SocketClosed(link_id) => self.enqueue(PendingEvent::Closed(link_id)),
            URCMessages::DataAvailable(link_id, length) => {
                if link_id >= MAX_CONNECTIONS {
                    return;
                }

                self.sockets[link_id].data_available = length;
                if length > 0 && !self.sockets[link_id].data_queued {
                    self.sockets[link_id].data_queued = true;
                    self.enqueue(PendingEvent::DataAvailable(link_id));
                }
            }
            URCMessages::Data(data) => self.data = Some(data),
            URCMessages::Unknown => {}
        }
    }

    /// Appends an event to the delivery queue. Events get dropped if the queue is full.
    pub(crate) fn enqueue(&mut self, event: PendingEvent) {
        if self.pending.push_back(event).is_err() {
            log::warn!("Event queue full, dropping {:?}", event);
        }
    }

    /// Returns true if a close of the given link is waiting for delivery
    pub(crate) fn is_close_pending(&self, link_id: usize) -> bool {
        self.pending.iter().any(|event| *event == PendingEvent::Closed(link_id))
    }

    /// Resets all state lost by a restart of ESP-AT. Socket states are kept for delivering close events.
    pub(crate) fn restarted(&mut self) {
        self.joined = false;
        self.ip_assigned = false;
        self.multi_connections_enabled = false;
        self.passive_mode_enabled = false;
        self.server_active = false;
        self.data = None;
    }
}

impl<
        'urc_sub,
        A: AtatClient,
        T: Timer<TIMER_HZ>,
        const TIMER_HZ: u32,
        const RX_SIZE: usize,
        const URC_CAPACITY: usize,
    > Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY>
{
    /// Creates a new network adapter. Client needs to be in timeout or blocking mode
    pub fn new(
        client: A,
        urc_subscription: UrcSubscription<'urc_sub, URCMessages<RX_SIZE>, URC_CAPACITY, 1>,
        timer: T,
    ) -> Self {
        Self {
            client,
            urc_subscription,
            timer,
            session: Session::default(),
            ready_timeout: 5_000.millis(),
            join_retry_delay: 1_000.millis(),
            minimum_version: MINIMUM_FIRMWARE_VERSION,
            firmware_version: FirmwareVersion::default(),
        }
    }

    /// Restarts ESP-AT, detects the firmware version and reports the result to the given handler.
    ///
    /// [Event::VersionNotSupported] is emitted if the firmware is older then the minimum version,
    /// followed by [Event::InitFinished] in any case.
    pub fn initialize<L: EventHandler<Self>>(&mut self, lifecycle: &mut L) -> Result<(), Error> {
        self.restart()?;

        let response = self.send_command(FirmwareVersionCommand)?;
        self.firmware_version = response.version;
        log::debug!("Detected AT firmware version {}", self.firmware_version);

        if self.firmware_version < self.minimum_version {
            self.emit(lifecycle, &Event::VersionNotSupported);
        }

        self.emit(lifecycle, &Event::InitFinished);
        Ok(())
    }

    /// Restarts the module and blocks until ready
    fn restart(&mut self) -> Result<(), Error> {
        // Discarding messages of the previous session
        self.process_urc_messages();
        self.session = Session::default();
        self.session.awaiting_ready = true;

        self.send_command(RestartCommand)?;
        self.timer.start(self.ready_timeout).map_err(|_| Error::TimerError)?;

        loop {
            self.process_urc_messages();
            if self.session.ready {
                return Ok(());
            }

            match self.timer.wait() {
                Ok(_) => return Err(Error::ReadyTimeout),
                Err(nb::Error::Other(_)) => return Err(Error::TimerError),
                Err(nb::Error::WouldBlock) => {}
            }
        }
    }

    /// Processes all pending messages in the queue
    pub(crate) fn process_urc_messages(&mut self) {
        while let Some(message) = self.urc_subscription.try_next_message_pure() {
            self.session.handle_urc(message);
        }
    }

    /// Sends a command and maps the error if the command failed
    pub(crate) fn send_command<Cmd: AtatCmd + CommandErrorHandler>(
        &mut self,
        command: Cmd,
    ) -> Result<Cmd::Response, Cmd::Error> {
        self.client.send(&command).map_err(|error| command.command_error(error))
    }

    /// Delivers a single event to the given handler
    pub(crate) fn emit<H: EventHandler<Self>>(&mut self, handler: &mut H, event: &Event<'_>) {
        if handler.handle_event(self, event) != Status::Ok {
            log::warn!("Handling of event {:?} failed", event.kind());
        }
    }

    /// Blocks for the given duration
    pub(crate) fn delay(&mut self, duration: TimerDurationU32<TIMER_HZ>) -> Result<(), Error> {
        self.timer.start(duration).map_err(|_| Error::TimerError)?;
        nb::block!(self.timer.wait()).map_err(|_| Error::TimerError)
    }

    /// Returns true once after an unexpected restart of ESP-AT was delivered
    pub(crate) fn take_reset(&mut self) -> bool {
        core::mem::take(&mut self.session.reset_detected)
    }

    /// Sets the max. duration to wait for ESP-AT to become ready after a restart
    pub fn set_ready_timeout_ms(&mut self, timeout: u32) {
        self.ready_timeout = TimerDurationU32::millis(timeout);
    }

    /// Sets the delay between two connection attempts in blocking access point mode
    pub fn set_join_retry_delay_ms(&mut self, delay: u32) {
        self.join_retry_delay = TimerDurationU32::millis(delay);
    }

    /// Overrides the minimum firmware version checked by [Adapter::initialize()]
    pub fn set_minimum_firmware_version(&mut self, version: FirmwareVersion) {
        self.minimum_version = version;
    }
}

impl<
        'urc_sub,
        A: AtatClient,
        T: Timer<TIMER_HZ>,
        const TIMER_HZ: u32,
        const RX_SIZE: usize,
        const URC_CAPACITY: usize,
    > Engine for Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY>
{
    type Error = Error;

    /// Closes the connection by CIPCLOSE command.
    ///
    /// Non graceful close returns as soon as the command was accepted, the close gets reported
    /// later by [Event::ConnectionClosed]. Graceful close additionally waits for the confirmation
    /// by URC message.
    fn close_connection(&mut self, connection: &Connection, graceful: bool) -> Result<(), Error> {
        self.close_socket(connection.number(), graceful)
    }

    fn minimum_firmware_version(&self) -> FirmwareVersion {
        self.minimum_version
    }

    fn current_firmware_version(&self) -> FirmwareVersion {
        self.firmware_version
    }
}
