//! # TCP server
//!
//! ESP-AT accepts connections on its own once the server is started. Accepted connections, received
//! data and closed connections are reported by URC messages, which get translated into [Event]s.
//!
//! Received data is kept by ESP-AT (passive receiving mode) until the connection event gets delivered.
//! It is then fetched in chunks of RX_SIZE bytes, s. [Adapter].
//!
//! ## Example
//!
//! ````
//! # use esp_at_server::adapter::Adapter;
//! # use esp_at_server::example::{ExampleAtClient, ExampleTimer};
//! # use esp_at_server::router::{LifecycleRouter, ServerRouter};
//! # use esp_at_server::server::ServerConfig;
//! #
//! let channel = ExampleAtClient::urc_channel();
//! let client = ExampleAtClient::init(&channel);
//! let mut adapter: Adapter<_, _, 1_000_000, 128, 8> =
//!     Adapter::new(client, channel.subscriber().unwrap(), ExampleTimer::default());
//!
//! let mut lifecycle = LifecycleRouter::new();
//! let mut server = ServerRouter::new();
//!
//! adapter.initialize(&mut lifecycle).unwrap();
//! adapter.start_server(&ServerConfig::new(80)).unwrap();
//!
//! // Delivers connect, data and close events of the example client
//! while adapter.dispatch_events(&mut lifecycle, Some(&mut server)) > 0 {}
//! ````
use crate::adapter::{Adapter, Error, PendingEvent, Session};
use crate::commands::{
    CloseSocketCommand, ReceiveDataCommand, ServerCommand, ServerMaxConnectionsCommand, ServerTimeoutCommand,
    SetMultipleConnectionsCommand, SetSocketReceivingModeCommand,
};
use crate::engine::EventHandler;
use crate::event::{Buffer, Connection, Event};
use atat::blocking::AtatClient;
use fugit_timer::Timer;
use heapless::Vec;

/// Max. number of parallel connections supported by ESP-AT
pub const MAX_CONNECTIONS: usize = 5;

/// Max. number of receive chunks delivered by a single data event
pub(crate) const MAX_SEGMENTS: usize = 4;

/// Internal state of a single link
#[derive(Copy, Clone, Default)]
pub(crate) struct SocketState {
    /// Connection state
    pub(crate) state: ConnectionState,

    /// Data length in bytes available to receive which is buffered by ESP-AT
    pub(crate) data_available: usize,

    /// True if a data event is waiting for delivery
    pub(crate) data_queued: bool,
}

/// Internal connection state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum ConnectionState {
    /// Link is free
    #[default]
    Closed,
    /// Connection is fully open
    Connected,
    /// Close was requested, but not yet confirmed by URC message
    Closing,
}

/// Server parameters
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Max. number of parallel connections, range 1-5
    pub max_connections: usize,

    /// Seconds after which idle connections are closed by ESP-AT, 0 => never. Range 0-7200.
    pub idle_timeout: u16,
}

impl ServerConfig {
    /// Config accepting the max. number of connections without idle timeout
    pub fn new(port: u16) -> Self {
        Self {
            port,
            max_connections: MAX_CONNECTIONS,
            idle_timeout: 0,
        }
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn idle_timeout(mut self, seconds: u16) -> Self {
        self.idle_timeout = seconds;
        self
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
    /// Starts listening for connections
    ///
    /// On first call ESP-AT is configured for multiple connections and passive socket receiving mode.
    pub fn start_server(&mut self, config: &ServerConfig) -> Result<(), Error> {
        if config.max_connections == 0 || config.max_connections > MAX_CONNECTIONS {
            return Err(Error::InvalidMaxConnections);
        }

        self.enable_multiple_connections()?;
        self.enable_passive_receiving_mode()?;

        self.send_command(ServerMaxConnectionsCommand::new(config.max_connections))?;
        self.send_command(ServerCommand::start(config.port))?;
        self.session.server_active = true;

        self.send_command(ServerTimeoutCommand::new(config.idle_timeout))?;
        Ok(())
    }

    /// Deletes the server. All server connections get closed by ESP-AT.
    pub fn stop_server(&mut self) -> Result<(), Error> {
        self.send_command(ServerCommand::stop())?;
        self.session.server_active = false;
        Ok(())
    }

    /// Returns true if the server is listening
    pub fn is_server_active(&mut self) -> bool {
        self.process_urc_messages();
        self.session.server_active
    }

    /// Delivers all pending events and returns the number of processed events
    ///
    /// Connection events are delivered to the server handler, engine events to the lifecycle handler.
    /// Without server handler, connection events are dropped.
    pub fn dispatch_events<L, S>(&mut self, lifecycle: &mut L, mut server: Option<&mut S>) -> usize
    where
        L: EventHandler<Self>,
        S: EventHandler<Self>,
    {
        self.process_urc_messages();
        let mut count = 0;

        while let Some(pending) = self.session.pending.pop_front() {
            match pending {
                PendingEvent::Connected(link_id) => self.dispatch_connected(link_id, server.as_deref_mut()),
                PendingEvent::DataAvailable(link_id) => self.dispatch_data(link_id, server.as_deref_mut()),
                PendingEvent::Closed(link_id) => self.dispatch_closed(link_id, server.as_deref_mut()),
                PendingEvent::Reset => self.dispatch_reset(lifecycle, server.as_deref_mut()),
            }

            count += 1;
            self.process_urc_messages();
        }

        count
    }

    fn dispatch_connected<S: EventHandler<Self>>(&mut self, link_id: usize, server: Option<&mut S>) {
        self.session.sockets[link_id].state = ConnectionState::Connected;
        self.emit_connection_event(server, &Event::ConnectionActive(&Connection::new(link_id, true)));
    }

    fn dispatch_data<S: EventHandler<Self>>(&mut self, link_id: usize, server: Option<&mut S>) {
        self.session.sockets[link_id].data_queued = false;

        // Data of a connection which got closed in the meantime
        if self.session.sockets[link_id].state != ConnectionState::Connected {
            return;
        }

        let chunks = match self.receive_chunks(link_id) {
            Ok(chunks) => chunks,
            Err(error) => {
                log::warn!("Fetching data of connection {} failed: {:?}", link_id, error);
                self.session.sockets[link_id].data_available = 0;
                Vec::new()
            }
        };

        let segments: Vec<&[u8], MAX_SEGMENTS> = chunks.iter().map(|chunk| chunk.as_slice()).collect();
        let buffer = if segments.is_empty() {
            None
        } else {
            Some(Buffer::new(segments.as_slice()))
        };

        let connection = Connection::new(link_id, true);
        self.emit_connection_event(
            server,
            &Event::DataReceived {
                connection: &connection,
                buffer,
            },
        );

        // Remaining data is delivered by a subsequent event
        let socket = &self.session.sockets[link_id];
        if socket.state == ConnectionState::Connected && socket.data_available > 0 && !socket.data_queued {
            self.session.sockets[link_id].data_queued = true;
            self.session.enqueue(PendingEvent::DataAvailable(link_id));
        }
    }

    fn dispatch_closed<S: EventHandler<Self>>(&mut self, link_id: usize, server: Option<&mut S>) {
        // Already reported, e.g. by a restart
        if self.session.sockets[link_id].state == ConnectionState::Closed {
            return;
        }

        self.session.sockets[link_id] = SocketState::default();
        self.emit_connection_event(server, &Event::ConnectionClosed(&Connection::new(link_id, false)));
    }

    fn dispatch_reset<L, S>(&mut self, lifecycle: &mut L, mut server: Option<&mut S>)
    where
        L: EventHandler<Self>,
        S: EventHandler<Self>,
    {
        for link_id in 0..MAX_CONNECTIONS {
            self.dispatch_closed(link_id, server.as_deref_mut());
        }

        self.session.restarted();
        self.session.reset_detected = true;
        self.emit(lifecycle, &Event::Reset);
    }

    fn emit_connection_event<S: EventHandler<Self>>(&mut self, server: Option<&mut S>, event: &Event<'_>) {
        match server {
            Some(handler) => self.emit(handler, event),
            None => log::debug!("No server handler installed, dropping {:?}", event.kind()),
        }
    }

    /// Fetches the available data of the given link
    fn receive_chunks(&mut self, link_id: usize) -> Result<Vec<atat::heapless::Vec<u8, RX_SIZE>, MAX_SEGMENTS>, Error> {
        let mut chunks = Vec::new();

        while self.session.sockets[link_id].data_available > 0 && !chunks.is_full() {
            let length = self.session.sockets[link_id].data_available.min(RX_SIZE);

            self.session.data = None;
            self.send_command(ReceiveDataCommand::new(link_id, length))?;
            self.process_urc_messages();

            let data = match self.session.data.take() {
                Some(data) if !data.is_empty() => data,
                _ => {
                    log::warn!("No data received for connection {}", link_id);
                    self.session.sockets[link_id].data_available = 0;
                    break;
                }
            };

            self.session.reduce_available_data(link_id, data.len());
            if chunks.push(data).is_err() {
                break;
            }
        }

        Ok(chunks)
    }

    /// Closes the given link, s. [crate::engine::Engine::close_connection()]
    pub(crate) fn close_socket(&mut self, link_id: usize, graceful: bool) -> Result<(), Error> {
        self.process_urc_messages();

        match self.session.socket_state(link_id) {
            None | Some(ConnectionState::Closed) => return Err(Error::InvalidConnection),
            Some(ConnectionState::Closing) => return Ok(()),
            Some(ConnectionState::Connected) => {}
        }

        self.session.sockets[link_id].state = ConnectionState::Closing;

        // Remote side closed already, close event is waiting for delivery
        if self.session.is_close_pending(link_id) {
            return Ok(());
        }

        self.send_command(CloseSocketCommand::new(link_id))?;
        if !graceful {
            return Ok(());
        }

        self.process_urc_messages();
        if !self.session.is_close_pending(link_id) {
            return Err(Error::UnconfirmedSocketState);
        }

        Ok(())
    }

    /// Enables multiple connections.
    /// Stores internal state, so command is just sent once for saving bandwidth
    fn enable_multiple_connections(&mut self) -> Result<(), Error> {
        if self.session.multi_connections_enabled {
            return Ok(());
        }

        self.send_command(SetMultipleConnectionsCommand::multiple())?;
        self.session.multi_connections_enabled = true;
        Ok(())
    }

    /// Enables the passive socket receiving mode
    /// Stores internal state, so command is just sent once for saving bandwidth
    fn enable_passive_receiving_mode(&mut self) -> Result<(), Error> {
        if self.session.passive_mode_enabled {
            return Ok(());
        }

        self.send_command(SetSocketReceivingModeCommand::passive_mode())?;
        self.session.passive_mode_enabled = true;
        Ok(())
    }
}

impl<const RX_SIZE: usize> Session<RX_SIZE> {
    /// Returns the state of the given link, None if link_id is out of range
    pub(crate) fn socket_state(&self, link_id: usize) -> Option<ConnectionState> {
        self.sockets.get(link_id).map(|socket| socket.state)
    }

    /// Reduces the available data length mark by the given length of the given link
    pub(crate) fn reduce_available_data(&mut self, link_id: usize, length: usize) {
        let socket = &mut self.sockets[link_id];
        socket.data_available = socket.data_available.saturating_sub(length);
    }
}
