//! # Server bootstrap
//!
//! [Esp] ties the engine together with the event handlers: It initializes ESP-AT, joins an access point,
//! starts the server and runs the passive event loop. Events are delivered from the thread calling
//! [Esp::poll()] or [Esp::run()].
//!
//! ## Example
//!
//! ````
//! # use esp_at_server::adapter::Adapter;
//! # use esp_at_server::esp::{Esp, State};
//! # use esp_at_server::example::{ExampleAtClient, ExampleTimer};
//! # use esp_at_server::router::{LifecycleRouter, ServerRouter};
//! # use esp_at_server::server::ServerConfig;
//! # use esp_at_server::station::AccessPoint;
//! #
//! let channel = ExampleAtClient::urc_channel();
//! let client = ExampleAtClient::init(&channel);
//! let adapter: Adapter<_, _, 1_000_000, 128, 8> =
//!     Adapter::new(client, channel.subscriber().unwrap(), ExampleTimer::default());
//!
//! let mut esp = Esp::initialize(adapter, LifecycleRouter::new()).unwrap();
//! esp.connect_to_preferred_access_point(&[AccessPoint::new("test_wifi", "secret")], false).unwrap();
//! assert_eq!("10.0.0.181", esp.local_address().unwrap().ipv4.unwrap().to_string());
//! esp.start_server(ServerConfig::new(80), ServerRouter::new()).unwrap();
//! assert_eq!(State::Serving, esp.state());
//!
//! // Connection of the example client gets accepted, receives "PING" and is closed
//! assert_eq!(3, esp.poll());
//! ````
use crate::adapter::{Adapter, Error};
use crate::engine::EventHandler;
use crate::server::ServerConfig;
use crate::station::AccessPoint;
use crate::wifi::{JoinError, JoinState, LocalAddress, WifiAdapter};
use atat::blocking::AtatClient;
use core::convert::Infallible;
use fugit::TimerDurationU32;
use fugit_timer::Timer;

/// Bootstrap state
///
/// There is no uninitialized state, as an [Esp] is only created by [Esp::initialize()].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// ESP-AT is initialized, server is not running
    Initialized,

    /// Server is listening for connections
    Serving,

    /// Unexpected restart of ESP-AT was detected, server needs to be restored
    Reset,
}

/// Engine bundled with its event handlers
///
/// L: Lifecycle event handler, S: Connection event handler
pub struct Esp<
    'urc_sub,
    A: AtatClient,
    T: Timer<TIMER_HZ>,
    L,
    S,
    const TIMER_HZ: u32,
    const RX_SIZE: usize,
    const URC_CAPACITY: usize,
> {
    adapter: Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY>,
    lifecycle: L,
    server: Option<S>,

    /// Config of the last started server, used for restoring after reset
    server_config: Option<ServerConfig>,

    /// Station addresses obtained after joining an access point
    address: Option<LocalAddress>,

    state: State,
}

impl<
        'urc_sub,
        A: AtatClient,
        T: Timer<TIMER_HZ>,
        L: EventHandler<Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY>>,
        S: EventHandler<Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY>>,
        const TIMER_HZ: u32,
        const RX_SIZE: usize,
        const URC_CAPACITY: usize,
    > Esp<'urc_sub, A, T, L, S, TIMER_HZ, RX_SIZE, URC_CAPACITY>
{
    /// Installs the lifecycle handler and initializes ESP-AT, s. [Adapter::initialize()]
    pub fn initialize(
        mut adapter: Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY>,
        mut lifecycle: L,
    ) -> Result<Self, Error> {
        adapter.initialize(&mut lifecycle)?;

        Ok(Self {
            adapter,
            lifecycle,
            server: None,
            server_config: None,
            address: None,
            state: State::Initialized,
        })
    }

    /// Joins the first reachable access point, s. [Adapter::connect_to_preferred_access_point()]
    ///
    /// Station addresses are queried once an IP got assigned, s. [Esp::local_address()]. A failed
    /// address query does not fail the join.
    pub fn connect_to_preferred_access_point(
        &mut self,
        preferred: &[AccessPoint<'_>],
        blocking: bool,
    ) -> Result<JoinState, JoinError> {
        let state = self.adapter.connect_to_preferred_access_point(preferred, blocking)?;
        self.address = None;

        if state.ip_assigned {
            match self.adapter.get_address() {
                Ok(address) => {
                    match address.ipv4 {
                        Some(ip) => log::info!("Station IP: {}", ip),
                        None => log::info!("No station IPv4 address reported"),
                    }
                    self.address = Some(address);
                }
                Err(error) => log::warn!("Querying station address failed: {:?}", error),
            }
        }

        Ok(state)
    }

    /// Starts the server and installs the handler of its connection events
    pub fn start_server(&mut self, config: ServerConfig, handler: S) -> Result<(), Error> {
        self.adapter.start_server(&config)?;

        self.server = Some(handler);
        self.server_config = Some(config);
        self.state = State::Serving;
        Ok(())
    }

    /// Stops the server and returns the uninstalled connection handler.
    ///
    /// Close events of the connections terminated by stopping are delivered before the handler gets removed.
    pub fn stop_server(&mut self) -> Result<Option<S>, Error> {
        self.adapter.stop_server()?;
        self.poll();

        self.server_config = None;
        self.state = State::Initialized;
        Ok(self.server.take())
    }

    /// Delivers all pending events and returns the number of processed events
    pub fn poll(&mut self) -> usize {
        let count = self.adapter.dispatch_events(&mut self.lifecycle, self.server.as_mut());

        if self.adapter.take_reset() {
            self.state = State::Reset;
        }

        count
    }

    /// Passive event loop. Polls for events every `period_ms` milliseconds and restores the server
    /// after a device reset.
    ///
    /// Returns only if restoring the server or the timer failed.
    pub fn run(&mut self, period_ms: u32) -> Result<Infallible, Error> {
        loop {
            self.poll();

            if self.state == State::Reset {
                self.restore()?;
            }

            self.adapter.delay(TimerDurationU32::millis(period_ms))?;
        }
    }

    /// Restarts the server with the last config after a device reset
    fn restore(&mut self) -> Result<(), Error> {
        match self.server_config {
            Some(config) => {
                log::info!("Restoring server on port {}", config.port);
                self.adapter.start_server(&config)?;
                self.state = State::Serving;
            }
            None => self.state = State::Initialized,
        }

        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn adapter(&mut self) -> &mut Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY> {
        &mut self.adapter
    }

    /// Station addresses of the last successful join, if an IP was assigned
    pub fn local_address(&self) -> Option<&LocalAddress> {
        self.address.as_ref()
    }

    pub fn lifecycle_handler(&self) -> &L {
        &self.lifecycle
    }

    /// Returns the installed connection handler
    pub fn server_handler(&self) -> Option<&S> {
        self.server.as_ref()
    }
}
