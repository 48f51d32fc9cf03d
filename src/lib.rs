//! # esp-at-server
//!
//! Event driven TCP server for [ESP-AT](https://github.com/espressif/esp-at) modems, based on the
//! [ATAT](https://github.com/BlackbirdHQ/atat) library.
//!
//! ESP-AT accepts connections on its own. The crate translates the URC messages of ESP-AT into
//! [Event](event::Event)s and delivers them to [EventHandler](engine::EventHandler)s:
//!
//! * [ServerRouter](router::ServerRouter) reacts on connection events. It reports the received byte
//!   count and closes every connection after receiving data.
//! * [LifecycleRouter](router::LifecycleRouter) reacts on events of the engine itself, like an
//!   unsupported firmware version or an unexpected device reset.
//!
//! During a callback the handler gets access to the [Engine](engine::Engine), e.g. for closing the
//! connection.
//!
//! ## Example
//!
//! ````
//! # use esp_at_server::adapter::Adapter;
//! # use esp_at_server::esp::Esp;
//! # use esp_at_server::example::{ExampleAtClient, ExampleTimer};
//! # use esp_at_server::router::{LifecycleRouter, Report, Reporter, ServerRouter};
//! # use esp_at_server::server::ServerConfig;
//! #
//! #[derive(Default)]
//! struct Reports(Vec<Report>);
//!
//! impl Reporter for Reports {
//!     fn report(&mut self, report: Report) {
//!         self.0.push(report);
//!     }
//! }
//!
//! let channel = ExampleAtClient::urc_channel();
//! let client = ExampleAtClient::init(&channel);
//! let adapter: Adapter<_, _, 1_000_000, 128, 8> =
//!     Adapter::new(client, channel.subscriber().unwrap(), ExampleTimer::default());
//!
//! let mut esp = Esp::initialize(adapter, LifecycleRouter::new()).unwrap();
//! esp.start_server(ServerConfig::new(80), ServerRouter::with_reporter(Reports::default())).unwrap();
//! esp.poll();
//!
//! let reports = esp.stop_server().unwrap().unwrap().into_reporter().0;
//! assert_eq!(
//!     vec![
//!         Report::ConnectionActive { connection: 0 },
//!         Report::DataReceived { connection: 0, length: 4 },
//!         Report::ConnectionClosed { connection: 0 },
//!     ],
//!     reports
//! );
//! ````
//!
//! ## Logging
//!
//! Reports of the routers and engine diagnostics are written to the [log] facade. Logging of the
//! ATAT crate may be enabled by the `atat-log` feature.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

#[cfg(test)]
extern crate alloc;

pub mod adapter;
pub(crate) mod commands;
pub mod engine;
pub mod esp;
pub mod event;
pub(crate) mod responses;
pub mod router;
pub mod server;
pub mod station;
pub mod urc;
pub mod wifi;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
