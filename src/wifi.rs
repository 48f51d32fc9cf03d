//! # WIFI access point client
//!
//! Joining a network and obtaining address information is supported.
//!
//! Note: If the connection was not successful or is lost, the ESP-AT will try independently from time
//! to time (by default every second) to establish connection to the network. The status can be
//! queried using `get_join_status()`.
//!
//! ## Example
//!
//! ````
//! # use esp_at_server::adapter::Adapter;
//! # use esp_at_server::example::{ExampleAtClient, ExampleTimer};
//! # use esp_at_server::wifi::WifiAdapter;
//! #
//! let channel = ExampleAtClient::urc_channel();
//! let client = ExampleAtClient::init(&channel);
//! let mut adapter: Adapter<_, _, 1_000_000, 128, 8> =
//!     Adapter::new(client, channel.subscriber().unwrap(), ExampleTimer::default());
//!
//! // Setting target WIFI access point
//! adapter.join("test_wifi", "secret").unwrap();
//!
//! // Waiting until a DCHP IP has been assigned
//! while !adapter.get_join_status().ip_assigned {}
//!
//! let address = adapter.get_address().unwrap();
//! assert_eq!("10:fe:ed:05:ba:50", address.mac.unwrap().as_str());
//! assert_eq!("10.0.0.181", address.ipv4.unwrap().to_string());
//! ````
use crate::adapter::Adapter;
use crate::commands::{AccessPointConnectCommand, ObtainLocalAddressCommand, WifiModeCommand};
use crate::responses::LocalAddressResponse;
use atat::blocking::AtatClient;
use atat::heapless::{String, Vec};
use atat::Error as AtError;
use core::fmt::Debug;
use core::net::{Ipv4Addr, Ipv6Addr};
use core::str::FromStr;
use fugit_timer::Timer;

/// Wifi network adapter trait
pub trait WifiAdapter {
    /// Error when joining a WIFI network
    type JoinError: Debug;

    /// Error when receiving local address information
    type AddressError: Debug;

    /// Connects to an WIFI access point and returns the connection state
    fn join(&mut self, ssid: &str, key: &str) -> Result<JoinState, Self::JoinError>;

    /// Returns the current WIFI connection status
    fn get_join_status(&mut self) -> JoinState;

    /// Returns local address information
    fn get_address(&mut self) -> Result<LocalAddress, Self::AddressError>;
}

/// Possible errors when joining an access point
#[derive(Clone, Debug, PartialEq)]
pub enum JoinError {
    /// Error wile setting WIFI mode to station
    ModeError(AtError),

    /// Error while setting WIFI credentials
    ConnectError(AtError),

    /// Given SSD is longer then the max. size of 32 chars
    InvalidSSDLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,

    /// No access point was configured
    NoAccessPoint,

    /// Upstream timer error while waiting between connection attempts
    TimerError,
}

/// Errors when receiving local address information
#[derive(Clone, Debug, PartialEq)]
pub enum AddressErrors {
    /// CIFSR command failed
    CommandError(AtError),

    /// Error while parsing addresses
    AddressParseError,
}

/// Current WIFI connection state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JoinState {
    /// True if connected to an WIFI access point
    pub connected: bool,

    /// True if an IP was assigned
    pub ip_assigned: bool,
}

impl<
        'urc_sub,
        A: AtatClient,
        T: Timer<TIMER_HZ>,
        const TIMER_HZ: u32,
        const RX_SIZE: usize,
        const URC_CAPACITY: usize,
    > WifiAdapter for Adapter<'urc_sub, A, T, TIMER_HZ, RX_SIZE, URC_CAPACITY>
{
    type JoinError = JoinError;
    type AddressError = AddressErrors;

    /// Connects to an WIFI access point and returns the connection state
    ///
    /// Note:
    /// If the connection was not successful or is lost, the ESP-AT will try independently from time
    /// to time (by default every second) to establish connection to the network. The status can be
    /// queried using `get_join_status()`.
    fn join(&mut self, ssid: &str, key: &str) -> Result<JoinState, JoinError> {
        self.set_station_mode()?;
        self.connect_access_point(ssid, key)?;
        Ok(self.get_join_status())
    }

    /// Returns the current WIFI connection status
    fn get_join_status(&mut self) -> JoinState {
        self.process_urc_messages();
        JoinState {
            connected: self.session.joined,
            ip_assigned: self.session.ip_assigned,
        }
    }

    /// Returns local address information
    fn get_address(&mut self) -> Result<LocalAddress, AddressErrors> {
        let responses = self.send_command(ObtainLocalAddressCommand::new())?;
        LocalAddress::from_responses(responses)
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
    /// Sends the command for switching to station mode
    fn set_station_mode(&mut self) -> Result<(), JoinError> {
        self.send_command(WifiModeCommand::station_mode())?;
        Ok(())
    }

    /// Sends the command for setting the WIFI credentials
    fn connect_access_point(&mut self, ssid: &str, key: &str) -> Result<(), JoinError> {
        let ssid = String::from_str(ssid).map_err(|_| JoinError::InvalidSSDLength)?;
        if key.len() > 63 {
            return Err(JoinError::InvalidPasswordLength);
        }
        let key = String::from_str(key).map_err(|_| JoinError::InvalidPasswordLength)?;

        self.send_command(AccessPointConnectCommand::new(ssid, key))?;
        Ok(())
    }
}

/// Local IP and MAC addresses
#[derive(Default, Clone, Debug)]
pub struct LocalAddress {
    /// Local IPv4 address if assigned
    pub ipv4: Option<Ipv4Addr>,

    /// Local MAC address
    pub mac: Option<String<17>>,

    /// Link local IPv6 address if assigned
    pub ipv6_link_local: Option<Ipv6Addr>,

    /// Global IPv6 address if assigned
    pub ipv6_global: Option<Ipv6Addr>,
}

impl LocalAddress {
    pub(crate) fn from_responses(responses: Vec<LocalAddressResponse, 4>) -> Result<Self, AddressErrors> {
        let mut data = Self::default();

        for response in responses {
            let address = response.address.as_str();

            match response.address_type.as_slice() {
                b"STAIP" => data.ipv4 = Some(Self::parse_address(address)?),
                b"STAIP6LL" => data.ipv6_link_local = Some(Self::parse_address(address)?),
                b"STAIP6GL" => data.ipv6_global = Some(Self::parse_address(address)?),
                b"STAMAC" => data.mac = Some(String::from_str(address).map_err(|_| AddressErrors::AddressParseError)?),
                &_ => {}
            }
        }

        Ok(data)
    }

    fn parse_address<T: FromStr>(address: &str) -> Result<T, AddressErrors> {
        T::from_str(address).map_err(|_| AddressErrors::AddressParseError)
    }
}
