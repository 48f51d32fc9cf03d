use crate::adapter::Error as AdapterError;
use crate::responses::{FirmwareVersionResponse, LocalAddressResponse, NoResponse};
use crate::wifi::{AddressErrors, JoinError};
use atat::atat_derive::AtatCmd;
use atat::heapless::{String, Vec};
use atat::{Error as AtError, InternalError};

/// Trait for mapping command errors
pub trait CommandErrorHandler {
    type Error;

    /// Maps regular errors
    fn command_error(&self, error: AtError) -> Self::Error;
}

/// Restarts the module
#[derive(Clone, AtatCmd)]
#[at_cmd("+RST", NoResponse, timeout_ms = 1_000)]
pub struct RestartCommand;

impl CommandErrorHandler for RestartCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::RestartFailed(error)
    }
}

/// Queries the version information of AT firmware and SDK
#[derive(Clone)]
pub struct FirmwareVersionCommand;

impl atat::AtatCmd for FirmwareVersionCommand {
    type Response = FirmwareVersionResponse;

    const MAX_LEN: usize = 8;
    const MAX_TIMEOUT_MS: u32 = 1_000;

    fn write(&self, buf: &mut [u8]) -> usize {
        let command = b"AT+GMR\r\n";
        buf[..command.len()].copy_from_slice(command);
        command.len()
    }

    fn parse(&self, resp: Result<&[u8], InternalError>) -> Result<Self::Response, AtError> {
        let response = resp.map_err(|_| AtError::Error)?;
        FirmwareVersionResponse::parse(response).ok_or(AtError::Parse)
    }
}

impl CommandErrorHandler for FirmwareVersionCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::VersionQueryFailed(error)
    }
}

/// Sets the WIFI mode + optionally enables/disables auto_connect
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWMODE", NoResponse, timeout_ms = 1_000)]
pub struct WifiModeCommand {
    /// WIFI mode:
    ///     0: Null mode. Wi-Fi RF will be disabled.
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    #[at_arg(position = 0)]
    mode: usize,
}

impl WifiModeCommand {
    pub fn station_mode() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for WifiModeCommand {
    type Error = JoinError;

    fn command_error(&self, error: AtError) -> Self::Error {
        JoinError::ModeError(error)
    }
}

/// Command for setting the target WIFI access point parameters
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWJAP", NoResponse, timeout_ms = 20_000)]
pub struct AccessPointConnectCommand {
    /// The SSID of the target access point
    #[at_arg(position = 0)]
    ssid: String<32>,

    /// The password/key of the target access point
    #[at_arg(position = 1)]
    password: String<64>,
}

impl AccessPointConnectCommand {
    pub fn new(ssid: String<32>, password: String<64>) -> Self {
        Self { ssid, password }
    }
}

impl CommandErrorHandler for AccessPointConnectCommand {
    type Error = JoinError;

    fn command_error(&self, error: AtError) -> Self::Error {
        JoinError::ConnectError(error)
    }
}

/// Queries the local IP and MAC addresses
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIFSR", Vec<LocalAddressResponse, 4>, timeout_ms = 5_000)]
pub struct ObtainLocalAddressCommand;

impl ObtainLocalAddressCommand {
    pub fn new() -> Self {
        Self
    }
}

impl CommandErrorHandler for ObtainLocalAddressCommand {
    type Error = AddressErrors;

    fn command_error(&self, error: AtError) -> Self::Error {
        AddressErrors::CommandError(error)
    }
}

/// Enables/Disables multiple connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse, timeout_ms = 1_000)]
pub struct SetMultipleConnectionsCommand {
    /// 0: single connection, 1: multiple connections
    mode: usize,
}

impl SetMultipleConnectionsCommand {
    /// Enables multiple connections
    pub fn multiple() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for SetMultipleConnectionsCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::EnablingMultiConnectionsFailed(error)
    }
}

/// Sets the socket receiving mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPRECVMODE", NoResponse, timeout_ms = 1_000)]
pub struct SetSocketReceivingModeCommand {
    /// 0: active mode => ESP-AT will send all the received socket data instantly to the host MCU
    /// 1: passive mode => ESP-AT will keep the received socket data in an internal buffer
    mode: usize,
}

impl SetSocketReceivingModeCommand {
    /// Enables the passive receiving mode
    pub fn passive_mode() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for SetSocketReceivingModeCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::EnablingPassiveSocketModeFailed(error)
    }
}

/// Sets the maximum number of connections accepted by the server
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSERVERMAXCONN", NoResponse, timeout_ms = 1_000)]
pub struct ServerMaxConnectionsCommand {
    /// Range 1-5
    count: usize,
}

impl ServerMaxConnectionsCommand {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl CommandErrorHandler for ServerMaxConnectionsCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::ServerConfigurationFailed(error)
    }
}

/// Creates or deletes the TCP server
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSERVER", NoResponse, timeout_ms = 5_000)]
pub struct ServerCommand {
    /// 0: delete server, 1: create server
    mode: usize,

    /// Mode 1: Port to listen on
    /// Mode 0: 1 => close all server connections, 0 => keep them
    parameter: u16,
}

impl ServerCommand {
    /// Starts listening on the given port
    pub fn start(port: u16) -> Self {
        Self { mode: 1, parameter: port }
    }

    /// Deletes the server and closes all its connections
    pub fn stop() -> Self {
        Self { mode: 0, parameter: 1 }
    }
}

impl CommandErrorHandler for ServerCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::ServerCommandFailed(error)
    }
}

/// Sets the idle timeout of server connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTO", NoResponse, timeout_ms = 1_000)]
pub struct ServerTimeoutCommand {
    /// Timeout in seconds, range 0-7200. 0 => never times out.
    timeout: u16,
}

impl ServerTimeoutCommand {
    pub fn new(timeout: u16) -> Self {
        Self { timeout }
    }
}

impl CommandErrorHandler for ServerTimeoutCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::ServerConfigurationFailed(error)
    }
}

/// Fetches data buffered by ESP-AT in passive receiving mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPRECVDATA", NoResponse, timeout_ms = 1_000)]
pub struct ReceiveDataCommand {
    /// Socket ID
    link_id: usize,

    /// Max. length of data to receive
    length: usize,
}

impl ReceiveDataCommand {
    pub fn new(link_id: usize, length: usize) -> Self {
        Self { link_id, length }
    }
}

impl CommandErrorHandler for ReceiveDataCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::ReceiveFailed(error)
    }
}

/// Closes a connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 5_000)]
pub struct CloseSocketCommand {
    /// Socket ID
    link_id: usize,
}

impl CloseSocketCommand {
    pub fn new(link_id: usize) -> Self {
        Self { link_id }
    }
}

impl CommandErrorHandler for CloseSocketCommand {
    type Error = AdapterError;

    fn command_error(&self, error: AtError) -> Self::Error {
        AdapterError::CloseError(error)
    }
}
