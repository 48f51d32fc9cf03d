use crate::event::FirmwareVersion;
use atat::atat_derive::AtatResp;
use atat::heapless::String;
use atat::heapless_bytes::Bytes;

/// Commands which gets just responded by OK
#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Single line response of CIFSR command
#[derive(Clone, AtatResp, Debug)]
pub struct LocalAddressResponse {
    /// Address type
    /// * STAIP: Local IPv4 address
    /// * STAIP6LL: Link local IPv6 address
    /// * STAIP6GL: Global IPv6 address
    /// * STAMAC: Local MAC address
    pub address_type: Bytes<8>,

    /// String encoded address
    pub address: String<64>,
}

/// AT firmware version extracted from the GMR response, e.g.
///
/// ```text
/// AT version:2.2.0.0(c6fa6bf - ESP32 - Jul  2 2021 06:44:05)
/// SDK version:v4.2.2-76-gefa6eca
/// compile time(3a696ba):Jul  2 2021 11:54:43
/// Bin version:2.2.0(WROOM-32)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FirmwareVersionResponse {
    pub version: FirmwareVersion,
}

impl atat::AtatResp for FirmwareVersionResponse {}

impl FirmwareVersionResponse {
    const PREFIX: &'static str = "AT version:";

    pub(crate) fn parse(response: &[u8]) -> Option<Self> {
        let text = core::str::from_utf8(response).ok()?;
        let line = text.lines().find_map(|line| line.trim().strip_prefix(Self::PREFIX))?;

        let end = line.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(line.len());
        let mut numbers = line[..end].split('.').map(|number| number.parse::<u8>());

        let major = numbers.next()?.ok()?;
        let minor = numbers.next()?.ok()?;
        let patch = numbers.next()?.ok()?;

        Some(Self {
            version: FirmwareVersion::new(major, minor, patch),
        })
    }
}
