use atat::digest::ParseError;
use atat::heapless::Vec;
use atat::{AtatUrc, Parser};

/// URC definitions, needs to passed as generic of [AtDigester](atat::digest::AtDigester): `AtDigester<URCMessages<RX_SIZE>>`
///
/// RX_SIZE: Max. chunk size of data fetched by `AT+CIPRECVDATA`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum URCMessages<const RX_SIZE: usize> {
    /// Modem is ready for receiving AT commands
    Ready,
    /// WIFi connection state changed to to connected
    WifiConnected,
    /// Wifi connection state changed to disconnected
    WifiDisconnected,
    /// Received an IP from the access point
    ReceivedIP,
    /// Socket with the given link_id connected
    SocketConnected(usize),
    /// Socket with the given link_id closed
    SocketClosed(usize),
    /// Data of the given length is buffered by ESP-AT for the given link_id (link_id, length)
    DataAvailable(usize, usize),
    /// Socket data fetched by `AT+CIPRECVDATA`
    Data(Vec<u8, RX_SIZE>),
    /// Unknown URC message
    Unknown,
}

impl<const RX_SIZE: usize> AtatUrc for URCMessages<RX_SIZE> {
    type Response = Self;

    fn parse(resp: &[u8]) -> Option<Self::Response> {
        if resp.starts_with(Self::DATA_PREFIX) {
            return Self::parse_data(resp);
        }

        let line = resp.strip_suffix(b"\r\n").unwrap_or(resp);

        if line.starts_with(b"+IPD,") {
            return Self::parse_data_available(&line[5..]);
        }

        match line {
            [link_id, b',', b'C', b'O', b'N', b'N', b'E', b'C', b'T'] => {
                return Some(Self::SocketConnected(Self::parse_link_id(*link_id)?))
            }
            [link_id, b',', b'C', b'L', b'O', b'S', b'E', b'D'] => {
                return Some(Self::SocketClosed(Self::parse_link_id(*link_id)?))
            }
            _ => {}
        }

        match line {
            b"ready" => Some(Self::Ready),
            b"WIFI CONNECTED" => Some(Self::WifiConnected),
            b"WIFI DISCONNECT" => Some(Self::WifiDisconnected),
            b"WIFI GOT IP" => Some(Self::ReceivedIP),
            _ => Some(Self::Unknown),
        }
    }
}

impl<const RX_SIZE: usize> URCMessages<RX_SIZE> {
    const DATA_PREFIX: &'static [u8] = b"+CIPRECVDATA";

    /// Parses the socket id. Currently supports just socket 0-4
    fn parse_link_id(link_id: u8) -> Option<usize> {
        match link_id {
            b'0'..=b'4' => Some((link_id - b'0') as usize),
            _ => None,
        }
    }

    /// Parses a decimal number without sign
    fn parse_number(digits: &[u8]) -> Option<usize> {
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }

        core::str::from_utf8(digits).ok()?.parse::<usize>().ok()
    }

    /// Parses the `<link_id>,<length>` part of '+IPD,<link_id>,<length>'
    fn parse_data_available(arguments: &[u8]) -> Option<Self> {
        let mut parts = arguments.split(|byte| *byte == b',');

        let link_id = parts.next()?;
        let length = Self::parse_number(parts.next()?)?;

        if link_id.len() != 1 || parts.next().is_some() {
            return None;
        }

        Some(Self::DataAvailable(Self::parse_link_id(link_id[0])?, length))
    }

    /// Parses '+CIPRECVDATA:<length>,<data>' or the out-of-spec format '+CIPRECVDATA,<length>:<data>'
    fn parse_data(resp: &[u8]) -> Option<Self> {
        let (length, start) = Self::parse_data_header(resp).ok()?;
        let data = resp.get(start..start.checked_add(length)?)?;
        Some(Self::Data(Vec::from_slice(data).ok()?))
    }

    /// Returns the complete length of a data message at the start of the buffer
    fn match_data(buf: &[u8]) -> Result<usize, ParseError> {
        let (length, start) = Self::parse_data_header(buf)?;
        let end = start.checked_add(length).ok_or(ParseError::NoMatch)?;

        if buf.len() < end {
            return Err(ParseError::Incomplete);
        }

        Ok(end)
    }

    /// Returns the data length and the index of the first data byte.
    ///
    /// ESP-AT 2.x sends '+CIPRECVDATA:<length>,<data>'. Older firmware versions swap the separators,
    /// s. https://github.com/atlas-aero/rt-esp-at-nal/issues/23
    fn parse_data_header(buf: &[u8]) -> Result<(usize, usize), ParseError> {
        let data_separator = match buf.get(Self::DATA_PREFIX.len()) {
            Some(b':') => b',',
            Some(b',') => b':',
            Some(_) => return Err(ParseError::NoMatch),
            None => return Err(ParseError::Incomplete),
        };

        let arguments_start = Self::DATA_PREFIX.len() + 1;
        let arguments = &buf[arguments_start..];

        let separator = match arguments.iter().position(|byte| *byte == data_separator) {
            None if arguments.iter().all(u8::is_ascii_digit) => return Err(ParseError::Incomplete),
            None => return Err(ParseError::NoMatch),
            Some(separator) => separator,
        };

        let length = Self::parse_number(&arguments[..separator]).ok_or(ParseError::NoMatch)?;
        Ok((length, arguments_start + separator + 1))
    }

    /// Returns true if line is matching a data available notification e.g. "+IPD,0,100"
    fn matches_data_available(line: &str) -> bool {
        line.len() > 7 && line.starts_with("+IPD,")
    }

    /// Returns true if line is a socket state change, e.g. "0,CONNECT"
    fn matches_socket_state(line: &str) -> bool {
        matches!(line.get(1..), Some(",CONNECT") | Some(",CLOSED"))
    }
}

impl<const RX_SIZE: usize> Parser for URCMessages<RX_SIZE> {
    fn parse(buf: &[u8]) -> Result<(&[u8], usize), ParseError> {
        let mut start = 0;
        while buf[start..].starts_with(b"\r\n") {
            start += 2;
        }

        let remaining = &buf[start..];

        if remaining.starts_with(Self::DATA_PREFIX) {
            let end = start + Self::match_data(remaining)?;
            return Ok((&buf[start..end], end));
        }

        if remaining.len() < 4 {
            return Err(ParseError::NoMatch);
        }

        // Line does not end with CRLF
        let line_end = remaining
            .windows(2)
            .position(|window| window == b"\r\n")
            .ok_or(ParseError::NoMatch)?;

        let line = core::str::from_utf8(&remaining[..line_end]).map_err(|_| ParseError::NoMatch)?;
        let end = start + line_end + 2;

        // Min. line length for matching any needles
        if line.len() < 4 {
            return Err(ParseError::NoMatch);
        }

        if line == "ready"
            || line.starts_with("WIFI")
            || Self::matches_socket_state(line)
            || Self::matches_data_available(line)
        {
            return Ok((&buf[start..end], end));
        }

        Err(ParseError::NoMatch)
    }
}
