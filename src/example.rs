//! Mocks for doc examples
use crate::urc::URCMessages;
use atat::blocking::AtatClient;
use atat::{AtatCmd, AtatUrc, Error};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

/// ATAT client mock
///
/// Simulates a peer connecting to the server, sending "PING" and getting closed.
pub struct ExampleAtClient<'a> {
    /// URC publisher used for statically mocking URC messages
    urc_publisher: Publisher<'a, CriticalSectionRawMutex, URCMessages<128>, 8, 1, 1>,
}

impl<'a> ExampleAtClient<'a> {
    pub fn urc_channel() -> PubSubChannel<CriticalSectionRawMutex, URCMessages<128>, 8, 1, 1> {
        PubSubChannel::new()
    }

    pub fn init(channel: &'a PubSubChannel<CriticalSectionRawMutex, URCMessages<128>, 8, 1, 1>) -> Self {
        Self {
            urc_publisher: channel.publisher().unwrap(),
        }
    }

    fn publish_urc(&self, message: &[u8]) {
        let message = URCMessages::parse(message).unwrap();
        self.urc_publisher.try_publish(message).unwrap();
    }
}

impl AtatClient for ExampleAtClient<'_> {
    fn send<A: AtatCmd>(&mut self, cmd: &A) -> Result<A::Response, Error> {
        let mut buffer = [0x0; 128];
        let length = cmd.write(&mut buffer);

        match &buffer[..length] {
            b"AT+RST\r\n" => self.publish_urc(b"ready\r\n"),
            b"AT+GMR\r\n" => {
                return cmd.parse(Ok(b"AT version:2.2.0.0(c6fa6bf - ESP32 - Jul  2 2021 06:44:05)\r\n\
                    SDK version:v4.2.2-76-gefa6eca\r\n\
                    Bin version:2.2.0(WROOM-32)\r\n"));
            }
            b"AT+CWJAP=\"test_wifi\",\"secret\"\r\n" => {
                self.publish_urc(b"WIFI CONNECTED\r\n");
                self.publish_urc(b"WIFI GOT IP\r\n");
            }
            b"AT+CIPSERVER=1,80\r\n" => {
                self.publish_urc(b"0,CONNECT\r\n");
                self.publish_urc(b"+IPD,0,4\r\n");
            }
            b"AT+CIPRECVDATA=0,4\r\n" => self.publish_urc(b"+CIPRECVDATA:4,PING"),
            b"AT+CIPCLOSE=0\r\n" => self.publish_urc(b"0,CLOSED\r\n"),
            b"AT+CIFSR\r\n" => {
                let response = cmd
                    .parse(Ok(
                        b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n",
                    ))
                    .map_err(|_| Error::Error)?;
                return Ok(response);
            }
            &_ => {}
        }

        let response = cmd.parse(Ok(b"\r\n")).map_err(|_| Error::Error)?;
        Ok(response)
    }
}

/// Timer mock, never expires
#[derive(Default)]
pub struct ExampleTimer {}

impl Timer<1_000_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1000000> {
        unimplemented!()
    }

    fn start(&mut self, _duration: TimerDurationU32<1000000>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        unimplemented!()
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        nb::Result::Err(nb::Error::WouldBlock)
    }
}
