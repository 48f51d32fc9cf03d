//! # Preferred access points
//!
//! Joins the first reachable network out of an ordered list of access points.
use crate::adapter::Adapter;
use crate::wifi::{JoinError, JoinState, WifiAdapter};
use atat::blocking::AtatClient;
use fugit_timer::Timer;

/// Credentials of a WIFI access point
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AccessPoint<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

impl<'a> AccessPoint<'a> {
    pub fn new(ssid: &'a str, password: &'a str) -> Self {
        Self { ssid, password }
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
    /// Tries the given access points in order until one was joined successfully.
    ///
    /// Non-blocking mode returns the error of the last access point after a single pass. Blocking mode
    /// waits the join retry delay after each failed pass and starts over, s. [Adapter::set_join_retry_delay_ms()].
    ///
    /// Credentials exceeding the length limits fail immediately in both modes.
    pub fn connect_to_preferred_access_point(
        &mut self,
        preferred: &[AccessPoint<'_>],
        blocking: bool,
    ) -> Result<JoinState, JoinError> {
        if preferred.is_empty() {
            return Err(JoinError::NoAccessPoint);
        }

        loop {
            let mut last_error = JoinError::NoAccessPoint;

            for access_point in preferred {
                match self.join(access_point.ssid, access_point.password) {
                    Ok(state) => {
                        log::info!("Joined access point {}", access_point.ssid);
                        return Ok(state);
                    }
                    Err(error @ (JoinError::InvalidSSDLength | JoinError::InvalidPasswordLength)) => {
                        return Err(error)
                    }
                    Err(error) => {
                        log::debug!("Joining access point {} failed: {:?}", access_point.ssid, error);
                        last_error = error;
                    }
                }
            }

            if !blocking {
                return Err(last_error);
            }

            log::warn!("No preferred access point reachable, retrying");
            self.delay(self.join_retry_delay).map_err(|_| JoinError::TimerError)?;
        }
    }
}
