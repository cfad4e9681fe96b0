//! Tunable transfer parameters shared by sender and receiver.

use std::time::Duration;

use thiserror::Error;

/// Default listening port (the payload is a DNS query).
pub const DEFAULT_PORT: u16 = 53;
/// How long the sender waits for each acknowledgment.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(3);
/// Resends allowed per fragment after the first transmission.
pub const DEFAULT_MAX_RETRIES: u32 = 10;
/// Payload bytes carried by one fragment.
pub const DEFAULT_CHUNK_SIZE: usize = 12;
/// Receiver inactivity period before an unfinished session is discarded.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(120);

/// Adjustable protocol parameters.
///
/// Both roles read the same struct; each ignores the fields that only
/// concern the other side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// UDP port the receiver listens on.
    pub port: u16,
    /// Bounded wait for the ack of one transmission.
    pub ack_timeout: Duration,
    /// Resends of a single fragment before the transfer is aborted.
    pub max_retries: u32,
    /// Maximum chunk length in bytes.
    pub chunk_size: usize,
    /// Receiver-side inactivity deadline for the active session.
    pub session_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.ack_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("ack_timeout"));
        }
        if self.session_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("session_timeout"));
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be at least one byte")]
    ZeroChunkSize,
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let c = TransferConfig::default();
        assert_eq!(c.port, 53);
        assert_eq!(c.ack_timeout, Duration::from_secs(3));
        assert_eq!(c.max_retries, 10);
        assert_eq!(c.chunk_size, 12);
        assert_eq!(c.session_timeout, Duration::from_secs(120));
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let c = TransferConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroChunkSize));
    }

    #[test]
    fn zero_timeouts_rejected() {
        let c = TransferConfig {
            ack_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroDuration("ack_timeout")));

        let c = TransferConfig {
            session_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::ZeroDuration("session_timeout"))
        );
    }

    #[test]
    fn zero_retries_is_allowed() {
        let c = TransferConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(c.validate().is_ok());
    }
}
