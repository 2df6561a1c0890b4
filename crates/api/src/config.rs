//! Application configuration

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use helpdesk_dispatch::ListenerConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub ticket_bind_address: SocketAddr,
    pub bind_address: SocketAddr,

    // Technicians
    pub technician_count: usize,
    pub technician_work_ms: u64,

    // Ticket socket
    pub submission_timeout_ms: u64,
    pub max_frame_bytes: usize,

    // Change feed
    pub event_buffer: usize,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            ticket_bind_address: parse_address("TICKET_BIND_ADDRESS", "0.0.0.0:1900")?,
            bind_address: parse_address("BIND_ADDRESS", "0.0.0.0:3000")?,

            // Technicians
            technician_count: env::var("TECHNICIAN_COUNT")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            technician_work_ms: env::var("TECHNICIAN_WORK_MS")
                .unwrap_or_else(|_| "50000".to_string())
                .parse()
                .unwrap_or(50000),

            // Ticket socket
            submission_timeout_ms: env::var("SUBMISSION_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10000),
            max_frame_bytes: non_zero(
                "MAX_FRAME_BYTES",
                env::var("MAX_FRAME_BYTES")
                    .unwrap_or_else(|_| "65536".to_string()) // 64KB default
                    .parse()
                    .unwrap_or(65536),
            )?,

            // Change feed
            event_buffer: non_zero(
                "EVENT_BUFFER",
                env::var("EVENT_BUFFER")
                    .unwrap_or_else(|_| "256".to_string())
                    .parse()
                    .unwrap_or(256),
            )?,

            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    /// Simulated time a technician spends on each ticket
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.technician_work_ms)
    }

    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            submission_timeout: Duration::from_millis(self.submission_timeout_ms),
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

fn parse_address(var: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let value = env::var(var).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("'{}' is not a socket address", value),
    })
}

fn non_zero(var: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
