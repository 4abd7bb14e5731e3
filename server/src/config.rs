//! Runtime settings for the server process.

use shared::{TICK_RATE, TIME_LIMIT_SECONDS};
use std::time::Duration;

/// Lines a session may fall behind before it is disconnected.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 32;

/// Upper bound on the clock advance of a single tick, in seconds.
pub const MAX_TICK_DELTA: f32 = 1.0 / 20.0;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    /// TCP port; 0 lets the OS pick one
    pub port: u16,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Length of a match in seconds
    pub match_duration: f32,
    /// Capacity of each session's outbound queue
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            tick_rate: TICK_RATE,
            match_duration: TIME_LIMIT_SECONDS,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    /// Queue capacity, never zero.
    pub fn queue_capacity(&self) -> usize {
        self.outbound_queue.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.match_duration, 180.0);
        assert_eq!(config.queue_capacity(), DEFAULT_OUTBOUND_QUEUE);
        assert_eq!(config.address(), "0.0.0.0:0");
    }

    #[test]
    fn test_tick_duration() {
        let config = ServerConfig {
            tick_rate: 50,
            ..ServerConfig::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(20));

        let zero = ServerConfig {
            tick_rate: 0,
            ..ServerConfig::default()
        };
        assert_eq!(zero.tick_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_queue_capacity_is_never_zero() {
        let config = ServerConfig {
            outbound_queue: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.queue_capacity(), 1);
    }
}
