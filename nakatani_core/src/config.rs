//! Runtime configuration for the measurement core.
//!
//! Separate from the TOML schema in `nakatani_config`; see `conversions`.

use std::time::Duration;

/// Stabilization thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizerCfg {
    /// Sliding window capacity; the test only runs on a full window.
    pub window: usize,
    /// The window maximum must be strictly below this.
    pub ceiling_ohms: u32,
    /// `max - min` must be strictly below this.
    pub max_spread_ohms: u32,
}

impl Default for StabilizerCfg {
    fn default() -> Self {
        Self {
            window: 20,
            ceiling_ohms: 90_000,
            max_spread_ohms: 5_000,
        }
    }
}

/// Per-session behaviour of the research state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCfg {
    pub stabilizer: StabilizerCfg,
    /// Keep ignoring the pen after a point is recorded until a zero sample (lift) arrives.
    pub require_pen_lift: bool,
}

/// Packet pump settings.
#[derive(Debug, Clone, Copy)]
pub struct PumpCfg {
    /// Per-read wait handed to the transport.
    pub read_timeout: Duration,
    /// Bounded channel capacity between pump and session.
    pub queue_depth: usize,
}

impl Default for PumpCfg {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            queue_depth: 256,
        }
    }
}
