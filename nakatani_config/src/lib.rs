#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the measurement workstation.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every table is optional; an empty file yields the stock left-hand
//!   session with the 20-sample stabilizer.
use std::collections::HashSet;
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;
use serde::de::Deserializer;

/// Anatomical object being examined.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResearchObjectKind {
    #[default]
    LeftHand,
    RightHand,
    LeftFoot,
    RightFoot,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ResearchCfg {
    pub object: ResearchObjectKind,
    /// After a point is recorded, ignore the pen until it has been lifted (zero sample).
    pub require_pen_lift: bool,
    /// Optional explicit topology. Accepts either:
    /// - array of strings: ["A", "B"]
    /// - array of tables: [{ name = "A" }, { name = "B" }]
    #[serde(deserialize_with = "de_points")]
    pub points: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StabilizerCfg {
    /// Number of most recent samples the stability test looks at.
    pub window: usize,
    /// Stabilize only when the window maximum is strictly below this (open circuit ≈ very high).
    pub ceiling_ohms: u32,
    /// Stabilize only when `max - min` is strictly below this.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TransportCfg {
    /// Per-read wait handed to `PacketSource::read`.
    pub read_timeout_ms: u64,
    /// Capacity of the pump → session channel.
    pub queue_depth: usize,
}

impl Default for TransportCfg {
    fn default() -> Self {
        Self {
            read_timeout_ms: 100,
            queue_depth: 256,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorCfg {
    /// Settled resistance per point, cycled when the topology is longer.
    pub base_ohms: Vec<u32>,
    /// Peak deviation around the settled value while in contact.
    pub noise_ohms: u32,
    /// Noisy approach samples emitted before the contact settles.
    pub settle_samples: usize,
    /// Settled samples emitted per point.
    pub contact_samples: usize,
    /// Zero samples (pen lifted) between points.
    pub lift_samples: usize,
    /// Delay between emitted frames.
    pub period_ms: u64,
    pub battery_percent: u8,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            base_ohms: vec![12_000, 15_000, 9_000, 20_000, 17_000, 11_000],
            noise_ohms: 400,
            settle_samples: 10,
            contact_samples: 30,
            lift_samples: 5,
            period_ms: 2,
            battery_percent: 87,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub research: ResearchCfg,
    pub stabilizer: StabilizerCfg,
    pub transport: TransportCfg,
    pub logging: Logging,
    pub simulator: SimulatorCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointToml {
    Name(String),
    Table { name: String },
}

fn de_points<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<PointToml>> = Option::deserialize(deserializer)?;
    Ok(opt.map(|items| {
        items
            .into_iter()
            .map(|p| match p {
                PointToml::Name(name) | PointToml::Table { name } => name,
            })
            .collect()
    }))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Research
        if let Some(points) = &self.research.points {
            if points.is_empty() {
                eyre::bail!("research.points must list at least one point");
            }
            let mut seen = HashSet::new();
            for name in points {
                if name.trim().is_empty() {
                    eyre::bail!("research.points contains an empty name");
                }
                if !seen.insert(name.as_str()) {
                    eyre::bail!("research.points contains duplicate name {name:?}");
                }
            }
        }

        // Stabilizer
        if self.stabilizer.window == 0 {
            eyre::bail!("stabilizer.window must be >= 1");
        }
        if self.stabilizer.ceiling_ohms == 0 {
            eyre::bail!("stabilizer.ceiling_ohms must be > 0");
        }
        if self.stabilizer.max_spread_ohms == 0 {
            eyre::bail!("stabilizer.max_spread_ohms must be > 0");
        }

        // Transport
        if self.transport.read_timeout_ms == 0 {
            eyre::bail!("transport.read_timeout_ms must be >= 1");
        }
        if self.transport.queue_depth == 0 {
            eyre::bail!("transport.queue_depth must be >= 1");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        // Simulator
        if self.simulator.base_ohms.is_empty() {
            eyre::bail!("simulator.base_ohms must not be empty");
        }
        if self.simulator.contact_samples < self.stabilizer.window {
            eyre::bail!(
                "simulator.contact_samples ({}) must be >= stabilizer.window ({})",
                self.simulator.contact_samples,
                self.stabilizer.window
            );
        }
        if self.simulator.period_ms > 1000 {
            eyre::bail!("simulator.period_ms is unreasonably large (>1s)");
        }
        if self.simulator.battery_percent > 100 {
            eyre::bail!("simulator.battery_percent must be in [0, 100]");
        }

        Ok(())
    }
}
