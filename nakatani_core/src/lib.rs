#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Measurement core (transport-agnostic).
//!
//! Turns the pen's notification stream into per-point resistance values.
//! All device I/O goes through `nakatani_traits::PacketSource` and
//! `nakatani_traits::CommandSink`.
//!
//! ## Architecture
//!
//! - **Protocol**: frame decoder and command encoder (`protocol` module)
//! - **Stabilizer**: sliding-window settle test (`stabilizer` module)
//! - **Points**: ordered point arena and research-object topologies (`points` module)
//! - **Session**: research state machine (`research` module) and its observer interface
//! - **Threading**: `PacketPump` reads the transport on a worker thread; `run_session`
//!   applies packets on the caller's thread, one at a time

pub mod config;
pub mod conversions;
pub mod error;
pub mod mocks;
pub mod observer;
pub mod points;
pub mod protocol;
pub mod pump;
pub mod research;
pub mod runner;
pub mod stabilizer;

pub use config::{PumpCfg, SessionCfg, StabilizerCfg};
pub use error::{BuildError, MalformedPacket, ResearchError, Result};
pub use observer::{ChannelObserver, NoopObserver, ResearchEvent, ResearchObserver};
pub use points::{MeasurementPoint, MeasurementPointList, PointId, ResearchObject};
pub use protocol::{Command, DecodedPacket, DeviceEvent, decode, decode_packet, encode};
pub use pump::{Inbound, PacketPump};
pub use research::{ResearchProcessManager, SessionState};
pub use runner::{SessionOutcome, run_session};
pub use stabilizer::SampleStabilizer;
