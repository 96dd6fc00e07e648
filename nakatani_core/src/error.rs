use thiserror::Error;

/// A notification buffer that does not follow the `#X` + u32 framing.
///
/// Never fatal: the caller logs it and keeps listening.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedPacket {
    #[error("malformed packet: {len} bytes, need at least 6")]
    TooShort { len: usize },
    #[error("malformed packet: type prefix is not ASCII")]
    NonAsciiPrefix,
    #[error("malformed packet: unknown prefix {:?}", String::from_utf8_lossy(.0))]
    UnknownPrefix([u8; 2]),
}

#[derive(Debug, Error, Clone)]
pub enum ResearchError {
    #[error("device error: {0}")]
    Device(String),
    #[error("device disconnected during session")]
    DisconnectedDuringSession,
    #[error("session interrupted before completion")]
    Interrupted,
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("point list is empty")]
    EmptyPointList,
    #[error("duplicate point name: {0}")]
    DuplicatePointName(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
