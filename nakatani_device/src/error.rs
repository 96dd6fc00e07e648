use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device not connected")]
    NotConnected,
    #[error("device link closed")]
    ChannelClosed,
    #[error("unknown command payload {0:02x?}")]
    UnknownCommand([u8; 2]),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
