//! Seams between the measurement core and the device transport.
//!
//! The BLE link itself (scanning, pairing, characteristic discovery) lives
//! outside this workspace; anything that can hand over raw notification
//! buffers and accept 2-byte command writes plugs in here.

use std::time::Duration;

/// Device → host side of the link.
pub trait PacketSource {
    /// Wait up to `timeout` for the next notification buffer.
    ///
    /// `Ok(None)` means nothing arrived in time; it is not an error.
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>;

    /// Whether the device is currently connected and subscribed.
    fn is_connected(&self) -> bool;
}

/// Host → device side of the link. Writes are fire-and-forget (no response).
pub trait CommandSink {
    fn send(&mut self, payload: [u8; 2]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: PacketSource + ?Sized> PacketSource for Box<T> {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn send(&mut self, payload: [u8; 2]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(payload)
    }
}
