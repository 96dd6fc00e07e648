//! Background packet reader.
//!
//! Spawns one thread that owns the `PacketSource`, forwards every buffer and
//! every change of the link state over a bounded channel, and is shut down
//! and joined when the `PacketPump` is dropped.
use crossbeam_channel as xch;
use nakatani_traits::PacketSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::PumpCfg;

/// What the pump hands to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Raw notification buffer, not yet decoded.
    Packet(Vec<u8>),
    /// Link state changed; also sent once at startup.
    Connection(bool),
}

pub struct PacketPump {
    rx: xch::Receiver<Inbound>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl PacketPump {
    pub fn spawn<S: PacketSource + Send + 'static>(mut source: S, cfg: PumpCfg) -> Self {
        let (tx, rx) = xch::bounded(cfg.queue_depth.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let wait = cfg.read_timeout.max(Duration::from_millis(1));

        let join_handle = std::thread::spawn(move || {
            let mut connected = source.is_connected();
            if !forward(&tx, Inbound::Connection(connected), &shutdown_clone, wait) {
                return;
            }
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("packet pump received shutdown signal");
                    break;
                }

                let now = source.is_connected();
                if now != connected {
                    connected = now;
                    if !forward(&tx, Inbound::Connection(now), &shutdown_clone, wait) {
                        break;
                    }
                }

                match source.read(wait) {
                    Ok(Some(buf)) => {
                        if !forward(&tx, Inbound::Packet(buf), &shutdown_clone, wait) {
                            tracing::debug!("packet consumer gone, exiting pump");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        // Transport errors are transient here; back off one read period.
                        tracing::trace!(error = %e, "packet source read failed");
                        std::thread::sleep(wait);
                    }
                }
            }
            tracing::trace!("packet pump exiting cleanly");
        });

        Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Inbound, xch::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<Inbound, xch::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn receiver(&self) -> &xch::Receiver<Inbound> {
        &self.rx
    }

    /// Worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }
}

/// Blocking send that still notices shutdown. Returns false when the
/// item could not be delivered.
fn forward(tx: &xch::Sender<Inbound>, item: Inbound, shutdown: &AtomicBool, wait: Duration) -> bool {
    let mut item = item;
    loop {
        match tx.send_timeout(item, wait) {
            Ok(()) => return true,
            Err(xch::SendTimeoutError::Timeout(back)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                item = back;
            }
            Err(xch::SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

impl Drop for PacketPump {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The worker exits after its current read returns (at most one read timeout).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("packet pump joined");
                }
                Err(e) => {
                    tracing::warn!(?e, "packet pump thread panicked during shutdown");
                }
            }
        }
    }
}
