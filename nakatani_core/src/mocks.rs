//! Test and helper mocks for nakatani_core

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use nakatani_traits::{CommandSink, PacketSource};

use crate::observer::{ResearchEvent, ResearchObserver};
use crate::points::MeasurementPointList;
use crate::protocol::Command;

/// A sink that accepts every command and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl CommandSink for NoopSink {
    fn send(&mut self, _payload: [u8; 2]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// A sink whose writes always fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl CommandSink for FailingSink {
    fn send(&mut self, _payload: [u8; 2]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("link down")))
    }
}

/// Accepts the first `n` writes, then fails every later one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlakySink {
    remaining: usize,
}

impl FlakySink {
    pub fn accepting(n: usize) -> Self {
        Self { remaining: n }
    }
}

impl CommandSink for FlakySink {
    fn send(&mut self, _payload: [u8; 2]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.remaining == 0 {
            return Err(Box::new(std::io::Error::other("link dropped")));
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Keeps every payload it is given. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<[u8; 2]>>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<[u8; 2]> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sent payloads decoded back into commands; unknown payloads are skipped.
    pub fn commands(&self) -> Vec<Command> {
        self.sent()
            .into_iter()
            .filter_map(Command::from_payload)
            .collect()
    }
}

impl CommandSink for RecordingSink {
    fn send(&mut self, payload: [u8; 2]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload);
        Ok(())
    }
}

/// Collects observer callbacks in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<ResearchEvent>,
}

impl ResearchObserver for RecordingObserver {
    fn active_point_changed(&mut self, name: &str) {
        self.events
            .push(ResearchEvent::ActivePointChanged(name.to_string()));
    }
    fn session_started_for_point(&mut self, name: &str) {
        self.events
            .push(ResearchEvent::SessionStartedForPoint(name.to_string()));
    }
    fn point_result_completed(&mut self, name: &str, value: u32) {
        self.events.push(ResearchEvent::PointResultCompleted {
            name: name.to_string(),
            value,
        });
    }
    fn session_completed(&mut self, points: &MeasurementPointList) {
        self.events
            .push(ResearchEvent::SessionCompleted(points.results()));
    }
}

/// A source that replays a fixed list of buffers, then stays quiet.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    packets: VecDeque<Vec<u8>>,
    connected: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new<I, B>(packets: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            packets: packets.into_iter().map(Into::into).collect(),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared flag reported by `is_connected`.
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }
}

impl PacketSource for ScriptedSource {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(buf) = self.packets.pop_front() {
            return Ok(Some(buf));
        }
        std::thread::sleep(timeout.min(Duration::from_millis(5)));
        Ok(None)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
