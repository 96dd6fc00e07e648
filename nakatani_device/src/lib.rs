//! Simulated measuring pen.
//!
//! Stands in for the BLE link: the control half accepts command writes, the
//! link half answers them with status frames and, while the ADC runs, streams
//! resistance frames that mimic an operator touching each point in turn.

pub mod error;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use nakatani_config::SimulatorCfg;
use nakatani_core::protocol::{
    Command, FRAME_LEN, PREFIX_ADC_STARTED, PREFIX_ADC_STOPPED, PREFIX_BATTERY, encode_packet,
    sample_packet,
};
use nakatani_traits::{CommandSink, PacketSource};

pub use error::DeviceError;

/// Reading while the pen hangs in the air before touching skin.
const OPEN_CIRCUIT_OHMS: u32 = 200_000;

/// Factory for a connected link/control pair.
pub struct SimulatedPen;

impl SimulatedPen {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(cfg: &SimulatorCfg) -> (SimulatedLink, SimulatedControl) {
        let (tx, rx) = xch::unbounded();
        let connected = Arc::new(AtomicBool::new(true));
        let link = SimulatedLink {
            commands: rx,
            pending: VecDeque::new(),
            streaming: false,
            script: ContactScript::new(cfg),
            period: Duration::from_millis(cfg.period_ms),
            battery_percent: u32::from(cfg.battery_percent),
            connected: connected.clone(),
        };
        let control = SimulatedControl { tx, connected };
        (link, control)
    }
}

/// Toggles the simulated connection from outside.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connected: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn set_connected(&self, connected: bool) {
        tracing::info!(connected, "simulated link state");
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Host → pen half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SimulatedControl {
    tx: xch::Sender<Command>,
    connected: Arc<AtomicBool>,
}

impl SimulatedControl {
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            connected: self.connected.clone(),
        }
    }

    fn write(&self, payload: [u8; 2]) -> error::Result<()> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(DeviceError::NotConnected);
        }
        let cmd = Command::from_payload(payload).ok_or(DeviceError::UnknownCommand(payload))?;
        self.tx.send(cmd).map_err(|_| DeviceError::ChannelClosed)
    }
}

impl CommandSink for SimulatedControl {
    fn send(&mut self, payload: [u8; 2]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.write(payload)?;
        Ok(())
    }
}

/// Pen → host half.
pub struct SimulatedLink {
    commands: xch::Receiver<Command>,
    pending: VecDeque<[u8; FRAME_LEN]>,
    streaming: bool,
    script: ContactScript,
    period: Duration,
    battery_percent: u32,
    connected: Arc<AtomicBool>,
}

impl SimulatedLink {
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            connected: self.connected.clone(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn apply(&mut self, cmd: Command) {
        tracing::debug!(command = %cmd, "pen received command");
        match cmd {
            Command::StartAdc => {
                self.streaming = true;
                self.pending.push_back(encode_packet(PREFIX_ADC_STARTED, 0));
            }
            Command::StopAdc => {
                self.streaming = false;
                self.pending.push_back(encode_packet(PREFIX_ADC_STOPPED, 0));
            }
            Command::RequestBattery => {
                self.pending
                    .push_back(encode_packet(PREFIX_BATTERY, self.battery_percent));
            }
            // The protocol has no version reply frame.
            Command::RequestVersion => {}
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            self.apply(cmd);
        }
    }

    fn read_frame(&mut self, timeout: Duration) -> error::Result<Option<[u8; FRAME_LEN]>> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(DeviceError::NotConnected);
        }
        self.drain_commands();
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        if self.streaming {
            if !self.period.is_zero() {
                std::thread::sleep(self.period);
            }
            return Ok(Some(sample_packet(self.script.next_sample())));
        }
        match self.commands.recv_timeout(timeout) {
            Ok(cmd) => {
                self.apply(cmd);
                Ok(self.pending.pop_front())
            }
            Err(xch::RecvTimeoutError::Timeout) => Ok(None),
            // Control half dropped: nothing will ever arrive again.
            Err(xch::RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

impl PacketSource for SimulatedLink {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_frame(timeout)?.map(|f| f.to_vec()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Approach,
    Contact,
    Lift,
}

/// Endless per-point sample pattern: approach, contact, lift, next point.
#[derive(Debug, Clone)]
struct ContactScript {
    base_ohms: Vec<u32>,
    noise: u32,
    settle: usize,
    contact: usize,
    lift: usize,
    point: usize,
    phase: Phase,
    step: usize,
    rng: u32,
}

impl ContactScript {
    fn new(cfg: &SimulatorCfg) -> Self {
        let base_ohms = if cfg.base_ohms.is_empty() {
            vec![10_000]
        } else {
            cfg.base_ohms.clone()
        };
        Self {
            base_ohms,
            noise: cfg.noise_ohms,
            settle: cfg.settle_samples,
            contact: cfg.contact_samples,
            lift: cfg.lift_samples,
            point: 0,
            phase: Phase::Approach,
            step: 0,
            rng: 0x9E37_79B9,
        }
    }

    fn xorshift(&mut self) -> u32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        x
    }

    /// Uniform in `[base - noise, base + noise]`.
    fn jitter(&mut self, base: u32) -> u32 {
        let span = self.noise.saturating_mul(2).saturating_add(1);
        base.saturating_sub(self.noise)
            .saturating_add(self.xorshift() % span)
    }

    fn phase_len(&self, phase: Phase) -> usize {
        match phase {
            Phase::Approach => self.settle,
            Phase::Contact => self.contact,
            Phase::Lift => self.lift,
        }
    }

    fn advance_phase(&mut self) {
        while self.step >= self.phase_len(self.phase) {
            self.step = 0;
            self.phase = match self.phase {
                Phase::Approach => Phase::Contact,
                Phase::Contact => Phase::Lift,
                Phase::Lift => {
                    self.point = (self.point + 1) % self.base_ohms.len();
                    Phase::Approach
                }
            };
            if self.settle == 0 && self.contact == 0 && self.lift == 0 {
                break;
            }
        }
    }

    fn next_sample(&mut self) -> u32 {
        self.advance_phase();
        let base = self.base_ohms[self.point];
        let value = match self.phase {
            Phase::Approach => {
                // Falls linearly from open circuit towards the settled value.
                let remaining = (self.settle - self.step) as u64;
                let gap = u64::from(OPEN_CIRCUIT_OHMS.saturating_sub(base));
                let above = gap * remaining / self.settle.max(1) as u64;
                let approach = u32::try_from(u64::from(base) + above).unwrap_or(u32::MAX);
                self.jitter(approach)
            }
            Phase::Contact => self.jitter(base),
            Phase::Lift => 0,
        };
        self.step += 1;
        value
    }
}
