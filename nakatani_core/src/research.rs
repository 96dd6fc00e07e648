//! Research session state machine.
//!
//! Walks a [`MeasurementPointList`] from head to tail. For every point it
//! feeds resistance samples into a [`SampleStabilizer`], records the
//! stabilized value and advances. All processing happens on the caller's
//! thread; one `handle_*` call finishes (window update, stabilization,
//! advance, notifications) before the next one starts.

use std::fmt;

use nakatani_traits::CommandSink;

use crate::config::SessionCfg;
use crate::error::{BuildError, ResearchError};
use crate::observer::ResearchObserver;
use crate::points::{MeasurementPoint, MeasurementPointList, PointId};
use crate::protocol::{self, Command, DeviceEvent};
use crate::stabilizer::SampleStabilizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Built, `start()` not called yet.
    Idle,
    /// ADC requested, no sample taken for the current point yet.
    Started,
    PointMeasuring,
    /// A value was just recorded.
    PointStabilized,
    Completed,
    /// Stopped by `abort()` before every point was measured.
    Aborted,
}

impl SessionState {
    /// Session accepts samples.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Started | SessionState::PointMeasuring | SessionState::PointStabilized
        )
    }

    pub fn is_finished(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Started => "started",
            SessionState::PointMeasuring => "point-measuring",
            SessionState::PointStabilized => "point-stabilized",
            SessionState::Completed => "completed",
            SessionState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

pub struct ResearchProcessManager<C: CommandSink, O: ResearchObserver> {
    sink: C,
    observer: O,
    points: MeasurementPointList,
    current: Option<PointId>,
    stabilizer: SampleStabilizer,
    stabilized: bool,
    state: SessionState,
    cfg: SessionCfg,
    connected: bool,
    adc_running: bool,
    last_battery: Option<u32>,
    packets: u64,
    malformed: u64,
}

fn point_name(points: &MeasurementPointList, id: PointId) -> &str {
    points.get(id).map_or("", MeasurementPoint::name)
}

impl<C: CommandSink, O: ResearchObserver> ResearchProcessManager<C, O> {
    pub fn new(
        points: MeasurementPointList,
        sink: C,
        observer: O,
        cfg: SessionCfg,
    ) -> Result<Self, BuildError> {
        if points.is_empty() {
            return Err(BuildError::EmptyPointList);
        }
        if cfg.stabilizer.window == 0 {
            return Err(BuildError::InvalidConfig("stabilizer window must be >= 1"));
        }
        Ok(Self {
            sink,
            observer,
            points,
            current: None,
            stabilizer: SampleStabilizer::new(cfg.stabilizer),
            stabilized: false,
            state: SessionState::Idle,
            cfg,
            connected: true,
            adc_running: false,
            last_battery: None,
            packets: 0,
            malformed: 0,
        })
    }

    /// Begin a session at the head point and request ADC streaming.
    ///
    /// Restarting a finished session discards its recorded values.
    pub fn start(&mut self) -> Result<(), ResearchError> {
        if self.state.is_active() {
            return Err(ResearchError::State(format!(
                "session already running ({})",
                self.state
            )));
        }
        self.send(Command::StartAdc)?;
        self.points.clear_values();
        self.stabilizer.clear();
        self.stabilized = false;
        self.current = self.points.head();
        self.state = SessionState::Started;

        let Some(head) = self.current else {
            return Err(ResearchError::State("point list has no head".into()));
        };
        let name = point_name(&self.points, head);
        tracing::info!(points = self.points.len(), first = %name, "research session started");
        self.observer.active_point_changed(name);
        Ok(())
    }

    /// Stop streaming and end the session without measuring the remaining points.
    pub fn abort(&mut self) -> Result<(), ResearchError> {
        if !self.state.is_active() {
            return Ok(());
        }
        let sent = self.send(Command::StopAdc);
        let at = self.current.map(|id| point_name(&self.points, id).to_string());
        self.state = SessionState::Aborted;
        self.current = None;
        self.stabilizer.clear();
        tracing::warn!(at = ?at, "research session aborted");
        sent
    }

    /// Forward an ad hoc command (battery or version query) to the device.
    pub fn send_command(&mut self, cmd: Command) -> Result<(), ResearchError> {
        self.send(cmd)
    }

    fn send(&mut self, cmd: Command) -> Result<(), ResearchError> {
        tracing::debug!(command = %cmd, "sending command");
        self.sink
            .send(protocol::encode(cmd))
            .map_err(|e| ResearchError::Device(format!("send {cmd}: {e}")))
    }

    /// Decode one notification buffer and apply it.
    ///
    /// Malformed buffers are logged and dropped.
    pub fn handle_packet(&mut self, buf: &[u8]) -> Result<(), ResearchError> {
        self.packets += 1;
        match protocol::decode_packet(buf) {
            Ok(packet) => self.handle_event(packet.event, packet.raw),
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(error = %e, len = buf.len(), "dropping packet");
                Ok(())
            }
        }
    }

    /// Apply one decoded device event; `raw` is the frame payload.
    pub fn handle_event(&mut self, event: DeviceEvent, raw: u32) -> Result<(), ResearchError> {
        match event {
            DeviceEvent::BatteryLevel => {
                self.last_battery = Some(raw);
                tracing::info!(percent = raw, "battery level");
                Ok(())
            }
            DeviceEvent::AdcStarted => {
                self.adc_running = true;
                tracing::debug!("adc started");
                Ok(())
            }
            DeviceEvent::AdcStopped => {
                self.adc_running = false;
                tracing::debug!("adc stopped");
                Ok(())
            }
            DeviceEvent::ResistanceSample(v) => self.on_sample(v),
        }
    }

    /// Feed one resistance sample through the state machine.
    pub fn on_sample(&mut self, v: u32) -> Result<(), ResearchError> {
        if !self.state.is_active() {
            tracing::trace!(value = v, state = %self.state, "sample ignored");
            return Ok(());
        }
        let Some(current) = self.current else {
            return Ok(());
        };

        if v == 0 {
            if self.stabilized {
                self.stabilizer.clear();
                self.stabilized = false;
                tracing::debug!(point = %point_name(&self.points, current), "pen lifted");
            } else {
                tracing::trace!("zero sample before stabilization ignored");
            }
            return Ok(());
        }
        if self.stabilized {
            tracing::trace!(value = v, "waiting for pen lift");
            return Ok(());
        }

        if self.state != SessionState::PointMeasuring {
            self.state = SessionState::PointMeasuring;
            let name = point_name(&self.points, current);
            tracing::debug!(point = %name, "measuring");
            self.observer.session_started_for_point(name);
        }

        tracing::trace!(value = v, window = self.stabilizer.len(), "sample");
        match self.stabilizer.push(v) {
            Some(value) => self.complete_point(current, value),
            None => Ok(()),
        }
    }

    fn complete_point(&mut self, id: PointId, value: u32) -> Result<(), ResearchError> {
        self.stabilized = true;
        self.points.record(id, value).map_err(ResearchError::State)?;
        let name = point_name(&self.points, id);
        tracing::info!(point = %name, value, "point stabilized");
        self.observer.point_result_completed(name, value);
        self.state = SessionState::PointStabilized;

        match self.points.next(id) {
            Some(next) => {
                self.current = Some(next);
                if !self.cfg.require_pen_lift {
                    self.stabilized = false;
                }
                let name = point_name(&self.points, next);
                tracing::debug!(point = %name, "active point changed");
                self.observer.active_point_changed(name);
                Ok(())
            }
            None => {
                if let Err(e) = self.send(Command::StopAdc) {
                    tracing::warn!(error = %e, "could not stop adc after the last point");
                }
                self.state = SessionState::Completed;
                self.current = None;
                tracing::info!(points = self.points.len(), "research session completed");
                self.observer.session_completed(&self.points);
                Ok(())
            }
        }
    }

    /// Transport link state. A disconnect keeps every recorded value and the
    /// current point; samples resume once the link is back.
    pub fn connection_changed(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        if !connected && self.state.is_active() {
            let at = self.current.map(|id| point_name(&self.points, id).to_string());
            tracing::warn!(
                error = %ResearchError::DisconnectedDuringSession,
                at = ?at,
                "waiting for reconnect"
            );
        } else if connected {
            tracing::info!(state = %self.state, "device connected");
        } else {
            tracing::info!("device disconnected");
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_point(&self) -> Option<&MeasurementPoint> {
        self.current.and_then(|id| self.points.get(id))
    }

    pub fn current_point_id(&self) -> Option<PointId> {
        self.current
    }

    pub fn points(&self) -> &MeasurementPointList {
        &self.points
    }

    pub fn is_stabilized(&self) -> bool {
        self.stabilized
    }

    pub fn window_len(&self) -> usize {
        self.stabilizer.len()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn adc_running(&self) -> bool {
        self.adc_running
    }

    /// Last battery percentage reported by the device.
    pub fn last_battery(&self) -> Option<u32> {
        self.last_battery
    }

    /// Buffers seen by `handle_packet`, and how many of them were dropped.
    pub fn packet_counts(&self) -> (u64, u64) {
        (self.packets, self.malformed)
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn sink(&self) -> &C {
        &self.sink
    }

    pub fn into_points(self) -> MeasurementPointList {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FailingSink, FlakySink, RecordingSink};
    use crate::observer::NoopObserver;
    use crate::protocol::sample_packet;

    fn manager(names: &[&str]) -> ResearchProcessManager<RecordingSink, NoopObserver> {
        let list = MeasurementPointList::from_names(names.iter().copied()).unwrap();
        ResearchProcessManager::new(list, RecordingSink::default(), NoopObserver, SessionCfg::default())
            .unwrap()
    }

    #[test]
    fn samples_before_start_are_ignored() {
        let mut m = manager(&["A"]);
        for _ in 0..30 {
            m.on_sample(1000).unwrap();
        }
        assert_eq!(m.state(), SessionState::Idle);
        assert_eq!(m.window_len(), 0);
        assert!(m.sink().sent().is_empty());
    }

    #[test]
    fn start_selects_head_and_sends_start_adc() {
        let mut m = manager(&["A", "B"]);
        m.start().unwrap();
        assert_eq!(m.state(), SessionState::Started);
        assert_eq!(m.current_point().map(MeasurementPoint::name), Some("A"));
        assert_eq!(m.sink().commands(), vec![Command::StartAdc]);
        assert!(m.start().is_err());
    }

    #[test]
    fn first_sample_enters_point_measuring() {
        let mut m = manager(&["A"]);
        m.start().unwrap();
        m.handle_packet(&sample_packet(1200)).unwrap();
        assert_eq!(m.state(), SessionState::PointMeasuring);
        assert_eq!(m.window_len(), 1);
    }

    #[test]
    fn malformed_packets_are_counted_and_dropped() {
        let mut m = manager(&["A"]);
        m.start().unwrap();
        m.handle_packet(b"#M").unwrap();
        m.handle_packet(b"#Xabcd").unwrap();
        assert_eq!(m.packet_counts(), (2, 2));
        assert_eq!(m.state(), SessionState::Started);
    }

    #[test]
    fn status_events_update_flags() {
        let mut m = manager(&["A"]);
        m.handle_packet(&protocol::encode_packet(protocol::PREFIX_BATTERY, 64))
            .unwrap();
        m.handle_packet(&protocol::encode_packet(protocol::PREFIX_ADC_STARTED, 0))
            .unwrap();
        assert_eq!(m.last_battery(), Some(64));
        assert!(m.adc_running());
        m.handle_packet(&protocol::encode_packet(protocol::PREFIX_ADC_STOPPED, 0))
            .unwrap();
        assert!(!m.adc_running());
    }

    #[test]
    fn abort_sends_stop_adc_once() {
        let mut m = manager(&["A", "B"]);
        m.start().unwrap();
        m.on_sample(1000).unwrap();
        m.abort().unwrap();
        m.abort().unwrap();
        assert_eq!(m.state(), SessionState::Aborted);
        assert!(m.current_point().is_none());
        assert_eq!(m.sink().commands(), vec![Command::StartAdc, Command::StopAdc]);
    }

    #[test]
    fn disconnect_keeps_recorded_values() {
        let mut m = manager(&["A", "B"]);
        m.start().unwrap();
        for _ in 0..20 {
            m.on_sample(1000).unwrap();
        }
        m.connection_changed(false);
        assert!(!m.is_connected());
        assert_eq!(m.current_point().map(MeasurementPoint::name), Some("B"));
        assert_eq!(m.points().result_map().get("A"), Some(&1000));
        m.connection_changed(true);
        for _ in 0..20 {
            m.on_sample(2000).unwrap();
        }
        assert_eq!(m.state(), SessionState::Completed);
    }

    #[test]
    fn send_failure_surfaces_as_device_error() {
        let list = MeasurementPointList::from_names(["A"]).unwrap();
        let mut m =
            ResearchProcessManager::new(list, FailingSink, NoopObserver, SessionCfg::default())
                .unwrap();
        assert!(matches!(m.start(), Err(ResearchError::Device(_))));
        assert_eq!(m.state(), SessionState::Idle);
    }

    #[test]
    fn failed_stop_adc_still_completes_the_session() {
        let list = MeasurementPointList::from_names(["A"]).unwrap();
        let mut m = ResearchProcessManager::new(
            list,
            FlakySink::accepting(1),
            NoopObserver,
            SessionCfg::default(),
        )
        .unwrap();
        m.start().unwrap();
        for _ in 0..20 {
            m.on_sample(1000).unwrap();
        }
        assert_eq!(m.state(), SessionState::Completed);
        assert_eq!(m.points().result_map().get("A"), Some(&1000));
    }

    #[test]
    fn restart_after_completion_clears_values() {
        let mut m = manager(&["A"]);
        m.start().unwrap();
        for _ in 0..20 {
            m.on_sample(1000).unwrap();
        }
        assert_eq!(m.state(), SessionState::Completed);
        m.start().unwrap();
        assert_eq!(m.points().results(), vec![("A".to_string(), None)]);
    }
}
