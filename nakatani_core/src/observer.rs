//! Notifications emitted by a research session.
//!
//! Callbacks run synchronously on the thread that drives the session, in the
//! order the state changes happen. Use [`ChannelObserver`] to hand them to
//! another thread.

use crossbeam_channel as xch;

use crate::points::MeasurementPointList;

/// Receiver of session progress.
pub trait ResearchObserver {
    /// The point the user should touch next.
    fn active_point_changed(&mut self, name: &str);

    /// The first sample for `name` has been taken.
    fn session_started_for_point(&mut self, name: &str);

    /// `name` stabilized at `value` ohms.
    fn point_result_completed(&mut self, name: &str, value: u32);

    /// Every point has a value.
    fn session_completed(&mut self, points: &MeasurementPointList);
}

impl<T: ResearchObserver + ?Sized> ResearchObserver for Box<T> {
    fn active_point_changed(&mut self, name: &str) {
        (**self).active_point_changed(name);
    }
    fn session_started_for_point(&mut self, name: &str) {
        (**self).session_started_for_point(name);
    }
    fn point_result_completed(&mut self, name: &str, value: u32) {
        (**self).point_result_completed(name, value);
    }
    fn session_completed(&mut self, points: &MeasurementPointList) {
        (**self).session_completed(points);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ResearchObserver for NoopObserver {
    fn active_point_changed(&mut self, _name: &str) {}
    fn session_started_for_point(&mut self, _name: &str) {}
    fn point_result_completed(&mut self, _name: &str, _value: u32) {}
    fn session_completed(&mut self, _points: &MeasurementPointList) {}
}

/// Owned form of an observer callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchEvent {
    ActivePointChanged(String),
    SessionStartedForPoint(String),
    PointResultCompleted { name: String, value: u32 },
    /// Final `(name, value)` pairs in list order.
    SessionCompleted(Vec<(String, Option<u32>)>),
}

/// Forwards callbacks as [`ResearchEvent`]s. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: xch::Sender<ResearchEvent>,
}

impl ChannelObserver {
    pub fn new(tx: xch::Sender<ResearchEvent>) -> Self {
        Self { tx }
    }

    /// Observer plus the receiving end of an unbounded channel.
    pub fn unbounded() -> (Self, xch::Receiver<ResearchEvent>) {
        let (tx, rx) = xch::unbounded();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ResearchEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("research event receiver dropped");
        }
    }
}

impl ResearchObserver for ChannelObserver {
    fn active_point_changed(&mut self, name: &str) {
        self.emit(ResearchEvent::ActivePointChanged(name.to_string()));
    }
    fn session_started_for_point(&mut self, name: &str) {
        self.emit(ResearchEvent::SessionStartedForPoint(name.to_string()));
    }
    fn point_result_completed(&mut self, name: &str, value: u32) {
        self.emit(ResearchEvent::PointResultCompleted {
            name: name.to_string(),
            value,
        });
    }
    fn session_completed(&mut self, points: &MeasurementPointList) {
        self.emit(ResearchEvent::SessionCompleted(points.results()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_observer_preserves_order() {
        let (mut obs, rx) = ChannelObserver::unbounded();
        let mut list = MeasurementPointList::new();
        let a = list.append("A").unwrap();
        list.record(a, 1500).unwrap();

        obs.active_point_changed("A");
        obs.session_started_for_point("A");
        obs.point_result_completed("A", 1500);
        obs.session_completed(&list);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ResearchEvent::ActivePointChanged("A".into()),
                ResearchEvent::SessionStartedForPoint("A".into()),
                ResearchEvent::PointResultCompleted {
                    name: "A".into(),
                    value: 1500
                },
                ResearchEvent::SessionCompleted(vec![("A".into(), Some(1500))]),
            ]
        );
    }

    #[test]
    fn dropped_receiver_is_not_an_error() {
        let (mut obs, rx) = ChannelObserver::unbounded();
        drop(rx);
        obs.active_point_changed("A");
    }
}
