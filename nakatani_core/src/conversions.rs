//! `From` implementations bridging `nakatani_config` types to `nakatani_core` types.

use std::time::Duration;

use nakatani_config::ResearchObjectKind;

use crate::config::{PumpCfg, SessionCfg, StabilizerCfg};
use crate::error::BuildError;
use crate::points::{MeasurementPointList, ResearchObject};

impl From<&nakatani_config::StabilizerCfg> for StabilizerCfg {
    fn from(c: &nakatani_config::StabilizerCfg) -> Self {
        Self {
            window: c.window,
            ceiling_ohms: c.ceiling_ohms,
            max_spread_ohms: c.max_spread_ohms,
        }
    }
}

impl From<&nakatani_config::TransportCfg> for PumpCfg {
    fn from(c: &nakatani_config::TransportCfg) -> Self {
        Self {
            read_timeout: Duration::from_millis(c.read_timeout_ms),
            queue_depth: c.queue_depth,
        }
    }
}

impl From<&nakatani_config::Config> for SessionCfg {
    fn from(c: &nakatani_config::Config) -> Self {
        Self {
            stabilizer: StabilizerCfg::from(&c.stabilizer),
            require_pen_lift: c.research.require_pen_lift,
        }
    }
}

impl From<ResearchObjectKind> for ResearchObject {
    fn from(k: ResearchObjectKind) -> Self {
        match k {
            ResearchObjectKind::LeftHand => ResearchObject::LeftHand,
            ResearchObjectKind::RightHand => ResearchObject::RightHand,
            ResearchObjectKind::LeftFoot => ResearchObject::LeftFoot,
            ResearchObjectKind::RightFoot => ResearchObject::RightFoot,
        }
    }
}

impl TryFrom<&nakatani_config::ResearchCfg> for MeasurementPointList {
    type Error = BuildError;

    /// Explicit `points` win over the static topology of `object`.
    fn try_from(c: &nakatani_config::ResearchCfg) -> Result<Self, Self::Error> {
        match &c.points {
            Some(names) => MeasurementPointList::from_names(names.iter().cloned()),
            None => Ok(MeasurementPointList::for_object(c.object.into())),
        }
    }
}
