//! The research session driven end to end by the simulated pen.

use std::sync::atomic::AtomicBool;

use nakatani_config::{Config, ResearchObjectKind, SimulatorCfg};
use nakatani_core::{
    MeasurementPointList, NoopObserver, PacketPump, PumpCfg, ResearchObject,
    ResearchProcessManager, SessionCfg, run_session,
};
use nakatani_device::SimulatedPen;
use rstest::rstest;

#[rstest]
#[case(false)]
#[case(true)]
fn every_point_gets_its_base_resistance(#[case] require_pen_lift: bool) {
    let mut cfg = Config::default();
    cfg.research.object = ResearchObjectKind::LeftHand;
    cfg.research.require_pen_lift = require_pen_lift;
    cfg.simulator = SimulatorCfg {
        period_ms: 0,
        ..SimulatorCfg::default()
    };
    cfg.validate().unwrap();

    let (link, control) = SimulatedPen::new(&cfg.simulator);
    let points = MeasurementPointList::for_object(ResearchObject::from(cfg.research.object));
    let mut manager =
        ResearchProcessManager::new(points, control, NoopObserver, SessionCfg::from(&cfg)).unwrap();
    let pump = PacketPump::spawn(link, PumpCfg::from(&cfg.transport));

    let outcome = run_session(&mut manager, &pump, &AtomicBool::new(false)).unwrap();

    assert_eq!(outcome.results.len(), 6);
    for ((name, value), base) in outcome.results.iter().zip(&cfg.simulator.base_ohms) {
        let value = value.unwrap_or_else(|| panic!("{name} has no value"));
        assert!(
            value.abs_diff(*base) <= cfg.simulator.noise_ohms,
            "{name}: {value} not within noise of {base}"
        );
    }
    assert_eq!(outcome.malformed, 0);
}
