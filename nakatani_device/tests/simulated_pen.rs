use std::time::Duration;

use nakatani_config::SimulatorCfg;
use nakatani_core::protocol::{Command, DeviceEvent, decode, decode_packet};
use nakatani_device::{DeviceError, SimulatedPen};
use nakatani_traits::{CommandSink, PacketSource};
use rstest::rstest;

const T: Duration = Duration::from_millis(20);

fn fast_cfg() -> SimulatorCfg {
    SimulatorCfg {
        period_ms: 0,
        ..SimulatorCfg::default()
    }
}

#[rstest]
#[case(Command::StartAdc, DeviceEvent::AdcStarted)]
#[case(Command::StopAdc, DeviceEvent::AdcStopped)]
#[case(Command::RequestBattery, DeviceEvent::BatteryLevel)]
fn commands_are_acknowledged(#[case] cmd: Command, #[case] expected: DeviceEvent) {
    let (mut link, mut control) = SimulatedPen::new(&fast_cfg());
    control.send(cmd.payload()).unwrap();
    let frame = link.read(T).unwrap().unwrap();
    assert_eq!(decode(&frame), Ok(expected));
}

#[test]
fn battery_reply_carries_percent() {
    let (mut link, mut control) = SimulatedPen::new(&fast_cfg());
    control.send(Command::RequestBattery.payload()).unwrap();
    let frame = link.read(T).unwrap().unwrap();
    assert_eq!(decode_packet(&frame).unwrap().raw, 87);
}

#[test]
fn version_request_has_no_reply() {
    let (mut link, mut control) = SimulatedPen::new(&fast_cfg());
    control.send(Command::RequestVersion.payload()).unwrap();
    assert_eq!(link.read(T).unwrap(), None);
}

#[test]
fn streams_samples_until_stopped() {
    let (mut link, mut control) = SimulatedPen::new(&fast_cfg());
    assert_eq!(link.read(T).unwrap(), None);

    control.send(Command::StartAdc.payload()).unwrap();
    assert_eq!(decode(&link.read(T).unwrap().unwrap()), Ok(DeviceEvent::AdcStarted));
    for _ in 0..50 {
        let frame = link.read(T).unwrap().unwrap();
        assert!(matches!(decode(&frame), Ok(DeviceEvent::ResistanceSample(_))));
    }
    assert!(link.is_streaming());

    control.send(Command::StopAdc.payload()).unwrap();
    assert_eq!(decode(&link.read(T).unwrap().unwrap()), Ok(DeviceEvent::AdcStopped));
    assert_eq!(link.read(T).unwrap(), None);
}

#[test]
fn disconnected_pen_refuses_io() {
    let (mut link, mut control) = SimulatedPen::new(&fast_cfg());
    let handle = link.handle();
    handle.set_connected(false);

    assert!(!link.is_connected());
    let err = control.send(Command::StartAdc.payload()).unwrap_err();
    assert_eq!(err.downcast_ref::<DeviceError>(), Some(&DeviceError::NotConnected));
    assert!(link.read(T).is_err());

    handle.set_connected(true);
    assert!(control.send(Command::StartAdc.payload()).is_ok());
}

#[test]
fn unknown_payload_is_rejected() {
    let (_link, mut control) = SimulatedPen::new(&fast_cfg());
    let err = control.send([0x23, 0x00]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DeviceError>(),
        Some(&DeviceError::UnknownCommand([0x23, 0x00]))
    );
}
