#![no_main]
use libfuzzer_sys::fuzz_target;
use nakatani_core::mocks::{NoopSink, RecordingObserver};
use nakatani_core::protocol::{decode, decode_packet, encode_packet, DeviceEvent};
use nakatani_core::{MeasurementPointList, ResearchObject, ResearchProcessManager, SessionCfg};

fuzz_target!(|data: &[u8]| {
    // A decoded frame re-encodes to its first six bytes.
    if let Ok(packet) = decode_packet(data) {
        let frame = encode_packet([data[0], data[1]], packet.raw);
        assert_eq!(&frame[..], &data[..6]);
        if let DeviceEvent::ResistanceSample(v) = packet.event {
            assert_eq!(v, packet.raw);
        }
    }

    // Arbitrary 6-byte chunks never break the state machine.
    let list = MeasurementPointList::for_object(ResearchObject::LeftHand);
    let Ok(mut m) =
        ResearchProcessManager::new(list, NoopSink, RecordingObserver::default(), SessionCfg::default())
    else {
        return;
    };
    let _ = m.start();
    for chunk in data.chunks(6) {
        let _ = decode(chunk);
        let _ = m.handle_packet(chunk);
    }
    assert!(m.points().iter().count() == 6);
});
