//! Packet pump thread lifecycle.
//!
//! Verifies that:
//! - Packets come out in the order the source produced them
//! - Link state changes are forwarded
//! - The worker exits when the pump is dropped, even with a full queue

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use nakatani_core::PumpCfg;
use nakatani_core::mocks::ScriptedSource;
use nakatani_core::protocol::sample_packet;
use nakatani_core::pump::{Inbound, PacketPump};

fn cfg(depth: usize) -> PumpCfg {
    PumpCfg {
        read_timeout: Duration::from_millis(10),
        queue_depth: depth,
    }
}

fn next(pump: &PacketPump) -> Inbound {
    pump.recv_timeout(Duration::from_secs(2)).unwrap()
}

#[test]
fn forwards_packets_in_order() {
    let frames: Vec<Vec<u8>> = (1..=5).map(|v| sample_packet(v).to_vec()).collect();
    let pump = PacketPump::spawn(ScriptedSource::new(frames.clone()), cfg(16));

    assert_eq!(next(&pump), Inbound::Connection(true));
    for frame in frames {
        assert_eq!(next(&pump), Inbound::Packet(frame));
    }
}

#[test]
fn reports_connection_changes() {
    let source = ScriptedSource::new(Vec::<Vec<u8>>::new());
    let link = source.connected_handle();
    let pump = PacketPump::spawn(source, cfg(4));
    assert_eq!(next(&pump), Inbound::Connection(true));

    link.store(false, Ordering::Relaxed);
    assert_eq!(next(&pump), Inbound::Connection(false));
    link.store(true, Ordering::Relaxed);
    assert_eq!(next(&pump), Inbound::Connection(true));
}

#[test]
fn drop_joins_worker_with_full_queue() {
    let frames: Vec<Vec<u8>> = (0..100).map(|v| sample_packet(v).to_vec()).collect();
    let pump = PacketPump::spawn(ScriptedSource::new(frames), cfg(1));
    std::thread::sleep(Duration::from_millis(20));

    let t0 = Instant::now();
    drop(pump);
    assert!(t0.elapsed() < Duration::from_secs(1));
}

#[test]
fn many_pumps_dont_leak_threads() {
    for _ in 0..10 {
        let pump = PacketPump::spawn(ScriptedSource::new([sample_packet(1)]), cfg(4));
        let _ = pump.recv_timeout(Duration::from_millis(50));
        drop(pump);
    }
}
