//! Research run against the simulated pen, plus the decode/command/self-check helpers.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use nakatani_config::{Config, ResearchObjectKind};
use nakatani_core::error::Result as CoreResult;
use nakatani_core::protocol::{self, Command, DecodedPacket, DeviceEvent};
use nakatani_core::{
    MeasurementPointList, PacketPump, PumpCfg, ResearchObserver, ResearchProcessManager,
    SessionCfg, SessionOutcome, run_session,
};
use nakatani_device::SimulatedPen;
use serde_json::json;

/// Prints session progress to stdout as it happens.
pub struct ConsoleObserver {
    json: bool,
}

impl ConsoleObserver {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl ResearchObserver for ConsoleObserver {
    fn active_point_changed(&mut self, name: &str) {
        if self.json {
            println!("{}", json!({ "event": "active_point", "point": name }));
        } else {
            println!("Touch point {name}");
        }
    }

    fn session_started_for_point(&mut self, name: &str) {
        if self.json {
            println!("{}", json!({ "event": "measuring", "point": name }));
        }
    }

    fn point_result_completed(&mut self, name: &str, value: u32) {
        if self.json {
            println!(
                "{}",
                json!({ "event": "point_result", "point": name, "ohms": value })
            );
        } else {
            println!("{name}: {value} ohm");
        }
    }

    fn session_completed(&mut self, points: &MeasurementPointList) {
        if self.json {
            let results: serde_json::Map<String, serde_json::Value> = points
                .iter()
                .map(|(_, p)| (p.name().to_string(), json!(p.value())))
                .collect();
            println!(
                "{}",
                json!({ "event": "session_completed", "results": results })
            );
        } else {
            println!("Research complete: {} points measured", points.len());
        }
    }
}

/// Build the point list for `object`, honouring explicit `research.points`.
pub fn build_points(cfg: &Config, object: ResearchObjectKind) -> CoreResult<MeasurementPointList> {
    let mut research = cfg.research.clone();
    research.object = object;
    let list = MeasurementPointList::try_from(&research)?;
    Ok(list)
}

pub fn run_research(
    cfg: &Config,
    object: ResearchObjectKind,
    require_pen_lift: bool,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<SessionOutcome> {
    let points = build_points(cfg, object)?;
    let mut session = SessionCfg::from(cfg);
    session.require_pen_lift |= require_pen_lift;

    let (link, control) = SimulatedPen::new(&cfg.simulator);
    let mut manager = ResearchProcessManager::new(points, control, ConsoleObserver::new(json), session)?;
    tracing::info!(
        object = %nakatani_core::ResearchObject::from(object),
        points = manager.points().len(),
        require_pen_lift = session.require_pen_lift,
        "starting research"
    );

    let pump = PacketPump::spawn(link, PumpCfg::from(&cfg.transport));
    manager
        .send_command(Command::RequestBattery)
        .wrap_err("query battery level")?;
    let outcome = run_session(&mut manager, &pump, &shutdown)?;

    if let Some(percent) = manager.last_battery() {
        tracing::info!(percent, "battery at end of session");
    }
    Ok(outcome)
}

pub fn print_outcome(outcome: &SessionOutcome, json: bool) {
    let duration_ms = u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX);
    if json {
        let results: Vec<_> = outcome
            .results
            .iter()
            .map(|(name, value)| json!({ "point": name, "ohms": value }))
            .collect();
        println!(
            "{}",
            json!({
                "results": results,
                "packets": outcome.packets,
                "malformed": outcome.malformed,
                "duration_ms": duration_ms,
            })
        );
    } else {
        println!("{:<12} {:>10}", "point", "ohm");
        for (name, value) in &outcome.results {
            let value = value.map_or_else(|| "-".to_string(), |v| v.to_string());
            println!("{name:<12} {value:>10}");
        }
        println!(
            "{} packets ({} malformed) in {duration_ms} ms",
            outcome.packets, outcome.malformed
        );
    }
}

/// Parse `234d e02e0000`, `23:4d:...` or `0x234d...` into bytes.
pub fn parse_hex(input: &str) -> eyre::Result<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body
        .bytes()
        .filter(|b| !matches!(b, b' ' | b':' | b'-' | b'_'))
        .collect();
    if digits.len() % 2 != 0 {
        eyre::bail!("odd number of hex digits in {input:?}");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0]);
            let lo = hex_value(pair[1]);
            match (hi, lo) {
                (Some(h), Some(l)) => Ok((h << 4) | l),
                _ => Err(eyre::eyre!("invalid hex digit in {input:?}")),
            }
        })
        .collect()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn event_name(event: DeviceEvent) -> &'static str {
    match event {
        DeviceEvent::BatteryLevel => "battery_level",
        DeviceEvent::AdcStarted => "adc_started",
        DeviceEvent::AdcStopped => "adc_stopped",
        DeviceEvent::ResistanceSample(_) => "resistance_sample",
    }
}

fn describe(packet: DecodedPacket) -> String {
    match packet.event {
        DeviceEvent::BatteryLevel => format!("battery {}%", packet.raw),
        DeviceEvent::AdcStarted => "adc started".to_string(),
        DeviceEvent::AdcStopped => "adc stopped".to_string(),
        DeviceEvent::ResistanceSample(0) => "sample 0 ohm (pen lifted)".to_string(),
        DeviceEvent::ResistanceSample(v) => format!("sample {v} ohm"),
    }
}

/// Decode each frame; returns how many were malformed.
pub fn decode_frames(frames: &[String], json: bool) -> usize {
    let mut malformed = 0;
    for input in frames {
        let decoded = parse_hex(input).and_then(|bytes| {
            protocol::decode_packet(&bytes).map_err(eyre::Report::from)
        });
        match decoded {
            Ok(packet) => {
                if json {
                    println!(
                        "{}",
                        json!({ "input": input, "event": event_name(packet.event), "raw": packet.raw })
                    );
                } else {
                    println!("{input}: {}", describe(packet));
                }
            }
            Err(e) => {
                malformed += 1;
                tracing::warn!(input = %input, error = %e, "undecodable frame");
                if json {
                    println!("{}", json!({ "input": input, "error": e.to_string() }));
                } else {
                    eprintln!("{input}: {e}");
                }
            }
        }
    }
    malformed
}

pub fn print_command(name: &str, json: bool) -> eyre::Result<()> {
    let cmd: Command = name.parse().map_err(|e: String| eyre::eyre!(e))?;
    let payload = protocol::encode(cmd);
    if json {
        println!("{}", json!({ "command": cmd.name(), "payload": hex(&payload) }));
    } else {
        println!("{cmd}: {:02x} {:02x}", payload[0], payload[1]);
    }
    Ok(())
}

/// Decode/encode known frames and build the configured point list.
pub fn self_check(cfg: &Config) -> eyre::Result<usize> {
    for cmd in Command::ALL {
        if Command::from_payload(protocol::encode(cmd)) != Some(cmd) {
            eyre::bail!("command {cmd} does not survive encoding");
        }
    }
    let frame = protocol::sample_packet(12_345);
    if protocol::decode(&frame)? != DeviceEvent::ResistanceSample(12_345) {
        eyre::bail!("sample frame decoded to the wrong value");
    }
    if protocol::decode(b"#M").is_ok() {
        eyre::bail!("short frame was accepted");
    }
    let points = build_points(cfg, cfg.research.object)?;
    Ok(points.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_variants() {
        assert_eq!(parse_hex("234d").unwrap(), vec![0x23, 0x4d]);
        assert_eq!(parse_hex("0x23:4D").unwrap(), vec![0x23, 0x4d]);
        assert_eq!(parse_hex(" 23 4d 39 30 00 00 ").unwrap().len(), 6);
        assert!(parse_hex("234").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn hex_roundtrips_payload() {
        assert_eq!(hex(&Command::StartAdc.payload()), "2352");
    }

    #[test]
    fn self_check_passes_on_defaults() {
        assert_eq!(self_check(&Config::default()).unwrap(), 6);
    }
}
