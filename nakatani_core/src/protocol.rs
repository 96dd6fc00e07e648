//! Wire format of the measuring pen.
//!
//! Device → host notifications are 6-byte frames: a two-character ASCII type
//! prefix followed by a 4-byte unsigned payload.
//!
//! | Offset | Field   | Encoding                            |
//! |--------|---------|-------------------------------------|
//! | 0–1    | prefix  | `#B`, `#R`, `#S` or `#M`            |
//! | 2–5    | payload | u32, [`PAYLOAD_ENDIANNESS`]         |
//!
//! Host → device commands are fixed 2-byte writes sent without response.

use core::fmt;
use core::str::FromStr;

use crate::error::MalformedPacket;

/// Minimum length of a device frame.
pub const FRAME_LEN: usize = 6;

/// Byte order of the 32-bit payload.
///
/// The device firmware does not document it; frames observed so far are
/// consistent with little-endian, which is what we commit to.
pub const PAYLOAD_ENDIANNESS: Endianness = Endianness::Little;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
}

pub const PREFIX_BATTERY: [u8; 2] = *b"#B";
pub const PREFIX_ADC_STARTED: [u8; 2] = *b"#R";
pub const PREFIX_ADC_STOPPED: [u8; 2] = *b"#S";
pub const PREFIX_SAMPLE: [u8; 2] = *b"#M";

/// Typed signal decoded from one device frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Battery report; the percentage is carried in [`DecodedPacket::raw`].
    BatteryLevel,
    AdcStarted,
    AdcStopped,
    /// Skin resistance in ohms. Zero means the pen is not touching anything.
    ResistanceSample(u32),
}

/// An event together with the raw payload it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPacket {
    pub event: DeviceEvent,
    pub raw: u32,
}

/// Decode one notification buffer. Pure; keeps no state between calls.
pub fn decode(buf: &[u8]) -> Result<DeviceEvent, MalformedPacket> {
    decode_packet(buf).map(|p| p.event)
}

/// Decode one notification buffer, keeping the raw payload.
///
/// Bytes past offset 5 are ignored.
pub fn decode_packet(buf: &[u8]) -> Result<DecodedPacket, MalformedPacket> {
    if buf.len() < FRAME_LEN {
        return Err(MalformedPacket::TooShort { len: buf.len() });
    }
    let prefix = [buf[0], buf[1]];
    if !prefix.is_ascii() {
        return Err(MalformedPacket::NonAsciiPrefix);
    }
    let raw = read_payload(&buf[2..FRAME_LEN]);
    let event = match prefix {
        PREFIX_BATTERY => DeviceEvent::BatteryLevel,
        PREFIX_ADC_STARTED => DeviceEvent::AdcStarted,
        PREFIX_ADC_STOPPED => DeviceEvent::AdcStopped,
        PREFIX_SAMPLE => DeviceEvent::ResistanceSample(raw),
        other => return Err(MalformedPacket::UnknownPrefix(other)),
    };
    Ok(DecodedPacket { event, raw })
}

#[inline]
fn read_payload(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    match PAYLOAD_ENDIANNESS {
        Endianness::Little => u32::from_le_bytes(word),
    }
}

/// Build a device frame. Used by the simulator and in tests.
pub fn encode_packet(prefix: [u8; 2], raw: u32) -> [u8; FRAME_LEN] {
    let payload = match PAYLOAD_ENDIANNESS {
        Endianness::Little => raw.to_le_bytes(),
    };
    [
        prefix[0], prefix[1], payload[0], payload[1], payload[2], payload[3],
    ]
}

/// Frame a resistance sample.
#[inline]
pub fn sample_packet(ohms: u32) -> [u8; FRAME_LEN] {
    encode_packet(PREFIX_SAMPLE, ohms)
}

/// Commands the host can write to the pen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    StartAdc,
    StopAdc,
    RequestBattery,
    RequestVersion,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Command::StartAdc,
        Command::StopAdc,
        Command::RequestBattery,
        Command::RequestVersion,
    ];

    /// Fixed wire payload. Total; never fails.
    pub const fn payload(self) -> [u8; 2] {
        match self {
            Command::RequestBattery => [0x23, 0x42],
            Command::StartAdc => [0x23, 0x52],
            Command::StopAdc => [0x23, 0x53],
            Command::RequestVersion => [0x23, 0x56],
        }
    }

    /// Inverse of [`Command::payload`].
    pub fn from_payload(payload: [u8; 2]) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.payload() == payload)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::StartAdc => "start-adc",
            Command::StopAdc => "stop-adc",
            Command::RequestBattery => "battery",
            Command::RequestVersion => "version",
        }
    }
}

/// Encode a command into its wire payload.
#[inline]
pub const fn encode(cmd: Command) -> [u8; 2] {
    cmd.payload()
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| {
                format!("unknown command {s:?}; expected one of battery, version, start-adc, stop-adc")
            })
    }
}
