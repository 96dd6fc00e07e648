//! Human-readable error descriptions and structured JSON error formatting.

use nakatani_core::error::{BuildError, MalformedPacket, ResearchError};
use nakatani_device::DeviceError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(re) = err.downcast_ref::<ResearchError>() {
        return match re {
            ResearchError::Interrupted => {
                "What happened: The research session was interrupted before every point was measured.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Start a new session; recorded values of an interrupted session are discarded.".to_string()
            }
            ResearchError::DisconnectedDuringSession => {
                "What happened: The pen disconnected during the session.\nLikely causes: Pen switched off, out of range, or battery empty.\nHow to fix: Reconnect the pen; the session resumes at the current point.".to_string()
            }
            ResearchError::Device(msg) => format!(
                "What happened: The pen rejected a command ({msg}).\nLikely causes: Link not connected or the pen was powered off.\nHow to fix: Check the connection and battery, then rerun."
            ),
            ResearchError::State(msg) => format!(
                "What happened: The session reached an unexpected state ({msg}).\nLikely causes: A command was issued out of order.\nHow to fix: Re-run with --log-level=debug and report the log."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::EmptyPointList => {
                "What happened: No measurement points to walk.\nLikely causes: research.points is an empty list.\nHow to fix: Remove research.points or list at least one point.".to_string()
            }
            BuildError::DuplicatePointName(name) => format!(
                "What happened: Point {name:?} appears twice.\nLikely causes: Copy-paste in research.points.\nHow to fix: Give every point a unique name."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/nakatani.toml for a sample."
            ),
        };
    }

    if let Some(mp) = err.downcast_ref::<MalformedPacket>() {
        return format!(
            "What happened: {mp}.\nLikely causes: Truncated capture or a frame from another device.\nHow to fix: Frames are 6 bytes: #B, #R, #S or #M followed by a little-endian u32."
        );
    }

    if let Some(de) = err.downcast_ref::<DeviceError>() {
        return format!(
            "What happened: Device error: {de}.\nLikely causes: Pen not connected or link closed.\nHow to fix: Reconnect the pen and rerun."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        let cause = err
            .chain()
            .last()
            .map(ToString::to_string)
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid ({cause}).\nLikely causes: Out-of-range values or a typo in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Check the path. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(re) = err.downcast_ref::<ResearchError>() {
        return match re {
            ResearchError::Interrupted => 2,
            ResearchError::DisconnectedDuringSession => 3,
            ResearchError::Device(_) => 4,
            ResearchError::State(_) => 1,
        };
    }
    if err.downcast_ref::<DeviceError>().is_some() {
        return 4;
    }
    1
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(re) = err.downcast_ref::<ResearchError>() {
        return match re {
            ResearchError::Interrupted => "Interrupted",
            ResearchError::DisconnectedDuringSession => "DisconnectedDuringSession",
            ResearchError::Device(_) => "Device",
            ResearchError::State(_) => "State",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    if err.downcast_ref::<MalformedPacket>().is_some() {
        return "MalformedPacket";
    }
    if err.downcast_ref::<DeviceError>().is_some() {
        return "Device";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
