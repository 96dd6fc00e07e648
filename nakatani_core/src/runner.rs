//! Session loop that feeds pumped packets into a research manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use nakatani_traits::CommandSink;

use crate::error::{ResearchError, Result};
use crate::observer::ResearchObserver;
use crate::pump::{Inbound, PacketPump};
use crate::research::{ResearchProcessManager, SessionState};

/// How often the runner wakes up to check the shutdown flag when the link is quiet.
const POLL: Duration = Duration::from_millis(50);

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// `(name, value)` pairs in list order.
    pub results: Vec<(String, Option<u32>)>,
    pub packets: u64,
    pub malformed: u64,
    pub elapsed: Duration,
}

/// Drive `manager` with packets from `pump` until every point has a value.
///
/// Runs on the caller's thread, which is the only writer of session state.
/// Starts the session if it is still idle. Setting `shutdown` stops the ADC
/// and returns [`ResearchError::Interrupted`]. A quiet link is not an error;
/// the session simply keeps waiting.
pub fn run_session<C, O>(
    manager: &mut ResearchProcessManager<C, O>,
    pump: &PacketPump,
    shutdown: &AtomicBool,
) -> Result<SessionOutcome>
where
    C: CommandSink,
    O: ResearchObserver,
{
    let started = Instant::now();
    if manager.state() == SessionState::Idle {
        manager.start()?;
    }

    while !manager.state().is_finished() {
        if shutdown.load(Ordering::Relaxed) {
            if let Err(e) = manager.abort() {
                tracing::warn!(error = %e, "could not stop adc while aborting");
            }
            return Err(ResearchError::Interrupted.into());
        }

        match pump.recv_timeout(POLL) {
            Ok(Inbound::Packet(buf)) => manager.handle_packet(&buf)?,
            Ok(Inbound::Connection(connected)) => manager.connection_changed(connected),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ResearchError::Device("packet pump stopped".into()).into());
            }
        }
    }

    if manager.state() == SessionState::Aborted {
        return Err(ResearchError::Interrupted.into());
    }

    let (packets, malformed) = manager.packet_counts();
    let elapsed = started.elapsed();
    tracing::info!(
        packets,
        malformed,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "session finished"
    );
    Ok(SessionOutcome {
        results: manager.points().results(),
        packets,
        malformed,
        elapsed,
    })
}
