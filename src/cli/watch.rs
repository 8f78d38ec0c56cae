use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, instrument};

use crate::app::connect_session;
use crate::cli::OutputFormat;
use crate::cli::ui::{Painter, WatchLineView};
use crate::error::InteractionError;
use crate::light::{LightSession, LightSnapshot};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Arguments for `watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many updates. If omitted, watch until Ctrl+C.
    #[arg(long)]
    max_updates: Option<usize>,
    /// How often to ask the light for fresh status (e.g. `30s`).
    #[arg(long, value_parser = parse_interval, default_value = "30s")]
    poll_interval: Duration,
}

impl WatchArgs {
    /// Creates watch arguments with an optional update limit.
    #[must_use]
    pub fn new(max_updates: Option<usize>) -> Self {
        Self {
            max_updates,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Why a watch run ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
enum WatchStopReason {
    Interrupted,
    ReachedLimit,
}

#[derive(Serialize)]
struct WatchEvent<'a> {
    update: usize,
    state: &'a LightSnapshot,
}

/// Prints the session state each time its change callback fires.
///
/// The callback is installed before connecting, so the status read while
/// connecting is the first update.
#[instrument(skip(session, out, painter), level = "info", fields(max_updates = ?args.max_updates))]
pub(crate) async fn run<W>(
    session: &LightSession,
    args: &WatchArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: &Painter,
) -> Result<()>
where
    W: io::Write,
{
    let (sender, mut changes) = mpsc::unbounded_channel();
    session.set_update_callback(move || {
        let _ = sender.send(());
    });
    connect_session(session).await?;

    let mut poll = interval(args.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    poll.tick().await;

    let mut received = 0usize;
    let stop_reason = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|source| InteractionError::CtrlC { source })?;
                break WatchStopReason::Interrupted;
            }
            _tick = poll.tick() => {
                let outcome = session.update().await;
                debug!(%outcome, "polled status");
            }
            change = changes.recv() => {
                if change.is_none() {
                    break WatchStopReason::Interrupted;
                }
                received += 1;
                let snapshot = session.snapshot();
                match output_format {
                    OutputFormat::Pretty => {
                        writeln!(out, "{}", WatchLineView::new(received, &snapshot, painter))?;
                    }
                    OutputFormat::Json => {
                        serde_json::to_writer(&mut *out, &WatchEvent { update: received, state: &snapshot })?;
                        writeln!(out)?;
                    }
                }
                if let Some(limit) = args.max_updates && received >= limit {
                    break WatchStopReason::ReachedLimit;
                }
            }
        }
    };

    debug!(?stop_reason, received, "watch finished");
    session.disconnect().await;
    Ok(())
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(value).map_err(|error| error.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}
