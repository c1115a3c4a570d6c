//! LiefClock - headless clock-in/out runner
//!
//! Reads commands from stdin (see [`liefclock_app::Command`]) until EOF or
//! Ctrl-C, then disposes the context.

use anyhow::Context;
use liefclock_app::{AppContext, Command};
use liefclock_domain::{ClockPayload, Position};
use liefclock_infra::{config, init_tracing};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => info!(error = %e, "No .env file loaded"),
    }

    let ctx = AppContext::init(config).await.context("failed to initialize LiefClock")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_fix: Option<Position> = None;
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else { break };
        let Some(command) = Command::parse(&line) else {
            if !line.trim().is_empty() && !line.trim_start().starts_with('#') {
                warn!(input = %line, "Unrecognized command");
            }
            continue;
        };

        if let Err(e) = run(&ctx, command, &mut last_fix).await {
            warn!(error = %e, "Command failed");
        }
    }

    ctx.dispose().await.context("failed to dispose LiefClock")?;
    Ok(())
}

async fn run(
    ctx: &AppContext,
    command: Command,
    last_fix: &mut Option<Position>,
) -> liefclock_domain::Result<()> {
    match command {
        Command::Position(position) => {
            *last_fix = Some(position);
            ctx.positions.publish(position);
        }
        Command::ClockIn(note) => {
            let Some(fix) = last_fix.as_ref() else { return no_fix() };
            let receipt = ctx.submitter.clock_in(payload(fix, note)).await?;
            info!(shift_id = %receipt.shift.id, offline = receipt.offline, "Clocked in");
        }
        Command::ClockOut(note) => {
            let Some(fix) = last_fix.as_ref() else { return no_fix() };
            let receipt = ctx.submitter.clock_out(payload(fix, note)).await?;
            info!(shift_id = %receipt.shift.id, offline = receipt.offline, "Clocked out");
        }
        Command::Sync => match ctx.sync.sync_now().await? {
            Some(summary) => info!(?summary, "Sync finished"),
            None => info!("Sync already running or offline"),
        },
        Command::Status => {
            info!(
                network = ?ctx.network.status(),
                sync = ?ctx.sync.status(),
                tracker = ?ctx.tracker.status(),
                storage = ?ctx.storage_stats().await?,
                pending = ctx.submitter.pending_sync_count(),
                "Status"
            );
        }
        Command::Shifts => {
            let listing = ctx.history.shifts().await?;
            info!(
                count = listing.shifts.len(),
                from_cache = listing.from_cache,
                open = ?listing.open_shift().map(|shift| shift.id.as_str()),
                "Shifts"
            );
        }
        Command::Visibility(visibility) => ctx.visibility.set(visibility),
    }
    Ok(())
}

fn no_fix() -> liefclock_domain::Result<()> {
    warn!("No position yet; send `lat,lng` first");
    Ok(())
}

fn payload(fix: &Position, note: Option<String>) -> ClockPayload {
    let payload = ClockPayload::new(fix.latitude(), fix.longitude());
    match note {
        Some(note) => payload.with_note(note),
        None => payload,
    }
}
