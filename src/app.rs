use std::io;

use anyhow::{Result, bail};
use bon::Builder;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::control::{self, ControlAction};
use crate::cli::ui::Painter;
use crate::cli::{Command, DeviceTarget, LogLevel, OutputFormat, offline, watch};
use crate::hw::transport_from_backend;
use crate::light::{LightSession, SessionTiming};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Settings shared by every command run.
#[derive(Debug, Clone, Default, Builder)]
pub struct RunOptions {
    log_level: Option<LogLevel>,
    /// Defaults to pretty output on a terminal and JSON otherwise.
    output_format: Option<OutputFormat>,
    #[builder(default)]
    timing: SessionTiming,
}

/// Builds a session for `target` and connects it.
///
/// # Errors
///
/// Returns an error if the transport cannot be created or the light cannot be
/// reached.
pub async fn open_session(target: &DeviceTarget, timing: SessionTiming) -> Result<LightSession> {
    let session = build_session(target, timing).await?;
    connect_session(&session).await?;
    Ok(session)
}

#[instrument(skip(target, timing), level = "info", fields(mac = %target.address()))]
async fn build_session(target: &DeviceTarget, timing: SessionTiming) -> Result<LightSession> {
    let transport = transport_from_backend(target.backend().clone(), target.address()).await?;
    Ok(LightSession::builder()
        .transport(transport)
        .address(target.address())
        .timing(timing)
        .build())
}

/// Connects `session`, failing if the light stays unreachable.
#[instrument(skip(session), level = "info", fields(mac = %session.mac()))]
pub(crate) async fn connect_session(session: &LightSession) -> Result<()> {
    tracing::Span::current().pb_set_message(&format!("Connecting to {}", session.mac()));
    session.connect().await;
    if !session.is_available() {
        bail!("could not connect to {}", session.mac());
    }
    Ok(())
}

/// Runs the CLI command.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = tl100::Args::try_parse_from(["tl100", "--fake", "effects"])?;
/// let (command, target) = args.into_command_and_target()?;
/// let mut out = Vec::new();
/// tl100::run(command, &mut out, target).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the light is unreachable,
/// or output writing fails.
pub async fn run<W>(command: Command, out: &mut W, target: Option<DeviceTarget>) -> Result<()>
where
    W: io::Write,
{
    run_with_options(command, out, target, RunOptions::default()).await
}

/// Runs the CLI command with explicit options.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the light is unreachable,
/// or output writing fails.
pub async fn run_with_options<W>(
    command: Command,
    out: &mut W,
    target: Option<DeviceTarget>,
    options: RunOptions,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients(command, out, &SystemTerminalClient, target, options).await
}

/// Runs the CLI command with an injected terminal client.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl tl100::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = tl100::Args::try_parse_from(["tl100", "--fake", "status"])?;
/// let options = tl100::RunOptions::builder()
///     .output_format(tl100::OutputFormat::Json)
///     .timing(args.timing())
///     .build();
/// let (command, target) = args.into_command_and_target()?;
/// let mut out = Vec::new();
/// tl100::run_with_clients(command, &mut out, &FakeTerminal, target, options).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the light is unreachable,
/// or output writing fails.
#[instrument(
    skip(out, terminal_client, target, options),
    level = "info",
    fields(command = command.name(), log_level = ?options.log_level)
)]
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    target: Option<DeviceTarget>,
    options: RunOptions,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "tl100",
        terminal_client.stderr_is_terminal(),
        options.log_level.map(LogLevel::as_level_filter),
    )?;

    let stdout_is_terminal = terminal_client.stdout_is_terminal();
    let output_format = options.output_format.unwrap_or(if stdout_is_terminal {
        OutputFormat::Pretty
    } else {
        OutputFormat::Json
    });
    let painter = Painter::new(stdout_is_terminal && output_format == OutputFormat::Pretty);

    let action = match &command {
        Command::Effects => return offline::run_effects(out, output_format, &painter),
        Command::Decode(args) => return offline::run_decode(args, out, output_format, &painter),
        Command::Watch(_args) => None,
        Command::Status => Some(ControlAction::Status),
        Command::On => Some(ControlAction::On),
        Command::Off => Some(ControlAction::Off),
        Command::Colour(args) => Some(ControlAction::Colour(args)),
        Command::Brightness(args) => Some(ControlAction::Brightness(args)),
        Command::White(args) => Some(ControlAction::White(args)),
        Command::Effect(args) => Some(ControlAction::Effect(args)),
    };

    let Some(target) = target else {
        bail!("`{}` needs --address or --fake", command.name());
    };
    let session = build_session(&target, options.timing).await?;

    let result = match (&command, action) {
        (Command::Watch(args), _) => {
            watch::run(&session, args, out, output_format, &painter).await
        }
        (_, Some(action)) => {
            async {
                connect_session(&session).await?;
                control::run(&session, action, out, output_format, &painter).await
            }
            .await
        }
        (_, None) => Ok(()),
    };
    session.disconnect().await;
    result
}
