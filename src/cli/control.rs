use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::cli::ui::{LightView, Painter};
use crate::handlers::{Brightness, Rgb};
use crate::light::{LightSession, LightSnapshot, RefreshOutcome};

/// JSON result emitted by a device command.
#[derive(Serialize)]
struct ControlResult<'a> {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh: Option<RefreshOutcome>,
    mac: String,
    state: &'a LightSnapshot,
}

/// Arguments for `colour`.
#[derive(Debug, Args)]
pub struct ColourArgs {
    red: u8,
    green: u8,
    blue: u8,
}

impl ColourArgs {
    /// Creates colour arguments.
    ///
    /// ```
    /// use tl100::ColourArgs;
    ///
    /// let args = ColourArgs::new(255, 64, 0);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    fn rgb(&self) -> Rgb {
        Rgb::new(self.red, self.green, self.blue)
    }
}

/// Arguments for `brightness` and `white`.
#[derive(Debug, Args)]
pub struct LevelArgs {
    /// Brightness on the 0..=255 scale.
    level: u8,
}

impl LevelArgs {
    #[must_use]
    pub fn new(level: u8) -> Self {
        Self { level }
    }

    fn brightness(&self) -> Brightness {
        Brightness::new(self.level)
    }
}

/// Arguments for `effect`.
#[derive(Debug, Args)]
pub struct EffectArgs {
    /// Effect name as listed by `effects`; unknown names select "Off".
    name: String,
}

impl EffectArgs {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One device command run by [`run`].
#[derive(Debug)]
pub(crate) enum ControlAction<'a> {
    Status,
    On,
    Off,
    Colour(&'a ColourArgs),
    Brightness(&'a LevelArgs),
    White(&'a LevelArgs),
    Effect(&'a EffectArgs),
}

impl ControlAction<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::On => "on",
            Self::Off => "off",
            Self::Colour(_args) => "colour",
            Self::Brightness(_args) => "brightness",
            Self::White(_args) => "white",
            Self::Effect(_args) => "effect",
        }
    }
}

/// Runs one device command against a connected session and prints the result.
#[instrument(skip(session, out, painter), level = "info", fields(action = action.name(), ?output_format))]
pub(crate) async fn run<W>(
    session: &LightSession,
    action: ControlAction<'_>,
    out: &mut W,
    output_format: OutputFormat,
    painter: &Painter,
) -> Result<()>
where
    W: io::Write,
{
    let refresh = match &action {
        ControlAction::Status => Some(session.update().await),
        ControlAction::On => {
            session.turn_on().await;
            None
        }
        ControlAction::Off => {
            session.turn_off().await;
            None
        }
        ControlAction::Colour(args) => {
            session.set_color(args.rgb()).await;
            None
        }
        ControlAction::Brightness(args) => {
            session.set_color_brightness(args.brightness()).await;
            None
        }
        ControlAction::White(args) => {
            session.set_white(args.brightness()).await;
            None
        }
        ControlAction::Effect(args) => {
            session.set_effect(&args.name).await;
            None
        }
    };

    let snapshot = session.snapshot();
    match output_format {
        OutputFormat::Pretty => {
            if let Some(outcome) = refresh
                && outcome != RefreshOutcome::Completed
            {
                writeln!(out, "{}", painter.warning(format!("Refresh {outcome}")))?;
            }
            writeln!(out, "{}", LightView::new(session.mac(), &snapshot, painter))?;
        }
        OutputFormat::Json => write_json_line(
            out,
            &ControlResult {
                action: action.name(),
                refresh,
                mac: session.mac().to_string(),
                state: &snapshot,
            },
        )?,
    }

    if !snapshot.available {
        anyhow::bail!("lost connection to {} during `{}`", session.mac(), action.name());
    }
    Ok(())
}

pub(crate) fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
