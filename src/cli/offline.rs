use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::command::HexPayload;
use crate::cli::control::write_json_line;
use crate::cli::ui::{DecodeView, EffectsView, Painter};
use crate::cli::OutputFormat;
use crate::effects::EffectCatalog;
use crate::handlers::FrameCodec;
use crate::notification::{NotificationHandler, ParsedStatus};

/// Arguments for `decode`.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Raw notification bytes as hexadecimal.
    payload: HexPayload,
}

impl DecodeArgs {
    #[must_use]
    pub fn new(payload: HexPayload) -> Self {
        Self { payload }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EffectEntry {
    pub(crate) index: usize,
    pub(crate) name: &'static str,
}

/// Decode result for one captured notification.
#[derive(Debug, Serialize)]
pub(crate) struct DecodeReport {
    pub(crate) length: usize,
    pub(crate) frame_valid: bool,
    pub(crate) decoded: Option<ParsedStatus>,
}

/// Prints the effect catalog.
pub(crate) fn run_effects<W>(out: &mut W, output_format: OutputFormat, painter: &Painter) -> Result<()>
where
    W: io::Write,
{
    let entries: Vec<EffectEntry> = EffectCatalog::names()
        .iter()
        .enumerate()
        .map(|(index, name)| EffectEntry { index, name })
        .collect();

    match output_format {
        OutputFormat::Pretty => writeln!(out, "{}", EffectsView::new(&entries, painter))?,
        OutputFormat::Json => write_json_line(out, &entries)?,
    }
    Ok(())
}

/// Decodes one captured notification.
pub(crate) fn run_decode<W>(
    args: &DecodeArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: &Painter,
) -> Result<()>
where
    W: io::Write,
{
    let bytes = args.payload.as_bytes();
    let report = DecodeReport {
        length: bytes.len(),
        frame_valid: FrameCodec::decode(bytes).is_ok(),
        decoded: NotificationHandler::decode(bytes),
    };

    match output_format {
        OutputFormat::Pretty => writeln!(out, "{}", DecodeView::new(&report, painter))?,
        OutputFormat::Json => write_json_line(out, &report)?,
    }
    Ok(())
}
