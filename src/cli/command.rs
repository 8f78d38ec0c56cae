use std::str::FromStr;
use std::time::Duration;

use btleplug::api::BDAddr;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::cli::control::{ColourArgs, EffectArgs, LevelArgs};
use crate::cli::offline::DecodeArgs;
use crate::cli::watch::WatchArgs;
use crate::error::{CliConfigError, FixtureError};
use crate::hw::{FakeDevice, HardwareBackend};
use crate::light::SessionTiming;

/// Address reported by the emulator when `--address` is omitted.
const FAKE_ADDRESS: [u8; 6] = [0xA4, 0xC1, 0x38, 0x10, 0x01, 0x00];

/// Command-line options for the TL100 light tool.
#[derive(Debug, Parser)]
#[command(name = "tl100", about = "Control TL100 Bluetooth lights.")]
pub struct Args {
    /// Bluetooth address of the light (e.g. `A4:C1:38:10:01:00`).
    #[arg(long, global = true, value_parser = parse_address)]
    address: Option<BDAddr>,
    /// Talk to an in-process emulated light instead of Bluetooth.
    #[arg(long, global = true)]
    fake: bool,
    /// Log level for this tool's own events; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to pretty on a terminal and JSON otherwise.
    #[arg(long, global = true, value_enum)]
    output_format: Option<OutputFormat>,
    /// Upper bound for one connection attempt (e.g. `20s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    connect_timeout: Option<Duration>,
    /// Pause after every command write (e.g. `100ms`).
    #[arg(long, global = true, value_parser = parse_duration)]
    command_spacing: Option<Duration>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use tl100::{Args, Command};
    ///
    /// let args = Args::new(Command::Effects);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            address: None,
            fake: false,
            log_level: None,
            output_format: None,
            connect_timeout: None,
            command_spacing: None,
            command,
        }
    }

    /// Targets the in-process emulator.
    #[must_use]
    pub fn with_fake(mut self) -> Self {
        self.fake = true;
        self
    }

    /// Targets the light at `address`.
    #[must_use]
    pub fn with_address(mut self, address: BDAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Returns the explicit log level, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicit output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    /// Session timing with command-line overrides applied.
    #[must_use]
    pub fn timing(&self) -> SessionTiming {
        let defaults = SessionTiming::default();
        SessionTiming::builder()
            .connect_timeout(self.connect_timeout.unwrap_or(defaults.connect_timeout))
            .command_spacing(self.command_spacing.unwrap_or(defaults.command_spacing))
            .settle_delay(defaults.settle_delay)
            .status_reply_timeout(defaults.status_reply_timeout)
            .build()
    }

    /// Splits parsed arguments into the command and the light it targets.
    ///
    /// Offline commands carry no target.
    ///
    /// # Errors
    ///
    /// Returns an error if a device command has neither `--address` nor `--fake`.
    pub fn into_command_and_target(self) -> anyhow::Result<(Command, Option<DeviceTarget>)> {
        let Args {
            address,
            fake,
            command,
            ..
        } = self;

        if !command.requires_device() {
            return Ok((command, None));
        }

        let target = match (fake, address) {
            (true, address) => DeviceTarget {
                address: address.unwrap_or(BDAddr::from(FAKE_ADDRESS)),
                backend: HardwareBackend::Fake(FakeDevice::default()),
            },
            (false, Some(address)) => DeviceTarget {
                address,
                backend: HardwareBackend::Real,
            },
            (false, None) => return Err(CliConfigError::MissingAddress.into()),
        };

        Ok((command, Some(target)))
    }
}

/// The light a device command talks to.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    address: BDAddr,
    backend: HardwareBackend,
}

impl DeviceTarget {
    /// Creates a target for an explicit backend.
    #[must_use]
    pub fn new(address: BDAddr, backend: HardwareBackend) -> Self {
        Self { address, backend }
    }

    #[must_use]
    pub fn address(&self) -> BDAddr {
        self.address
    }

    #[must_use]
    pub fn backend(&self) -> &HardwareBackend {
        &self.backend
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, refresh, and print the light state.
    Status,
    /// Turn the light on in its current mode.
    On,
    /// Turn both channels off.
    Off,
    /// Switch to colour mode with an RGB value.
    Colour(ColourArgs),
    /// Set colour-mode brightness (0..=255).
    Brightness(LevelArgs),
    /// Switch to the white reading light at a brightness (0..=255).
    White(LevelArgs),
    /// Start a named effect.
    Effect(EffectArgs),
    /// List the effect catalog without connecting.
    Effects,
    /// Print the light state every time it changes.
    Watch(WatchArgs),
    /// Decode a captured notification payload without connecting.
    Decode(DecodeArgs),
}

impl Command {
    /// Whether the command needs a connected light.
    #[must_use]
    pub fn requires_device(&self) -> bool {
        !matches!(self, Self::Effects | Self::Decode(_))
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::On => "on",
            Self::Off => "off",
            Self::Colour(_args) => "colour",
            Self::Brightness(_args) => "brightness",
            Self::White(_args) => "white",
            Self::Effect(_args) => "effect",
            Self::Effects => "effects",
            Self::Watch(_args) => "watch",
            Self::Decode(_args) => "decode",
        }
    }
}

/// Output rendering for command results.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables.
    Pretty,
    /// Machine-readable JSON.
    Json,
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Hexadecimal payload given on the command line.
///
/// Whitespace, `:` and `-` separators are ignored.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HexPayload(Vec<u8>);

impl HexPayload {
    /// Returns the decoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for HexPayload {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let compact: String = value
            .trim()
            .trim_start_matches("0x")
            .chars()
            .filter(|character| !character.is_whitespace() && !matches!(character, ':' | '-'))
            .collect();
        if compact.is_empty() {
            return Err(FixtureError::EmptyPayload);
        }
        Ok(Self(hex::decode(compact)?))
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

fn parse_address(value: &str) -> Result<BDAddr, String> {
    BDAddr::from_str_delim(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn device_commands_require_address_or_fake() {
        let args = Args::try_parse_from(["tl100", "on"]).expect("arguments should parse");

        let error = args
            .into_command_and_target()
            .expect_err("missing address should be rejected");
        assert_matches!(
            error.downcast_ref::<CliConfigError>(),
            Some(CliConfigError::MissingAddress)
        );
    }

    #[test]
    fn offline_commands_need_no_target() {
        let args = Args::try_parse_from(["tl100", "effects"]).expect("arguments should parse");

        let (command, target) = args
            .into_command_and_target()
            .expect("offline command should resolve");
        assert_matches!(command, Command::Effects);
        assert!(target.is_none());
    }

    #[test]
    fn fake_mode_uses_placeholder_address() {
        let args =
            Args::try_parse_from(["tl100", "--fake", "status"]).expect("arguments should parse");

        let (_command, target) = args
            .into_command_and_target()
            .expect("fake target should resolve");
        let target = target.expect("status needs a target");
        assert_eq!(BDAddr::from(FAKE_ADDRESS), target.address());
        assert_matches!(target.backend(), HardwareBackend::Fake(_));
    }

    #[test]
    fn address_selects_real_backend() {
        let args = Args::try_parse_from(["tl100", "--address", "A4:C1:38:AA:BB:CC", "off"])
            .expect("arguments should parse");

        let (_command, target) = args
            .into_command_and_target()
            .expect("real target should resolve");
        let target = target.expect("off needs a target");
        assert_eq!("A4:C1:38:AA:BB:CC", target.address().to_string());
        assert_matches!(target.backend(), HardwareBackend::Real);
    }

    #[test]
    fn malformed_address_is_rejected() {
        let error = Args::try_parse_from(["tl100", "--address", "not-a-mac", "off"])
            .expect_err("malformed address should fail");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn timing_flags_override_defaults() {
        let args = Args::try_parse_from([
            "tl100",
            "--connect-timeout",
            "5s",
            "--command-spacing",
            "150ms",
            "status",
        ])
        .expect("arguments should parse");

        let timing = args.timing();
        assert_eq!(Duration::from_secs(5), timing.connect_timeout);
        assert_eq!(Duration::from_millis(150), timing.command_spacing);
        assert_eq!(SessionTiming::default().settle_delay, timing.settle_delay);
    }

    #[rstest]
    #[case("FEEF0A", vec![0xFE, 0xEF, 0x0A])]
    #[case("fe ef 0a", vec![0xFE, 0xEF, 0x0A])]
    #[case("0xFE:EF:0A", vec![0xFE, 0xEF, 0x0A])]
    fn hex_payload_accepts_common_separators(#[case] input: &str, #[case] expected: Vec<u8>) {
        let payload: HexPayload = input.parse().expect("payload should parse");
        assert_eq!(expected, payload.as_bytes());
    }

    #[rstest]
    #[case("", FixtureError::EmptyPayload)]
    #[case("  ", FixtureError::EmptyPayload)]
    fn hex_payload_rejects_empty_input(#[case] input: &str, #[case] expected: FixtureError) {
        assert_eq!(Err(expected), input.parse::<HexPayload>());
    }

    #[test]
    fn hex_payload_rejects_odd_digits() {
        assert_matches!(
            "ABC".parse::<HexPayload>(),
            Err(FixtureError::InvalidHex(_))
        );
    }
}
