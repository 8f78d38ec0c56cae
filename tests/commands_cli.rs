use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl tl100::TerminalClient for FakeTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_with_argv(
    argv: &[&str],
    output_format: tl100::OutputFormat,
) -> anyhow::Result<String> {
    let args = tl100::Args::try_parse_from(argv)?;
    let options = tl100::RunOptions::builder()
        .output_format(output_format)
        .timing(args.timing())
        .build();
    let (command, target) = args.into_command_and_target()?;

    let mut output = Vec::new();
    tl100::run_with_clients(command, &mut output, &FakeTerminalClient, target, options).await?;
    Ok(String::from_utf8(output)?)
}

async fn run_json(argv: &[&str]) -> anyhow::Result<Value> {
    let stdout = run_with_argv(argv, tl100::OutputFormat::Json).await?;
    Ok(serde_json::from_str(&stdout)?)
}

#[tokio::test]
async fn effects_command_lists_catalog_without_a_device() -> anyhow::Result<()> {
    let effects = run_json(&["tl100", "effects"]).await?;

    let entries = effects.as_array().expect("effects should be a JSON array");
    assert_eq!(11, entries.len());
    assert_eq!(serde_json::json!({ "index": 9, "name": "Forest" }), entries[9]);
    Ok(())
}

#[tokio::test]
async fn effects_command_pretty_output_names_every_effect() -> anyhow::Result<()> {
    let stdout = run_with_argv(&["tl100", "effects"], tl100::OutputFormat::Pretty).await?;

    for name in tl100::EffectCatalog::names() {
        assert!(stdout.contains(name), "missing {name} in {stdout}");
    }
    Ok(())
}

#[tokio::test]
async fn decode_command_reports_white_status() -> anyhow::Result<()> {
    let frame = tl100::FakeDevice {
        white_on: true,
        white_wire: 51,
        ..tl100::FakeDevice::default()
    }
    .white_status();
    let payload = hex::encode(&frame);

    let report = run_json(&["tl100", "decode", &payload]).await?;

    assert_eq!(
        serde_json::json!({
            "length": frame.len(),
            "frame_valid": true,
            "decoded": { "status": "white", "on": true, "brightness": 130 },
        }),
        report
    );
    Ok(())
}

#[tokio::test]
async fn decode_command_marks_unknown_payload_as_ignored() -> anyhow::Result<()> {
    let stdout = run_with_argv(&["tl100", "decode", "DE:AD:BE:EF"], tl100::OutputFormat::Pretty)
        .await?;

    assert!(stdout.contains("ignored"), "{stdout}");
    assert!(stdout.contains("invalid"), "{stdout}");
    Ok(())
}

#[test]
fn decode_command_rejects_malformed_hex() {
    let error = tl100::Args::try_parse_from(["tl100", "decode", "0xABC"])
        .expect_err("odd-length hex should be rejected");
    assert_eq!(ErrorKind::ValueValidation, error.kind());
}

#[tokio::test(start_paused = true)]
async fn colour_command_drives_fake_light() -> anyhow::Result<()> {
    let result = run_json(&["tl100", "--fake", "colour", "255", "64", "0"]).await?;

    assert_eq!("colour", result["action"]);
    assert_eq!("A4:C1:38:10:01:00", result["mac"]);
    assert_eq!(
        serde_json::json!({ "red": 255, "green": 64, "blue": 0 }),
        result["state"]["rgb_color"]
    );
    assert_eq!("color", result["state"]["color_mode"]);
    assert_eq!(true, result["state"]["is_on"]);
    assert_eq!(Value::Null, result["refresh"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn status_command_reports_completed_refresh() -> anyhow::Result<()> {
    let result = run_json(&["tl100", "--fake", "status"]).await?;

    assert_eq!("status", result["action"]);
    assert_eq!("completed", result["refresh"]);
    assert_eq!(true, result["state"]["available"]);
    assert_eq!(false, result["state"]["is_on"]);
    assert_eq!(128, result["state"]["color_brightness"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn white_command_pretty_output_shows_white_mode() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        &["tl100", "--fake", "white", "200"],
        tl100::OutputFormat::Pretty,
    )
    .await?;

    assert!(stdout.contains("white"), "{stdout}");
    assert!(stdout.contains("199"), "{stdout}");
    assert!(stdout.contains("A4:C1:38:10:01:00"), "{stdout}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watch_command_reports_state_read_while_connecting() -> anyhow::Result<()> {
    let started = Instant::now();
    let stdout = run_with_argv(
        &["tl100", "--fake", "watch", "--max-updates", "1", "--poll-interval", "1h"],
        tl100::OutputFormat::Pretty,
    )
    .await?;

    assert!(started.elapsed() < Duration::from_secs(60));
    assert_snapshot!(
        stdout.trim_end(),
        @"[1] off mode=unset brightness=128 rgb=(255, 255, 255) effect=-"
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watch_command_keeps_polling_after_first_update() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        &["tl100", "--fake", "watch", "--max-updates", "2", "--poll-interval", "5s"],
        tl100::OutputFormat::Json,
    )
    .await?;

    let updates: Vec<Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(2, updates.len());
    assert_eq!(1, updates[0]["update"]);
    assert_eq!(2, updates[1]["update"]);
    assert_eq!(true, updates[1]["state"]["available"]);
    Ok(())
}

#[test]
fn device_command_requires_address_or_fake() {
    let args = tl100::Args::try_parse_from(["tl100", "on"]).expect("arguments should parse");
    let error = args
        .into_command_and_target()
        .expect_err("a device command without a target should fail");
    assert_eq!("--address is required unless --fake is set", error.to_string());
}

#[test]
fn address_flag_selects_real_backend() -> anyhow::Result<()> {
    let args = tl100::Args::try_parse_from(["tl100", "--address", "a4:c1:38:00:00:01", "off"])?;
    let (command, target) = args.into_command_and_target()?;

    assert!(matches!(command, tl100::Command::Off));
    let target = target.expect("device commands carry a target");
    assert_eq!("A4:C1:38:00:00:01", target.address().to_string());
    assert!(matches!(target.backend(), tl100::HardwareBackend::Real));
    Ok(())
}

#[test]
fn offline_commands_carry_no_target() -> anyhow::Result<()> {
    let args = tl100::Args::try_parse_from(["tl100", "--fake", "effects"])?;
    let (_command, target) = args.into_command_and_target()?;
    assert!(target.is_none());
    Ok(())
}
