use std::process::ExitCode;

use clap::Parser;

use tl100::{Args, RunOptions, run_with_options};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let run_result = async {
        let options = RunOptions::builder()
            .maybe_log_level(args.log_level())
            .maybe_output_format(args.output_format())
            .timing(args.timing())
            .build();
        let (command, target) = args.into_command_and_target()?;

        run_with_options(command, &mut stdout, target, options).await
    }
    .await;

    match run_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
