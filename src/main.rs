use caption_shot::{setup_logging, CaptionError, Cli, CliRunner};
use clap::{CommandFactory, Parser};
use tracing::{debug, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse CLI arguments; clap would exit 2 on bad input
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    info!("Starting caption-shot v{}", env!("CARGO_PKG_VERSION"));

    let runner = match CliRunner::new(&args).await {
        Ok(runner) => runner,
        Err(e) => exit_with(e),
    };

    match runner.run().await {
        Ok(artifact) => info!(
            "Wrote {} ({} bytes)",
            artifact.path.display(),
            artifact.bytes_written
        ),
        Err(e) => exit_with(e),
    }
}

/// The one place errors turn into output and an exit status.
fn exit_with(error: CaptionError) -> ! {
    if error.is_classified() {
        debug!("Run failed: {:?}", error);
    } else {
        warn!("Run failed: {:?}", error);
    }

    match &error {
        CaptionError::Usage => {
            let _ = Cli::command().print_help();
        }
        _ => eprintln!("error: {error}"),
    }

    std::process::exit(error.exit_code());
}
