use clap::Parser;
use http_server_tester::{RunOptions, TestPlan, TestRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run HTTP expectations against a freshly launched server",
    long_about = None
)]
struct Args {
    /// Test specification file (one scenario object or an array of them)
    config: PathBuf,

    /// Per-request timeout in milliseconds, overriding every scenario
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Fixed warm-up delay in milliseconds, overriding every scenario
    #[arg(long)]
    warmup_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Test run failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<String> {
    if !args.config.exists() {
        anyhow::bail!(
            "Test config file with path '{}' not found",
            args.config.display()
        );
    }

    let plan = TestPlan::load(&args.config).await?;
    log::info!(
        "Loaded {} scenario(s) from {}",
        plan.scenarios.len(),
        plan.source.display()
    );

    let runner = TestRunner::new().options(RunOptions {
        warmup: args.warmup_ms.map(Duration::from_millis),
        request_timeout: args.request_timeout_ms.map(Duration::from_millis),
    });

    let summary = runner.run_all(&plan).await?;

    Ok(format!(
        "All queries were successful! ({} scenario(s), {} entries in {:.1?})",
        summary.scenarios, summary.entries, summary.duration
    ))
}
