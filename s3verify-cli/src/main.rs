mod config;

use std::process::ExitCode;

use s3verify::{CaseReport, Suite, SuiteError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::load(|name| std::env::var(name).ok()) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "invalid settings");
            return ExitCode::from(2);
        }
    };
    let config = match settings.server_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid server configuration");
            return ExitCode::from(2);
        }
    };
    tracing::info!(endpoint = config.endpoint(), region = config.region(), "starting suite");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling probes");
                cancel.cancel();
            }
        }
    });

    let suite = Suite::catalogue();
    let total = suite.cases().count();
    match suite.run_with_cancel(config, settings.options, cancel).await {
        Ok(report) => {
            print_passed(&report.cases);
            println!(
                "{}/{total} cases passed in {:.2?}, released {} fixtures ({} failed)",
                report.cases.len(),
                report.elapsed,
                report.teardown.released,
                report.teardown.failed,
            );
            if report.teardown.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(SuiteError::Case { passed, failure }) => {
            print_passed(&passed);
            println!("FAIL  {failure}");
            println!("{}/{total} cases passed", passed.len());
            ExitCode::FAILURE
        }
        Err(err @ SuiteError::Schedule(_)) => {
            tracing::error!(error = %err, "catalogue cannot be scheduled");
            ExitCode::from(2)
        }
    }
}

fn print_passed(cases: &[CaseReport]) {
    for case in cases {
        println!(
            "PASS  {:<32} {:>5} probes  {:>8.2?}",
            case.name, case.probes, case.elapsed
        );
    }
}
