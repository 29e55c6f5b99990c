use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use varflow_preview::{config::PreviewConfig, preview};

const USAGE: &str = "usage: varflow-preview <trigger.json> [config.toml]";

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(trigger_path) = args.next() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let config_path = args.next();

    let config = match PreviewConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "Loaded configuration");

    let trigger = match preview::load_trigger(&trigger_path) {
        Ok(trigger) => trigger,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load trigger");
            return ExitCode::FAILURE;
        }
    };

    match preview::build_report(&trigger, &config, chrono::Utc::now()) {
        Ok(report) => {
            print!("{report}");
            if report.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build preview");
            ExitCode::FAILURE
        }
    }
}
