use chrono::Local;
use clap::Parser;
use job_digest::core::digest::DigestFormatter;
use job_digest::utils::{logger, validation::Validate};
use job_digest::{
    AdzunaClient, CliArgs, DigestConfig, DigestEngine, DigestError, DigestPipeline, FileLedger,
    RunOutcome, SmtpMailer,
};

fn report_failure(stage: &str, e: &DigestError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1))
}

fn load_config(args: &CliArgs) -> job_digest::Result<DigestConfig> {
    match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            DigestConfig::from_file(path)
        }
        None => {
            tracing::info!("📁 Loading configuration from the environment");
            DigestConfig::from_env()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    // Before the logger so RUST_LOG can come from .env.
    let dotenv = dotenvy::dotenv();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => report_failure("Loading configuration", &e),
    };
    if args.verbose {
        tracing::debug!("Configuration: {:?}", config);
    }
    if let Err(e) = config.validate() {
        report_failure("Configuration validation", &e);
    }

    let source = match AdzunaClient::new(config.adzuna_settings()) {
        Ok(client) => client,
        Err(e) => report_failure("Creating the search client", &DigestError::from(e)),
    };
    let mailer = match SmtpMailer::new(config.smtp_settings()) {
        Ok(mailer) => mailer,
        Err(e) => report_failure("Creating the mail transport", &DigestError::from(e)),
    };

    let pipeline = DigestPipeline::new(
        FileLedger::new(config.ledger_path()),
        source,
        mailer,
        config.search_query(),
        config.recipient().to_string(),
        DigestFormatter::new(config.digest_settings()),
    );
    let engine = DigestEngine::new_with_monitoring(pipeline, config.run_policy(), args.monitor);

    match engine.run(Local::now().naive_local()).await {
        Ok(RunOutcome::Skipped { reason }) => {
            println!("⏭️ Skipped: {}", reason);
        }
        Ok(RunOutcome::Completed(report)) if report.delivery_failed() => {
            println!(
                "⚠️ {} new listings found but the digest could not be sent; they will be retried next run",
                report.new_listings
            );
        }
        Ok(RunOutcome::Completed(report)) => {
            println!(
                "✅ Run completed: {} fetched, {} new",
                report.fetched, report.new_listings
            );
        }
        Err(e) => {
            if e.exit_code() == 0 {
                tracing::warn!("Run finished with a recoverable error: {}", e);
            } else {
                report_failure("Job listing check", &e);
            }
        }
    }

    Ok(())
}
