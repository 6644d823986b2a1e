use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "job-digest")]
#[command(about = "Check the job search API once and mail a digest of new listings")]
pub struct CliArgs {
    /// Path to a TOML configuration file. Without it, configuration is read
    /// from the environment (and `.env`).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log CPU and memory usage per pipeline phase
    #[arg(long)]
    pub monitor: bool,
}
