//! Upkeep — scheduled billing automation for subscription clients.
//!
//! `upkeep check` flags overdue clients as due; `upkeep report` writes the
//! periodic analytics report. Both are meant to be run by cron or a job
//! scheduler, which owns retries.

mod render;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use upkeep_billing::BillingStatusChecker;
use upkeep_core::config::{AppConfig, StoreBackend};
use upkeep_core::store::ClientStore;
use upkeep_core::types::ReportPeriod;
use upkeep_reporting::ReportComposer;

#[derive(Parser, Debug)]
#[command(name = "upkeep")]
#[command(about = "Billing status checks and analytics reports for subscription clients")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store backend (overrides config)
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// MongoDB connection string (overrides config)
    #[arg(long, global = true)]
    mongodb_uri: Option<String>,

    /// Populate the in-memory store with demo clients before running
    #[arg(long, global = true, default_value_t = false)]
    seed_demo: bool,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mark clients whose billing date has passed as due
    Check,

    /// Generate and store an analytics report
    Report {
        /// Report period
        #[arg(long, value_enum, default_value_t = PeriodArg::Daily)]
        period: PeriodArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Mongo,
    Memory,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PeriodArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<PeriodArg> for ReportPeriod {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Daily => ReportPeriod::Daily,
            PeriodArg::Weekly => ReportPeriod::Weekly,
            PeriodArg::Monthly => ReportPeriod::Monthly,
        }
    }
}

fn init_tracing(pretty: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "upkeep=info".into());
    if pretty {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.pretty);

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(backend) = cli.backend {
        config.store.backend = match backend {
            BackendArg::Mongo => StoreBackend::Mongo,
            BackendArg::Memory => StoreBackend::Memory,
        };
    }
    if let Some(uri) = cli.mongodb_uri.clone() {
        config.store.mongodb_uri = Some(uri);
    }
    config.validate()?;

    info!(
        backend = ?config.store.backend,
        clients = %config.store.clients_collection,
        "Configuration loaded"
    );

    let store = upkeep_store::open(&config.store, cli.seed_demo).await?;
    let outcome = run(&cli.command, store.as_ref()).await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close store cleanly");
    }
    outcome
}

async fn run(command: &Commands, store: &dyn ClientStore) -> anyhow::Result<()> {
    match command {
        Commands::Check => {
            let outcome = BillingStatusChecker::new(store).run_check().await?;
            println!("{}", render::check_outcome(&outcome));
        }
        Commands::Report { period } => {
            let report = ReportComposer::new(store)
                .generate_report((*period).into())
                .await?;
            println!("{}", render::report(&report));
            println!("Report saved successfully");
        }
    }
    Ok(())
}
