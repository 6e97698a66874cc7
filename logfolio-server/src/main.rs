//! Logfolio - Investment journal service and DCF calculator.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use logfolio_common::logging::init_logging_with_exclusions;
use logfolio_common::{Config, DisplayConfig};
use logfolio_server::{seed, LocalStorage, LogfolioService};
use logfolio_valuation::{render_text, Metric, MetricLabels, ValuationForm};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logfolio")]
#[command(version)]
#[command(about = "Investment journal with a DCF valuation calculator", long_about = None)]
struct Cli {
    /// SQLite database file (overrides config and LOGFOLIO_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a DCF valuation and print the projection
    Dcf {
        /// Cash metric being projected (fcf, operating-income, dividend, ebitda)
        #[arg(long, default_value = "fcf")]
        metric: Metric,

        /// Projection years
        #[arg(long, default_value = "5", allow_hyphen_values = true)]
        years: String,

        /// Current metric value ($M)
        #[arg(long, default_value = "1000", allow_hyphen_values = true)]
        value: String,

        /// Annual share count growth (%)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        share_growth: String,

        /// Annual metric growth (%)
        #[arg(long, default_value = "10", allow_hyphen_values = true)]
        growth: String,

        /// Exit multiple applied to the final year
        #[arg(long, default_value = "15", allow_hyphen_values = true)]
        terminal_multiple: String,

        /// Discount rate (%)
        #[arg(long, default_value = "10", allow_hyphen_values = true)]
        discount: String,

        /// Current share price
        #[arg(long, default_value = "230", allow_hyphen_values = true)]
        price: String,

        /// Current trading multiple
        #[arg(long, default_value = "25", allow_hyphen_values = true)]
        multiple: String,

        /// Mask dollar amounts
        #[arg(long)]
        blur: bool,

        /// Print JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Insert default data
    Seed {
        #[arg(value_enum)]
        target: SeedTarget,
    },

    /// Run a one-off data migration
    Migrate {
        #[arg(value_enum)]
        target: MigrateTarget,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SeedTarget {
    /// The six built-in investment strategies
    Strategies,
    /// Sample stocks
    Stocks,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MigrateTarget {
    /// Link unlinked stocks to the strategy matching their investment type
    Strategies,
    /// Copy legacy stock theses into journal entries
    Journal,
}

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();
    let cli = Cli::parse();

    let mut config = Config::load_with_env()?;
    if let Some(db) = cli.db {
        config.storage.db_path = Some(db);
    }

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.network.bind = host;
            }
            if let Some(port) = port {
                config.network.port = port;
            }
            config.validate().map_err(|e| anyhow!("{}", e))?;
            init_logging(&config);

            tracing::info!("Logfolio v{}", env!("CARGO_PKG_VERSION"));

            let service = LogfolioService::new(config);

            let startup_duration = startup_start.elapsed();
            tracing::info!(
                duration_ms = startup_duration.as_millis() as u64,
                "Service initialized in {:?}",
                startup_duration
            );

            service.start().await
        }

        Commands::Dcf {
            metric,
            years,
            value,
            share_growth,
            growth,
            terminal_multiple,
            discount,
            price,
            multiple,
            blur,
            json,
        } => {
            let form = ValuationForm {
                metric,
                projection_years: years,
                current_metric_value: value,
                share_count_growth_rate: share_growth,
                metric_growth_rate: growth,
                terminal_multiple,
                discount_rate: discount,
                current_share_price: price,
                current_multiple: multiple,
            };
            let result = form.evaluate();

            if json {
                let body = serde_json::json!({
                    "result": result,
                    "labels": MetricLabels::from(metric),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let display = DisplayConfig {
                    blur_currency: blur || config.display.blur_currency,
                };
                print!("{}", render_text(result.as_ref(), metric, display));
            }
            Ok(())
        }

        Commands::Seed { target } => {
            init_logging(&config);
            let storage = LocalStorage::open(&config.db_path())?;
            let report = match target {
                SeedTarget::Strategies => seed::seed_strategies(&storage).await?,
                SeedTarget::Stocks => seed::seed_stocks(&storage).await?,
            };
            println!("Seeded {target:?}: {report}");
            Ok(())
        }

        Commands::Migrate { target } => {
            init_logging(&config);
            let storage = LocalStorage::open(&config.db_path())?;
            let report = match target {
                MigrateTarget::Strategies => seed::migrate_strategies(&storage).await?,
                MigrateTarget::Journal => seed::migrate_journal(&storage).await?,
            };
            println!("Migrated {target:?}: {report}");
            Ok(())
        }
    }
}

fn init_logging(config: &Config) {
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );
}
