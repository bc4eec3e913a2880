//! Costbook CLI - monthly cloud cost reports from Cost Explorer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use costbook_billing::period::{BillingPeriod, ReportMonth};
use costbook_billing::providers::DEFAULT_ROLE_NAME;
use costbook_report::config::{
    self, AccessMode, RunConfig, DEFAULT_PROFILE, DEFAULT_REGION, DEFAULT_ROSTER, DEFAULT_WORKBOOK,
};
use costbook_report::roster::Roster;
use costbook_report::run;

/// Costbook CLI - monthly cloud cost reports.
#[derive(Parser)]
#[command(name = "costbook")]
#[command(about = "Collect monthly blended costs into a report workbook")]
struct Cli {
    /// Named credential profile, recorded in logs (keys come from
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`).
    #[arg(long, env = "AWS_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// AWS region for the Cost Explorer and STS endpoints.
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one report month for every roster account and merge it into
    /// the workbook.
    Month {
        /// Report year (four digits).
        #[arg(long)]
        year: String,

        /// Report month (01-12). The column holds the prior month's bill.
        #[arg(long)]
        month: String,

        /// Account roster CSV (account_id,account_name,...).
        #[arg(long, default_value = DEFAULT_ROSTER)]
        roster: PathBuf,

        /// Workbook directory holding the report sheets.
        #[arg(long, env = "COSTBOOK_WORKBOOK", default_value = DEFAULT_WORKBOOK)]
        workbook: PathBuf,

        /// Sheet name override; defaults to the report year.
        #[arg(long)]
        project: Option<String>,

        /// Role assumed in each account.
        #[arg(long, default_value = DEFAULT_ROLE_NAME)]
        role_name: String,

        /// Query with the profile credentials directly, without assuming
        /// a role per account.
        #[arg(long, default_value = "false")]
        direct: bool,
    },

    /// Print monthly totals for an explicit date range, nothing persisted.
    Span {
        /// First billed day (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// First day after the range (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Role ARN to assume first; defaults to the profile credentials.
        #[arg(long)]
        role_arn: Option<String>,
    },

    /// Per-service breakdown for one report month.
    Services {
        /// Report year (four digits).
        #[arg(long)]
        year: String,

        /// Report month (01-12).
        #[arg(long)]
        month: String,

        /// Project name, also the sheet name when a workbook is given.
        #[arg(long)]
        project: String,

        /// Workbook directory; omit to print without persisting.
        #[arg(long, env = "COSTBOOK_WORKBOOK")]
        workbook: Option<PathBuf>,

        /// Role ARN to assume first; defaults to the profile credentials.
        #[arg(long)]
        role_arn: Option<String>,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}': expected YYYY-MM-DD"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(profile = %cli.profile, region = %cli.region, "Application started");

    match cli.command {
        Commands::Month {
            year,
            month,
            roster,
            workbook,
            project,
            role_name,
            direct,
        } => {
            let report_month = ReportMonth::parse(&year, &month)?;
            let access = if direct {
                AccessMode::Direct
            } else {
                AccessMode::AssumeRole { role_name }
            };
            let run_config = RunConfig {
                profile: cli.profile,
                region: cli.region,
                access,
            };
            run_config.validate()?;

            let roster = Roster::from_path(&roster)
                .with_context(|| format!("failed to read roster {}", roster.display()))?;
            let broker = run_config.broker()?;

            run::run_month(
                broker.as_ref(),
                &roster,
                &report_month,
                &workbook,
                project.as_deref(),
            )
            .await?;
        }

        Commands::Span {
            start,
            end,
            role_arn,
        } => {
            let period = BillingPeriod::from_dates(parse_date(&start)?, parse_date(&end)?)?;
            let run_config = RunConfig {
                profile: cli.profile,
                region: cli.region,
                access: AccessMode::Direct,
            };
            run_config.validate()?;

            let client = run_config.single_client(role_arn.as_deref()).await?;
            run::run_span(client.as_ref(), &period).await?;
        }

        Commands::Services {
            year,
            month,
            project,
            workbook,
            role_arn,
        } => {
            let report_month = ReportMonth::parse(&year, &month)?;
            config::validate_sheet_name(&project)?;
            let run_config = RunConfig {
                profile: cli.profile,
                region: cli.region,
                access: AccessMode::Direct,
            };
            run_config.validate()?;

            let client = run_config.single_client(role_arn.as_deref()).await?;
            run::run_services(
                client.as_ref(),
                &report_month,
                &project,
                workbook.as_deref(),
            )
            .await?;
        }
    }

    info!("Application finished");
    Ok(())
}
