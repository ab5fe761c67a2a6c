use crate::demo::{run_demo, DemoArgs};
use crate::report::{
    run_compliance_report, run_revenue_report, run_scan, run_trend_report, ComplianceArgs,
    RevenueArgs, ScanArgs, TrendArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gstdesk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "GST Practice Desk",
    about = "Scan GST deadlines and produce compliance reports for a practice",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one deadline scan against a snapshot and write alerts into it
    Scan(ScanArgs),
    /// Produce a compliance, trend, or revenue report from a snapshot
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Run an end-to-end demo against a seeded practice
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Per-client compliance scores for a year or month
    Compliance(ComplianceArgs),
    /// Monthly filing rates for the trailing months
    Trend(TrendArgs),
    /// Invoiced revenue by month with top clients
    Revenue(RevenueArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Practice snapshot (JSON) to serve; starts empty when omitted
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
    /// GST portal return-status export merged into the snapshot
    #[arg(long, requires = "snapshot")]
    pub(crate) returns_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scan(args) => run_scan(args),
        Command::Report { command } => match command {
            ReportCommand::Compliance(args) => run_compliance_report(args),
            ReportCommand::Trend(args) => run_trend_report(args),
            ReportCommand::Revenue(args) => run_revenue_report(args),
        },
        Command::Demo(args) => run_demo(args),
    }
}
