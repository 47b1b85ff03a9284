mod aggregate;
mod cache;
mod client;
mod config;
mod fetch;
mod logging;
mod model;
mod progress;
mod render;
mod session;
mod targets;
#[cfg(test)]
mod testing;
mod validate;

use crate::aggregate::{AggregateError, AggregationRequest, run_aggregation};
use crate::client::ApiClient;
use crate::config::{CacheConfig, EffectiveConfig, Scope, save};
use crate::fetch::Dashboard;
use crate::model::{HistoryQuery, Resolution};
use crate::progress::{BarProgress, NoProgress, ProgressReporter};
use crate::render::{OutputFormat, RenderOpts, render_items, render_report};
use crate::session::{API_KEY_ENV, Session};
use crate::targets::{select_networks, select_organization};
use crate::validate::{DateRange, ValidationError};
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "wirelessctl",
    version,
    about = "Wireless client count history for Meraki Dashboard networks"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Base URL for the API (defaults to https://api.meraki.com/api/v1)"
    )]
    base_url: Option<String>,

    #[arg(
        long,
        short = 'o',
        value_enum,
        default_value_t = OutputFormat::Pretty,
        global = true,
        help = "Output format (propagates to subcommands)"
    )]
    output: OutputFormat,

    #[arg(
        long,
        value_name = "COL1,COL2",
        global = true,
        help = "Override table columns (comma-separated)"
    )]
    columns: Option<String>,

    #[arg(
        long,
        value_name = "COLUMN",
        global = true,
        help = "Sort table rows by column (ascending)"
    )]
    sort_by: Option<String>,

    #[arg(
        long,
        value_name = "TEXT",
        global = true,
        help = "Filter rows containing TEXT (case-insensitive)"
    )]
    filter: Option<String>,

    #[arg(
        long,
        value_name = "LEVEL",
        global = true,
        default_value = "warn",
        help = "Log level on stderr (RUST_LOG takes precedence)"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Persist settings to the chosen scope (the API key is only read from MK_CSM_KEY)
    Configure {
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
        #[arg(long, value_name = "URL", help = "Base URL to store")]
        base_url: Option<String>,
        #[arg(long, value_name = "PATH", help = "Log file location")]
        log_file: Option<PathBuf>,
        #[arg(long, value_name = "BOOL", help = "Enable or disable the log file")]
        file_logging: Option<bool>,
        #[arg(long, value_name = "SECONDS", help = "Cache TTL for client history")]
        short_ttl: Option<u64>,
        #[arg(
            long,
            value_name = "SECONDS",
            help = "Cache TTL for organization, network and SSID listings"
        )]
        medium_ttl: Option<u64>,
    },
    /// Show effective configuration (the API key is never printed)
    ConfigShow,
    /// List organizations visible to the API key
    Orgs,
    /// List networks of an organization (wireless only by default)
    Networks {
        #[arg(long, value_name = "ID|NAME")]
        org: Option<String>,
        #[arg(long, help = "Include networks without the wireless product")]
        all_types: bool,
    },
    /// List SSIDs of a network
    Ssids {
        #[arg(long, value_name = "NETWORK_ID")]
        network: String,
        #[arg(long, help = "Only enabled SSIDs")]
        enabled_only: bool,
    },
    /// Client count history of one network (optionally one SSID)
    History {
        #[arg(long, value_name = "NETWORK_ID")]
        network: String,
        #[arg(long, value_name = "NUMBER")]
        ssid: Option<u32>,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Aggregate client counts over networks and print the series with a total
    Report {
        #[arg(long, value_name = "ID|NAME")]
        org: Option<String>,
        #[arg(
            long = "network",
            value_name = "ID|NAME",
            help = "Network to include (repeatable)"
        )]
        networks: Vec<String>,
        #[arg(
            long,
            conflicts_with = "networks",
            help = "Mass fetch: every wireless network of the organization"
        )]
        all: bool,
        #[arg(long, help = "Split results by enabled SSID")]
        split_by_ssid: bool,
        #[command(flatten)]
        window: WindowArgs,
        #[arg(
            long,
            value_name = "SECONDS",
            value_parser = clap::value_parser!(u64).range(1..),
            help = "Watch mode: re-run the report every SECONDS"
        )]
        watch: Option<u64>,
    },
    /// Print the tail of the application log
    Logs {
        #[arg(long, default_value_t = 2000)]
        lines: usize,
        #[arg(long, value_name = "LEVEL", help = "Only lines at LEVEL (INFO, WARN, ERROR)")]
        level: Option<String>,
    },
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(clap::Args, Clone)]
struct WindowArgs {
    #[arg(long, value_name = "YYYY-MM-DD", help = "Start date (defaults to 7 days ago)")]
    start: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD", help = "End date (defaults to today)")]
    end: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = ResolutionArg::Hour)]
    resolution: ResolutionArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResolutionArg {
    Hour,
    Day,
}

impl From<ResolutionArg> for Resolution {
    fn from(value: ResolutionArg) -> Self {
        match value {
            ResolutionArg::Hour => Resolution::Hourly,
            ResolutionArg::Day => Resolution::Daily,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("reading current directory")?;

    match &cli.command {
        Commands::Configure {
            scope,
            base_url,
            log_file,
            file_logging,
            short_ttl,
            medium_ttl,
        } => {
            let mut existing = config::load_scope((*scope).into(), &cwd)?;
            if let Some(url) = base_url.clone() {
                existing.base_url = Some(url);
            }
            if let Some(path) = log_file.clone() {
                existing.log_file = Some(path);
            }
            if let Some(enabled) = file_logging {
                existing.file_logging = Some(*enabled);
            }
            if short_ttl.is_some() || medium_ttl.is_some() {
                let cache = existing.cache.get_or_insert_with(CacheConfig::default);
                if short_ttl.is_some() {
                    cache.short_ttl_secs = *short_ttl;
                }
                if medium_ttl.is_some() {
                    cache.medium_ttl_secs = *medium_ttl;
                }
            }

            let path = save((*scope).into(), &existing, &cwd)?;
            println!("Saved configuration to {}", path.display());
            return Ok(());
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            match shell {
                CompletionShell::Bash => {
                    generate(shells::Bash, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Zsh => {
                    generate(shells::Zsh, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Fish => {
                    generate(shells::Fish, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::PowerShell => {
                    generate(shells::PowerShell, &mut cmd, bin, &mut std::io::stdout())
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let settings = config::resolve(&cwd, cli.base_url.clone())?;
    logging::init(
        &cli.log_level,
        settings.file_logging.then_some(settings.log_file.as_path()),
    )?;

    if let Err(err) = run(cli, &settings) {
        // Validation and empty results are logged where they are detected.
        let expected = err.downcast_ref::<ValidationError>().is_some()
            || err.downcast_ref::<AggregateError>().is_some();
        if !expected {
            error!("Critical application error: {:#}", err);
        }
        return Err(err);
    }
    Ok(())
}

fn run(cli: Cli, settings: &EffectiveConfig) -> Result<()> {
    let session = Session::from_env(&settings.base_url);
    let render_opts = RenderOpts {
        columns_override: cli.columns.as_ref().map(|c| {
            c.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }),
        sort_by: cli.sort_by.clone(),
        filter: cli.filter.clone(),
    };
    let output = cli.output;

    match cli.command {
        Commands::ConfigShow => show_config(settings, output)?,
        Commands::Logs { lines, level } => show_logs(&settings.log_file, lines, level.as_deref())?,
        Commands::Orgs => {
            let dashboard = open_dashboard(&session, settings)?;
            let orgs = dashboard.list_organizations()?;
            render_items(&orgs, output, &render_opts, Some(&["name", "id"]))?;
        }
        Commands::Networks { org, all_types } => {
            let dashboard = open_dashboard(&session, settings)?;
            let org = select_organization(&dashboard.list_organizations()?, org.as_deref())?;
            let mut networks = dashboard.list_networks(&org.id)?;
            if !all_types {
                networks.retain(|n| n.is_wireless());
            }
            render_items(
                &networks,
                output,
                &render_opts,
                Some(&["name", "id", "productTypes"]),
            )?;
        }
        Commands::Ssids {
            network,
            enabled_only,
        } => {
            let dashboard = open_dashboard(&session, settings)?;
            let mut ssids = dashboard.list_ssids(&network)?;
            if enabled_only {
                ssids.retain(|s| s.enabled);
            }
            render_items(
                &ssids,
                output,
                &render_opts,
                Some(&["number", "name", "enabled"]),
            )?;
        }
        Commands::History {
            network,
            ssid,
            window,
        } => {
            let range = validated_range(&window)?;
            let dashboard = open_dashboard(&session, settings)?;
            let query = HistoryQuery::new(&network, &range, window.resolution.into(), ssid);
            let points = dashboard.client_history(&query);
            render_items(
                &points,
                output,
                &render_opts,
                Some(&["startTs", "clientCount"]),
            )?;
        }
        Commands::Report {
            org,
            networks,
            all,
            split_by_ssid,
            window,
            watch,
        } => {
            let report = ReportArgs {
                org,
                networks,
                all,
                split_by_ssid,
                window,
            };
            match watch {
                Some(interval) => {
                    // A window that is invalid now stays invalid. Each pass checks
                    // again since the start date ages; the caches live across passes.
                    validated_range(&report.window)?;
                    let dashboard = open_dashboard(&session, settings)?;
                    loop {
                        if let Err(err) = run_report(&dashboard, &report, output, &render_opts) {
                            error!("Report failed: {:#}", err);
                            eprintln!("Error: {err:#}");
                        }
                        std::thread::sleep(std::time::Duration::from_secs(interval));
                    }
                }
                None => {
                    validated_range(&report.window)?;
                    let dashboard = open_dashboard(&session, settings)?;
                    run_report(&dashboard, &report, output, &render_opts)?;
                }
            }
        }
        Commands::Configure { .. } | Commands::Completion { .. } => {}
    }

    Ok(())
}

struct ReportArgs {
    org: Option<String>,
    networks: Vec<String>,
    all: bool,
    split_by_ssid: bool,
    window: WindowArgs,
}

fn open_dashboard<'a>(
    session: &'a Session,
    settings: &EffectiveConfig,
) -> Result<Dashboard<&'a ApiClient>> {
    Ok(Dashboard::new(session.client()?, settings.ttls))
}

fn validated_range(window: &WindowArgs) -> Result<DateRange> {
    let today = Local::now().date_naive();
    let start = window.start.unwrap_or(today - Duration::days(7));
    let end = window.end.unwrap_or(today);
    DateRange::validated(start, end, today).map_err(|err| {
        for violation in &err.violations {
            warn!("Validation Error: {}", violation);
        }
        anyhow::Error::from(err)
    })
}

fn run_report(
    dashboard: &Dashboard<&ApiClient>,
    report: &ReportArgs,
    output: OutputFormat,
    render_opts: &RenderOpts,
) -> Result<()> {
    let range = validated_range(&report.window)?;
    let resolution: Resolution = report.window.resolution.into();

    let org = select_organization(&dashboard.list_organizations()?, report.org.as_deref())?;
    let networks = dashboard.list_networks(&org.id)?;
    let targets = select_networks(&networks, &report.networks, report.all)?;
    if report.all {
        info!("Mass Fetch enabled for Organization: {}", org.name);
    }

    info!("Starting Analysis for Organization: {}", org.name);
    info!(
        "Parameters: Networks={}, Resolution={}s, SplitSSID={}, Window={}..{}",
        targets.len(),
        resolution.seconds(),
        report.split_by_ssid,
        range.start(),
        range.end()
    );

    let request = AggregationRequest {
        targets: &targets,
        range: &range,
        resolution,
        split_by_ssid: report.split_by_ssid,
    };
    let mut progress: Box<dyn ProgressReporter> = match output {
        OutputFormat::Pretty => Box::new(BarProgress::new()),
        OutputFormat::Json => Box::new(NoProgress),
    };

    match run_aggregation(dashboard, &request, progress.as_mut()) {
        Ok(aggregation) => {
            let caption = format!(
                "Split by SSID: {} | Resolution: {} | {} to {}",
                report.split_by_ssid,
                resolution,
                range.start(),
                range.end()
            );
            render_report(&aggregation, output, render_opts, &caption)?;
            info!(
                "Report rendered successfully ({} upstream calls so far).",
                dashboard.call_count()
            );
            Ok(())
        }
        Err(AggregateError::NoData) => {
            Err(AggregateError::NoData).context("No data found for the selected criteria")
        }
    }
}

fn show_config(settings: &EffectiveConfig, output: OutputFormat) -> Result<()> {
    info!("Showing system configuration");
    let api_key = if session::api_key_configured() {
        "Set"
    } else {
        "Missing"
    };
    match output {
        OutputFormat::Json => {
            let value = json!({
                "apiKey": api_key,
                "baseUrl": settings.base_url,
                "fileLogging": settings.file_logging,
                "logFile": settings.log_file,
                "cache": {
                    "short": settings.ttls.short.as_secs(),
                    "medium": settings.ttls.medium.as_secs(),
                },
            });
            println!("{}", serde_json::to_string(&value)?);
        }
        OutputFormat::Pretty => {
            println!("API Key ({API_KEY_ENV}): {api_key}");
            println!("Base URL: {}", settings.base_url);
            println!(
                "File Logging: {}",
                if settings.file_logging {
                    "Enabled"
                } else {
                    "Disabled"
                }
            );
            if settings.file_logging {
                println!("Log Filename: {}", settings.log_file.display());
            }
            println!("Caching Timers (Seconds):");
            println!("  short: {}", settings.ttls.short.as_secs());
            println!("  medium: {}", settings.ttls.medium.as_secs());
        }
    }
    Ok(())
}

fn show_logs(path: &Path, lines: usize, level: Option<&str>) -> Result<()> {
    match logging::tail(path, lines, level)? {
        Some(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        None => eprintln!("File {} not found.", path.display()),
    }
    Ok(())
}
