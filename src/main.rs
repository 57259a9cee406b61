use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use email_auth_check::common::domain::{validate_domain, validate_selector};
use email_auth_check::dkim::DkimReport;
use email_auth_check::dmarc::DmarcReport;
use email_auth_check::spf::SpfReport;
use email_auth_check::{AuthChecker, CheckError, CheckOutcome, CheckerConfig, DomainReport, HickoryResolver, Issue};

/// Check the SPF, DKIM and DMARC records a domain publishes.
#[derive(Parser, Debug)]
#[command(name = "authcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "AUTHCHECK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// DNS query timeout in seconds (overrides the config file)
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the SPF record
    Spf { domain: String },

    /// Check the DMARC record
    Dmarc { domain: String },

    /// Check the DKIM key for a selector
    Dkim { domain: String, selector: String },

    /// Run SPF, DMARC and (with --selector) DKIM together
    All {
        domain: String,
        #[arg(short, long)]
        selector: Option<String>,
    },
}

/// Exit status when DNS itself failed, as opposed to a failing record.
const EXIT_DNS_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => CheckerConfig::load(path)?,
        None => CheckerConfig::default(),
    };
    if let Some(secs) = cli.timeout {
        config.dns.timeout_secs = secs;
    }
    debug!(?config, "configuration loaded");

    let resolver = HickoryResolver::from_settings(&config.dns).context("failed to set up DNS resolver")?;
    let checker = AuthChecker::new(resolver);

    match &cli.command {
        Commands::Spf { domain } => {
            let domain = validate_domain(domain)?;
            let report = checker.check_spf(&domain).await;
            emit(report, cli.json, render_spf)
        }
        Commands::Dmarc { domain } => {
            let domain = validate_domain(domain)?;
            let report = checker.check_dmarc(&domain).await;
            emit(report, cli.json, render_dmarc)
        }
        Commands::Dkim { domain, selector } => {
            let domain = validate_domain(domain)?;
            let selector = validate_selector(selector)?;
            let report = checker.check_dkim(&domain, &selector).await;
            emit(report, cli.json, render_dkim)
        }
        Commands::All { domain, selector } => {
            let domain = validate_domain(domain)?;
            let selector = selector.as_deref().map(validate_selector).transpose()?;
            let report = checker.check_all(&domain, selector.as_deref()).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_all(&report));
            }
            Ok(if report.has_dns_failure() {
                ExitCode::from(EXIT_DNS_FAILURE)
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: serde::Serialize>(
    result: Result<T, CheckError>,
    json: bool,
    render: fn(&T) -> String,
) -> Result<ExitCode> {
    match result {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render(&report));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("DNS failure, the record could not be checked: {}", e);
            Ok(ExitCode::from(EXIT_DNS_FAILURE))
        }
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn push_issues(out: &mut String, issues: &[Issue]) {
    for issue in issues {
        out.push_str(&format!("  [{:?}] {}\n", issue.severity, issue.message));
    }
}

fn render_spf(report: &SpfReport) -> String {
    let mut out = format!("SPF {}: {}\n", report.domain, report.status);
    if let Some(record) = &report.record {
        out.push_str(&format!("  record: {}\n", record));
        out.push_str(&format!("  DNS lookups: {}\n", report.dns_lookup_count));
    }
    push_issues(&mut out, &report.issues);
    out
}

fn render_dmarc(report: &DmarcReport) -> String {
    let mut out = format!("DMARC {}: {}\n", report.domain, report.status);
    if let Some(record) = &report.raw_record {
        out.push_str(&format!("  record: {}\n", record));
    }
    for field in &report.fields {
        out.push_str(&format!("  {} ({}={}): {}\n", field.name, field.tag, field.value, field.description));
    }
    push_issues(&mut out, &report.issues);
    out
}

fn render_dkim(report: &DkimReport) -> String {
    let mut out = format!("DKIM {}: {}\n", report.hostname, report.status);
    if let Some(target) = &report.cname_target {
        out.push_str(&format!("  CNAME: {}\n", target));
    }
    if let Some(record) = &report.record {
        out.push_str(&format!("  record: {}\n", record));
    }
    push_issues(&mut out, &report.issues);
    out
}

fn render_outcome<T>(outcome: &CheckOutcome<T>, label: &str, render: fn(&T) -> String) -> String {
    match outcome {
        CheckOutcome::Completed(report) => render(report),
        CheckOutcome::DnsFailure { message } => format!("{}: DNS failure, not checked: {}\n", label, message),
    }
}

fn render_all(report: &DomainReport) -> String {
    let mut out = render_outcome(&report.spf, "SPF", render_spf);
    out.push_str(&render_outcome(&report.dmarc, "DMARC", render_dmarc));
    if let Some(dkim) = &report.dkim {
        out.push_str(&render_outcome(dkim, "DKIM", render_dkim));
    }
    out
}
