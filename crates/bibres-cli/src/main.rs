use std::io::Read;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use bibres_core::{IdentifierKind, ResolveOptions, ResolverConfig};
use bibres_resolve::{BibliographyResolver, extract_identifiers_from_url, validate_identifier};

mod telemetry;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bibres",
    about = "Resolve an ordered list of reference URLs into numbered CSL-JSON citations",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit log lines as JSON on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a bibliography read from FILE (or stdin).
    Resolve {
        /// One URL per line; blank lines and `#` comments are skipped.
        file: Option<String>,
        /// Input is a JSON array of URL strings.
        #[arg(long)]
        json_input: bool,
        #[arg(long)]
        no_validate: bool,
        #[arg(long)]
        scrape: bool,
        #[arg(long)]
        pdf: bool,
        #[arg(long)]
        topic_validation: bool,
        #[arg(long)]
        dedupe: bool,
        /// References resolved at the same time.
        #[arg(long)]
        concurrency: Option<usize>,
        /// Per-call timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Enable a built-in validator (repeatable).
        #[arg(long = "validator", action = clap::ArgAction::Append)]
        validators: Vec<String>,
    },

    /// Show identifiers found in a single URL.
    Extract { url: String },

    /// Check the syntax of one identifier.
    Validate {
        /// doi, pmid or pmcid.
        kind: String,
        value: String,
    },

    /// Print the effective configuration.
    Config,
}

struct ResolveArgs {
    file: Option<String>,
    json_input: bool,
    options: ResolveOptions,
    concurrency: Option<usize>,
    timeout: Option<u64>,
    validators: Vec<String>,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json, telemetry::level_for(cli.verbose));

    let config = ResolverConfig::load()
        .with_context(|| format!("loading {}", ResolverConfig::config_path().display()))?;
    debug!(path = %ResolverConfig::config_path().display(), "config loaded");

    match cli.command {
        Commands::Resolve {
            file,
            json_input,
            no_validate,
            scrape,
            pdf,
            topic_validation,
            dedupe,
            concurrency,
            timeout,
            validators,
        } => {
            // Flags only switch features on; the config file sets the baseline.
            let base = config.options;
            let options = ResolveOptions {
                validate: base.validate && !no_validate,
                scrape: base.scrape || scrape,
                pdf: base.pdf || pdf,
                topic_validation: base.topic_validation || topic_validation,
                dedupe: base.dedupe || dedupe,
            };
            let args = ResolveArgs {
                file,
                json_input,
                options,
                concurrency,
                timeout,
                validators,
            };
            cmd_resolve(config, args).await?;
        }

        Commands::Extract { url } => {
            let candidates = extract_identifiers_from_url(&url);
            print_json(&serde_json::to_value(&candidates)?)?;
        }

        Commands::Validate { kind, value } => {
            let Some(kind) = IdentifierKind::from_str_loose(&kind) else {
                eprintln!("Unknown identifier kind: {kind} (expected doi, pmid or pmcid)");
                std::process::exit(2);
            };
            let check = validate_identifier(kind, &value);
            print_json(&serde_json::to_value(&check)?)?;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "done");
    Ok(())
}

// ─── Commands ───────────────────────────────────────────────────────────────

async fn cmd_resolve(mut config: ResolverConfig, args: ResolveArgs) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        config.pipeline.concurrency = concurrency.max(1);
    }
    if let Some(timeout) = args.timeout {
        config.pipeline.call_timeout_secs = timeout.max(1);
    }
    for name in args.validators {
        if !config.validators.enabled.contains(&name) {
            config.validators.enabled.push(name);
        }
    }

    let input = read_input(args.file.as_deref())?;
    let urls = if args.json_input {
        let value: serde_json::Value =
            serde_json::from_str(&input).context("input is not valid JSON")?;
        bibres_resolve::pipeline::urls_from_json(&value)?
    } else {
        parse_url_lines(&input)
    };
    info!(count = urls.len(), "references read");

    let resolver = BibliographyResolver::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, writing partial result.");
            on_interrupt.cancel();
        }
    });

    let result = resolver
        .resolve_with_cancel(&urls, &args.options, cancel)
        .await;
    print_json(&serde_json::to_value(&result)?)?;
    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) if path != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

/// One URL per line. Order and duplicates are preserved.
fn parse_url_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}
