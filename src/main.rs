mod auth;
mod cli;
mod data;
mod environment;
mod error;
mod history;
mod http;
mod scenarios;
mod schema;
mod testing;

use std::fmt::Write as _;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputFormat, RunArgs, Suite};
use data::{BookingDataBuilder, BookingId, BookingSource};
use environment::SuiteConfig;
use history::RunHistory;
use http::BookerClient;
use scenarios::{LifecycleContext, SchemaCheckContext, lifecycle, schema_checks};
use schema::SchemaStore;
use testing::{RunReport, Scenario};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "booker_e2e=info",
            1 => "booker_e2e=debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether the command succeeded.
async fn execute(command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Run(args) => run(args, |key| std::env::var(key).ok()).await,
        Command::Plan { suite } => {
            print_plan(suite)?;
            Ok(true)
        }
        Command::Generate { seed, partial } => {
            let mut builder = match seed {
                Some(seed) => BookingDataBuilder::seeded(seed),
                None => BookingDataBuilder::from_entropy(),
            };
            let json = if partial {
                serde_json::to_string_pretty(&builder.generate_partial_booking())?
            } else {
                serde_json::to_string_pretty(&builder.generate_booking())?
            };
            println!("{json}");
            Ok(true)
        }
        Command::History { db, limit, show } => {
            let history = RunHistory::open(&db)
                .with_context(|| format!("opening history database `{}`", db.display()))?;
            print!("{}", render_history(&history, limit, show)?);
            Ok(true)
        }
    }
}

/// The recent-runs listing, or the stored JSON report of run `show`.
fn render_history(history: &RunHistory, limit: usize, show: Option<i64>) -> anyhow::Result<String> {
    if let Some(id) = show {
        let json = history
            .report_json(id)?
            .with_context(|| format!("no run #{id} in history"))?;
        return Ok(format!("{json}\n"));
    }

    let mut out = String::new();
    for entry in history.recent(limit)? {
        let _ = writeln!(
            out,
            "#{:<5} {}  {} steps: {} passed, {} failed, {} skipped ({} ms)",
            entry.id,
            entry.started_at.format("%Y-%m-%d %H:%M:%S"),
            entry.total,
            entry.passed,
            entry.failed,
            entry.skipped,
            entry.duration_ms
        );
    }
    Ok(out)
}

/// Config file, then environment (through `env`), then command-line flags.
fn resolve_config(args: &RunArgs, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<SuiteConfig> {
    let mut config = SuiteConfig::load(args.config.as_deref())?;
    config.apply_env_overrides(env);

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

fn data_source(seed: Option<u64>) -> Box<dyn BookingSource> {
    match seed {
        Some(seed) => Box::new(BookingDataBuilder::seeded(seed)),
        None => Box::new(BookingDataBuilder::from_entropy()),
    }
}

async fn run(args: RunArgs, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<bool> {
    let config = resolve_config(&args, env)?;
    let client = BookerClient::new(&config.base_url, config.request_timeout())?;
    tracing::info!(base_url = %client.base_url(), suite = ?args.suite, "starting run");

    // Plans and schemas are checked before the first request goes out.
    let lifecycle_scenario = lifecycle::scenario().with_step_timeout(config.step_timeout());
    let schema_scenario = schema_checks::scenario().with_step_timeout(config.step_timeout());
    lifecycle_scenario.execution_order()?;
    schema_scenario.execution_order()?;

    let schemas = if args.suite.includes_schema() {
        Some(Arc::new(SchemaStore::load(&config.schema_paths()?)?))
    } else {
        None
    };

    let started_at = Utc::now();
    let start = Instant::now();

    let mut lifecycle_ctx = args.suite.includes_lifecycle().then(|| {
        LifecycleContext::new(
            client.clone(),
            config.credentials.clone(),
            data_source(config.seed),
        )
    });
    let mut schema_ctx = schemas.map(|schemas| {
        SchemaCheckContext::new(
            client.clone(),
            config.credentials.clone(),
            data_source(config.seed.map(|seed| seed.wrapping_add(1))),
            schemas,
            BookingId(config.unknown_booking_id),
        )
    });

    let (lifecycle_report, schema_report) = tokio::join!(
        async {
            match lifecycle_ctx.as_mut() {
                Some(ctx) => lifecycle_scenario.run(ctx).await.map(Some),
                None => Ok(None),
            }
        },
        async {
            match schema_ctx.as_mut() {
                Some(ctx) => schema_scenario.run(ctx).await.map(Some),
                None => Ok(None),
            }
        },
    );

    let report = RunReport {
        started_at,
        duration_ms: start.elapsed().as_millis() as u64,
        scenarios: [lifecycle_report?, schema_report?].into_iter().flatten().collect(),
    };

    match args.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if let Some(path) = &args.report {
        fs::write(path, report.to_json()?)
            .with_context(|| format!("writing report to `{}`", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    if let Some(path) = &args.history {
        let history = RunHistory::open(path)
            .with_context(|| format!("opening history database `{}`", path.display()))?;
        history.record(&report)?;
    }

    if !report.is_success() {
        tracing::warn!(failed = report.failed(), "run finished with failures");
    }
    Ok(report.is_success())
}

fn print_plan(suite: Suite) -> anyhow::Result<()> {
    if suite.includes_lifecycle() {
        print_scenario_plan(&lifecycle::scenario())?;
    }
    if suite.includes_schema() {
        print_scenario_plan(&schema_checks::scenario())?;
    }
    Ok(())
}

fn print_scenario_plan<C: Send>(scenario: &Scenario<C>) -> anyhow::Result<()> {
    println!("{}", scenario.name());
    for (position, index) in scenario.execution_order()?.into_iter().enumerate() {
        let step = &scenario.steps()[index];
        if step.depends_on.is_empty() {
            println!("  {}. {} ({:?})", position + 1, step.id, step.severity);
        } else {
            println!(
                "  {}. {} ({:?}) after {}",
                position + 1,
                step.id,
                step.severity,
                step.depends_on.join(", ")
            );
        }
    }
    Ok(())
}
