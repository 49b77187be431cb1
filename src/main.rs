// src/main.rs
use std::env;
use std::io;

use anyhow::{Context, bail};
use dotenvy::dotenv;
use repayment_engine::{Strategy, backend, config::Settings, report};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // logs go to stderr so `schedule` output stays clean CSV
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("server") => backend::run_server(settings).await,
        Some("schedule") => print_schedule(&settings, &args[2..]),
        Some(other) => bail!("Unknown command '{other}'. Usage: repayment-server [server | schedule <strategy> <budget> [months]]"),
    }
}

/// Writes the configured ledger's schedule as CSV to stdout.
fn print_schedule(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let [strategy, budget, rest @ ..] = args else {
        bail!("Usage: repayment-server schedule <strategy> <budget> [months]");
    };
    let strategy: Strategy = strategy.parse()?;
    let budget: Decimal = budget
        .parse()
        .with_context(|| format!("Invalid budget '{budget}'"))?;
    let max_months = match rest.first() {
        Some(months) => months
            .parse()
            .with_context(|| format!("Invalid month count '{months}'"))?,
        None => settings.default_max_months,
    };

    let ledger = settings.ledger()?;
    let plan = report::generate_plan(&ledger, strategy, budget, max_months)?;
    plan.write_csv(io::stdout().lock())?;

    if !plan.payoff_reached {
        eprintln!("Debts are not paid off within {max_months} months.");
    }
    Ok(())
}
