use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use storefront::{
    scenario::ScenarioLoader,
    snapshot::HistoryWriter,
    PaymentMode,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Small business lifecycle simulation")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/dmotopia.yaml")]
    scenario: PathBuf,

    /// Override cycle count (uses scenario default when omitted)
    #[arg(long)]
    cycles: Option<u64>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// How fulfilled need is credited: price_reapplied or quantity_times_price
    #[arg(long)]
    payment_mode: Option<PaymentMode>,

    /// Directory for the exported history
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log every cycle summary
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut builder = scenario.builder();
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if let Some(mode) = cli.payment_mode {
        builder = builder.payment_mode(mode);
    }
    let mut city = builder.build()?;
    let cycles = scenario.cycles(cli.cycles);

    city.run(cycles)?;

    if let Some(dir) = cli.output {
        let path = HistoryWriter::new(dir).write(&city.export_history())?;
        tracing::info!(path = %path.display(), "history written");
    }

    let mean_lifespan = city
        .world()
        .mean_lifespan()
        .map(|m| format!("{m:.1}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "City '{}' ran {} cycles ({} mode). Active businesses: {}, failed: {}, mean lifespan: {}",
        city.name(),
        city.age(),
        city.payment_mode(),
        city.businesses().count(),
        city.failed_businesses().len(),
        mean_lifespan
    );
    Ok(())
}
