//! CLI tool for Board Sampler (sample-sensors)

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "sample-sensors")]
#[command(about = "Board Sampler: periodic power, thermal and frequency readings on stdout", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.config/board-sampler/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Period used when no sensor declares one, in microseconds
    #[arg(short = 'p', long)]
    default_period_us: Option<i64>,

    /// Run under SCHED_FIFO at this priority
    #[arg(short = 'r', long)]
    realtime_priority: Option<i32>,

    /// Print the discovered sensors and exit
    #[arg(short, long)]
    list: bool,
}

#[cfg(feature = "cli")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use board_sampler::periodic::set_realtime_priority;
    use board_sampler::{probe_all, Config, Sampler, Sensor, SignalHandlers};
    use std::io::Write;

    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(period) = cli.default_period_us {
        config.sampling.default_period_us = period;
    }
    if let Some(priority) = cli.realtime_priority {
        config.sampling.realtime_priority = priority;
    }
    config.validate()?;

    if config.sampling.realtime_priority > 0 {
        if let Err(e) = set_realtime_priority(config.sampling.realtime_priority) {
            log::warn!("realtime priority not applied: {}", e);
        }
    }

    let handlers = SignalHandlers::install()?;
    let sampler = Sampler::new(probe_all(&config), config.sampling.default_period_us);

    if cli.list {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for sensor in sampler.registry().iter() {
            writeln!(out, "{} {}", sensor.name(), sensor.period_us())?;
        }
        writeln!(out, "UPDATE_PERIOD_us {}", sampler.period_us())?;
        sampler.close();
        return Ok(());
    }

    if sampler.registry().is_empty() {
        log::warn!("no sensors found");
    }

    sampler.run(std::io::stdout().lock(), handlers.state())?;
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}
