mod analysis;
mod config;
mod data;
mod report;
mod stats;

use anyhow::Result;
use config::AnalysisConfig;

fn main() -> Result<()> {
    env_logger::init();

    let config = AnalysisConfig::default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report::run(&config, &mut out)
}
