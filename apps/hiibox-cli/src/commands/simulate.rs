use hiibox_engine::{DrawSource, EngineError, SeededSource, ThreadRngSource};
use std::path::PathBuf;

use crate::commands::load_engine;
use crate::error::CliResult;

pub async fn execute(
    config: PathBuf,
    draws: u64,
    seed: Option<u64>,
    tier: Option<String>,
) -> CliResult<()> {
    let (_, engine) = load_engine(&config).await?;
    let mut table = engine.reward_table().await?;
    if let Some(tier) = tier.as_deref() {
        table = table.for_tier(tier).map_err(EngineError::from)?;
    }

    let source: Box<dyn DrawSource> = match seed {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(ThreadRngSource),
    };

    println!("Simulating {} draws...", draws);
    let results = table.simulate(draws, source.as_ref());

    println!(
        "  {:<32} {:>10} {:>10} {:>10}",
        "reward", "draws", "expected", "observed"
    );
    for result in &results {
        println!(
            "  {:<32} {:>10} {:>9.4}% {:>9.4}%",
            result.name,
            result.draws,
            result.expected * 100.0,
            result.observed * 100.0
        );
    }

    let worst = results
        .iter()
        .map(|result| (result.observed - result.expected).abs())
        .fold(0.0_f64, f64::max);
    println!("Largest deviation: {:.4} percentage points", worst * 100.0);
    Ok(())
}
