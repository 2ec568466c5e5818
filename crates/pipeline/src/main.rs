use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use bank::ExcerptBank;
use capability::{Engine, OllamaBackend, Registry, register_builtins, registry};
use compose::run_composition;
use extraction::{Source, run_extraction};
use ingest::{ReaderOptions, load_records};
use sampling::sample_random_combinations;
use validate::run_validation;

const EXTRACTION_CAPABILITIES: &[&str] = &["alerts", "recommendations"];
const BATCH_SIZE: usize = 25;
const MATCH_THRESHOLD: f64 = 0.5;
const N_SAMPLES: usize = 50;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(input) = args.get(1) else {
        eprintln!("usage: pipeline <input-file> [out-dir]");
        std::process::exit(2);
    };
    let out_dir = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("runs"));

    // Startup-time capability registration; any collision fails loudly here.
    let mut reg = Registry::new();
    register_builtins(&mut reg)?;
    let reg = Arc::new(reg);
    registry::install(reg.clone())?;

    let engine = Engine::new(reg, OllamaBackend::default());

    println!("=== Synthetic Text Pipeline ===\n");

    // Stage 1: extract labeled spans from the source texts
    let records = load_records(Path::new(input), &ReaderOptions::default()).await?;
    println!("Loaded {} text records from {input}", records.len());

    let extraction = run_extraction(
        &engine,
        &records,
        EXTRACTION_CAPABILITIES,
        None,
        BATCH_SIZE,
        Source::Organic,
    )
    .await?;
    extraction.save(out_dir.join("extraction.json"))?;
    println!("Extraction batch {} saved", extraction.batch_id);

    // Stage 2: build the bank and sample excerpt combinations
    let excerpt_bank = ExcerptBank::from_batch(&extraction);
    excerpt_bank.save(out_dir.join("bank.json"))?;
    println!("Excerpt bank: {} labels", excerpt_bank.available_labels().len());
    for (label, count) in excerpt_bank.counts_by_label() {
        println!("  {label}: {count} excerpts");
    }

    let excerpt_sets = sample_random_combinations(&excerpt_bank, N_SAMPLES, 1, 3, 3, true, None);
    println!("Sampled {} excerpt sets", excerpt_sets.len());

    // Stage 3: compose synthetic texts
    let synthetic = run_composition(&engine, excerpt_sets, None, BATCH_SIZE).await?;
    synthetic.save(out_dir.join("synthetic.json"))?;
    println!("Composed {} synthetic texts", synthetic.texts.len());

    // Stage 4: validate by re-extraction
    let validation = run_validation(
        &engine,
        &synthetic,
        EXTRACTION_CAPABILITIES,
        MATCH_THRESHOLD,
        None,
        BATCH_SIZE,
    )
    .await?;
    validation.save(out_dir.join("validation.json"))?;

    let summary = &validation.summary;
    println!("\n=== VALIDATION ===");
    println!("total:     {}", summary.total);
    println!("passed:    {} ({:.1}%)", summary.passed, summary.pass_rate * 100.0);
    println!("precision: {:.3}", summary.mean_precision);
    println!("recall:    {:.3}", summary.mean_recall);
    println!("f1:        {:.3}", summary.mean_f1);
    if !summary.top_missed.is_empty() {
        println!("most missed labels:");
        for missed in &summary.top_missed {
            println!("  {}: {}", missed.label, missed.count);
        }
    }

    println!("\nArtifacts saved to {}", out_dir.display());
    Ok(())
}
