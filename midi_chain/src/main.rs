// MIDI Markov generator: CLI entry point.
//
// Finds MIDI files under a directory, trains the selected Markov model on
// them and writes a newly sampled melody to a MIDI file.
// The pipeline: discovery → extraction → training → generation → MIDI output.
//
// Usage:
//   cargo run -p midi_chain -- [-d DIR] [-o output.mid] [-c config.json]
//     [-n LENGTH] [--seed N] [--model sparse|dense] [--low N] [--high N]
//     [--fallback reseed|uniform|fail] [--max-files N]
//
// Set RUST_LOG=debug for per-step diagnostics.

use clap::Parser;
use midi_chain::config::GeneratorConfig;
use midi_chain::discover::{find_midi_files, limit_inputs};
use midi_chain::generator::{FallbackPolicy, Generator};
use midi_chain::markov::{ModelKind, TransitionModel, TransitionStats};
use midi_chain::midi::{read_corpus, write_midi};
use midi_chain::range::PitchRange;
use midi_chain::Result;
use midi_chain_prng::ChainRng;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "generate",
    version,
    about = "Train a Markov chain on MIDI files and generate a new melody"
)]
struct Cli {
    /// Directory to load MIDI files from. Searched recursively.
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// JSON config file; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output .mid path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of notes to generate.
    #[arg(short = 'n', long)]
    length: Option<usize>,

    /// PRNG seed (same seed and inputs => same output).
    #[arg(long)]
    seed: Option<u64>,

    /// Transition model: sparse (order 2 with backoff) or dense (order 1).
    #[arg(long)]
    model: Option<ModelKind>,

    /// Lowest pitch of the model range (inclusive).
    #[arg(long)]
    low: Option<u8>,

    /// Highest pitch of the model range (exclusive).
    #[arg(long)]
    high: Option<u8>,

    /// What to do when the model has no data for the current context.
    #[arg(long)]
    fallback: Option<FallbackPolicy>,

    /// Read at most this many files.
    #[arg(long)]
    max_files: Option<usize>,
}

impl Cli {
    /// Load the base config and apply flag overrides.
    fn resolve(&self) -> Result<GeneratorConfig> {
        let mut config = match (&self.config, self.model) {
            (Some(path), _) => GeneratorConfig::load(path)?,
            (None, Some(ModelKind::DenseMarkov)) => GeneratorConfig::dense_preset(),
            (None, _) => GeneratorConfig::default(),
        };
        if let Some(model) = self.model {
            config.model = model;
        }
        if self.low.is_some() || self.high.is_some() {
            if config.model == ModelKind::SparseMarkov {
                log::warn!("--low/--high only apply to the dense model; ignored for sparse");
            }
            config.range = PitchRange::new(
                self.low.unwrap_or(config.range.low()),
                self.high.unwrap_or(config.range.high()),
            )?;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(length) = self.length {
            config.length = length;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(fallback) = self.fallback {
            config.fallback = fallback;
        }
        if let Some(max_files) = self.max_files {
            config.max_files = max_files;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Model name, plus the pitch range for the model that uses one.
fn model_summary(config: &GeneratorConfig) -> String {
    match config.model {
        ModelKind::DenseMarkov => format!(
            "{} (range {}..{})",
            config.model,
            config.range.low(),
            config.range.high()
        ),
        ModelKind::SparseMarkov => config.model.to_string(),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve()?;

    println!("=== MIDI Markov Generator ===");
    println!("Input: {}", cli.directory.display());
    println!("Output: {}", config.output.display());
    println!("Model: {}", model_summary(&config));
    println!("Length: {} notes", config.length);
    println!();

    println!("[1/4] Finding MIDI files...");
    let files = find_midi_files(&cli.directory, std::slice::from_ref(&config.output))?;
    if files.is_empty() {
        // Nothing to do is not a failure.
        println!("Error: Must input midi files.");
        return Ok(());
    }
    let files = limit_inputs(files, config.max_files);
    for file in &files {
        println!("\t{}", file.display());
    }

    println!("[2/4] Reading notes...");
    let corpus = read_corpus(&files, &config.extract);
    println!(
        "  {} notes from {} files.",
        corpus.event_count(),
        corpus.len()
    );

    println!("[3/4] Training {} model...", config.model);
    let mut model = TransitionModel::new(config.model, config.range);
    model.train(&corpus)?;
    println!("  {} transitions learned.", model.transition_count());

    let rng = match config.seed {
        Some(seed) => ChainRng::new(seed),
        None => {
            let (rng, seed) = ChainRng::from_clock();
            log::info!("no seed given, using {seed}");
            rng
        }
    };
    println!("[4/4] Generating {} notes...", config.length);
    let mut generator = Generator::new(&model, rng)
        .with_note_policy(config.notes)
        .with_fallback(config.fallback);
    let notes = generator.predict(config.length)?;
    if generator.reseeds() > 0 {
        println!("  Reseeded {} times (undertrained contexts).", generator.reseeds());
    }

    write_midi(&notes, &config.output, &config.writer)?;
    println!("  Wrote {} notes to {}.", notes.len(), config.output.display());

    if notes.is_empty() {
        log::warn!("length is 0, the output file has no notes");
    }
    Ok(())
}
