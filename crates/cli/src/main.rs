use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use kinship_core::data::{IdMapping, LoadOptions};
use kinship_core::genetics::{CoefficientEngine, EngineConfig, ParentCodes, Pedigree};
use kinship_core::{Coefficient, InbreedingReport};

#[derive(Parser)]
#[command(name = "kinship")]
#[command(version)]
#[command(about = "Inbreeding and coancestry coefficients from sire/dam pedigrees")]
struct Cli {
    /// Log debug messages (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PedigreeArgs {
    /// Path to pedigree CSV (columns: animal, sire, dam)
    #[arg(short, long)]
    pedigree: String,

    /// Path to ID mapping CSV (columns: internal_id, standard_id),
    /// applied to sire and dam identifiers
    #[arg(long)]
    id_map: Option<String>,

    /// Extra token meaning "no recorded parent" (repeatable)
    #[arg(long)]
    unknown: Vec<String>,

    /// Recursion depth past which a branch counts as 0
    #[arg(long, default_value = "50")]
    max_depth: usize,

    /// Evaluation frame budget per query
    #[arg(long, default_value = "4096")]
    max_frames: usize,

    /// Evaluation step budget per query
    #[arg(long, default_value = "50000000")]
    max_steps: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the inbreeding coefficient of every animal in the pedigree
    Inbreeding {
        #[command(flatten)]
        input: PedigreeArgs,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Compute the coancestry coefficient between two animals
    Coancestry {
        #[command(flatten)]
        input: PedigreeArgs,

        /// First animal ID
        first: String,

        /// Second animal ID
        second: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Inbreeding {
            input,
            format,
            output,
        } => cmd_inbreeding(&input, &format, output.as_deref()),
        Commands::Coancestry {
            input,
            first,
            second,
        } => cmd_coancestry(&input, &first, &second),
    }
}

fn load_pedigree(input: &PedigreeArgs) -> Result<Pedigree> {
    let mut options = LoadOptions::new();

    if let Some(ref map_path) = input.id_map {
        let mapping = IdMapping::from_csv(map_path)
            .with_context(|| format!("Failed to load ID mapping from '{}'", map_path))?;
        eprintln!("Loaded {} ID mappings from '{}'", mapping.len(), map_path);
        options = options.id_mapping(mapping);
    }

    let codes = input
        .unknown
        .iter()
        .fold(ParentCodes::new(), |codes, code| codes.with_code(code));
    options = options.parent_codes(codes);

    let ped = Pedigree::from_csv_with(&input.pedigree, &options)
        .with_context(|| format!("Failed to load pedigree from '{}'", input.pedigree))?;

    if ped.is_empty() {
        anyhow::bail!("Pedigree '{}' contains no animals", input.pedigree);
    }

    eprintln!(
        "Loaded pedigree with {} animals from '{}'",
        ped.n_animals(),
        input.pedigree
    );
    let dangling = ped.dangling_parents().len();
    if dangling > 0 {
        eprintln!(
            "{} parent IDs are not in the pedigree and are treated as unknown",
            dangling
        );
    }

    Ok(ped)
}

fn engine_config(input: &PedigreeArgs) -> EngineConfig {
    EngineConfig::new()
        .max_depth(input.max_depth)
        .max_frames(input.max_frames)
        .max_steps(input.max_steps)
}

fn cmd_inbreeding(input: &PedigreeArgs, format: &str, output: Option<&str>) -> Result<()> {
    let ped = load_pedigree(input)?;
    let mut engine = CoefficientEngine::new(&ped)
        .with_config(engine_config(input))
        .context("Invalid engine limits")?;

    let report = engine.inbreeding_all();
    eprintln!(
        "Computed {} coefficients, {} failed ({} cached pairs)",
        report.computed(),
        report.failed(),
        engine.cached_pairs()
    );

    let rendered = match format.to_lowercase().as_str() {
        "json" => render_json(&report)?,
        "text" => report.summary(),
        other => {
            anyhow::bail!("Unknown format '{}'. Use 'text' (default) or 'json'.", other);
        }
    };

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(rendered.as_bytes())
                .with_context(|| format!("Failed to write '{}'", path))?;
            writer.flush()?;
            eprintln!("Results written to '{}'", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn render_json(report: &InbreedingReport) -> Result<String> {
    let animals: Vec<serde_json::Value> = report
        .iter()
        .map(|(id, coefficient)| match coefficient {
            Coefficient::Value(f) => serde_json::json!({
                "id": id,
                "inbreeding": f,
            }),
            Coefficient::Unavailable { reason } => serde_json::json!({
                "id": id,
                "inbreeding": serde_json::Value::Null,
                "error": reason,
            }),
        })
        .collect();

    let mut map = serde_json::Map::new();
    map.insert("n_animals".to_string(), serde_json::json!(report.len()));
    map.insert("computed".to_string(), serde_json::json!(report.computed()));
    map.insert("failed".to_string(), serde_json::json!(report.failed()));
    map.insert("n_inbred".to_string(), serde_json::json!(report.n_inbred()));
    map.insert(
        "mean_inbreeding".to_string(),
        serde_json::json!(report.mean_inbreeding()),
    );
    map.insert("animals".to_string(), serde_json::json!(animals));

    let mut json_str = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
    json_str.push('\n');
    Ok(json_str)
}

fn cmd_coancestry(input: &PedigreeArgs, first: &str, second: &str) -> Result<()> {
    let ped = load_pedigree(input)?;
    let mut engine = CoefficientEngine::new(&ped)
        .with_config(engine_config(input))
        .context("Invalid engine limits")?;

    for id in [first, second] {
        if !ped.contains(id) {
            log::warn!("Animal '{}' is not in the pedigree; coancestry is 0", id);
        }
    }

    let f = engine
        .coancestry_of(first, second)
        .with_context(|| format!("Failed to compute coancestry of '{}' and '{}'", first, second))?;

    println!("Coancestry f({}, {}) = {:.6}", first, second, f);
    println!("Relationship a({}, {}) = {:.6}", first, second, 2.0 * f);

    Ok(())
}
