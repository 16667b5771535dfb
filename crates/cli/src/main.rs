use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;

use swag_common::{
    build_word_level_tokenizer, SwagBatcher, SwagExample, SwagModelConfig, SwagReader,
};
use swag_core::SwagModel;

#[derive(Parser, Debug)]
#[command(name = "swag", about = "Unified CLI for the SWAG multiple-choice ranker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a word-level tokenizer.json from a SWAG CSV.
    BuildTokenizer(BuildTokenizerArgs),
    /// Score a SWAG CSV and write per-example ending probabilities.
    Predict(PredictArgs),
    /// Report accuracy and mean loss over a labelled SWAG CSV.
    Evaluate(EvaluateArgs),
}

// ── Build-tokenizer ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct BuildTokenizerArgs {
    #[arg(long)]
    data: PathBuf,
    #[arg(long, default_value = "tokenizer.json")]
    output: PathBuf,
    #[arg(long, default_value = "10000")]
    vocab_size: usize,
}

// ── Predict / Evaluate ─────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct PredictArgs {
    #[arg(long)]
    data: PathBuf,
    #[arg(long, default_value = "tokenizer.json")]
    tokenizer: PathBuf,
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Safetensors weights to load; without it the freshly initialised
    /// weights are used (useful for smoke tests only).
    #[arg(long)]
    checkpoint: Option<PathBuf>,
    #[arg(long, default_value = "32")]
    batch_size: usize,
    /// Truncate every text field to this many tokens.
    #[arg(long)]
    max_len: Option<usize>,
    /// Re-read the CSV on demand instead of materialising it.
    #[arg(long)]
    lazy: bool,
    /// Output CSV; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct EvaluateArgs {
    #[arg(long)]
    data: PathBuf,
    #[arg(long, default_value = "tokenizer.json")]
    tokenizer: PathBuf,
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    #[arg(long)]
    checkpoint: Option<PathBuf>,
    #[arg(long, default_value = "32")]
    batch_size: usize,
    #[arg(long)]
    max_len: Option<usize>,
    #[arg(long)]
    lazy: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::BuildTokenizer(args) => cmd_build_tokenizer(args),
        Command::Predict(args) => cmd_predict(args),
        Command::Evaluate(args) => cmd_evaluate(args),
    }
}

// ── Command implementations ────────────────────────────────────────────────────

fn cmd_build_tokenizer(args: BuildTokenizerArgs) -> Result<()> {
    let examples = SwagReader::new(false).read(&args.data)?;
    let examples: Vec<SwagExample> = examples.iter()?.collect::<Result<_>>()?;
    let tokenizer = build_word_level_tokenizer(&examples, args.vocab_size, &args.output)?;
    eprintln!(
        "Wrote tokenizer with {} entries to {}",
        tokenizer.get_vocab_size(true),
        args.output.display()
    );
    Ok(())
}

fn cmd_predict(args: PredictArgs) -> Result<()> {
    let device = Device::cuda_if_available(0)?;
    let batcher = SwagBatcher::from_file(&args.tokenizer, args.max_len, device.clone())?;
    let config = load_or_default_config(&args.config, batcher.vocab_size())?;
    let model = load_model(&config, &device, args.checkpoint.as_deref())?;

    let examples = SwagReader::new(args.lazy).read(&args.data)?;

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(["prediction", "prob0", "prob1", "prob2", "prob3"])?;

    let mut buffer: Vec<SwagExample> = Vec::with_capacity(args.batch_size);
    let mut total = 0usize;
    for example in examples.iter()? {
        // Prediction ignores any gold labels present in the file.
        let example = SwagExample {
            label: None,
            ..example?
        };
        buffer.push(example);
        if buffer.len() == args.batch_size {
            total += write_predictions(&model, &batcher, &buffer, &mut writer)?;
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        total += write_predictions(&model, &batcher, &buffer, &mut writer)?;
    }
    writer.flush()?;
    eprintln!("Scored {total} examples");
    Ok(())
}

fn write_predictions(
    model: &SwagModel,
    batcher: &SwagBatcher,
    examples: &[SwagExample],
    writer: &mut csv::Writer<Box<dyn Write>>,
) -> Result<usize> {
    let batch = batcher.batch(examples)?;
    let output = model.forward(&batch)?;
    let rows: Vec<Vec<f32>> = output.probabilities.to_vec2()?;
    for row in &rows {
        let best = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        writer.write_record([
            best.to_string(),
            format!("{:.6}", row[0]),
            format!("{:.6}", row[1]),
            format!("{:.6}", row[2]),
            format!("{:.6}", row[3]),
        ])?;
    }
    Ok(rows.len())
}

fn cmd_evaluate(args: EvaluateArgs) -> Result<()> {
    let device = Device::cuda_if_available(0)?;
    let batcher = SwagBatcher::from_file(&args.tokenizer, args.max_len, device.clone())?;
    let config = load_or_default_config(&args.config, batcher.vocab_size())?;
    let model = load_model(&config, &device, args.checkpoint.as_deref())?;

    let examples = SwagReader::new(args.lazy).read(&args.data)?;
    let progress = match examples.len_hint() {
        Some(n) => ProgressBar::new(n as u64),
        None => ProgressBar::new_spinner(),
    };

    let mut loss_sum = 0.0f64;
    let mut num_batches = 0usize;
    let mut total = 0usize;
    let mut buffer: Vec<SwagExample> = Vec::with_capacity(args.batch_size);

    let mut run = |buffer: &[SwagExample],
                   loss_sum: &mut f64,
                   num_batches: &mut usize|
     -> Result<()> {
        let batch = batcher.batch(buffer)?;
        let output = model.forward(&batch)?;
        match output.loss {
            Some(loss) => *loss_sum += loss.to_scalar::<f32>()? as f64,
            None => bail!("evaluation data has no labels"),
        }
        *num_batches += 1;
        Ok(())
    };

    for example in examples.iter()? {
        buffer.push(example?);
        if buffer.len() == args.batch_size {
            run(&buffer, &mut loss_sum, &mut num_batches)?;
            total += buffer.len();
            progress.inc(buffer.len() as u64);
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        run(&buffer, &mut loss_sum, &mut num_batches)?;
        total += buffer.len();
        progress.inc(buffer.len() as u64);
    }
    progress.finish_and_clear();

    if num_batches == 0 {
        bail!("no examples to evaluate in {}", args.data.display());
    }

    let metrics = model.get_metrics(false);
    println!(
        "accuracy {:.4}  mean_loss {:.4}  ({total} examples)",
        metrics.accuracy,
        loss_sum / num_batches as f64
    );
    Ok(())
}

// ── Shared setup ───────────────────────────────────────────────────────────────

fn load_or_default_config(path: &Path, vocab_size: usize) -> Result<SwagModelConfig> {
    if path.exists() {
        SwagModelConfig::load(path)
    } else {
        let config = SwagModelConfig::default_for_vocab(vocab_size);
        config.save(path)?;
        eprintln!("Created default config at {}", path.display());
        Ok(config)
    }
}

fn load_model(
    config: &SwagModelConfig,
    device: &Device,
    checkpoint: Option<&Path>,
) -> Result<SwagModel> {
    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = SwagModel::new(config, vb)?;
    match checkpoint {
        Some(path) => {
            varmap.load(path)?;
            eprintln!("Loaded checkpoint {}", path.display());
        }
        None => eprintln!("No checkpoint given; using freshly initialised weights"),
    }
    Ok(model)
}
