use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use student_predictor::server::{self, AppState};
use student_predictor::{ClassifierKind, Config, NumericFallback, Predictor, Trainer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "student-predictor",
    version,
    about = "Train a pass/fail classifier on student records and serve its predictions."
)]
struct Cli {
    /// TOML file with schema, training and serving settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit encoders and classifier on a CSV dataset and write the bundle
    Train(TrainArgs),
    /// Load a bundle and serve predictions over HTTP
    Serve(ServeArgs),
    /// Predict a single record from the command line
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[arg(long, default_value = "student_performance_prediction.csv")]
    data: PathBuf,

    #[arg(long, default_value = "student_performance_model.msgpack")]
    out: PathBuf,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    classifier: Option<ClassifierKind>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "student_performance_model.msgpack")]
    bundle: PathBuf,

    #[arg(long)]
    addr: Option<SocketAddr>,

    /// How to fill numeric values that cannot be used
    #[arg(long, value_enum)]
    missing_numeric: Option<NumericFallback>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long, default_value = "student_performance_model.msgpack")]
    bundle: PathBuf,

    /// Field as `Column=value`, repeated once per column
    #[arg(long = "set", value_name = "COLUMN=VALUE")]
    fields: Vec<String>,

    #[arg(long, value_enum)]
    missing_numeric: Option<NumericFallback>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Train(args) => run_train(config, args),
        Commands::Serve(args) => run_serve(config, args),
        Commands::Predict(args) => run_predict(config, args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("student_predictor=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_train(config: Config, args: TrainArgs) -> Result<()> {
    let mut training = config.training;
    if let Some(seed) = args.seed {
        training.seed = seed;
    }
    if let Some(kind) = args.classifier {
        training.classifier = kind;
    }

    let trainer = Trainer::new(config.schema, training)?;
    let (bundle, report) = trainer
        .train_from_csv(&args.data)
        .with_context(|| format!("Training on {:?} failed", args.data))?;
    bundle
        .save_to_file(&args.out)
        .with_context(|| format!("Could not write bundle to {:?}", args.out))?;

    println!(
        "🧠 Trained on {} rows ({} held out, {} dropped for missing labels)",
        report.train_rows, report.test_rows, report.dropped_rows
    );
    if let Some(accuracy) = report.accuracy {
        println!("✅ Accuracy: {:.2}%", accuracy * 100.0);
    }
    println!("💾 Saved bundle to {:?}", args.out);
    Ok(())
}

fn load_predictor(path: &Path, fallback: NumericFallback) -> Result<Predictor> {
    Predictor::load(path, fallback).with_context(|| format!("Could not load bundle {path:?}"))
}

fn run_serve(config: Config, args: ServeArgs) -> Result<()> {
    let fallback = args
        .missing_numeric
        .unwrap_or(config.serving.missing_numeric);
    let address = args.addr.unwrap_or(config.serving.address);
    let predictor = load_predictor(&args.bundle, fallback)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
    runtime.block_on(server::serve(AppState::new(predictor), address))?;
    Ok(())
}

fn run_predict(config: Config, args: PredictArgs) -> Result<()> {
    let fallback = args
        .missing_numeric
        .unwrap_or(config.serving.missing_numeric);
    let predictor = load_predictor(&args.bundle, fallback)?;

    let mut record = BTreeMap::new();
    for field in &args.fields {
        let Some((column, value)) = field.split_once('=') else {
            bail!("Expected `Column=value`, got `{field}`");
        };
        record.insert(column.trim().to_string(), value.to_string());
    }

    let outcome = predictor.predict(&record)?;
    println!("{outcome}");
    Ok(())
}
