use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use gpx_pacer::library::{discover_gpx_files, predict_all, write_batch_csv};
use gpx_pacer::report::{
    format_hours, format_pace, print_prediction_summary, print_reference_summary,
    save_prediction_csv, save_reference_csv,
};
use gpx_pacer::{
    load_track, FitConfig, PaceModel, PredictionConfig, PredictionSession, ReducerConfig,
    ReferenceModel, SessionConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trail pace prediction from a reference GPX run", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a reference run and predict pace and time for a target track
    Predict(PredictArgs),
    /// Fit a reference run and show the regression parameters
    Fit(FitArgs),
    /// Predict every GPX file in a library folder against one reference
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Prediction model
    #[arg(long, value_enum, default_value_t = ModelOpt::Linear)]
    model: ModelOpt,

    /// Base pace in min/km for the manual model (3.5 to 10)
    #[arg(long, default_value_t = 5.0)]
    base_pace: f64,

    /// Slowest pace a segment may be predicted at, min/km
    #[arg(long, default_value_t = 19.0)]
    min_pace: f64,

    /// Tune the whole prediction up or down by a percentage
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pace_adjust: f64,

    /// Segment length in meters
    #[arg(long, default_value_t = 100.0)]
    bucket_width: f64,
}

#[derive(Parser, Debug)]
struct PredictArgs {
    /// Completed run with timestamps
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    reference: PathBuf,

    /// Track to predict
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    target: PathBuf,

    #[command(flatten)]
    model: ModelArgs,

    /// Predicted segment CSV
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Reference segment CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    reference_output: Option<PathBuf>,

    /// Print a summary for every model instead of only the selected one
    #[arg(long, action = ArgAction::SetTrue)]
    compare: bool,
}

#[derive(Parser, Debug)]
struct FitArgs {
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    reference: PathBuf,

    /// Segment length in meters
    #[arg(long, default_value_t = 100.0)]
    bucket_width: f64,

    /// Reference segment CSV
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    reference: PathBuf,

    /// Folder searched recursively for .gpx files
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    library: PathBuf,

    #[command(flatten)]
    model: ModelArgs,

    /// Batch summary CSV (defaults to <library>/pace_predictions.csv)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Worker threads (defaults to the number of cores)
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModelOpt {
    Manual,
    Parabolic,
    Linear,
    Hybrid,
}

impl From<ModelOpt> for PaceModel {
    fn from(opt: ModelOpt) -> Self {
        match opt {
            ModelOpt::Manual => PaceModel::Manual,
            ModelOpt::Parabolic => PaceModel::Parabolic,
            ModelOpt::Linear => PaceModel::Linear,
            ModelOpt::Hybrid => PaceModel::Hybrid,
        }
    }
}

impl ModelArgs {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            reducer: ReducerConfig {
                bucket_width_m: self.bucket_width,
            },
            fit: FitConfig::default(),
            prediction: PredictionConfig {
                model: self.model.into(),
                base_pace: self.base_pace,
                min_pace: self.min_pace,
                pace_adjust_percent: self.pace_adjust,
            },
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Command::Predict(args) => run_predict(args),
        Command::Fit(args) => run_fit(args),
        Command::Batch(args) => run_batch(args),
    }
}

fn run_predict(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = PredictionSession::new(args.model.session_config());

    println!("🔄 Loading reference: {}", args.reference.display());
    let reference = load_track(&args.reference)?;
    if reference.timed_points() < 2 {
        return Err(format!("reference {} has no timestamps", args.reference.display()).into());
    }
    print_reference_summary(session.load_reference(&reference.name, &reference.points)?);

    println!("\n🔄 Loading target: {}", args.target.display());
    let target = load_track(&args.target)?;
    session.load_target(&target.name, &target.points)?;

    let prediction = session.predict()?;
    print_prediction_summary(&prediction);

    if args.compare {
        println!("\n📊 MODEL COMPARISON");
        println!("==================");
        let selected = session.config().prediction;
        for model in PaceModel::ALL {
            session.set_prediction_config(PredictionConfig { model, ..selected })?;
            let p = session.predict()?;
            println!(
                "  {:<10} {}  ({} min/km)",
                model.name(),
                format_hours(p.summary.total_time_h),
                format_pace(p.summary.average_pace)
            );
        }
    }

    if let Some(path) = &args.output {
        save_prediction_csv(path, &prediction)?;
        println!("📁 Prediction saved to: {}", path.display());
    }
    if let Some(path) = &args.reference_output {
        if let Some(reference) = session.reference() {
            save_reference_csv(path, &reference.segments)?;
            println!("📁 Reference segments saved to: {}", path.display());
        }
    }

    Ok(())
}

fn run_fit(args: FitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let reducer = ReducerConfig {
        bucket_width_m: args.bucket_width,
    };

    println!("🔄 Loading reference: {}", args.reference.display());
    let track = load_track(&args.reference)?;
    let reference = ReferenceModel::fit(&track.name, &track.points, &reducer, &FitConfig::default())?;
    print_reference_summary(&reference);

    if let Some(path) = &args.output {
        save_reference_csv(path, &reference.segments)?;
        println!("📁 Reference segments saved to: {}", path.display());
    }
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.model.session_config();
    config.prediction.validate()?;

    let jobs = args.jobs.unwrap_or_else(num_cpus::get).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()?;

    println!("🔄 Loading reference: {}", args.reference.display());
    let track = load_track(&args.reference)?;
    let reference = ReferenceModel::fit(&track.name, &track.points, &config.reducer, &config.fit)?;
    print_reference_summary(&reference);

    let files: Vec<PathBuf> = discover_gpx_files(&args.library)?
        .into_iter()
        .filter(|p| !same_file(p, &args.reference))
        .collect();
    println!("\n🔍 Found {} GPX files to predict", files.len());
    println!("⚡ Using parallel processing on {} threads", jobs);

    let outcomes = predict_all(&reference, &files, &config.reducer, &config.prediction);

    let mut ok = 0;
    for outcome in &outcomes {
        let name = outcome.path.display();
        match &outcome.result {
            Ok(p) => {
                ok += 1;
                println!(
                    "   ✅ {}: {:.2}km, {:.0}m ascent, {}",
                    name,
                    p.summary.total_distance_km,
                    p.summary.total_ascent_m,
                    format_hours(p.summary.total_time_h)
                );
            }
            Err(e) => eprintln!("   ❌ {}: {}", name, e),
        }
    }

    let output = args
        .output
        .unwrap_or_else(|| args.library.join("pace_predictions.csv"));
    write_batch_csv(std::fs::File::create(&output)?, &outcomes)?;

    println!("\n🎯 BATCH SUMMARY");
    println!("===============");
    println!("✅ Successful: {}", ok);
    println!("❌ Errors: {}", outcomes.len() - ok);
    println!("📁 Results saved to: {}", output.display());

    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
