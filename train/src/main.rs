use std::fs::File;
use std::path::{Path, PathBuf};

use chunker::{GridSearch, Trainer, TrainingParameters, DEFAULT_RESULTS_LOG};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "A program to train chunker models.")]
struct Args {
    /// The training parameters file
    #[arg(long)]
    params: PathBuf,

    /// The file to write the trained model to. Defaults to OutputModel of the parameters file,
    /// then to the parameters file name with the .bin extension
    #[arg(long)]
    model: Option<PathBuf>,

    /// The file grid search results are appended to (used when CrossEval is set)
    #[arg(long, default_value = DEFAULT_RESULTS_LOG)]
    results_log: PathBuf,

    /// The zstd compression level of the model file
    #[arg(long, default_value = "19")]
    zstd_level: i32,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn model_path(args: &Args, params: &TrainingParameters) -> PathBuf {
    args.model
        .clone()
        .or_else(|| params.output_model.clone())
        .unwrap_or_else(|| Path::new(&args.params).with_extension("bin"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let params = TrainingParameters::load(&args.params)?;
    let trainer = Trainer::default();

    let result = if params.cross_eval.is_some() {
        let outcome = GridSearch::new(&trainer)
            .results_log(&args.results_log)
            .run(&params)?;
        for point in &outcome.results {
            println!(
                "Iterations: {} cutoff: {} Accuracy: {}",
                point.iterations, point.cutoff, point.f_measure
            );
        }
        println!(
            "Best: Iterations: {} cutoff: {} Accuracy: {}",
            outcome.best.iterations, outcome.best.cutoff, outcome.best.f_measure
        );
        outcome.result
    } else {
        trainer.train(&params)?
    };
    println!("Final result: {}", result.fmeasure.value());

    let path = model_path(&args, &params);
    tracing::info!(path = %path.display(), "writing the model");
    let mut f = zstd::Encoder::new(File::create(path)?, args.zstd_level)?;
    f.multithread(args.zstd_workers)?;
    result.model.write(&mut f)?;
    f.finish()?;

    Ok(())
}
