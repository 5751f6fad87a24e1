use std::path::PathBuf;

use chunker::{Chunker, Corpus, Evaluator, Model, ReportMode};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate the accuracy of chunker models.")]
struct Args {
    /// The model file to evaluate
    #[arg(long)]
    model: PathBuf,

    /// A test corpus with `token pos chunk` lines
    #[arg(long)]
    test_set: PathBuf,

    /// Report type: {brief, detailed, error}.
    /// brief: precision, recall and F-measure.
    /// detailed: scores per chunk type.
    /// error: every mistagged token, followed by the brief scores.
    #[arg(long, default_value = "detailed")]
    eval_report: ReportMode,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    tracing::info!(path = %args.model.display(), "loading the model");
    let chunker = Chunker::new(Model::read_file(&args.model)?);
    let samples = Corpus::from_path(&args.test_set).samples()?;
    let report = Evaluator::new(&chunker).evaluate(samples, args.eval_report)?;
    print!("{report}");

    Ok(())
}
