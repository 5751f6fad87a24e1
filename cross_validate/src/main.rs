use std::path::PathBuf;

use chunker::{KFoldValidator, Trainer, TrainingParameters};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "A program to cross-validate chunker training on TrainSet.")]
struct Args {
    /// The training parameters file. Folds and EvaluationType control the validation
    #[arg(long)]
    params: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let params = TrainingParameters::load(&args.params)?;
    let trainer = Trainer::default();
    let report = KFoldValidator::new(&trainer).run(&params)?;
    print!("{report}");

    Ok(())
}
