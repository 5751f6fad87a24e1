use std::io::{prelude::*, stdin, stdout};
use std::path::PathBuf;
use std::sync::Arc;

use chunker::{
    AnnotateConfig, Annotator, FileModelLoader, InputFormat, ModelCache, ModelSource,
    OutputFormat, BASELINE, MODEL_DIR_ENV,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "A program to chunk documents read from stdin.")]
struct Args {
    /// The model file, or `baseline` for the bundled model of the language
    #[arg(long, default_value = BASELINE)]
    model: String,

    /// The directory of bundled models
    #[arg(long, env = MODEL_DIR_ENV, default_value = "models")]
    model_dir: PathBuf,

    /// The language. Must agree with the language declared by the document, if any
    #[arg(long)]
    lang: Option<String>,

    /// Input format: {document, conll}
    #[arg(long, default_value = "document")]
    input_format: InputFormat,

    /// Output format: {document, conll}
    #[arg(long, default_value = "document")]
    output_format: OutputFormat,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let source = ModelSource::from_arg(&args.model, args.model_dir);
    let annotator = Annotator::new(
        Arc::new(ModelCache::new(FileModelLoader::new(source))),
        AnnotateConfig {
            language: args.lang,
            input_format: args.input_format,
            output_format: args.output_format,
        },
    );

    let mut input = String::new();
    stdin().lock().read_to_string(&mut input)?;
    let output = annotator.annotate_text(&input)?;
    stdout().lock().write_all(output.as_bytes())?;

    Ok(())
}
