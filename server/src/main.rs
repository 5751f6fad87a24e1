use std::path::PathBuf;
use std::sync::Arc;

use chunker::server::serve;
use chunker::{
    AnnotateConfig, Annotator, FileModelLoader, InputFormat, ModelCache, ModelSource,
    OutputFormat, BASELINE, MODEL_DIR_ENV,
};
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(about = "A TCP server chunking documents terminated by <ENDOFDOCUMENT>.")]
struct Args {
    /// The port to listen on
    #[arg(long)]
    port: u16,

    /// The address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// The model file, or `baseline` for the bundled model of the language
    #[arg(long, default_value = BASELINE)]
    model: String,

    /// The directory of bundled models
    #[arg(long, env = MODEL_DIR_ENV, default_value = "models")]
    model_dir: PathBuf,

    /// The language. Its model is loaded before accepting connections
    #[arg(long)]
    lang: Option<String>,

    /// Input format: {document, conll}
    #[arg(long, default_value = "document")]
    input_format: InputFormat,

    /// Output format: {document, conll}
    #[arg(long, default_value = "document")]
    output_format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let source = ModelSource::from_arg(&args.model, args.model_dir);
    let cache = Arc::new(ModelCache::new(FileModelLoader::new(source)));
    if let Some(lang) = &args.lang {
        cache.get(lang)?;
    }
    let annotator = Arc::new(Annotator::new(
        cache,
        AnnotateConfig {
            language: args.lang,
            input_format: args.input_format,
            output_format: args.output_format,
        },
    ));

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    tracing::info!("chunk server running");
    serve(listener, annotator).await?;

    Ok(())
}
