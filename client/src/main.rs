use std::io::{prelude::*, stdin, stdout};

use chunker::server::request;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "A client sending stdin to a chunk server and printing the reply.")]
struct Args {
    /// The server host name or IP address
    #[arg(long, default_value = "localhost")]
    host: String,

    /// The server port
    #[arg(long)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let mut input = String::new();
    stdin().lock().read_to_string(&mut input)?;
    let reply = request(&args.host, args.port, &input).await?;
    stdout().lock().write_all(reply.as_bytes())?;

    Ok(())
}
