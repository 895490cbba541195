use clap::Parser;
use course_architect_api::router::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

/// Writes the Course Architect OpenAPI document to disk.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Destination file.
    #[arg(short, long, default_value = "openapi.json")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&args.output, spec_json)?;
    println!("Wrote {}", args.output.display());
    Ok(())
}
