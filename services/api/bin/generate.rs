//! Command-line course generation.
//!
//! Runs the full pipeline for a topic, or re-runs one resumable stage for an
//! existing course, using the same environment configuration as the API.

use anyhow::Context;
use clap::Parser;
use course_architect_api::{config::Config, init_tracing, state::AppState};
use course_architect_core::pipeline::{Stage, StageEvent, StageOutcome};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(version, about = "Generate a course with the Architect, Librarian and Professor")]
struct Args {
    /// Course topic, or the title of an existing course with `--stage`.
    #[arg(short, long)]
    topic: String,

    /// Re-run only this stage (`librarian` or `professor`).
    #[arg(short, long, value_parser = parse_stage)]
    stage: Option<Stage>,
}

fn parse_stage(value: &str) -> Result<Stage, String> {
    let stage: Stage = value.parse()?;
    if !stage.is_resumable() {
        return Err(format!("'{}' cannot be run on its own", stage));
    }
    Ok(stage)
}

fn print_outcome(outcome: &StageOutcome) {
    match outcome {
        StageOutcome::Architect(out) if out.skeleton_written => {
            println!("[architect] course skeleton written for '{}'", out.course_title)
        }
        StageOutcome::Architect(out) => {
            println!("[architect] could not write a skeleton for '{}'", out.course_title)
        }
        StageOutcome::Librarian(out) => {
            for entry in &out.researched {
                println!("[librarian] {}", entry);
            }
            for title in &out.failed {
                println!("[librarian] still pending: {}", title);
            }
        }
        StageOutcome::Professor(out) => {
            for title in &out.drafted {
                println!("[professor] drafted '{}'", title);
            }
            for title in &out.failed {
                println!("[professor] still pending: {}", title);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_level);

    let state = AppState::build(config)
        .await
        .context("Failed to initialize application state")?;

    if let Some(stage) = args.stage {
        let outcome = state.pipeline.run_stage(stage, &args.topic).await;
        print_outcome(&outcome);
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel(8);
    let pipeline = state.pipeline.clone();
    let topic = args.topic.clone();
    let run = tokio::spawn(async move { pipeline.run_streaming(&topic, tx).await });

    while let Some(event) = rx.recv().await {
        match event {
            StageEvent::Completed { outcome } => print_outcome(&outcome),
            StageEvent::Finished { report } => println!(
                "Finished '{}': {} lessons processed, status {:?}",
                report.course_title, report.lessons_processed, report.current_status
            ),
        }
    }
    run.await.context("Pipeline task failed")?;
    Ok(())
}
