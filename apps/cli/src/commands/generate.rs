//! Video generation command implementation.

use super::build_service;
use super::types::GenerateArgs;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use montage_abstraction::{GenerationResult, ProgressReporter, ProgressUpdate};
use montage_orchestrator::{GenerateOptions, OrchestratorConfig};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Execute the generate command.
pub async fn execute(config: &OrchestratorConfig, args: GenerateArgs) -> Result<()> {
    let service = build_service(config);
    if let Some(strategy) = &args.strategy {
        service.set_routing_strategy_name(strategy)?;
    }

    let options = GenerateOptions {
        image_path: args.image.clone(),
        duration_secs: args.duration,
        fps: args.fps,
        width: args.width,
        height: args.height,
        motion_intensity: args.motion,
        output_format: args.format.clone(),
        seed: args.seed,
        preferred_engines: args.engines.clone(),
        params: HashMap::new(),
    };

    let progress = if args.json { ProgressReporter::silent() } else { ProgressReporter::new(print_progress) };

    // Ctrl-C cancels the in-flight generation instead of killing the process.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling generation");
            trigger.cancel();
        }
    });

    let outcome = service.generate_with_cancel(&args.prompt, &options, &progress, &cancel).await;
    watcher.abort();
    service.shutdown().await;

    let result = outcome.context("Invalid generation request")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if !result.success {
        bail!("Generation failed: {}", result.error_message());
    }
    Ok(())
}

fn print_progress(update: &ProgressUpdate) {
    let engine = update.engine.map(|kind| format!("[{}] ", kind)).unwrap_or_default();
    match update.fraction {
        Some(fraction) => {
            eprintln!("{} {}{} ({:.0}%)", "→".cyan(), engine.dimmed(), update.message, fraction * 100.0);
        }
        None => eprintln!("{} {}{}", "→".cyan(), engine.dimmed(), update.message),
    }
}

fn print_result(result: &GenerationResult) {
    println!();
    if result.success {
        println!("{}", "✓ Video generated".bold().green());
        println!();
        if let Some(path) = &result.artifact_path {
            println!("  Output:   {}", path.display().to_string().cyan());
        }
        if let Some(engine) = result.engine {
            println!("  Engine:   {}", engine.display_name());
        }
        println!("  Time:     {:.2}s", result.generation_time.as_secs_f64());
        if result.cost > 0.0 {
            println!("  Cost:     {}", format!("{:.4}", result.cost).yellow());
        } else {
            println!("  Cost:     {}", "free".dimmed());
        }
        if let Some((width, height)) = result.resolution {
            println!("  Format:   {}x{} @ {} fps, {:.1}s", width, height, result.fps, result.duration_secs);
        }
    } else if result.is_cancelled() {
        println!("{}", "⚠ Generation cancelled".bold().yellow());
    } else {
        println!("{}", "✗ Generation failed".bold().red());
        println!();
        println!("  Error:    {}", result.error_message().red());
    }
    println!();
}
