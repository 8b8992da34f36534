//! Engine management command implementation.

use super::build_service;
use super::types::EnginesCommand;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use montage_abstraction::{EngineInfo, EngineKind};
use montage_orchestrator::{OrchestratorConfig, VideoGenerationService};
use serde_json::json;
use std::collections::BTreeMap;

/// Execute the engines command.
pub async fn execute(config: &OrchestratorConfig, command: EnginesCommand) -> Result<()> {
    let service = build_service(config);
    let outcome = match command {
        EnginesCommand::List { json } => list_engines(&service, json).await,
        EnginesCommand::Show { engine, json } => show_engine(&service, &engine, json).await,
        EnginesCommand::Test { engine, json } => test_engines(&service, engine.as_deref(), json).await,
    };
    service.shutdown().await;
    outcome
}

/// Parses an engine name and checks that it is configured.
fn resolve_engine(service: &VideoGenerationService, name: &str) -> Result<EngineKind> {
    let kind = name.parse::<EngineKind>()?;
    if !service.registered_engines().contains(&kind) {
        bail!("Engine {} is disabled in the configuration", kind);
    }
    Ok(kind)
}

fn inputs_label(info: &EngineInfo) -> &'static str {
    match (info.supports_image_input, info.supports_text_input) {
        (true, true) => "image+text",
        (true, false) => "image",
        (false, true) => "text",
        (false, false) => "none",
    }
}

/// List all configured engines.
async fn list_engines(service: &VideoGenerationService, json_output: bool) -> Result<()> {
    let available = service.list_available_engines().await;
    let mut rows = Vec::new();
    for kind in service.registered_engines() {
        let info = service.get_engine_info(kind).await;
        rows.push((kind, info, available.contains(&kind)));
    }

    if json_output {
        let engine_list: Vec<_> = rows
            .iter()
            .map(|(kind, info, is_available)| {
                json!({
                    "id": kind,
                    "name": kind.display_name(),
                    "available": is_available,
                    "info": info,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&engine_list)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("🎬 Available Engines ({})", rows.len()).bold().green());
    println!();
    println!(
        "{:<22} {:<24} {:<8} {:<12} {:<8} {:<10}",
        "ID", "Name", "Cost/s", "Inputs", "Slots", "Status"
    );
    println!("{}", "─".repeat(88));

    for (kind, info, is_available) in &rows {
        let status = if *is_available { "ready".green() } else { "unavailable".red() };
        match info {
            Some(info) => {
                let cost = if info.is_free {
                    "free".to_string()
                } else {
                    format!("{:.3}", info.cost_per_second)
                };
                println!(
                    "{:<22} {:<24} {:<8} {:<12} {:<8} {}",
                    kind.as_str().cyan(),
                    kind.display_name(),
                    cost.yellow(),
                    inputs_label(info).dimmed(),
                    info.max_concurrent_tasks,
                    status
                );
            }
            None => println!("{:<22} {:<24} {}", kind.as_str().cyan(), kind.display_name(), status),
        }
    }

    println!();
    Ok(())
}

/// Show detailed information about one engine.
async fn show_engine(service: &VideoGenerationService, name: &str, json_output: bool) -> Result<()> {
    let kind = resolve_engine(service, name)?;
    let info = service
        .get_engine_info(kind)
        .await
        .with_context(|| format!("Engine {} could not be constructed", kind))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let resolutions: Vec<String> =
        info.supported_resolutions.iter().map(|(w, h)| format!("{}x{}", w, h)).collect();
    let fps: Vec<String> = info.supported_fps.iter().map(ToString::to_string).collect();

    println!();
    println!("{}", format!("Engine: {}", info.name).bold().cyan());
    println!();
    println!("  ID:           {}", kind.as_str().cyan());
    println!("  Description:  {}", info.description.dimmed());
    println!("  Version:      {}", info.version.dimmed());
    println!(
        "  Cost:         {}",
        if info.is_free { "Free".green() } else { format!("{:.3} per second", info.cost_per_second).yellow() }
    );
    println!("  Inputs:       {}", inputs_label(&info));
    println!("  Max duration: {}s", info.max_duration_secs);
    println!("  Resolutions:  {}", resolutions.join(", ").dimmed());
    println!("  Frame rates:  {}", fps.join(", ").dimmed());
    println!("  Rate limit:   {}/min", info.rate_limit_per_minute);
    println!("  Concurrency:  {}", info.max_concurrent_tasks);
    println!();

    Ok(())
}

/// Run connectivity tests for one engine or all of them.
async fn test_engines(
    service: &VideoGenerationService,
    name: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let results: BTreeMap<EngineKind, bool> = match name {
        Some(name) => {
            let kind = resolve_engine(service, name)?;
            std::iter::once((kind, service.test_engine(kind).await)).collect()
        }
        None => service.test_all_engines().await,
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!();
        println!("{}", "Engine Connectivity".bold().cyan());
        println!();
        for (kind, reachable) in &results {
            let mark = if *reachable { "✓ reachable".green() } else { "✗ unreachable".red() };
            println!("  {:<22} {}", kind.as_str(), mark);
        }
        println!();
    }

    if results.values().any(|reachable| !reachable) {
        bail!("One or more engines failed the connectivity test");
    }
    Ok(())
}
