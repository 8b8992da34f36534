//! Orchestrator statistics command.

use super::build_service;
use anyhow::Result;
use colored::Colorize;
use montage_orchestrator::OrchestratorConfig;

/// Execute the stats command.
///
/// Engines are brought up first so their status and counters are visible.
pub async fn execute(config: &OrchestratorConfig, json_output: bool) -> Result<()> {
    let service = build_service(config);
    service.list_available_engines().await;
    let stats = service.statistics();
    service.shutdown().await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("{}", "📊 Orchestrator Statistics".bold().green());
    println!();
    println!("  Routing strategy:  {}", stats.routing_strategy.to_string().cyan());
    println!("  Concurrency limit: {}", stats.concurrency_limit);
    println!("  Active tasks:      {}", stats.active_tasks);
    println!();

    println!(
        "{:<22} {:<12} {:<9} {:<9} {:<9} {:<10}",
        "Engine", "Status", "Requests", "Success", "Errors", "Avg time"
    );
    println!("{}", "─".repeat(76));
    for (kind, engine) in &stats.engines {
        let avg = stats
            .performance
            .get(kind)
            .filter(|perf| perf.avg_generation_secs > 0.0)
            .map_or_else(|| "-".to_string(), |perf| format!("{:.2}s", perf.avg_generation_secs));
        println!(
            "{:<22} {:<12} {:<9} {:<9} {:<9} {}",
            kind.as_str().cyan(),
            engine.status.to_string(),
            engine.request_count,
            engine.success_count,
            engine.error_count,
            avg.dimmed()
        );
    }
    println!();

    Ok(())
}
