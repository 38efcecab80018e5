//! Report Module
//!
//! Summary reporting for batch operations.

use crate::batch::BatchResult;
use console::style;
use std::time::Duration;

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Render the report as lines so callers can print them (or route them through a bar).
pub fn render_summary_report(
    result: &BatchResult,
    duration: Duration,
    input_bytes: u64,
    output_bytes: u64,
    operation_name: &str,
) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(String::new());
    lines.push(format!("📊 {} Summary Report", operation_name));
    lines.push("━".repeat(60));
    lines.push(format!("  📁 Files Processed:    {:>10}", result.total));
    lines.push(format!(
        "  ✅ Succeeded:          {:>10}",
        style(result.succeeded).green()
    ));
    lines.push(format!("  ❌ Failed:             {:>10}", style(result.failed).red()));
    lines.push(format!("  ⏭️  Skipped:            {:>10}", result.skipped));
    if result.warnings > 0 {
        lines.push(format!(
            "  ⚠️  Warnings:           {:>10}",
            style(result.warnings).yellow()
        ));
    }
    lines.push(format!("  📈 Success Rate:       {:>9.1}%", result.success_rate()));
    lines.push("━".repeat(60));
    lines.push(format!("  💾 Input Size:         {:>10}", format_bytes(input_bytes)));
    lines.push(format!("  💾 Output Size:        {:>10}", format_bytes(output_bytes)));
    lines.push(format!("  ⏱️  Total Time:         {:>10}", format_duration(duration)));
    if result.total > 0 {
        let avg_time = duration.as_secs_f64() / result.total as f64;
        lines.push(format!("  ⏱️  Avg Time/File:      {:>9.2}s", avg_time));
    }
    lines.push("━".repeat(60));

    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push("❌ Errors encountered:".to_string());
        for (path, error) in &result.errors {
            lines.push(format!("   {} → {}", path.display(), error));
        }
    }
    lines
}

pub fn print_summary_report(
    result: &BatchResult,
    duration: Duration,
    input_bytes: u64,
    output_bytes: u64,
    operation_name: &str,
) {
    for line in render_summary_report(result, duration, input_bytes, output_bytes, operation_name)
    {
        println!("{}", line);
    }
}
