use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{ensure_logs_dir, safe_truncate};

/// Log an inference request for debugging (console output)
pub fn log_request<T: Serialize>(url: &str, request: &T, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_cyan());
    println!("{}", "🔍 INFERENCE REQUEST DEBUG".bright_cyan().bold());
    println!("{}", "═".repeat(80).bright_cyan());

    // Parse URL to show host and port
    if let Ok(parsed_url) = reqwest::Url::parse(url) {
        println!("{}: {}", "URL".bright_yellow(), url);
        println!("{}: {}", "Host".bright_yellow(), parsed_url.host_str().unwrap_or("unknown"));
        println!(
            "{}: {}",
            "Port".bright_yellow(),
            parsed_url
                .port_or_known_default()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
    } else {
        println!("{}: {}", "URL".bright_yellow(), url);
    }

    println!("\n{}", "Request Body:".bright_yellow());
    match serde_json::to_string_pretty(request) {
        Ok(json) => {
            // Truncate very long requests for readability
            if json.chars().count() > 5000 {
                println!("{}", safe_truncate(&json, 5000));
                println!("\n{}", format!("... (truncated, total {} bytes)", json.len()).bright_black());
            } else {
                println!("{}", json);
            }
        }
        Err(e) => println!("{}", format!("Error serializing request: {}", e).red()),
    }

    println!("{}", "═".repeat(80).bright_cyan());
    println!();
}

/// Write an inference request to `<log_dir>/req-<millis>.txt`; returns the file path
pub fn log_request_to_file<T: Serialize>(log_dir: &Path, url: &str, request: &T) -> Result<PathBuf> {
    let logs_dir = ensure_logs_dir(log_dir)?;

    let timestamp = Utc::now().timestamp_millis();
    let file_path = logs_dir.join(format!("req-{}.txt", timestamp));

    let mut log_content = String::new();
    log_content.push_str("INFERENCE REQUEST LOG\n");
    log_content.push_str("=====================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n", timestamp));
    log_content.push_str(&format!("URL: {}\n\n", url));

    log_content.push_str("Request Body:\n");
    match serde_json::to_string_pretty(request) {
        Ok(json) => {
            log_content.push_str(&json);
            log_content.push('\n');
        }
        Err(e) => {
            log_content.push_str(&format!("Error serializing request: {}\n", e));
        }
    }

    fs::write(&file_path, log_content)
        .with_context(|| format!("Failed to write request log to {}", file_path.display()))?;

    Ok(file_path)
}

/// Log an inference response for debugging (console output)
pub fn log_response(status: &reqwest::StatusCode, body: &str, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_green());
    println!("{}", "📥 INFERENCE RESPONSE DEBUG".bright_green().bold());
    println!("{}", "═".repeat(80).bright_green());

    println!(
        "{}: {} {}",
        "Status".bright_yellow(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );

    println!("\n{}", "Response Body:".bright_yellow());
    // Try to pretty-print JSON, fall back to raw text
    let shown = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| body.to_string());
    if shown.chars().count() > 5000 {
        println!("{}", safe_truncate(&shown, 5000));
        println!("\n{}", format!("... (truncated, total {} bytes)", shown.len()).bright_black());
    } else {
        println!("{}", shown);
    }

    println!("{}", "═".repeat(80).bright_green());
    println!();
}

/// Log streaming chunk for debugging (console output)
pub fn log_stream_chunk(chunk_num: usize, data: &str, verbose: bool) {
    if !verbose {
        return;
    }

    println!("{}", format!("📦 Stream Chunk #{}: {}", chunk_num,
        if data.chars().count() > 200 {
            format!("{}... ({} bytes)", safe_truncate(data, 200), data.len())
        } else {
            data.to_string()
        }
    ).bright_black());
}
