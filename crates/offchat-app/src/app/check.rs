use anyhow::Result;
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};
use sysinfo::System;

use offchat_llm_api::{InferenceClient, LlamaCppClient, ModelInfo};

use crate::config::OffchatConfig;

/// Fewer hardware threads than this makes generation noticeably slow
const RECOMMENDED_CPU_THREADS: usize = 4;

/// Less total memory than this may not hold a 7B quantized model
const RECOMMENDED_MEMORY_BYTES: u64 = 8 * 1024 * 1024 * 1024;

/// Result of one readiness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
}

fn report(status: Status, message: &str) {
    match status {
        Status::Ok => println!("{} {}", "✓".green(), message),
        Status::Warn => println!("{} {}", "⚠️".yellow(), message.yellow()),
        Status::Fail => println!("{} {}", "✗".red(), message.red()),
    }
}

/// Locate `binary` the way a spawn would: explicit paths as-is, bare names through PATH
fn find_binary(binary: &Path) -> Option<PathBuf> {
    if binary.components().count() > 1 || binary.is_absolute() {
        return binary.is_file().then(|| binary.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

fn check_cpu() -> Status {
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if threads >= RECOMMENDED_CPU_THREADS {
        report(Status::Ok, &format!("CPU threads: {}", threads));
        Status::Ok
    } else {
        report(
            Status::Warn,
            &format!("CPU threads: {} (generation may be slow)", threads),
        );
        Status::Warn
    }
}

fn memory_status(total_bytes: u64) -> Status {
    if total_bytes >= RECOMMENDED_MEMORY_BYTES {
        Status::Ok
    } else {
        Status::Warn
    }
}

fn check_memory() -> Status {
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    let gb = total as f64 / (1024.0 * 1024.0 * 1024.0);

    let status = memory_status(total);
    match status {
        Status::Ok => report(status, &format!("RAM: {:.1} GB", gb)),
        _ => report(status, &format!("RAM: {:.1} GB (8 GB or more recommended)", gb)),
    }
    status
}

fn check_model(config: &OffchatConfig) -> Status {
    let info = ModelInfo::inspect(&config.model_path);
    match info.size_mb {
        Some(size_mb) => {
            report(
                Status::Ok,
                &format!("Model: {} ({} MB)", info.path.display(), size_mb),
            );
            if !info.is_gguf() {
                report(Status::Warn, "Model file does not have a .gguf extension");
                return Status::Warn;
            }
            Status::Ok
        }
        None if config.llama_cpp_url.is_some() => {
            report(
                Status::Warn,
                &format!("Model not found locally: {} (using external server)", info.path.display()),
            );
            Status::Warn
        }
        None => {
            report(Status::Fail, &format!("Model not found: {}", info.path.display()));
            Status::Fail
        }
    }
}

/// Run every readiness check. Returns false if any check failed.
pub async fn run_check(config: &OffchatConfig) -> Result<bool> {
    println!("{}", "offchat system check".bright_cyan().bold());
    println!("{}", "=".repeat(40).cyan());

    let mut statuses = Vec::new();

    statuses.push(match config.validate() {
        Ok(()) => {
            report(Status::Ok, "Config OK");
            Status::Ok
        }
        Err(e) => {
            report(Status::Fail, &format!("Config error: {}", e));
            Status::Fail
        }
    });

    statuses.push(check_model(config));
    statuses.push(check_memory());
    statuses.push(check_cpu());

    match &config.llama_cpp_url {
        Some(url) => {
            let client = LlamaCppClient::new(url.clone());
            statuses.push(match client.check_health().await {
                Ok(()) => {
                    report(Status::Ok, &format!("llama.cpp server healthy at {}", url));
                    Status::Ok
                }
                Err(e) => {
                    report(Status::Fail, &format!("llama.cpp server: {}", e));
                    Status::Fail
                }
            });
        }
        None => {
            statuses.push(match find_binary(&config.server_binary) {
                Some(path) => {
                    report(Status::Ok, &format!("llama-server: {}", path.display()));
                    Status::Ok
                }
                None => {
                    report(
                        Status::Fail,
                        &format!("llama-server binary not found: {}", config.server_binary.display()),
                    );
                    Status::Fail
                }
            });
        }
    }

    let passed = !statuses.contains(&Status::Fail);
    println!("{}", "=".repeat(40).cyan());
    if passed {
        println!("{}", "System ready".green().bold());
    } else {
        println!("{}", "Some checks failed".red().bold());
    }
    Ok(passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_binary() {
        assert_eq!(find_binary(Path::new("/no/such/dir/llama-server")), None);
    }

    #[test]
    fn test_explicit_binary_found() {
        let exe = std::env::current_exe().unwrap();
        assert_eq!(find_binary(&exe), Some(exe.clone()));
    }

    #[test]
    fn test_unknown_bare_name_not_in_path() {
        assert_eq!(find_binary(Path::new("offchat-no-such-binary-xyz")), None);
    }

    #[test]
    fn test_memory_threshold() {
        let gib = 1024 * 1024 * 1024;
        assert_eq!(memory_status(16 * gib), Status::Ok);
        assert_eq!(memory_status(8 * gib), Status::Ok);
        assert_eq!(memory_status(8 * gib - 1), Status::Warn);
        assert_eq!(memory_status(4 * gib), Status::Warn);
    }

    #[test]
    fn test_missing_model_fails_check() {
        let config = OffchatConfig {
            model_path: PathBuf::from("/no/such/model.gguf"),
            ..OffchatConfig::default()
        };
        assert_eq!(check_model(&config), Status::Fail);
    }

    #[tokio::test]
    async fn test_run_check_reports_failure() {
        let config = OffchatConfig {
            model_path: PathBuf::from("/no/such/model.gguf"),
            server_binary: PathBuf::from("/no/such/llama-server"),
            ..OffchatConfig::default()
        };
        assert!(!run_check(&config).await.unwrap());
    }
}
