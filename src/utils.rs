use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub fn setup_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

pub fn log_info(msg: &str) {
    println!("{} {}", "[INFO]".green().bold(), msg);
}

pub fn log_warn(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

pub fn log_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

pub fn log_step(step: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{}/{}]", step, total).cyan().bold(), msg);
}

/// Keeps at most three leading characters of a secret, and never all of it.
pub fn redact(secret: &str) -> String {
    let keep = secret.chars().count().saturating_sub(1).min(3);
    let prefix: String = secret.chars().take(keep).collect();
    format!("{}***", prefix)
}

/// Decodes a base64 PNG and writes it as `{dir}/{label}.png`.
pub fn save_base64_png(data: &str, dir: &Path, label: &str) -> Result<PathBuf> {
    let bytes = STANDARD.decode(data.trim())?;
    setup_dir(dir)?;
    let path = dir.join(format!("{}.png", label));
    fs::write(&path, bytes)?;
    Ok(path)
}
