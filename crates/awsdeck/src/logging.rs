//! tracing の初期化
//!
//! ダッシュボードは端末を占有するため、ログはファイルに書き出す。

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// ログの出力先
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// ダッシュボード用のログファイル
pub fn default_log_file(config_dir: &Path) -> PathBuf {
    config_dir.join("awsdeck.log")
}

pub fn init(verbose: bool, target: LogTarget) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(verbose));

    match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
    }
    Ok(())
}
