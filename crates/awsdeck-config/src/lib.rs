pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{
    Ec2Settings, LightsailSettings, PollingSettings, Settings, SshSettings, expand_home,
};

use std::path::{Path, PathBuf};

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_ENV: &str = "AWSDECK_CONFIG";

const CANDIDATES: [&str; 4] = [
    "awsdeck.local.yaml",
    ".awsdeck.local.yaml",
    "awsdeck.yaml",
    ".awsdeck.yaml",
];

/// awsdeck の設定ディレクトリを取得 (なければ作成)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("awsdeck");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 AWSDECK_CONFIG (直接パス指定)
/// 2. カレントディレクトリ: awsdeck.local.yaml, .awsdeck.local.yaml, awsdeck.yaml, .awsdeck.yaml
/// 3. ./.awsdeck/ ディレクトリ内: 同様の順序
/// 4. ~/.config/awsdeck/config.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points to a missing file: {}", CONFIG_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.awsdeck/ ディレクトリで検索
    let local_dir = current_dir.join(".awsdeck");
    if local_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = local_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("awsdeck").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// 指定されたファイルから設定を読み込む
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    let settings = Settings::from_yaml(&content, path)?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// 設定を読み込む
///
/// 設定ファイルが見つからない場合はデフォルト値を返す。
pub fn load_settings() -> Result<Settings> {
    match find_config_file() {
        Ok(path) => load_settings_from(&path),
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using defaults");
            Ok(Settings::default().expand_paths())
        }
        Err(e) => Err(e),
    }
}
