//! awsdeck の設定値
//!
//! すべてのフィールドにデフォルト値があるため、設定ファイルには変更したい
//! 項目だけを書けばよい。
//!
//! ```yaml
//! region: ap-south-1
//! ssh:
//!   key_path: ~/.ssh/lightsail.pem
//!   user: ubuntu
//! polling:
//!   interval_secs: 5
//!   max_polls: 60
//! ec2:
//!   ami_id: ami-00bb6a80f01f03502
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// AWS リージョン。未指定なら SDK の既定チェーンに従う
    pub region: Option<String>,
    pub ssh: SshSettings,
    pub polling: PollingSettings,
    pub ec2: Ec2Settings,
    pub lightsail: LightsailSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    /// `ssh -i` に渡す秘密鍵
    pub key_path: PathBuf,
    pub user: String,
    /// 新しい端末を開くコマンド。`{cmd}` が ssh コマンドに置換される
    pub terminal: Option<String>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from("~/.ssh/awsdeck.pem"),
            user: "ubuntu".to_string(),
            terminal: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
    pub max_polls: u32,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_polls: 60,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ec2Settings {
    /// 起動フローで使う AMI
    pub ami_id: Option<String>,
    /// 新規作成したキーペアの秘密鍵の保存先
    pub key_dir: PathBuf,
}

impl Default for Ec2Settings {
    fn default() -> Self {
        Self {
            ami_id: None,
            key_dir: PathBuf::from("~/.ssh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsailSettings {
    pub availability_zone: String,
    pub blueprint_id: String,
    pub database_blueprint_id: String,
    pub master_database_name: String,
    pub master_username: String,
}

impl Default for LightsailSettings {
    fn default() -> Self {
        Self {
            availability_zone: "us-east-1a".to_string(),
            blueprint_id: "ubuntu_22_04".to_string(),
            database_blueprint_id: "mysql_8_0".to_string(),
            master_database_name: "appdb".to_string(),
            master_username: "dbadmin".to_string(),
        }
    }
}

impl Settings {
    /// YAML 文字列から読み込む
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        // 空ファイルはすべてデフォルト
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Settings =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings.expand_paths())
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "polling.interval_secs は 1 以上にしてください".into(),
            ));
        }
        if self.polling.max_polls == 0 {
            return Err(ConfigError::InvalidValue(
                "polling.max_polls は 1 以上にしてください".into(),
            ));
        }
        if self.ssh.user.trim().is_empty() {
            return Err(ConfigError::InvalidValue("ssh.user が空です".into()));
        }
        Ok(())
    }

    /// `~/` で始まるパスをホームディレクトリに展開する
    pub fn expand_paths(mut self) -> Self {
        self.ssh.key_path = expand_home(&self.ssh.key_path);
        self.ec2.key_dir = expand_home(&self.ec2.key_dir);
        self
    }
}

pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
