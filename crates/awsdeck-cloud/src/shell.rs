//! Remote shell capability

use crate::error::{CloudError, Result};
use crate::model::{LifecycleState, ResourceKind, ResourceRecord};
use async_trait::async_trait;
use std::path::PathBuf;

/// Settings resolved at startup and handed to [`prepare_shell`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    /// Private key passed to `ssh -i`
    pub key_path: PathBuf,
    /// Remote login user
    pub user: String,
}

impl ShellSettings {
    pub fn new(key_path: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            user: user.into(),
        }
    }
}

/// Everything needed to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTarget {
    pub address: String,
    pub user: String,
    pub key_path: PathBuf,
}

impl ShellTarget {
    /// The `ssh` invocation as argv
    pub fn ssh_args(&self) -> Vec<String> {
        vec![
            "ssh".to_string(),
            "-i".to_string(),
            self.key_path.display().to_string(),
            format!("{}@{}", self.user, self.address),
        ]
    }

    /// The `ssh` invocation as a single command line
    pub fn ssh_command(&self) -> String {
        self.ssh_args().join(" ")
    }
}

/// Opens an interactive session in a new terminal context
#[async_trait]
pub trait ShellLauncher: Send + Sync {
    async fn launch(&self, target: &ShellTarget) -> Result<()>;
}

/// Validate that `record` can be the target of a shell session.
pub fn prepare_shell(record: &ResourceRecord, settings: &ShellSettings) -> Result<ShellTarget> {
    if record.kind() != ResourceKind::Vm {
        return Err(CloudError::unsupported(record.provider(), "shell"));
    }
    if record.lifecycle_state != LifecycleState::Running {
        return Err(CloudError::NotRunning(format!(
            "{} is {}",
            record.id(),
            record.lifecycle_state
        )));
    }

    let address = record
        .public_address
        .clone()
        .ok_or_else(|| CloudError::AddressMissing(record.id().to_string()))?;

    if !settings.key_path.is_file() {
        return Err(CloudError::CredentialMissing(
            settings.key_path.display().to_string(),
        ));
    }

    Ok(ShellTarget {
        address,
        user: settings.user.clone(),
        key_path: settings.key_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn running_vm(address: Option<&str>) -> ResourceRecord {
        ResourceRecord::new("web", "lightsail", ResourceKind::Vm)
            .with_state(LifecycleState::Running)
            .with_address(address.map(str::to_string))
    }

    #[test]
    fn test_prepare_shell() {
        let key = NamedTempFile::new().unwrap();
        let settings = ShellSettings::new(key.path(), "ubuntu");

        let target = prepare_shell(&running_vm(Some("203.0.113.9")), &settings).unwrap();
        assert_eq!(target.address, "203.0.113.9");
        assert_eq!(
            target.ssh_command(),
            format!("ssh -i {} ubuntu@203.0.113.9", key.path().display())
        );
    }

    #[test]
    fn test_requires_running() {
        let key = NamedTempFile::new().unwrap();
        let settings = ShellSettings::new(key.path(), "ubuntu");
        let stopped = running_vm(Some("203.0.113.9")).with_state(LifecycleState::Stopped);

        assert!(matches!(
            prepare_shell(&stopped, &settings),
            Err(CloudError::NotRunning(_))
        ));
    }

    #[test]
    fn test_requires_address() {
        let key = NamedTempFile::new().unwrap();
        let settings = ShellSettings::new(key.path(), "ubuntu");

        assert!(matches!(
            prepare_shell(&running_vm(None), &settings),
            Err(CloudError::AddressMissing(_))
        ));
    }

    #[test]
    fn test_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ShellSettings::new(dir.path().join("absent.pem"), "ubuntu");

        assert!(matches!(
            prepare_shell(&running_vm(Some("203.0.113.9")), &settings),
            Err(CloudError::CredentialMissing(_))
        ));
    }

    #[test]
    fn test_databases_are_not_shell_targets() {
        let key = NamedTempFile::new().unwrap();
        let settings = ShellSettings::new(key.path(), "ubuntu");
        let database = ResourceRecord::new("orders", "lightsail-db", ResourceKind::ManagedDatabase)
            .with_state(LifecycleState::from_provider("available"))
            .with_address(Some("ls-abc.cxyz.us-east-1.rds.amazonaws.com".into()));

        assert!(matches!(
            prepare_shell(&database, &settings),
            Err(CloudError::Unsupported { .. })
        ));
    }
}
