//! 新しい端末ウィンドウで SSH セッションを開く

use async_trait::async_trait;
use awsdeck_cloud::{CloudError, ShellLauncher, ShellTarget};
use tokio::process::Command;

/// ダッシュボードの外に端末を開く [`ShellLauncher`]
#[derive(Debug, Clone, Default)]
pub struct TerminalShellLauncher {
    /// `{cmd}` を含むコマンドテンプレート。未指定ならプラットフォーム既定
    terminal: Option<String>,
}

impl TerminalShellLauncher {
    pub fn new(terminal: Option<String>) -> Self {
        Self { terminal }
    }

    /// 実行するプログラムと引数
    pub fn command_for(&self, target: &ShellTarget) -> (String, Vec<String>) {
        let ssh = target.ssh_command();

        if let Some(template) = &self.terminal {
            return (
                "sh".to_string(),
                vec!["-c".to_string(), template.replace("{cmd}", &ssh)],
            );
        }

        if cfg!(target_os = "macos") {
            (
                "osascript".to_string(),
                vec![
                    "-e".to_string(),
                    format!(
                        "tell application \"Terminal\" to do script \"{}\"",
                        ssh.replace('\\', "\\\\").replace('"', "\\\"")
                    ),
                ],
            )
        } else {
            let mut args = vec!["-e".to_string()];
            args.extend(target.ssh_args());
            ("x-terminal-emulator".to_string(), args)
        }
    }
}

#[async_trait]
impl ShellLauncher for TerminalShellLauncher {
    async fn launch(&self, target: &ShellTarget) -> awsdeck_cloud::Result<()> {
        let (program, args) = self.command_for(target);
        tracing::info!("Opening terminal: {} {:?}", program, args);

        let mut child = Command::new(&program).args(&args).spawn().map_err(|e| {
            CloudError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to run {}: {}", program, e),
            ))
        })?;

        // 端末は独立して動くので終了だけ回収する
        tokio::spawn(async move {
            if let Err(e) = child.wait().await {
                tracing::warn!("Terminal process failed: {}", e);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn target() -> ShellTarget {
        ShellTarget {
            address: "203.0.113.9".into(),
            user: "ubuntu".into(),
            key_path: PathBuf::from("/keys/demo.pem"),
        }
    }

    #[test]
    fn test_custom_terminal_template() {
        let launcher = TerminalShellLauncher::new(Some("wezterm start -- {cmd}".into()));
        let (program, args) = launcher.command_for(&target());
        assert_eq!(program, "sh");
        assert_eq!(
            args,
            vec![
                "-c".to_string(),
                "wezterm start -- ssh -i /keys/demo.pem ubuntu@203.0.113.9".to_string()
            ]
        );
    }

    #[test]
    fn test_default_terminal() {
        let (program, args) = TerminalShellLauncher::default().command_for(&target());
        if cfg!(target_os = "macos") {
            assert_eq!(program, "osascript");
            assert!(args[1].contains("do script \"ssh -i /keys/demo.pem ubuntu@203.0.113.9\""));
        } else {
            assert_eq!(program, "x-terminal-emulator");
            assert_eq!(args[0], "-e");
            assert_eq!(args[1], "ssh");
            assert_eq!(args.last().map(String::as_str), Some("ubuntu@203.0.113.9"));
        }
    }
}
