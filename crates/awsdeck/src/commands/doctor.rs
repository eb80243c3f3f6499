//! 設定と認証情報の診断

use awsdeck_cloud::InventoryAggregator;
use awsdeck_config::Settings;
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    settings: &Settings,
    config_path: Option<&Path>,
    region: &str,
    aggregator: &InventoryAggregator,
) -> anyhow::Result<()> {
    println!("{}", "awsdeck 診断".bold());
    println!();

    println!("{}", "設定:".yellow());
    match config_path {
        Some(path) => println!("  ✓ 設定ファイル: {}", path.display().to_string().cyan()),
        None => println!("  ℹ 設定ファイルなし (デフォルト値を使用)"),
    }
    println!("  ✓ リージョン: {}", region.cyan());

    let key_path = &settings.ssh.key_path;
    if key_path.exists() {
        println!("  ✓ SSH 鍵: {}", key_path.display().to_string().cyan());
    } else {
        println!(
            "  {} SSH 鍵が見つかりません: {}",
            "⚠".yellow(),
            key_path.display()
        );
    }
    if settings.ec2.ami_id.is_none() {
        println!(
            "  {} ec2.ami_id が未設定のため EC2 インスタンスは作成できません",
            "⚠".yellow()
        );
    }

    println!();
    println!("{}", "プロバイダ:".yellow());
    let mut failures = 0;
    for provider in aggregator.providers() {
        match provider.check_auth().await {
            Ok(status) if status.authenticated => println!(
                "  {} {} {}",
                "✓".green(),
                provider.display_name(),
                status.account_info.unwrap_or_default().dimmed()
            ),
            Ok(status) => {
                failures += 1;
                println!(
                    "  {} {}: {}",
                    "✗".red(),
                    provider.display_name(),
                    status.error.unwrap_or_else(|| "認証されていません".to_string())
                );
            }
            Err(e) => {
                failures += 1;
                println!("  {} {}: {}", "✗".red(), provider.display_name(), e);
            }
        }
    }

    println!();
    if failures == 0 {
        println!("{}", "✓ すべてのチェックに成功しました".green().bold());
        Ok(())
    } else {
        println!();
        println!("{}", "解決方法:".yellow());
        println!("  • aws configure または AWS_PROFILE で認証情報を設定してください");
        println!("  • --region または AWS_REGION でリージョンを確認してください");
        Err(anyhow::anyhow!("{} 件のプロバイダで認証に失敗しました", failures))
    }
}
