mod commands;
mod context;
mod logging;
mod shell;
mod tui;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use context::{AppContext, Overrides, apply_overrides};
use logging::LogTarget;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "awsdeck")]
#[command(about = "EC2 と Lightsail のインスタンス・データベースを操作するターミナルダッシュボード", long_about = None)]
struct Cli {
    /// AWS リージョン (設定ファイルより優先)
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// 設定ファイルのパス
    /// 環境変数 AWSDECK_CONFIG からも読み込み可能
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SSH 秘密鍵のパス
    #[arg(short, long, global = true)]
    key: Option<PathBuf>,

    /// デバッグログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// リソースの一覧を表示
    List {
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// 設定と認証情報を診断
    Doctor,
    /// バージョン情報を表示
    Version,
}

/// 設定を読み込み、見つかったファイルのパスも返す
fn load_settings(cli: &Cli) -> anyhow::Result<(awsdeck_config::Settings, Option<PathBuf>)> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => match awsdeck_config::find_config_file() {
            Ok(path) => Some(path),
            Err(awsdeck_config::ConfigError::ConfigFileNotFound) => None,
            Err(e) => return Err(e.into()),
        },
    };

    let settings = match &path {
        Some(path) => awsdeck_config::load_settings_from(path)
            .with_context(|| format!("設定ファイルの読み込みに失敗しました: {}", path.display()))?,
        None => awsdeck_config::load_settings()?,
    };

    let overrides = Overrides {
        region: cli.region.clone(),
        key: cli.key.clone(),
    };
    Ok((apply_overrides(settings, &overrides), path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Some(Commands::Version)) {
        println!("awsdeck {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // ダッシュボードは端末を占有するのでログはファイルへ
    let log_target = match cli.command {
        None => LogTarget::File(logging::default_log_file(&awsdeck_config::get_config_dir()?)),
        Some(_) => LogTarget::Stderr,
    };
    logging::init(cli.verbose, log_target)?;

    let (settings, config_path) = match load_settings(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {:#}", e);
            return Err(e);
        }
    };

    let ctx = AppContext::build(settings).await;

    match cli.command {
        None => tui::run(ctx).await,
        Some(Commands::List { json }) => commands::list::handle(&ctx.aggregator, json).await,
        Some(Commands::Doctor) => {
            commands::doctor::handle(
                &ctx.settings,
                config_path.as_deref(),
                &ctx.region,
                &ctx.aggregator,
            )
            .await
        }
        Some(Commands::Version) => Ok(()),
    }
}
