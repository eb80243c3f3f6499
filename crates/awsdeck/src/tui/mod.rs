//! TUI (Terminal User Interface) モジュール
//!
//! ratatui を使用したインタラクティブなダッシュボード。AWS への呼び出しは
//! すべてバックグラウンドのタスクで行い、描画ループは止めない。

pub mod app;
pub mod terminal;
pub mod ui;

use crate::context::{AppContext, shell_settings};
use crate::shell::TerminalShellLauncher;
use app::{App, Effect, LaunchTarget};
use awsdeck_cloud::{
    ActionOrchestrator, CloudError, Inventory, InventoryAggregator, Notification,
    NotificationLevel, ShellSettings,
};
use crossterm::event::{self, Event, KeyEventKind};
use std::sync::Arc;
use std::time::Duration;
use terminal::{Tui, restore_terminal, setup_terminal};
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_millis(200);

/// バックグラウンドタスクからの結果
enum AppEvent {
    Refreshed(Result<Inventory, CloudError>),
}

struct Runtime {
    aggregator: Arc<InventoryAggregator>,
    orchestrator: ActionOrchestrator,
    shell: Arc<ShellSettings>,
    launcher: Arc<TerminalShellLauncher>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl Runtime {
    fn refresh(&self, app: &mut App) {
        if !app.begin_refresh() {
            return;
        }
        let aggregator = Arc::clone(&self.aggregator);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = aggregator.refresh().await;
            let _ = events.send(AppEvent::Refreshed(result));
        });
    }

    /// 結果は通知チャネル経由で届く
    fn apply(&self, app: &mut App, effect: Effect) -> bool {
        match effect {
            Effect::None => {}
            Effect::Quit => return false,
            Effect::Refresh => self.refresh(app),
            Effect::Submit(request) => {
                let orchestrator = self.orchestrator.clone();
                tokio::spawn(async move {
                    if let Err(e) = orchestrator.submit(request).await {
                        tracing::debug!("Action failed: {}", e);
                    }
                });
            }
            Effect::Launch { provider, request } => {
                let orchestrator = self.orchestrator.clone();
                tokio::spawn(async move {
                    if let Err(e) = orchestrator.launch(&provider, &request).await {
                        tracing::debug!("Launch failed: {}", e);
                    }
                });
            }
            Effect::Shell(record) => {
                let orchestrator = self.orchestrator.clone();
                let shell = Arc::clone(&self.shell);
                let launcher = Arc::clone(&self.launcher);
                tokio::spawn(async move {
                    if let Err(e) = orchestrator
                        .open_shell(&record, &shell, launcher.as_ref())
                        .await
                    {
                        tracing::debug!("Shell failed: {}", e);
                    }
                });
            }
        }
        true
    }
}

/// 作成に対応しているプロバイダ
fn launch_targets(aggregator: &InventoryAggregator) -> Vec<LaunchTarget> {
    aggregator
        .providers()
        .iter()
        .filter(|p| !p.catalog().is_empty())
        .map(|p| LaunchTarget {
            provider: p.name().to_string(),
            display_name: p.display_name().to_string(),
            plans: p.catalog().to_vec(),
        })
        .collect()
}

/// ダッシュボードを起動
pub async fn run(ctx: AppContext) -> anyhow::Result<()> {
    let AppContext {
        settings,
        region,
        aggregator,
        orchestrator,
        mut notifications,
    } = ctx;

    let mut app = App::new(region, launch_targets(&aggregator));
    let (events, mut event_rx) = mpsc::unbounded_channel();
    let runtime = Runtime {
        aggregator: Arc::new(aggregator),
        orchestrator,
        shell: Arc::new(shell_settings(&settings)),
        launcher: Arc::new(TerminalShellLauncher::new(settings.ssh.terminal.clone())),
        events,
    };

    let mut terminal = setup_terminal()?;
    let result = event_loop(
        &mut terminal,
        &mut app,
        &runtime,
        &mut notifications,
        &mut event_rx,
    )
    .await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Tui,
    app: &mut App,
    runtime: &Runtime,
    notifications: &mut mpsc::UnboundedReceiver<Notification>,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> anyhow::Result<()> {
    runtime.refresh(app);

    loop {
        while let Ok(AppEvent::Refreshed(result)) = event_rx.try_recv() {
            match result {
                Ok(inventory) => app.set_inventory(inventory),
                Err(e) => {
                    tracing::warn!("Refresh failed: {}", e);
                    let notification = Notification::from_error("Failed to refresh inventory", &e);
                    app.push_notification(notification);
                }
            }
            if app.finish_refresh() {
                runtime.refresh(app);
            }
        }

        // 状態が変わり得る通知を受けたら一覧を取り直す
        let mut stale = false;
        while let Ok(notification) = notifications.try_recv() {
            stale |= notification.level != NotificationLevel::Info;
            app.push_notification(notification);
        }
        if stale {
            runtime.refresh(app);
        }

        app.pending = runtime.orchestrator.pending().await;
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(TICK)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let effect = app.handle_key(key);
            if !runtime.apply(app, effect) {
                return Ok(());
            }
        }
    }
}
