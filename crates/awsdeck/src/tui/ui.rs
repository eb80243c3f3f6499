//! 描画

use super::app::{App, LaunchField, Mode, Prompt};
use awsdeck_cloud::{LifecycleState, NotificationLevel, ResourceRecord};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_resources(frame, chunks[1], app);
    draw_log(frame, chunks[2], app);
    draw_footer(frame, chunks[3], app);

    match &app.mode {
        Mode::Normal => {}
        Mode::Confirm { prompt, .. } => draw_confirm(frame, prompt),
        Mode::Prompt(prompt) => draw_prompt(frame, prompt),
        Mode::Launch(_) => draw_launch(frame, app),
        Mode::Help => draw_help(frame),
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "awsdeck",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  region: {}  resources: {}", app.region, app.inventory.len())),
    ];
    if !app.pending.is_empty() {
        spans.push(Span::styled(
            format!("  in flight: {}", app.pending.len()),
            Style::default().fg(Color::Yellow),
        ));
    }
    if app.loading {
        spans.push(Span::styled("  更新中...", Style::default().fg(Color::Gray)));
    }

    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn state_style(state: LifecycleState) -> Style {
    match state {
        LifecycleState::Running => Style::default().fg(Color::Green),
        LifecycleState::Stopped | LifecycleState::Terminated => Style::default().fg(Color::Red),
        state if state.is_transitional() => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Gray),
    }
}

fn resource_row<'a>(app: &App, record: &'a ResourceRecord) -> Row<'a> {
    let mut state = record.lifecycle_state.to_string();
    if app.pending_for(&record.key()).is_some() {
        state.push_str(" ⟳");
    }

    Row::new(vec![
        Span::raw(record.provider()),
        Span::raw(record.id()),
        Span::raw(record.display_name.as_str()),
        Span::styled(state, state_style(record.lifecycle_state)),
        Span::raw(record.address_label()),
        Span::styled(
            record.display_tags().join(","),
            Style::default().fg(Color::Gray),
        ),
    ])
}

fn draw_resources(frame: &mut Frame, area: Rect, app: &App) {
    let rows: Vec<Row> = app
        .inventory
        .records()
        .iter()
        .map(|record| resource_row(app, record))
        .collect();

    let header = Row::new(vec!["PROVIDER", "ID", "NAME", "STATE", "ADDRESS", "TAGS"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▶ ")
    .block(
        Block::default()
            .title("リソース (↑↓で移動)")
            .borders(Borders::ALL),
    );

    let mut state = TableState::default();
    if !app.inventory.is_empty() {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn level_style(level: NotificationLevel) -> Style {
    match level {
        NotificationLevel::Info => Style::default().fg(Color::Gray),
        NotificationLevel::Success => Style::default().fg(Color::Green),
        NotificationLevel::Warning => Style::default().fg(Color::Yellow),
        NotificationLevel::Error => Style::default().fg(Color::Red),
    }
}

fn draw_log(frame: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .log
        .iter()
        .rev()
        .take(visible)
        .map(|n| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    n.at.format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(format!("{:<5} ", n.level.to_string()), level_style(n.level)),
                Span::raw(n.message.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().title("通知").borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.mode {
        Mode::Normal => concat!(
            "r: 更新 | s: 起動 | x: 停止 | b: 再起動 | t: タグ | a/d: アドレス | ",
            "p: ポート | c: SSH | l: 作成 | ?: ヘルプ | q: 終了"
        ),
        Mode::Confirm { .. } => "y/Enter: 実行 | n/Esc: キャンセル",
        Mode::Prompt(_) => "Enter: 決定 | Esc: キャンセル",
        Mode::Launch(_) => "←→: プロバイダ | ↑↓: プラン | Tab: 入力欄 | Enter: 作成 | Esc: キャンセル",
        Mode::Help => "任意のキーで閉じる",
    };

    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

/// 画面中央に幅 `width`、高さ `height` の領域を取る
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_modal(frame: &mut Frame, title: &str, lines: Vec<Line>, width: u16) {
    let area = centered_rect(width, lines.len() as u16 + 2, frame.area());
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn draw_confirm(frame: &mut Frame, prompt: &str) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            prompt.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y: 実行  n: キャンセル",
            Style::default().fg(Color::Yellow),
        )),
    ];
    draw_modal(frame, "確認", lines, 70);
}

fn draw_prompt(frame: &mut Frame, prompt: &Prompt) {
    let lines = vec![
        Line::from(format!("対象: {}", prompt.target.id())),
        Line::from(""),
        Line::from(vec![
            Span::raw("> "),
            Span::styled(prompt.input.clone(), Style::default().fg(Color::Green)),
            Span::styled("_", Style::default().fg(Color::Gray)),
        ]),
    ];
    draw_modal(frame, prompt.kind.title(), lines, 70);
}

fn draw_launch(frame: &mut Frame, app: &App) {
    let Mode::Launch(form) = &app.mode else {
        return;
    };
    let Some(target) = app.launch_targets.get(form.target) else {
        return;
    };
    let plan = target
        .plans
        .get(form.plan)
        .map(|p| format!("{} ({})", p.id, p.description))
        .unwrap_or_default();

    let field = |label: &str, value: &str, active: bool| {
        let style = if active {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{:<10}", label), style),
            Span::raw(value.to_string()),
            Span::raw(if active { "_" } else { "" }),
        ])
    };

    let lines = vec![
        Line::from(vec![
            Span::raw("プロバイダ: "),
            Span::styled(target.display_name.clone(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("プラン:     "),
            Span::styled(plan, Style::default().fg(Color::Green)),
        ]),
        Line::from(""),
        field("名前", &form.name, form.field == LaunchField::Name),
        field("キー名", &form.key_name, form.field == LaunchField::KeyName),
        field("ディスク", &form.disk, form.field == LaunchField::Disk),
    ];
    draw_modal(frame, "リソース作成", lines, 72);
}

fn draw_help(frame: &mut Frame) {
    let keys = [
        ("r", "一覧を更新"),
        ("↑↓ / jk", "選択を移動"),
        ("s", "起動 (停止中のみ)"),
        ("x", "停止 (稼働中のみ)"),
        ("b", "再起動 (稼働中のみ)"),
        ("t", "タグを付与"),
        ("a", "パブリックアドレスを割り当て"),
        ("d", "パブリックアドレスを解除"),
        ("p", "ポートを開放"),
        ("c", "新しい端末で SSH 接続"),
        ("l", "インスタンス/データベースを作成"),
        ("q / Esc", "終了"),
    ];
    let lines = keys
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!("{:<10}", key), Style::default().fg(Color::Yellow)),
                Span::raw(*desc),
            ])
        })
        .collect();
    draw_modal(frame, "ヘルプ", lines, 50);
}
