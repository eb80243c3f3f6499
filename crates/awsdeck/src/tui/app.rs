//! ダッシュボードの状態とキー操作

use awsdeck_cloud::{
    Action, ActionRequest, AddressMode, ConfirmationGate, ConfirmationTicket, Confirmed,
    CreateRequest, Inventory, Notification, NotificationLevel, PendingOperation, PlanOption,
    PortRule, Protocol, ResourceKey, ResourceRecord,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;

/// 通知ログに保持する件数
pub const LOG_CAPACITY: usize = 200;

/// 作成フローで選べるプロバイダ
#[derive(Debug, Clone)]
pub struct LaunchTarget {
    pub provider: String,
    pub display_name: String,
    pub plans: Vec<PlanOption>,
}

/// 入力プロンプトの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Tag,
    Port,
    Address,
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::Tag => "タグ (key=value)",
            PromptKind::Port => "ポート (443, 8000-8100/udp, 22 10.0.0.0/8)",
            PromptKind::Address => "アドレス (空欄で空きアドレスを再利用/新規確保)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    pub target: ResourceRecord,
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchField {
    Name,
    KeyName,
    Disk,
}

impl LaunchField {
    fn next(self) -> Self {
        match self {
            LaunchField::Name => LaunchField::KeyName,
            LaunchField::KeyName => LaunchField::Disk,
            LaunchField::Disk => LaunchField::Name,
        }
    }
}

/// リソース作成フォーム
#[derive(Debug, Clone)]
pub struct LaunchForm {
    pub target: usize,
    pub plan: usize,
    pub name: String,
    pub key_name: String,
    pub disk: String,
    pub field: LaunchField,
}

impl LaunchForm {
    fn new() -> Self {
        Self {
            target: 0,
            plan: 0,
            name: String::new(),
            key_name: String::new(),
            disk: String::new(),
            field: LaunchField::Name,
        }
    }

    fn input_mut(&mut self) -> &mut String {
        match self.field {
            LaunchField::Name => &mut self.name,
            LaunchField::KeyName => &mut self.key_name,
            LaunchField::Disk => &mut self.disk,
        }
    }

    /// 入力内容から作成リクエストを組み立てる
    pub fn request(&self, targets: &[LaunchTarget]) -> Result<(String, CreateRequest), String> {
        let target = targets
            .get(self.target)
            .ok_or_else(|| "no provider supports resource creation".to_string())?;
        let plan = target
            .plans
            .get(self.plan)
            .ok_or_else(|| format!("{} has no plans", target.display_name))?;

        let mut request = CreateRequest::new(self.name.trim(), plan.id);
        if !self.key_name.trim().is_empty() {
            request = request.with_key_name(self.key_name.trim());
        }
        if !self.disk.trim().is_empty() {
            let gib = self
                .disk
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid disk size: {}", self.disk.trim()))?;
            request = request.with_disk_size(gib);
        }
        request
            .validate(&target.plans)
            .map_err(|e| e.to_string())?;
        Ok((target.provider.clone(), request))
    }
}

/// 入力モード
#[derive(Debug)]
pub enum Mode {
    Normal,
    Confirm {
        ticket: ConfirmationTicket,
        prompt: String,
    },
    Prompt(Prompt),
    Launch(LaunchForm),
    Help,
}

/// キー操作の結果としてイベントループが実行すること
#[derive(Debug)]
pub enum Effect {
    None,
    Quit,
    Refresh,
    Submit(Confirmed<ActionRequest>),
    Launch {
        provider: String,
        request: CreateRequest,
    },
    Shell(ResourceRecord),
}

pub struct App {
    pub region: String,
    pub inventory: Inventory,
    pub selected: usize,
    pub log: VecDeque<Notification>,
    pub mode: Mode,
    pub pending: Vec<PendingOperation>,
    pub loading: bool,
    pub launch_targets: Vec<LaunchTarget>,
    gate: ConfirmationGate<ActionRequest>,
    refresh_queued: bool,
}

impl App {
    pub fn new(region: impl Into<String>, launch_targets: Vec<LaunchTarget>) -> Self {
        Self {
            region: region.into(),
            inventory: Inventory::new(),
            selected: 0,
            log: VecDeque::new(),
            mode: Mode::Normal,
            pending: Vec::new(),
            loading: false,
            launch_targets,
            gate: ConfirmationGate::new(),
            refresh_queued: false,
        }
    }

    pub fn selected_record(&self) -> Option<&ResourceRecord> {
        self.inventory.records().get(self.selected)
    }

    /// 新しい一覧に差し替える。選択中のリソースは位置が変わっても追従する
    pub fn set_inventory(&mut self, inventory: Inventory) {
        let selected_key = self.selected_record().map(ResourceRecord::key);
        self.inventory = inventory;
        self.selected = selected_key
            .and_then(|key| {
                self.inventory
                    .records()
                    .iter()
                    .position(|r| r.key() == key)
            })
            .unwrap_or(self.selected)
            .min(self.inventory.len().saturating_sub(1));
    }

    /// 取得を始めてよければ true。取得中なら完了後の取り直しを予約する
    pub fn begin_refresh(&mut self) -> bool {
        if self.loading {
            self.refresh_queued = true;
            return false;
        }
        self.loading = true;
        true
    }

    /// 取得の完了。予約済みの取り直しがあれば true
    pub fn finish_refresh(&mut self) -> bool {
        self.loading = false;
        std::mem::take(&mut self.refresh_queued)
    }

    pub fn push_notification(&mut self, notification: Notification) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(notification);
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.push_notification(Notification::new(NotificationLevel::Warning, message));
    }

    /// 対象リソースで進行中の操作
    pub fn pending_for(&self, key: &ResourceKey) -> Option<&PendingOperation> {
        self.pending.iter().find(|op| &op.target == key)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Effect::Quit;
        }

        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.handle_normal(key.code),
            Mode::Help => Effect::None,
            Mode::Confirm { ticket, prompt } => self.handle_confirm(key.code, ticket, prompt),
            Mode::Prompt(prompt) => self.handle_prompt(key.code, prompt),
            Mode::Launch(form) => self.handle_launch(key.code, form),
        }
    }

    fn handle_normal(&mut self, code: KeyCode) -> Effect {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Effect::Quit,
            KeyCode::Char('r') => Effect::Refresh,
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.inventory.len() {
                    self.selected += 1;
                }
                Effect::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                Effect::None
            }
            KeyCode::Char('s') => self.request_action(Action::Start),
            KeyCode::Char('x') => self.request_action(Action::Stop),
            KeyCode::Char('b') => self.request_action(Action::Reboot),
            KeyCode::Char('d') => self.request_action(Action::DetachAddress),
            KeyCode::Char('t') => self.open_prompt(PromptKind::Tag),
            KeyCode::Char('p') => self.open_prompt(PromptKind::Port),
            KeyCode::Char('a') => self.open_prompt(PromptKind::Address),
            KeyCode::Char('c') => match self.selected_record() {
                Some(record) => Effect::Shell(record.clone()),
                None => Effect::None,
            },
            KeyCode::Char('l') => {
                if self.launch_targets.is_empty() {
                    self.warn("No provider supports resource creation");
                } else {
                    self.mode = Mode::Launch(LaunchForm::new());
                }
                Effect::None
            }
            KeyCode::Char('?') => {
                self.mode = Mode::Help;
                Effect::None
            }
            _ => Effect::None,
        }
    }

    /// 破壊的操作は必ず確認を挟む
    fn request_action(&mut self, action: Action) -> Effect {
        let Some(target) = self.selected_record().cloned() else {
            return Effect::None;
        };
        self.confirm_request(ActionRequest::new(target, action));
        Effect::None
    }

    fn confirm_request(&mut self, request: ActionRequest) {
        let prompt = request.prompt();
        let label = request.action.to_string();
        let target = request.target.key();
        let ticket = self.gate.request(label, target, request);
        self.mode = Mode::Confirm { ticket, prompt };
    }

    fn handle_confirm(
        &mut self,
        code: KeyCode,
        ticket: ConfirmationTicket,
        prompt: String,
    ) -> Effect {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.gate.confirm(&ticket) {
                    Some(confirmed) => Effect::Submit(confirmed),
                    None => Effect::None,
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.gate.cancel(&ticket);
                Effect::None
            }
            _ => {
                self.mode = Mode::Confirm { ticket, prompt };
                Effect::None
            }
        }
    }

    fn open_prompt(&mut self, kind: PromptKind) -> Effect {
        if let Some(target) = self.selected_record().cloned() {
            self.mode = Mode::Prompt(Prompt {
                kind,
                target,
                input: String::new(),
            });
        }
        Effect::None
    }

    fn handle_prompt(&mut self, code: KeyCode, mut prompt: Prompt) -> Effect {
        match code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                let parsed = match prompt.kind {
                    PromptKind::Tag => parse_tag(&prompt.input),
                    PromptKind::Port => parse_port(&prompt.input).map(Action::OpenPort),
                    PromptKind::Address => Ok(parse_address(&prompt.input)),
                };
                match parsed {
                    Ok(action) => self.confirm_request(ActionRequest::new(prompt.target, action)),
                    Err(message) => self.warn(message),
                }
            }
            KeyCode::Backspace => {
                prompt.input.pop();
                self.mode = Mode::Prompt(prompt);
            }
            KeyCode::Char(c) => {
                prompt.input.push(c);
                self.mode = Mode::Prompt(prompt);
            }
            _ => self.mode = Mode::Prompt(prompt),
        }
        Effect::None
    }

    fn handle_launch(&mut self, code: KeyCode, mut form: LaunchForm) -> Effect {
        let targets = self.launch_targets.len().max(1);
        match code {
            KeyCode::Esc => return Effect::None,
            KeyCode::Enter => match form.request(&self.launch_targets) {
                Ok((provider, request)) => return Effect::Launch { provider, request },
                Err(message) => self.warn(message),
            },
            KeyCode::Tab => form.field = form.field.next(),
            KeyCode::Left => {
                form.target = (form.target + targets - 1) % targets;
                form.plan = 0;
            }
            KeyCode::Right => {
                form.target = (form.target + 1) % targets;
                form.plan = 0;
            }
            KeyCode::Up | KeyCode::Down => {
                let plans = self
                    .launch_targets
                    .get(form.target)
                    .map_or(1, |t| t.plans.len().max(1));
                form.plan = if code == KeyCode::Up {
                    (form.plan + plans - 1) % plans
                } else {
                    (form.plan + 1) % plans
                };
            }
            KeyCode::Backspace => {
                form.input_mut().pop();
            }
            KeyCode::Char(c) => form.input_mut().push(c),
            _ => {}
        }
        self.mode = Mode::Launch(form);
        Effect::None
    }
}

/// `key=value` を解釈する
pub fn parse_tag(input: &str) -> Result<Action, String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", input))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("tag key must not be empty".to_string());
    }
    Ok(Action::Tag {
        key: key.to_string(),
        value: value.trim().to_string(),
    })
}

/// `<port>[-<port>][/tcp|/udp] [cidr]` を解釈する
pub fn parse_port(input: &str) -> Result<PortRule, String> {
    let mut parts = input.split_whitespace();
    let head = parts.next().ok_or("port must not be empty")?;

    let (range, protocol) = match head.split_once('/') {
        Some((range, "tcp")) => (range, Protocol::Tcp),
        Some((range, "udp")) => (range, Protocol::Udp),
        Some((_, other)) => return Err(format!("unknown protocol: {}", other)),
        None => (head, Protocol::Tcp),
    };

    let parse = |s: &str| {
        s.parse::<u16>()
            .map_err(|_| format!("invalid port: {}", s))
    };
    let (from_port, to_port) = match range.split_once('-') {
        Some((from, to)) => (parse(from)?, parse(to)?),
        None => {
            let port = parse(range)?;
            (port, port)
        }
    };

    let mut rule = PortRule {
        protocol,
        from_port,
        to_port,
        cidr: "0.0.0.0/0".to_string(),
    };
    if let Some(cidr) = parts.next() {
        rule = rule.with_cidr(cidr);
    }
    rule.validate().map_err(|e| e.to_string())?;
    Ok(rule)
}

fn parse_address(input: &str) -> Action {
    match input.trim() {
        "" => Action::AttachAddress(AddressMode::AllocateNew),
        address => Action::AttachAddress(AddressMode::ReuseExisting(address.to_string())),
    }
}
