//! 界面状态与按键处理。终端初始化/还原见 [`run`]。

use std::{collections::HashMap, io, time::Duration};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, widgets::ListState, Terminal};
use tui_textarea::{Input, Key, TextArea};

use crate::{
    app::{App, Command},
    keymap::KeyAction,
    render,
    store::KvStore,
    theme::Theme,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Persons,
    Topics,
    History,
    Memo,
    GroupFilter,
    NameFilter,
}

pub struct Tui {
    pub focus: Focus,
    pub persons_state: ListState,
    pub topics_state: ListState,
    pub history_state: ListState,
    pub memo: TextArea<'static>,
    pub confirm_reset: bool,
    pub status: Option<String>,
    pub theme: Theme,
    keymap: HashMap<char, KeyAction>,
    // 离开 memo / 筛选输入后回到的焦点
    return_focus: Focus,
}

impl Tui {
    pub fn new(theme: Theme, keymap: HashMap<char, KeyAction>) -> Self {
        Self {
            focus: Focus::Persons,
            persons_state: ListState::default(),
            topics_state: ListState::default(),
            history_state: ListState::default(),
            memo: TextArea::default(),
            confirm_reset: false,
            status: None,
            theme,
            keymap,
            return_focus: Focus::Persons,
        }
    }

    pub fn memo_text(&self) -> String {
        self.memo.lines().join("\n")
    }

    fn enter(&mut self, focus: Focus) {
        if matches!(self.focus, Focus::Persons | Focus::Topics | Focus::History) {
            self.return_focus = self.focus;
        }
        self.focus = focus;
    }

    fn leave_input(&mut self) {
        self.focus = self.return_focus;
    }
}

pub fn run<S: KvStore>(app: &mut App<S>, tui: &mut Tui) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, app, tui);

    // 退出还原
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn run_loop<B: ratatui::backend::Backend, S: KvStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
    tui: &mut Tui,
) -> Result<()> {
    loop {
        terminal.draw(|f| render::draw(f, tui, &app.view()))?;
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(k) = event::read()? {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(app, tui, k) {
                    Ok(true) => break,
                    Ok(false) => {}
                    // 单个命令失败不退出，记日志并显示在状态栏
                    Err(err) => {
                        log::error!("event=command_failed err={:#}", err);
                        tui.status = Some(format!("操作失败: {err}"));
                    }
                }
            }
        }
    }
    Ok(())
}

/// 返回 true 表示退出
pub fn handle_key<S: KvStore>(app: &mut App<S>, tui: &mut Tui, key: KeyEvent) -> Result<bool> {
    if tui.confirm_reset {
        tui.confirm_reset = false;
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            app.apply(Command::Reset { purge: false })?;
            sync_memo(app, tui);
            sync_lists(app, tui);
            tui.status = Some("历史已清空".into());
        } else {
            tui.status = Some("已取消".into());
        }
        return Ok(false);
    }
    match tui.focus {
        Focus::Memo => handle_memo_key(app, tui, key)?,
        Focus::GroupFilter | Focus::NameFilter => handle_filter_key(app, tui, key)?,
        Focus::Persons | Focus::Topics | Focus::History => return handle_nav_key(app, tui, key),
    }
    Ok(false)
}

fn handle_memo_key<S: KvStore>(app: &mut App<S>, tui: &mut Tui, key: KeyEvent) -> Result<()> {
    if key.code == KeyCode::Esc {
        tui.leave_input();
        return Ok(());
    }
    if tui.memo.input(to_input(key)) {
        app.apply(Command::EditMemo(tui.memo_text()))?;
    }
    Ok(())
}

fn handle_filter_key<S: KvStore>(app: &mut App<S>, tui: &mut Tui, key: KeyEvent) -> Result<()> {
    let group = tui.focus == Focus::GroupFilter;
    let mut text = if group {
        app.view().filter.group.clone()
    } else {
        app.view().filter.name.clone()
    };
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            tui.leave_input();
            return Ok(());
        }
        KeyCode::Backspace => {
            text.pop();
        }
        KeyCode::Char(ch) => text.push(ch),
        _ => return Ok(()),
    }
    app.apply(if group {
        Command::SetGroupFilter(text)
    } else {
        Command::SetNameFilter(text)
    })?;
    sync_lists(app, tui);
    Ok(())
}

fn handle_nav_key<S: KvStore>(app: &mut App<S>, tui: &mut Tui, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Tab => focus_next(tui),
        KeyCode::Down => move_selection(app, tui, 1)?,
        KeyCode::Up => move_selection(app, tui, -1)?,
        KeyCode::Enter if tui.focus == Focus::History => {
            // 没有选中行时不动 memo 草稿
            if let Some(idx) = selected_history_index(app, tui) {
                app.apply(Command::EditHistoryMemo(Some(idx)))?;
                sync_memo(app, tui);
                tui.enter(Focus::Memo);
            }
        }
        KeyCode::Esc if tui.focus == Focus::History && app.editing().is_some() => {
            app.apply(Command::EditHistoryMemo(None))?;
            sync_memo(app, tui);
        }
        KeyCode::Char(ch) => {
            if let Some(action) = tui.keymap.get(&ch).copied() {
                return apply_action(app, tui, action);
            }
        }
        _ => {}
    }
    Ok(false)
}

fn apply_action<S: KvStore>(app: &mut App<S>, tui: &mut Tui, action: KeyAction) -> Result<bool> {
    tui.status = None;
    match action {
        KeyAction::MarkAsked => {
            app.apply(Command::MarkAsked)?;
            sync_memo(app, tui);
            sync_lists(app, tui);
        }
        KeyAction::Pass => app.apply(Command::Pass)?,
        KeyAction::PickRandom => {
            app.apply(Command::PickRandom)?;
            sync_lists(app, tui);
        }
        KeyAction::ResetHistory => tui.confirm_reset = true,
        KeyAction::EditMemo => tui.enter(Focus::Memo),
        KeyAction::EditGroupFilter => tui.enter(Focus::GroupFilter),
        KeyAction::EditNameFilter => tui.enter(Focus::NameFilter),
        KeyAction::ToggleStar => {
            if let Some(idx) = history_target(app, tui) {
                app.apply(Command::ToggleStar(idx))?;
            }
        }
        KeyAction::DeleteHistory => {
            if let Some(idx) = history_target(app, tui) {
                app.apply(Command::Delete(idx))?;
                sync_memo(app, tui);
                sync_lists(app, tui);
            }
        }
        KeyAction::FocusNext => focus_next(tui),
        KeyAction::MoveDown => move_selection(app, tui, 1)?,
        KeyAction::MoveUp => move_selection(app, tui, -1)?,
        KeyAction::Quit => return Ok(true),
    }
    Ok(false)
}

fn history_target<S: KvStore>(app: &App<S>, tui: &Tui) -> Option<usize> {
    if tui.focus == Focus::History {
        selected_history_index(app, tui)
    } else {
        None
    }
}

fn selected_history_index<S: KvStore>(app: &App<S>, tui: &Tui) -> Option<usize> {
    tui.history_state
        .selected()
        .and_then(|pos| app.history().true_index(pos))
}

fn focus_next(tui: &mut Tui) {
    tui.focus = match tui.focus {
        Focus::Persons => Focus::Topics,
        Focus::Topics => Focus::History,
        _ => Focus::Persons,
    };
}

fn step(state: &mut ListState, len: usize, delta: isize) -> Option<usize> {
    if len == 0 {
        state.select(None);
        return None;
    }
    let next = match state.selected() {
        Some(i) => (i as isize + delta).clamp(0, len as isize - 1) as usize,
        None => 0,
    };
    state.select(Some(next));
    Some(next)
}

fn move_selection<S: KvStore>(app: &mut App<S>, tui: &mut Tui, delta: isize) -> Result<()> {
    match tui.focus {
        Focus::Persons => {
            let id = {
                let view = app.view();
                step(&mut tui.persons_state, view.persons.len(), delta)
                    .and_then(|i| view.persons.get(i).map(|p| p.id.clone()))
            };
            app.apply(Command::SelectPerson(id))?;
        }
        Focus::Topics => {
            let id = step(&mut tui.topics_state, app.catalog().topics.len(), delta)
                .and_then(|i| app.catalog().topics.get(i).map(|t| t.id.clone()));
            app.apply(Command::SelectTopic(id))?;
        }
        Focus::History => {
            step(&mut tui.history_state, app.history().len(), delta);
        }
        _ => {}
    }
    Ok(())
}

/// 让列表高亮跟上 App 里的选择（筛选变化、随机选题、删除之后）
pub fn sync_lists<S: KvStore>(app: &App<S>, tui: &mut Tui) {
    let view = app.view();
    let person_pos = view
        .selection
        .person_id
        .as_deref()
        .and_then(|pid| view.persons.iter().position(|p| p.id == pid));
    tui.persons_state.select(person_pos);
    let topic_pos = view
        .selection
        .topic_id
        .as_deref()
        .and_then(|tid| view.topics.iter().position(|t| t.id == tid));
    tui.topics_state.select(topic_pos);
    let n = view.history.len();
    match tui.history_state.selected() {
        Some(_) if n == 0 => tui.history_state.select(None),
        Some(i) if i >= n => tui.history_state.select(Some(n - 1)),
        _ => {}
    }
}

pub fn sync_memo<S: KvStore>(app: &App<S>, tui: &mut Tui) {
    let lines: Vec<String> = app.memo().split('\n').map(str::to_string).collect();
    tui.memo = TextArea::from(lines);
}

fn to_input(key: KeyEvent) -> Input {
    let k = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Enter => Key::Enter,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Tab => Key::Tab,
        KeyCode::Delete => Key::Delete,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Esc => Key::Esc,
        KeyCode::F(n) => Key::F(n),
        _ => Key::Null,
    };
    Input {
        key: k,
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
    }
}
