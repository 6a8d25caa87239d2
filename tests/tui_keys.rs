use std::collections::HashMap;

use askbank::app::{App, Command};
use askbank::config::ThemeKind;
use askbank::keymap::{default_keymap, keymap_with};
use askbank::store::MemoryStore;
use askbank::theme::theme_of;
use askbank::tui::{handle_key, sync_lists, Focus, Tui};
use askbank::{render, Catalog, NextQuestion};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, Terminal};

fn catalog() -> Catalog {
    Catalog {
        topics: serde_json::from_str(r#"[{"id":"t1","name":"Work"},{"id":"t2","name":"Food"}]"#)
            .unwrap(),
        questions: serde_json::from_str(r#"{"t1":["Q1","Q2"],"t2":["F1"]}"#).unwrap(),
        persons: serde_json::from_str(
            r#"[{"id":"p1","name":"Alice","group":"AB"},{"id":"p2","name":"Bob","group":"C"}]"#,
        )
        .unwrap(),
        selected: serde_json::from_str(r#"{"p1":{"t1":"engineer"}}"#).unwrap(),
        self_notes: Default::default(),
    }
}

fn setup() -> (App<MemoryStore>, Tui) {
    let app = App::new(catalog(), MemoryStore::new());
    let tui = Tui::new(theme_of(ThemeKind::Dark), default_keymap());
    (app, tui)
}

fn press(app: &mut App<MemoryStore>, tui: &mut Tui, code: KeyCode) -> bool {
    handle_key(app, tui, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
}

fn chars(app: &mut App<MemoryStore>, tui: &mut Tui, s: &str) {
    for ch in s.chars() {
        press(app, tui, KeyCode::Char(ch));
    }
}

/// 选第一个人物与第一个话题
fn pick_first(app: &mut App<MemoryStore>, tui: &mut Tui) {
    press(app, tui, KeyCode::Down);
    press(app, tui, KeyCode::Tab);
    press(app, tui, KeyCode::Down);
}

#[test]
fn navigation_selects_person_and_topic() {
    let (mut app, mut tui) = setup();
    pick_first(&mut app, &mut tui);
    assert_eq!(app.selection().person_id.as_deref(), Some("p1"));
    assert_eq!(app.selection().topic_id.as_deref(), Some("t1"));
    assert_eq!(app.current(), &NextQuestion::Ask("Q1".into()));
}

#[test]
fn memo_then_mark_asked() {
    let (mut app, mut tui) = setup();
    pick_first(&mut app, &mut tui);

    press(&mut app, &mut tui, KeyCode::Char('e'));
    assert_eq!(tui.focus, Focus::Memo);
    chars(&mut app, &mut tui, "hi a");
    assert_eq!(app.memo(), "hi a");
    press(&mut app, &mut tui, KeyCode::Esc);
    assert_eq!(tui.focus, Focus::Topics);

    press(&mut app, &mut tui, KeyCode::Char('a'));
    assert_eq!(app.history().len(), 1);
    assert_eq!(app.history().get(0).unwrap().memo, "hi a");
    assert_eq!(tui.memo_text(), "");
    assert_eq!(app.current(), &NextQuestion::Ask("Q2".into()));
}

#[test]
fn pass_and_random_pick_keys() {
    let (mut app, mut tui) = setup();
    pick_first(&mut app, &mut tui);
    press(&mut app, &mut tui, KeyCode::Char('p'));
    assert!(app.history().is_empty());
    assert_eq!(app.current(), &NextQuestion::Ask("Q2".into()));

    press(&mut app, &mut tui, KeyCode::Char('r'));
    let q = app.current().question().unwrap().to_string();
    assert!(q == "Q2" || q == "F1");
    let tid = app.selection().topic_id.clone().unwrap();
    let pos = app.catalog().topics.iter().position(|t| t.id == tid);
    assert_eq!(tui.topics_state.selected(), pos);
}

#[test]
fn name_filter_is_live() {
    let (mut app, mut tui) = setup();
    press(&mut app, &mut tui, KeyCode::Char('/'));
    assert_eq!(tui.focus, Focus::NameFilter);
    // 输入状态下字符只进筛选框，不触发快捷键
    assert!(!press(&mut app, &mut tui, KeyCode::Char('b')));
    assert_eq!(app.view().persons.len(), 1);
    press(&mut app, &mut tui, KeyCode::Backspace);
    assert_eq!(app.view().persons.len(), 2);
    press(&mut app, &mut tui, KeyCode::Enter);
    assert_eq!(tui.focus, Focus::Persons);
}

#[test]
fn history_star_edit_and_delete() {
    let (mut app, mut tui) = setup();
    pick_first(&mut app, &mut tui);
    press(&mut app, &mut tui, KeyCode::Char('a'));
    press(&mut app, &mut tui, KeyCode::Char('a'));

    press(&mut app, &mut tui, KeyCode::Tab);
    assert_eq!(tui.focus, Focus::History);
    press(&mut app, &mut tui, KeyCode::Down);
    // 第一行是最新的一条（真实下标 1）
    press(&mut app, &mut tui, KeyCode::Char('s'));
    assert!(app.history().get(1).unwrap().starred);
    assert!(!app.history().get(0).unwrap().starred);

    press(&mut app, &mut tui, KeyCode::Enter);
    assert_eq!(tui.focus, Focus::Memo);
    assert_eq!(app.editing(), Some(1));
    chars(&mut app, &mut tui, "ok");
    assert_eq!(app.history().get(1).unwrap().memo, "ok");
    press(&mut app, &mut tui, KeyCode::Esc);
    assert_eq!(tui.focus, Focus::History);

    press(&mut app, &mut tui, KeyCode::Char('d'));
    assert_eq!(app.history().len(), 1);
    assert_eq!(app.history().get(0).unwrap().question, "Q1");
    assert_eq!(tui.history_state.selected(), Some(0));
}

#[test]
fn reset_needs_confirmation() {
    let (mut app, mut tui) = setup();
    pick_first(&mut app, &mut tui);
    press(&mut app, &mut tui, KeyCode::Char('a'));

    press(&mut app, &mut tui, KeyCode::Char('X'));
    assert!(tui.confirm_reset);
    press(&mut app, &mut tui, KeyCode::Char('n'));
    assert!(!tui.confirm_reset);
    assert_eq!(app.history().len(), 1);

    press(&mut app, &mut tui, KeyCode::Char('X'));
    press(&mut app, &mut tui, KeyCode::Char('y'));
    assert!(app.history().is_empty());
    assert_eq!(app.current(), &NextQuestion::Ask("Q1".into()));
}

#[test]
fn enter_on_empty_history_keeps_the_draft() {
    let (mut app, mut tui) = setup();
    pick_first(&mut app, &mut tui);
    press(&mut app, &mut tui, KeyCode::Char('e'));
    chars(&mut app, &mut tui, "draft");
    press(&mut app, &mut tui, KeyCode::Esc);

    press(&mut app, &mut tui, KeyCode::Tab);
    assert_eq!(tui.focus, Focus::History);
    press(&mut app, &mut tui, KeyCode::Enter);
    assert_eq!(tui.focus, Focus::History);
    assert_eq!(app.memo(), "draft");
    assert_eq!(tui.memo_text(), "draft");
}

#[test]
fn rebound_j_runs_its_new_action() {
    let mut keys = HashMap::new();
    keys.insert("j".to_string(), "pass".to_string());
    let mut app = App::new(catalog(), MemoryStore::new());
    let mut tui = Tui::new(theme_of(ThemeKind::Dark), keymap_with(&keys));
    pick_first(&mut app, &mut tui);

    press(&mut app, &mut tui, KeyCode::Char('j'));
    assert_eq!(app.current(), &NextQuestion::Ask("Q2".into()));
    assert_eq!(tui.topics_state.selected(), Some(0));

    // k 仍是默认的上移
    press(&mut app, &mut tui, KeyCode::Char('k'));
    assert_eq!(tui.topics_state.selected(), Some(0));
    assert_eq!(app.selection().topic_id.as_deref(), Some("t1"));
}

#[test]
fn quit_key_returns_true() {
    let (mut app, mut tui) = setup();
    assert!(press(&mut app, &mut tui, KeyCode::Char('q')));
}

#[test]
fn screen_shows_current_question() {
    let (mut app, mut tui) = setup();
    app.apply(Command::SelectPerson(Some("p1".into()))).unwrap();
    app.apply(Command::SelectTopic(Some("t1".into()))).unwrap();
    sync_lists(&app, &mut tui);

    let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
    terminal
        .draw(|f| render::draw(f, &mut tui, &app.view()))
        .unwrap();
    let buf = terminal.backend().buffer();
    let text: String = buf.content().iter().map(|c| c.symbol()).collect();
    assert!(text.contains("Q1"));
    assert!(text.contains("Alice"));
    assert!(text.contains("engineer"));
    assert_eq!(tui.persons_state.selected(), Some(0));
}

#[test]
fn screen_draws_confirm_popup() {
    let (app, mut tui) = setup();
    tui.confirm_reset = true;
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal
        .draw(|f| render::draw(f, &mut tui, &app.view()))
        .unwrap();
    let text: String = terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect();
    assert!(text.contains("[y]"));
}
