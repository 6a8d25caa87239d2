//! 应用状态与命令分发。
//!
//! 所有可变状态都在 [`App`] 里：题库、存储、已问记录、历史、当前选择、
//! 筛选条件、memo 草稿，以及当前显示的问题。界面层只发 [`Command`]，
//! 再用 [`App::view`] 取回要画的数据。

use anyhow::Result;
use chrono::Utc;
use rand::Rng;

use crate::{
    catalog::{filter_persons, Catalog, Person, Topic},
    history::{History, HistoryEntry},
    store::{load_or_default, save_value, KvStore, ASKED_KEY, HISTORY_KEY},
    tracker::{next_question, pick_random, AskedRecord, NextQuestion},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub person_id: Option<String>,
    pub topic_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    pub group: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetGroupFilter(String),
    SetNameFilter(String),
    SelectPerson(Option<String>),
    SelectTopic(Option<String>),
    MarkAsked,
    Pass,
    PickRandom,
    /// memo 草稿改动；若正在编辑某条历史则同步写入
    EditMemo(String),
    /// 选中一条历史（真实下标）来编辑它的 memo；None 取消
    EditHistoryMemo(Option<usize>),
    ToggleStar(usize),
    Delete(usize),
    Reset { purge: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRow<'a> {
    pub text: &'a str,
    pub asked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow<'a> {
    /// 在历史中的真实下标（插入顺序）
    pub index: usize,
    pub entry: &'a HistoryEntry,
}

#[derive(Debug, Clone)]
pub struct View<'a> {
    pub persons: Vec<&'a Person>,
    pub topics: &'a [Topic],
    pub selection: &'a Selection,
    pub filter: &'a PersonFilter,
    pub next: &'a NextQuestion,
    pub questions: Vec<QuestionRow<'a>>,
    pub person_note: Option<&'a str>,
    pub self_note: Option<&'a str>,
    pub history: Vec<HistoryRow<'a>>,
    pub memo: &'a str,
    pub editing: Option<usize>,
    /// (已问, 总数)，针对当前人物 + 话题
    pub progress: (usize, usize),
}

pub struct App<S: KvStore> {
    catalog: Catalog,
    store: S,
    asked: AskedRecord,
    history: History,
    selection: Selection,
    filter: PersonFilter,
    current: NextQuestion,
    memo: String,
    editing: Option<usize>,
}

impl<S: KvStore> App<S> {
    pub fn new(catalog: Catalog, store: S) -> Self {
        let asked: AskedRecord = load_or_default(&store, ASKED_KEY);
        let history: History = load_or_default(&store, HISTORY_KEY);
        log::debug!(
            "event=state_loaded history={} asked_empty={}",
            history.len(),
            asked.is_empty()
        );
        Self {
            catalog,
            store,
            asked,
            history,
            selection: Selection::default(),
            filter: PersonFilter::default(),
            current: NextQuestion::NeedSelection,
            memo: String::new(),
            editing: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn asked(&self) -> &AskedRecord {
        &self.asked
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current(&self) -> &NextQuestion {
        &self.current
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    pub fn apply(&mut self, cmd: Command) -> Result<()> {
        self.apply_with(cmd, &mut rand::thread_rng())
    }

    /// 与 [`App::apply`] 相同，但随机选题使用给定的 rng
    pub fn apply_with<R: Rng>(&mut self, cmd: Command, rng: &mut R) -> Result<()> {
        match cmd {
            Command::SetGroupFilter(g) => {
                self.filter.group = g;
                self.drop_filtered_out_person();
            }
            Command::SetNameFilter(n) => {
                self.filter.name = n;
                self.drop_filtered_out_person();
            }
            Command::SelectPerson(p) => {
                self.selection.person_id = p.filter(|s| !s.is_empty());
                self.refresh_current();
            }
            Command::SelectTopic(t) => {
                self.selection.topic_id = t.filter(|s| !s.is_empty());
                self.refresh_current();
            }
            Command::MarkAsked => self.mark_asked()?,
            Command::Pass => self.pass()?,
            Command::PickRandom => self.pick_random(rng),
            Command::EditMemo(text) => {
                if let Some(idx) = self.editing {
                    if self.history.set_memo(idx, &text) {
                        save_value(&mut self.store, HISTORY_KEY, &self.history)?;
                    }
                }
                self.memo = text;
            }
            Command::EditHistoryMemo(idx) => {
                self.editing = idx.filter(|i| *i < self.history.len());
                self.memo = self
                    .editing
                    .and_then(|i| self.history.get(i))
                    .map(|e| e.memo.clone())
                    .unwrap_or_default();
            }
            Command::ToggleStar(idx) => {
                if self.history.toggle_star(idx) {
                    save_value(&mut self.store, HISTORY_KEY, &self.history)?;
                }
            }
            Command::Delete(idx) => {
                if self.history.delete(idx) {
                    save_value(&mut self.store, HISTORY_KEY, &self.history)?;
                    log::info!("event=history_delete index={}", idx);
                }
                self.editing = None;
                self.memo.clear();
            }
            Command::Reset { purge } => self.reset(purge)?,
        }
        Ok(())
    }

    fn refresh_current(&mut self) {
        self.current = next_question(
            self.selection.person_id.as_deref(),
            self.selection.topic_id.as_deref(),
            &self.catalog,
            &self.asked,
        );
    }

    fn drop_filtered_out_person(&mut self) {
        if let Some(pid) = self.selection.person_id.as_deref() {
            let still_there = filter_persons(
                &self.catalog.persons,
                &self.filter.group,
                &self.filter.name,
            )
            .iter()
            .any(|p| p.id == pid);
            if !still_there {
                self.selection.person_id = None;
                self.refresh_current();
            }
        }
    }

    /// 当前显示的问题 + 两个 id；任何一个缺失都返回 None
    fn surfaced(&self) -> Option<(String, String, String)> {
        let pid = self.selection.person_id.clone()?;
        let tid = self.selection.topic_id.clone()?;
        let q = self.current.question()?.to_string();
        Some((pid, tid, q))
    }

    /// 先落盘再更新内存；历史写入失败时把已问记录写回原样
    fn mark_asked(&mut self) -> Result<()> {
        let Some((pid, tid, q)) = self.surfaced() else {
            return Ok(());
        };
        let mut asked = self.asked.clone();
        asked.push(&pid, &tid, &q);

        let person_name = self
            .catalog
            .person(&pid)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| pid.clone());
        let topic_name = self
            .catalog
            .topic(&tid)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| tid.clone());
        let mut history = self.history.clone();
        history.push(HistoryEntry {
            person_id: pid.clone(),
            person_name,
            topic_id: tid.clone(),
            topic_name,
            question: q,
            memo: self.memo.clone(),
            starred: false,
            asked_at: Some(Utc::now().to_rfc3339()),
        });

        save_value(&mut self.store, ASKED_KEY, &asked)?;
        if let Err(err) = save_value(&mut self.store, HISTORY_KEY, &history) {
            if let Err(undo) = save_value(&mut self.store, ASKED_KEY, &self.asked) {
                log::error!("event=mark_asked_rollback_failed err={}", undo);
            }
            return Err(err.into());
        }
        log::info!("event=mark_asked person={} topic={}", pid, tid);

        self.asked = asked;
        self.history = history;
        self.memo.clear();
        self.editing = None;
        self.refresh_current();
        Ok(())
    }

    fn pass(&mut self) -> Result<()> {
        let Some((pid, tid, q)) = self.surfaced() else {
            return Ok(());
        };
        let mut asked = self.asked.clone();
        asked.push(&pid, &tid, &q);
        save_value(&mut self.store, ASKED_KEY, &asked)?;
        self.asked = asked;
        log::info!("event=pass person={} topic={}", pid, tid);
        self.refresh_current();
        Ok(())
    }

    fn pick_random<R: Rng>(&mut self, rng: &mut R) {
        let Some(pid) = self.selection.person_id.as_deref() else {
            self.current = NextQuestion::NeedSelection;
            return;
        };
        match pick_random(pid, &self.catalog, &self.asked, rng) {
            Some(pick) => {
                log::debug!("event=pick_random person={} topic={}", pid, pick.topic_id);
                self.selection.topic_id = Some(pick.topic_id);
                self.current = NextQuestion::Ask(pick.question);
            }
            None => self.current = NextQuestion::Exhausted,
        }
    }

    fn reset(&mut self, purge: bool) -> Result<()> {
        if purge {
            self.store.clear()?;
        } else {
            self.store.remove(HISTORY_KEY)?;
            self.store.remove(ASKED_KEY)?;
        }
        self.asked = AskedRecord::new();
        self.history = History::new();
        self.memo.clear();
        self.editing = None;
        self.refresh_current();
        log::info!("event=reset purge={}", purge);
        Ok(())
    }

    pub fn view(&self) -> View<'_> {
        let pid = self.selection.person_id.as_deref();
        let tid = self.selection.topic_id.as_deref();
        let questions: Vec<QuestionRow<'_>> = tid
            .map(|t| {
                self.catalog
                    .questions_of(t)
                    .iter()
                    .map(|q| QuestionRow {
                        text: q,
                        asked: pid.is_some_and(|p| self.asked.contains(p, t, q)),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let progress = (
            questions.iter().filter(|r| r.asked).count(),
            questions.len(),
        );
        View {
            persons: filter_persons(
                &self.catalog.persons,
                &self.filter.group,
                &self.filter.name,
            ),
            topics: &self.catalog.topics,
            selection: &self.selection,
            filter: &self.filter,
            next: &self.current,
            questions,
            person_note: pid.zip(tid).and_then(|(p, t)| self.catalog.person_note(p, t)),
            self_note: tid.and_then(|t| self.catalog.self_note(t)),
            history: self
                .history
                .display()
                .map(|(index, entry)| HistoryRow { index, entry })
                .collect(),
            memo: &self.memo,
            editing: self.editing,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rand::{rngs::StdRng, SeedableRng};

    fn catalog() -> Catalog {
        let topics = r#"[{"id":"t1","name":"Work"},{"id":"t2","name":"Food"}]"#;
        let persons = r#"[{"id":1,"name":"Alice","group":"AB"},{"id":2,"name":"Bob","group":"C"}]"#;
        Catalog {
            topics: serde_json::from_str(topics).unwrap(),
            questions: serde_json::from_str(r#"{"t1":["Q1","Q2"],"t2":["F1"]}"#).unwrap(),
            persons: serde_json::from_str(persons).unwrap(),
            selected: serde_json::from_str(r#"{"1":{"t1":"engineer"}}"#).unwrap(),
            self_notes: serde_json::from_str(r#"{"t1":"I write Rust"}"#).unwrap(),
        }
    }

    fn app() -> App<MemoryStore> {
        App::new(catalog(), MemoryStore::new())
    }

    fn select(app: &mut App<MemoryStore>, p: &str, t: &str) {
        app.apply(Command::SelectPerson(Some(p.into()))).unwrap();
        app.apply(Command::SelectTopic(Some(t.into()))).unwrap();
    }

    #[test]
    fn mark_asked_advances_and_snapshots_names() {
        let mut app = app();
        select(&mut app, "1", "t1");
        assert_eq!(app.current(), &NextQuestion::Ask("Q1".into()));
        app.apply(Command::EditMemo("first chat".into())).unwrap();
        app.apply(Command::MarkAsked).unwrap();

        assert_eq!(app.current(), &NextQuestion::Ask("Q2".into()));
        let e = app.history().get(0).unwrap();
        assert_eq!(e.person_name, "Alice");
        assert_eq!(e.topic_name, "Work");
        assert_eq!(e.question, "Q1");
        assert_eq!(e.memo, "first chat");
        assert!(!e.starred);
        assert!(e.asked_at.is_some());
        assert_eq!(app.memo(), "");
    }

    #[test]
    fn mark_asked_until_exhausted_then_noop() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::MarkAsked).unwrap();
        app.apply(Command::MarkAsked).unwrap();
        assert_eq!(app.current(), &NextQuestion::Exhausted);
        app.apply(Command::MarkAsked).unwrap();
        assert_eq!(app.history().len(), 2);
        assert_eq!(app.asked().asked("1", "t1").len(), 2);
    }

    #[test]
    fn missing_selection_is_a_noop() {
        let mut app = app();
        app.apply(Command::SelectTopic(Some("t1".into()))).unwrap();
        app.apply(Command::MarkAsked).unwrap();
        app.apply(Command::Pass).unwrap();
        assert!(app.history().is_empty());
        assert!(app.asked().is_empty());
        assert_eq!(app.current(), &NextQuestion::NeedSelection);
    }

    /// 写 history 键时失败的存储
    #[derive(Default)]
    struct HistoryWriteFails(MemoryStore);

    impl KvStore for HistoryWriteFails {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }
        fn set(&mut self, key: &str, value: String) -> crate::store::StoreResult<()> {
            if key == HISTORY_KEY {
                return Err(crate::store::StoreError::Write {
                    path: "storage.json".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.0.set(key, value)
        }
        fn remove(&mut self, key: &str) -> crate::store::StoreResult<()> {
            self.0.remove(key)
        }
        fn clear(&mut self) -> crate::store::StoreResult<()> {
            self.0.clear()
        }
    }

    #[test]
    fn failed_history_write_leaves_state_untouched() {
        let mut app = App::new(catalog(), HistoryWriteFails::default());
        app.apply(Command::SelectPerson(Some("1".into()))).unwrap();
        app.apply(Command::SelectTopic(Some("t1".into()))).unwrap();
        app.apply(Command::EditMemo("keep me".into())).unwrap();

        assert!(app.apply(Command::MarkAsked).is_err());
        assert!(app.history().is_empty());
        assert!(app.asked().is_empty());
        assert_eq!(app.memo(), "keep me");
        assert_eq!(app.current(), &NextQuestion::Ask("Q1".into()));
        assert_eq!(app.store().get(ASKED_KEY).as_deref(), Some("{}"));
    }

    #[test]
    fn pass_skips_without_history() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::Pass).unwrap();
        assert!(app.history().is_empty());
        assert_eq!(app.current(), &NextQuestion::Ask("Q2".into()));
    }

    #[test]
    fn writes_go_through_the_store() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::MarkAsked).unwrap();
        let raw = app.store().get(ASKED_KEY).unwrap();
        assert_eq!(raw, r#"{"1":{"t1":["Q1"]}}"#);
        let reloaded = App::new(catalog(), app.store().clone());
        assert_eq!(reloaded.history().len(), 1);
        assert_eq!(reloaded.asked().asked("1", "t1"), ["Q1"]);
    }

    #[test]
    fn random_pick_moves_topic_and_can_be_asked() {
        let mut app = app();
        app.apply(Command::SelectPerson(Some("1".into()))).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        app.apply_with(Command::PickRandom, &mut rng).unwrap();
        let tid = app.selection().topic_id.clone().unwrap();
        let q = app.current().question().unwrap().to_string();
        assert!(app.catalog().questions_of(&tid).contains(&q));

        app.apply(Command::MarkAsked).unwrap();
        assert!(app.asked().contains("1", &tid, &q));
        assert_eq!(app.history().get(0).unwrap().topic_id, tid);
    }

    #[test]
    fn random_pick_without_person_asks_for_selection() {
        let mut app = app();
        app.apply(Command::PickRandom).unwrap();
        assert_eq!(app.current(), &NextQuestion::NeedSelection);
    }

    #[test]
    fn random_pick_with_nothing_left_is_exhausted() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::Pass).unwrap();
        app.apply(Command::Pass).unwrap();
        app.apply(Command::SelectTopic(Some("t2".into()))).unwrap();
        app.apply(Command::Pass).unwrap();
        app.apply(Command::PickRandom).unwrap();
        assert_eq!(app.current(), &NextQuestion::Exhausted);
    }

    #[test]
    fn editing_a_history_entry_writes_memo_live() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::MarkAsked).unwrap();
        app.apply(Command::MarkAsked).unwrap();
        app.apply(Command::EditHistoryMemo(Some(0))).unwrap();
        app.apply(Command::EditMemo("likes coffee".into())).unwrap();
        assert_eq!(app.history().get(0).unwrap().memo, "likes coffee");
        assert_eq!(app.history().get(1).unwrap().memo, "");

        app.apply(Command::Delete(0)).unwrap();
        assert_eq!(app.editing(), None);
        assert_eq!(app.memo(), "");
        assert_eq!(app.history().get(0).unwrap().question, "Q2");
    }

    #[test]
    fn star_toggles_on_true_index() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::MarkAsked).unwrap();
        app.apply(Command::MarkAsked).unwrap();
        let newest = app.view().history[0].index;
        app.apply(Command::ToggleStar(newest)).unwrap();
        assert!(app.history().get(1).unwrap().starred);
        assert!(!app.history().get(0).unwrap().starred);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::MarkAsked).unwrap();
        app.apply(Command::Reset { purge: false }).unwrap();
        assert!(app.history().is_empty());
        assert_eq!(app.current(), &NextQuestion::Ask("Q1".into()));
        assert!(app.store().get(ASKED_KEY).is_none());
        assert!(app.store().get(HISTORY_KEY).is_none());
    }

    #[test]
    fn purge_clears_unrelated_keys_too() {
        let mut store = MemoryStore::new();
        store.set("other", "1".into()).unwrap();
        let mut app = App::new(catalog(), store);
        app.apply(Command::Reset { purge: true }).unwrap();
        assert!(app.store().is_empty());
    }

    #[test]
    fn filter_drops_hidden_person() {
        let mut app = app();
        select(&mut app, "2", "t1");
        app.apply(Command::SetGroupFilter("A".into())).unwrap();
        assert_eq!(app.selection().person_id, None);
        assert_eq!(app.current(), &NextQuestion::NeedSelection);
        let view = app.view();
        assert_eq!(view.persons.len(), 1);
        assert_eq!(view.persons[0].id, "1");
    }

    #[test]
    fn view_carries_notes_and_progress() {
        let mut app = app();
        select(&mut app, "1", "t1");
        app.apply(Command::Pass).unwrap();
        let view = app.view();
        assert_eq!(view.person_note, Some("engineer"));
        assert_eq!(view.self_note, Some("I write Rust"));
        assert_eq!(view.progress, (1, 2));
        assert!(view.questions[0].asked);
        assert!(!view.questions[1].asked);
    }
}
