//! AskBank：按人物与话题推荐下一个还没问过的问题，记录问过的问题与对话历史。
//!
//! 题库是只读的 JSON 文件（见 [`catalog`]），可变状态经 [`store::KvStore`]
//! 持久化成两个键：`askedQuestions` 与 `history`。

pub mod app;
pub mod catalog;
pub mod config;
pub mod history;
pub mod keymap;
pub mod logging;
pub mod render;
pub mod store;
pub mod theme;
pub mod tracker;
pub mod tui;

pub use app::{App, Command, View};
pub use catalog::{Catalog, Person, Topic};
pub use history::{History, HistoryEntry};
pub use store::{JsonFileStore, KvStore, MemoryStore, StoreError};
pub use tracker::{AskedRecord, NextQuestion};
