//! 已问记录与选题。

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// person id -> topic id -> 已出现过的问题（按插入顺序，允许重复）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AskedRecord(HashMap<String, HashMap<String, Vec<String>>>);

impl AskedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asked(&self, person_id: &str, topic_id: &str) -> &[String] {
        self.0
            .get(person_id)
            .and_then(|m| m.get(topic_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, person_id: &str, topic_id: &str, question: &str) -> bool {
        self.asked(person_id, topic_id).iter().any(|q| q == question)
    }

    /// 不去重：同一问题再次 push 会重复记录。
    pub fn push(&mut self, person_id: &str, topic_id: &str, question: &str) {
        self.0
            .entry(person_id.to_string())
            .or_default()
            .entry(topic_id.to_string())
            .or_default()
            .push(question.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|m| m.values().all(Vec::is_empty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextQuestion {
    /// 还没选人物或话题
    NeedSelection,
    Ask(String),
    /// 该范围内的问题都问完了
    Exhausted,
}

impl NextQuestion {
    pub fn question(&self) -> Option<&str> {
        match self {
            Self::Ask(q) => Some(q),
            _ => None,
        }
    }
}

pub fn next_question(
    person_id: Option<&str>,
    topic_id: Option<&str>,
    catalog: &Catalog,
    asked: &AskedRecord,
) -> NextQuestion {
    let (Some(pid), Some(tid)) = (non_empty(person_id), non_empty(topic_id)) else {
        return NextQuestion::NeedSelection;
    };
    let done = asked.asked(pid, tid);
    catalog
        .questions_of(tid)
        .iter()
        .find(|q| !done.contains(q))
        .map(|q| NextQuestion::Ask(q.clone()))
        .unwrap_or(NextQuestion::Exhausted)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomPick {
    pub topic_id: String,
    pub question: String,
}

/// 所有话题中该人物尚未问过的 (topic, question) 里均匀随机取一个。
pub fn pick_random<R: Rng>(
    person_id: &str,
    catalog: &Catalog,
    asked: &AskedRecord,
    rng: &mut R,
) -> Option<RandomPick> {
    let pool = unasked_pool(person_id, catalog, asked);
    if pool.is_empty() {
        return None;
    }
    let (tid, q) = pool[rng.gen_range(0..pool.len())];
    Some(RandomPick {
        topic_id: tid.to_string(),
        question: q.to_string(),
    })
}

pub fn unasked_pool<'a>(
    person_id: &str,
    catalog: &'a Catalog,
    asked: &AskedRecord,
) -> Vec<(&'a str, &'a str)> {
    let mut pool = Vec::new();
    for t in &catalog.topics {
        let done = asked.asked(person_id, &t.id);
        for q in catalog.questions_of(&t.id) {
            if !done.contains(q) {
                pool.push((t.id.as_str(), q.as_str()));
            }
        }
    }
    pool
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}
