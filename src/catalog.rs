//! 静态题库：话题、问题、人物以及两类备注。
//!
//! 启动时按固定顺序读取 `topics.json`、`questions.json`、`persons.json`、
//! `selected.json`、`self.json`，之后只读。

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

pub const TOPICS_FILE: &str = "topics.json";
pub const QUESTIONS_FILE: &str = "questions.json";
pub const PERSONS_FILE: &str = "persons.json";
pub const SELECTED_FILE: &str = "selected.json";
pub const SELF_FILE: &str = "self.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: String,
}

/// topic id -> 有序问题列表
pub type QuestionCatalog = HashMap<String, Vec<String>>;
/// person id -> topic id -> 备注
pub type PersonTopicNotes = HashMap<String, HashMap<String, String>>;
/// topic id -> 自己的备注
pub type SelfNotes = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub topics: Vec<Topic>,
    pub questions: QuestionCatalog,
    pub persons: Vec<Person>,
    pub selected: PersonTopicNotes,
    pub self_notes: SelfNotes,
}

impl Catalog {
    /// 从数据目录读取五个文件。顺序固定，任何一个失败都直接返回错误。
    pub fn load(dir: &Path) -> Result<Self> {
        let topics: Vec<Topic> = read_json(&dir.join(TOPICS_FILE))?;
        let questions: QuestionCatalog = read_json(&dir.join(QUESTIONS_FILE))?;
        let persons: Vec<Person> = read_json(&dir.join(PERSONS_FILE))?;
        let selected: PersonTopicNotes = read_json(&dir.join(SELECTED_FILE))?;
        let self_notes: SelfNotes = read_json(&dir.join(SELF_FILE))?;
        log::info!(
            "event=catalog_loaded dir={} topics={} persons={} questions={}",
            dir.display(),
            topics.len(),
            persons.len(),
            questions.values().map(Vec::len).sum::<usize>()
        );
        Ok(Self {
            topics,
            questions,
            persons,
            selected,
            self_notes,
        })
    }

    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.persons.iter().find(|p| p.id == id)
    }

    /// 未知话题视为空列表
    pub fn questions_of(&self, topic_id: &str) -> &[String] {
        self.questions
            .get(topic_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn person_note(&self, person_id: &str, topic_id: &str) -> Option<&str> {
        self.selected
            .get(person_id)
            .and_then(|m| m.get(topic_id))
            .map(String::as_str)
    }

    pub fn self_note(&self, topic_id: &str) -> Option<&str> {
        self.self_notes.get(topic_id).map(String::as_str)
    }
}

fn read_json<T: DeserializeOwned>(path: &PathBuf) -> Result<T> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "读取题库文件失败: {}\n提示: 使用 --data <目录> 或设置环境变量 ASKBANK_DATA 指向包含 {} 等文件的目录。",
            path.display(),
            TOPICS_FILE
        ));
    }
    let s = fs::read_to_string(path)
        .with_context(|| format!("读取题库文件失败: {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("解析 JSON 失败: {}", path.display()))
}

/// 人物筛选：分组为子串匹配（区分大小写），姓名为不区分大小写的子串匹配；
/// 空条件匹配全部。
pub fn filter_persons<'a>(persons: &'a [Person], group: &str, name: &str) -> Vec<&'a Person> {
    let key = name.to_lowercase();
    persons
        .iter()
        .filter(|p| {
            (group.is_empty() || p.group.contains(group))
                && (key.is_empty() || p.name.to_lowercase().contains(&key))
        })
        .collect()
}

// JSON 里的 id 可能是数字也可能是字符串，统一成字符串。
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Int(i64),
    Float(f64),
}

fn id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(match RawId::deserialize(d)? {
        RawId::Str(s) => s,
        RawId::Int(i) => i.to_string(),
        RawId::Float(f) => f.to_string(),
    })
}
