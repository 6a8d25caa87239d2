//! 提问历史：只追加；可改 memo / starred，可按下标删除。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub person_id: String,
    /// 创建时的人物名快照
    #[serde(rename = "person")]
    pub person_name: String,
    #[serde(default)]
    pub topic_id: String,
    /// 创建时的话题名快照
    #[serde(rename = "topic")]
    pub topic_name: String,
    pub question: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub starred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asked_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.0.get(index)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.0.push(entry);
    }

    pub fn set_memo(&mut self, index: usize, text: &str) -> bool {
        match self.0.get_mut(index) {
            Some(e) => {
                e.memo = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn toggle_star(&mut self, index: usize) -> bool {
        match self.0.get_mut(index) {
            Some(e) => {
                e.starred = !e.starred;
                true
            }
            None => false,
        }
    }

    /// 删除后其后的下标依次前移一位
    pub fn delete(&mut self, index: usize) -> bool {
        if index < self.0.len() {
            self.0.remove(index);
            true
        } else {
            false
        }
    }

    /// 最新在前；返回 (真实下标, 条目)
    pub fn display(&self) -> impl Iterator<Item = (usize, &HistoryEntry)> + '_ {
        self.0.iter().enumerate().rev()
    }

    /// 显示位置 -> 真实下标
    pub fn true_index(&self, display_pos: usize) -> Option<usize> {
        (display_pos < self.0.len()).then(|| self.0.len() - 1 - display_pos)
    }
}
