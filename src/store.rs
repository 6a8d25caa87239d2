//! 键值存储：值以字符串形式保存（序列化后的 JSON），与浏览器 localStorage 的形状一致。

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub const ASKED_KEY: &str = "askedQuestions";
pub const HISTORY_KEY: &str = "history";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("读取存储文件失败: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("写入存储文件失败: {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("序列化失败: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> StoreResult<()>;
    fn remove(&mut self, key: &str) -> StoreResult<()>;
    /// 清空全部键
    fn clear(&mut self) -> StoreResult<()>;
}

/// 读取并反序列化；键不存在或内容损坏时返回默认值（损坏会记一条 warn）。
pub fn load_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KvStore + ?Sized,
{
    let Some(raw) = store.get(key) else {
        return T::default();
    };
    match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(err) => {
            log::warn!("event=store_parse_failed key={} err={}", key, err);
            T::default()
        }
    }
}

pub fn save_value<T, S>(store: &mut S, key: &str, value: &T) -> StoreResult<()>
where
    T: Serialize,
    S: KvStore + ?Sized,
{
    let s = serde_json::to_string(value)?;
    store.set(key, s)
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.entries.clear();
        Ok(())
    }
}

/// 整个存储是一个 JSON 对象文件，每次写入都整体落盘。
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: PathBuf) -> StoreResult<Self> {
        let entries = if path.exists() {
            let s = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            match serde_json::from_str(&s) {
                Ok(entries) => entries,
                Err(err) => {
                    // 原文件先挪到一边，下次写入才不会覆盖掉它
                    let aside = corrupt_path(&path);
                    fs::copy(&path, &aside).map_err(|source| StoreError::Write {
                        path: aside.clone(),
                        source,
                    })?;
                    log::warn!(
                        "event=store_file_corrupt path={} backup={} err={}",
                        path.display(),
                        aside.display(),
                        err
                    );
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> StoreResult<()> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(write_err)?;
            }
        }
        let s = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, s).map_err(write_err)
    }
}

/// storage.json -> storage.json.corrupt
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value);
        self.save()
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        if self.entries.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.entries.clear();
        self.save()
    }
}
