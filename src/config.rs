use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::catalog::TOPICS_FILE;

pub const CONFIG_FILE: &str = "askbank.toml";
pub const STORE_FILE: &str = "storage.json";

#[derive(Debug, Clone, Parser)]
#[command(name = "askbank-tui", about = "按人物与话题推荐下一个问题的对话助手", version)]
pub struct Cli {
    /// 题库目录（含 topics.json 等五个文件），默认读取环境变量 ASKBANK_DATA 或自动探测
    #[arg(long, short = 'd', env = "ASKBANK_DATA")]
    pub data: Option<PathBuf>,

    /// 存储文件路径，默认 <题库目录>/storage.json
    #[arg(long, short = 's', env = "ASKBANK_STORE")]
    pub store: Option<PathBuf>,

    /// 配置文件路径，默认在当前目录及上级目录查找 askbank.toml
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// 主题（外观）：dark | light
    #[arg(long, value_enum)]
    pub theme: Option<ThemeKind>,

    /// 日志级别：trace | debug | info | warn | error
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// 日志目录，默认 <存储文件所在目录>/logs
    #[arg(long = "log-dir")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// 交互界面（默认）
    Tui,
    /// 打印某人物某话题的下一个问题
    Next {
        #[arg(long, short = 'p')]
        person: String,
        #[arg(long, short = 't')]
        topic: String,
    },
    /// 按时间倒序打印历史
    History {
        /// 只看收藏
        #[arg(long)]
        starred: bool,
    },
    /// 清空已问记录与历史
    Reset {
        /// 清空整个存储文件
        #[arg(long)]
        all: bool,
        /// 跳过确认
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Dark,
    Light,
}

/// askbank.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub theme: Option<ThemeKind>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub keys: HashMap<String, String>,
}

impl Settings {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("解析 askbank.toml 失败")
    }

    /// 文件里的相对路径以配置文件所在目录为基准
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置失败: {}", path.display()))?;
        let mut settings = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            settings.anchor_to(base);
        }
        Ok(settings)
    }

    /// 显式指定的路径必须存在；否则从当前目录向上探测，找不到就用默认值。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::read(p);
        }
        match std::env::current_dir() {
            Ok(cwd) => Self::load_from(&cwd),
            Err(_) => Ok(Self::default()),
        }
    }

    /// 从 start 开始逐级向上查找 askbank.toml
    pub fn load_from(start: &Path) -> Result<Self> {
        for anc in start.ancestors() {
            let p = anc.join(CONFIG_FILE);
            if p.exists() {
                log::debug!("event=config_found path={}", p.display());
                return Self::read(&p);
            }
        }
        Ok(Self::default())
    }

    fn anchor_to(&mut self, base: &Path) {
        for p in [&mut self.data_dir, &mut self.store, &mut self.log_dir]
            .into_iter()
            .flatten()
        {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }
}

/// CLI 与配置文件合并后的最终路径/选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub data_dir: PathBuf,
    pub store: PathBuf,
    pub theme: ThemeKind,
    pub log_level: Option<String>,
    pub log_dir: PathBuf,
}

pub fn resolve(cli: &Cli, settings: &Settings) -> Resolved {
    let data_dir = cli
        .data
        .clone()
        .or_else(|| settings.data_dir.clone())
        .unwrap_or_else(probe_data_dir);
    let store = cli
        .store
        .clone()
        .or_else(|| settings.store.clone())
        .unwrap_or_else(|| data_dir.join(STORE_FILE));
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| settings.log_dir.clone())
        .unwrap_or_else(|| {
            store
                .parent()
                .map(|p| p.join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        });
    Resolved {
        data_dir,
        store,
        theme: cli.theme.or(settings.theme).unwrap_or_default(),
        log_level: cli.log_level.clone().or_else(|| settings.log_level.clone()),
        log_dir,
    }
}

fn probe_data_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = vec![PathBuf::from("data")];
    if let Ok(cwd) = std::env::current_dir() {
        for anc in cwd.ancestors() {
            candidates.push(anc.join("data"));
            candidates.push(anc.join("askbank/data"));
        }
    }
    for c in candidates {
        if c.join(TOPICS_FILE).exists() {
            return c;
        }
    }
    // 可能不存在，加载题库时会给出清晰错误
    PathBuf::from("data")
}
