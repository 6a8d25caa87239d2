use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use askbank::{
    app::{App, Command},
    catalog::Catalog,
    config::{resolve, Cli, CliCommand, Resolved, Settings},
    keymap::keymap_with,
    logging::{default_log_level, init_logging},
    render::next_question_text,
    store::{JsonFileStore, KvStore},
    theme::theme_of,
    tracker::next_question,
    tui::{self, Tui},
};
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let resolved = resolve(&cli, &settings);
    let level = resolved
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, &resolved.log_dir)?;

    let catalog = Catalog::load(&resolved.data_dir)?;
    let store = JsonFileStore::open(resolved.store.clone())
        .with_context(|| format!("打开存储失败: {}", resolved.store.display()))?;
    let mut app = App::new(catalog, store);

    let res = match cli.command.unwrap_or(CliCommand::Tui) {
        CliCommand::Tui => run_tui(&mut app, &resolved, &settings),
        CliCommand::Next { person, topic } => print_next(&app, &person, &topic),
        CliCommand::History { starred } => print_history(&app, starred),
        CliCommand::Reset { all, yes } => reset(&mut app, all, yes),
    };
    if let Err(err) = &res {
        log::error!("event=app_exit status=error err={:#}", err);
    }
    res
}

fn run_tui<S: KvStore>(app: &mut App<S>, resolved: &Resolved, settings: &Settings) -> Result<()> {
    let mut ui = Tui::new(theme_of(resolved.theme), keymap_with(&settings.keys));
    tui::run(app, &mut ui)
}

fn print_next<S: KvStore>(app: &App<S>, person: &str, topic: &str) -> Result<()> {
    let next = next_question(Some(person), Some(topic), app.catalog(), app.asked());
    let mut out = io::stdout().lock();
    writeln!(out, "{}", next_question_text(&next))?;
    Ok(())
}

fn print_history<S: KvStore>(app: &App<S>, starred_only: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    for (_, e) in app.history().display() {
        if starred_only && !e.starred {
            continue;
        }
        let star = if e.starred { "★" } else { " " };
        let date = e
            .asked_at
            .as_deref()
            .map(|s| s.chars().take(10).collect::<String>())
            .unwrap_or_default();
        writeln!(
            out,
            "{star} {date} {}【{}】{}",
            e.person_name, e.topic_name, e.question
        )?;
        if !e.memo.is_empty() {
            writeln!(out, "    📝 {}", e.memo.replace('\n', " / "))?;
        }
    }
    Ok(())
}

fn reset<S: KvStore>(app: &mut App<S>, purge: bool, yes: bool) -> Result<()> {
    if !yes {
        print!("确定要清空全部历史和已问记录吗？[y/N] ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        if !matches!(line.trim(), "y" | "Y" | "yes") {
            println!("已取消");
            return Ok(());
        }
    }
    app.apply(Command::Reset { purge })?;
    println!("已清空");
    Ok(())
}
