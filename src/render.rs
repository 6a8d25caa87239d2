// ---------------- 绘制 ----------------
// 只读 View，不碰 App；列表高亮状态在 Tui 里。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    app::View,
    theme::Theme,
    tracker::NextQuestion,
    tui::{Focus, Tui},
};

pub const PROMPT_SELECT: &str = "请选择人物和话题";
pub const ALL_DONE: &str = "问题都问完了 👍";
pub const NO_PERSON_NOTE: &str = "暂无信息";
pub const NO_SELF_NOTE: &str = "无";

pub fn next_question_text(next: &NextQuestion) -> &str {
    match next {
        NextQuestion::NeedSelection => PROMPT_SELECT,
        NextQuestion::Ask(q) => q,
        NextQuestion::Exhausted => ALL_DONE,
    }
}

pub fn draw(f: &mut Frame, tui: &mut Tui, view: &View) {
    // 顶栏 + 主区 + 底栏
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(f.area());
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(v[1]);

    draw_header(f, v[0], tui, view);
    draw_left(f, h[0], tui, view);
    draw_right(f, h[1], tui, view);
    draw_footer(f, v[2], tui);

    if tui.confirm_reset {
        draw_confirm(f, tui.theme);
    }
}

fn titled(title: &str, th: Theme, focused: bool) -> Block<'static> {
    let border = if focused { th.accent } else { th.dim };
    Block::default()
        .title(Span::styled(format!(" {title} "), Style::default().fg(th.accent)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn highlight(th: Theme) -> Style {
    Style::default()
        .bg(th.highlight)
        .fg(th.text)
        .add_modifier(Modifier::BOLD)
}

fn draw_header(f: &mut Frame, area: Rect, tui: &Tui, view: &View) {
    let th = tui.theme;
    let person = view
        .selection
        .person_id
        .as_deref()
        .and_then(|pid| view.persons.iter().find(|p| p.id == pid))
        .map(|p| p.name.as_str())
        .unwrap_or("-");
    let topic = view
        .selection
        .topic_id
        .as_deref()
        .and_then(|tid| view.topics.iter().find(|t| t.id == tid))
        .map(|t| t.name.as_str())
        .unwrap_or("-");
    let mut segs = vec![
        Span::styled(
            " AskBank · 对话助手 ",
            Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | 人物:", Style::default().fg(th.dim)),
        Span::styled(person.to_string(), Style::default().fg(th.text)),
        Span::styled(" | 话题:", Style::default().fg(th.dim)),
        Span::styled(topic.to_string(), Style::default().fg(th.text)),
        Span::styled(" | 进度:", Style::default().fg(th.dim)),
        Span::styled(
            format!("{}/{}", view.progress.0, view.progress.1),
            Style::default().fg(th.done),
        ),
        Span::styled(" | 历史:", Style::default().fg(th.dim)),
        Span::styled(view.history.len().to_string(), Style::default().fg(th.text)),
    ];
    if let Some(msg) = &tui.status {
        segs.push(Span::styled(format!("  {msg}"), Style::default().fg(th.notice)));
    }
    let para = Paragraph::new(Line::from(segs)).style(Style::default().bg(th.bar).fg(th.text));
    f.render_widget(para, area);
}

fn draw_left(f: &mut Frame, area: Rect, tui: &mut Tui, view: &View) {
    let th = tui.theme;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Percentage(40),
        ])
        .split(area);

    // 筛选
    let cursor = |on: bool| if on { "_" } else { "" };
    let filter_lines = vec![
        Line::from(vec![
            Span::styled("分组[g]: ", Style::default().fg(th.dim)),
            Span::styled(view.filter.group.clone(), Style::default().fg(th.text)),
            Span::styled(
                cursor(tui.focus == Focus::GroupFilter),
                Style::default().fg(th.accent),
            ),
        ]),
        Line::from(vec![
            Span::styled("姓名[/]: ", Style::default().fg(th.dim)),
            Span::styled(view.filter.name.clone(), Style::default().fg(th.text)),
            Span::styled(
                cursor(tui.focus == Focus::NameFilter),
                Style::default().fg(th.accent),
            ),
        ]),
    ];
    let filter_focused = matches!(tui.focus, Focus::GroupFilter | Focus::NameFilter);
    f.render_widget(
        Paragraph::new(filter_lines).block(titled("筛选", th, filter_focused)),
        rows[0],
    );

    let width = rows[1].width.saturating_sub(4) as usize;
    let persons: Vec<ListItem> = view
        .persons
        .iter()
        .map(|p| {
            let label = format!("{}（{}）", p.name, p.group);
            ListItem::new(Line::from(Span::styled(
                clip(&label, width),
                Style::default().fg(th.text),
            )))
        })
        .collect();
    let list = List::new(persons)
        .block(titled(
            &format!("人物 {}", view.persons.len()),
            th,
            tui.focus == Focus::Persons,
        ))
        .highlight_style(highlight(th))
        .highlight_symbol("▸ ");
    f.render_stateful_widget(list, rows[1], &mut tui.persons_state);

    let topics: Vec<ListItem> = view
        .topics
        .iter()
        .map(|t| ListItem::new(Line::from(Span::raw(clip(&t.name, width)))))
        .collect();
    let list = List::new(topics)
        .block(titled("话题", th, tui.focus == Focus::Topics))
        .highlight_style(highlight(th))
        .highlight_symbol("▸ ");
    f.render_stateful_widget(list, rows[2], &mut tui.topics_state);
}

fn draw_right(f: &mut Frame, area: Rect, tui: &mut Tui, view: &View) {
    let th = tui.theme;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(5),
        ])
        .split(area);

    // 下一个问题
    let topic_label = view
        .selection
        .topic_id
        .as_deref()
        .and_then(|tid| view.topics.iter().find(|t| t.id == tid))
        .map(|t| format!("下一个问题 ·【{}】", t.name))
        .unwrap_or_else(|| "下一个问题".to_string());
    let q_style = match view.next {
        NextQuestion::Ask(_) => Style::default().fg(th.text).add_modifier(Modifier::BOLD),
        NextQuestion::Exhausted => Style::default().fg(th.done),
        NextQuestion::NeedSelection => Style::default().fg(th.dim),
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            next_question_text(view.next).to_string(),
            q_style,
        )))
        .wrap(Wrap { trim: false })
        .block(titled(&topic_label, th, false)),
        rows[0],
    );

    // 备注：对方 / 自己
    let notes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    f.render_widget(
        Paragraph::new(view.person_note.unwrap_or(NO_PERSON_NOTE).to_string())
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(th.text))
            .block(titled("对方信息", th, false)),
        notes[0],
    );
    f.render_widget(
        Paragraph::new(view.self_note.unwrap_or(NO_SELF_NOTE).to_string())
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(th.text))
            .block(titled("自己的信息", th, false)),
        notes[1],
    );

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[2]);
    draw_question_list(f, body[0], th, view);
    draw_history(f, body[1], tui, view);

    // memo 编辑器
    let memo_title = match view.editing {
        Some(_) => "Memo（编辑历史）[Esc 返回]",
        None => "Memo [e 编辑 / Esc 返回]",
    };
    tui.memo
        .set_block(titled(memo_title, th, tui.focus == Focus::Memo));
    tui.memo.set_cursor_line_style(Style::default());
    let cursor_style = if tui.focus == Focus::Memo {
        Style::default().bg(th.accent).fg(th.bar)
    } else {
        Style::default()
    };
    tui.memo.set_cursor_style(cursor_style);
    f.render_widget(&tui.memo, rows[3]);
}

fn draw_question_list(f: &mut Frame, area: Rect, th: Theme, view: &View) {
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = view
        .questions
        .iter()
        .map(|row| {
            let (mark, style) = if row.asked {
                ("✓ ", Style::default().fg(th.dim))
            } else {
                ("· ", Style::default().fg(th.text))
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(th.done)),
                Span::styled(clip(row.text, width.saturating_sub(2)), style),
            ]))
        })
        .collect();
    f.render_widget(
        List::new(items).block(titled("问题列表", th, false)),
        area,
    );
}

fn draw_history(f: &mut Frame, area: Rect, tui: &mut Tui, view: &View) {
    let th = tui.theme;
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = view
        .history
        .iter()
        .map(|row| {
            let e = row.entry;
            let date = e
                .asked_at
                .as_deref()
                .map(|s| s.chars().take(10).collect::<String>())
                .unwrap_or_default();
            let mut head = vec![
                Span::styled(
                    if e.starred { "★ " } else { "☆ " },
                    Style::default().fg(th.notice),
                ),
                Span::styled(
                    e.person_name.clone(),
                    Style::default().fg(th.text).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" [{}]", e.topic_name), Style::default().fg(th.topic)),
            ];
            if !date.is_empty() {
                head.push(Span::styled(format!(" {date}"), Style::default().fg(th.dim)));
            }
            if view.editing == Some(row.index) {
                head.push(Span::styled(" ✎", Style::default().fg(th.accent)));
            }
            let mut lines = vec![
                Line::from(head),
                Line::from(Span::raw(format!("  {}", clip(&e.question, width.saturating_sub(2))))),
            ];
            if !e.memo.is_empty() {
                let first = e.memo.lines().next().unwrap_or("");
                lines.push(Line::from(Span::styled(
                    format!("  📝 {}", clip(first, width.saturating_sub(5))),
                    Style::default().fg(th.dim),
                )));
            }
            ListItem::new(lines)
        })
        .collect();
    let list = List::new(items)
        .block(titled(
            "历史 [Enter 编辑memo / s 收藏 / d 删除]",
            th,
            tui.focus == Focus::History,
        ))
        .highlight_style(highlight(th))
        .highlight_symbol("▸ ");
    f.render_stateful_widget(list, area, &mut tui.history_state);
}

fn draw_footer(f: &mut Frame, area: Rect, tui: &Tui) {
    let th = tui.theme;
    let tips = match tui.focus {
        Focus::Memo => " [Esc]返回  输入即保存 ",
        Focus::GroupFilter | Focus::NameFilter => " [Enter/Esc]完成  [Backspace]删除 ",
        _ => " [q]退出  [Tab]切换面板  [j/k]上下  [a]已问  [p]跳过  [r]随机  [e]Memo  [g/ /]筛选  [X]清空历史 ",
    };
    let help = Paragraph::new(Line::from(Span::styled(tips, Style::default().fg(th.dim))))
        .style(Style::default().bg(th.bar));
    f.render_widget(help, area);
}

fn draw_confirm(f: &mut Frame, th: Theme) {
    let area = dialog_rect(44, 6, f.area());
    f.render_widget(Clear, area);
    let para = Paragraph::new(vec![
        Line::from(Span::styled(
            "确定要清空全部历史和已问记录吗？",
            Style::default().fg(th.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(" "),
        Line::from(Span::styled("[y] 确定    其他键取消", Style::default().fg(th.dim))),
    ])
    .wrap(Wrap { trim: false })
    .block(titled("清空历史", th, true));
    f.render_widget(para, area);
}

/// 在 area 中央放一个 width x height 的对话框，超出时收缩到 area 内
fn dialog_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

/// 按显示宽度截断，超出时以 … 结尾
pub fn clip(s: &str, max: usize) -> String {
    if UnicodeWidthStr::width(s) <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut w = 0;
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if w + cw + 1 > max {
            break;
        }
        out.push(ch);
        w += cw;
    }
    out.push('…');
    out
}
