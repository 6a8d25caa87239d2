// ---------------- Keymap ----------------
// 单字符快捷键 -> 动作；askbank.toml 的 [keys] 表可以覆盖默认值。

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    MarkAsked,
    Pass,
    PickRandom,
    ResetHistory,
    EditMemo,
    EditGroupFilter,
    EditNameFilter,
    ToggleStar,
    DeleteHistory,
    FocusNext,
    MoveDown,
    MoveUp,
    Quit,
}

pub fn action_from_str(s: &str) -> Option<KeyAction> {
    use KeyAction::*;
    Some(match s {
        "mark_asked" => MarkAsked,
        "pass" => Pass,
        "pick_random" => PickRandom,
        "reset_history" => ResetHistory,
        "edit_memo" => EditMemo,
        "edit_group_filter" => EditGroupFilter,
        "edit_name_filter" => EditNameFilter,
        "toggle_star" => ToggleStar,
        "delete_history" => DeleteHistory,
        "focus_next" => FocusNext,
        "move_down" => MoveDown,
        "move_up" => MoveUp,
        "quit" => Quit,
        _ => return None,
    })
}

pub fn default_keymap() -> HashMap<char, KeyAction> {
    use KeyAction::*;
    let mut m = HashMap::new();
    m.insert('a', MarkAsked);
    m.insert('p', Pass);
    m.insert('r', PickRandom);
    m.insert('X', ResetHistory); // 大写 X
    m.insert('e', EditMemo);
    m.insert('g', EditGroupFilter);
    m.insert('/', EditNameFilter);
    m.insert('s', ToggleStar);
    m.insert('d', DeleteHistory);
    m.insert('j', MoveDown);
    m.insert('k', MoveUp);
    m.insert('q', Quit);
    m
}

/// 在默认键位上叠加配置；多字符键或未知动作被忽略。
pub fn keymap_with(overrides: &HashMap<String, String>) -> HashMap<char, KeyAction> {
    let mut out = default_keymap();
    for (k, v) in overrides {
        let mut chars = k.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            log::warn!("event=keymap_skip key={:?} reason=not_single_char", k);
            continue;
        };
        match action_from_str(v) {
            Some(act) => {
                out.insert(ch, act);
            }
            None => log::warn!("event=keymap_skip key={:?} action={:?}", k, v),
        }
    }
    out
}
