use ratatui::style::Color;

use crate::config::ThemeKind;

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub text: Color,
    /// 标签、边框、已问过的问题
    pub dim: Color,
    pub accent: Color,
    /// 顶栏 / 底栏背景
    pub bar: Color,
    /// 列表选中行背景
    pub highlight: Color,
    /// ✓ 与进度
    pub done: Color,
    /// 收藏星标与状态提示
    pub notice: Color,
    /// 历史里的话题名
    pub topic: Color,
}

pub fn theme_of(kind: ThemeKind) -> Theme {
    match kind {
        ThemeKind::Dark => Theme {
            text: Color::Rgb(228, 224, 214),
            dim: Color::Rgb(128, 124, 118),
            accent: Color::Rgb(232, 152, 92),
            bar: Color::Rgb(42, 38, 36),
            highlight: Color::Rgb(70, 62, 56),
            done: Color::Rgb(146, 196, 132),
            notice: Color::Rgb(240, 206, 96),
            topic: Color::Rgb(150, 178, 220),
        },
        ThemeKind::Light => Theme {
            text: Color::Rgb(44, 40, 36),
            dim: Color::Rgb(136, 130, 122),
            accent: Color::Rgb(196, 96, 32),
            bar: Color::Rgb(242, 236, 226),
            highlight: Color::Rgb(228, 216, 198),
            done: Color::Rgb(58, 140, 72),
            notice: Color::Rgb(186, 128, 0),
            topic: Color::Rgb(48, 96, 170),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_stands_out_from_bars() {
        for kind in [ThemeKind::Dark, ThemeKind::Light] {
            let th = theme_of(kind);
            assert_ne!(th.highlight, th.bar);
            assert_ne!(th.text, th.dim);
        }
    }
}
