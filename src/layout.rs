//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メインレイアウトの3つの領域
pub struct MainLayout {
    /// 商品一覧 + サイドパネルの領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// ボディ部の2つの領域
pub struct BodyLayout {
    /// 商品テーブルの領域
    pub products_table: Rect,
    /// 右側パネルの領域
    pub side_panel: Rect,
}

/// 右側パネルの領域（インポート中のみ進捗欄を持つ）
pub struct SideLayout {
    pub upload: Option<Rect>,
    pub log: Rect,
}

/// メイン画面を分割（Body + HELP + STATUS）
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// Body領域を分割（商品テーブル 65% + サイドパネル 35%）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    BodyLayout {
        products_table: chunks[0],
        side_panel: chunks[1],
    }
}

/// サイドパネルを進捗欄とログ欄に分割
pub fn create_side_layout(area: Rect, show_upload: bool) -> SideLayout {
    if !show_upload {
        return SideLayout {
            upload: None,
            log: area,
        };
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(area);

    SideLayout {
        upload: Some(chunks[0]),
        log: chunks[1],
    }
}
