//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph, Row, Table, TableState, Wrap},
};

use crate::{
    events::UploadPanel,
    import::types::ProgressTone,
    input, layout,
    shortcuts::Shortcuts,
};

use super::App;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    // メインレイアウト（Body + HELP + STATUS）を作る。
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);
    let side_layout = layout::create_side_layout(body_layout.side_panel, app.ui.upload.is_some());

    draw_products(f, app, body_layout.products_table);

    // インポート中のみ進捗パネルを出す。
    if let (Some(area), Some(panel)) = (side_layout.upload, &app.ui.upload) {
        draw_upload_panel(f, panel, area);
    }

    let log_text = app
        .ui
        .log
        .iter()
        .rev()
        .take(side_layout.log.height.saturating_sub(2) as usize)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let log_panel = Paragraph::new(log_text)
        .block(Block::default().borders(Borders::ALL).title("LOG"))
        .wrap(Wrap { trim: true });
    f.render_widget(log_panel, side_layout.log);

    let help_bar = Paragraph::new(get_help_text(&app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    f.render_widget(build_status_bar(app), main_layout.status_bar);

    // 入力ボックスが開いていれば重ねて描画する。
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// 商品テーブルを描画する。
fn draw_products(f: &mut Frame, app: &App, area: Rect) {
    let rows = app.products.iter().map(|p| {
        Row::new(vec![
            p.sku.clone(),
            p.name.clone(),
            p.description.clone().unwrap_or_else(|| "-".into()),
            if p.active { "Active" } else { "Inactive" }.to_string(),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Min(12),
            Constraint::Min(10),
            Constraint::Length(9),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("PRODUCTS ({} total)", app.products_total)),
    )
    .header(Row::new(vec!["sku", "name", "description", "status"]).bold())
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(255, 140, 0)) // オレンジ色の背景
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );

    let mut table_state = TableState::default();
    if !app.products.is_empty() {
        table_state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(table, area, &mut table_state);
}

/// インポート進捗パネルを描画する。
fn draw_upload_panel(f: &mut Frame, panel: &UploadPanel, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("IMPORT {}", panel.filename));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // 状態ラベル
            Constraint::Length(1), // ゲージ
            Constraint::Min(1),    // メッセージ
        ])
        .split(inner);

    let view = &panel.view;
    f.render_widget(
        Paragraph::new(view.label.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        rows[0],
    );

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(tone_color(view.tone)))
        .percent(view.percent.min(100))
        .label(format!("{}%", view.percent));
    f.render_widget(gauge, rows[1]);

    f.render_widget(
        Paragraph::new(view.message.clone()).wrap(Wrap { trim: true }),
        rows[2],
    );
}

/// 進捗の見た目に応じたゲージ色。
fn tone_color(tone: ProgressTone) -> Color {
    match tone {
        ProgressTone::Active => Color::Yellow,
        ProgressTone::Success => Color::Green,
        ProgressTone::Failed => Color::Red,
    }
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let import_info = match &app.ui.upload {
        Some(p) => format!("Import: {} {}%", p.view.label, p.view.percent),
        None => "Import: idle".to_string(),
    };

    // エラーの有無でステータス文字列を切り替える。
    let status_text = if let Some(err) = &app.ui.error {
        format!("{} | ERROR: {}", import_info, err)
    } else {
        format!("{} | {}", import_info, app.ui.status)
    };

    let mut status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });

    // エラー時は赤色で強調表示する。
    if app.ui.error.is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }
    status_bar
}

/// ヘルプ文字列を返す。
fn get_help_text(shortcuts: &Shortcuts) -> String {
    let sc = &shortcuts.main;
    format!(
        "{}: import csv | {}: refresh | {}: dismiss error | {}/{}: navigate | {}: quit",
        format_keys(&sc.upload),
        format_keys(&sc.refresh),
        format_keys(&sc.dismiss),
        format_keys(&sc.up),
        format_keys(&sc.down),
        format_keys(&sc.quit),
    )
}

/// ショートカットキーの配列を表示用文字列に変換する。
fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, import::types::ProgressView, worker::WorkerCmd};
    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[test]
    fn test_draw_with_active_import() {
        let (tx_cmd, _rx_cmd) = mpsc::channel::<WorkerCmd>(1);
        let (_tx_ev, rx_ev) = mpsc::channel(1);
        let mut app = App::new(Config::default(), Shortcuts::default(), tx_cmd, rx_ev);
        app.ui.upload = Some(UploadPanel {
            session: Uuid::new_v4(),
            filename: "products.csv".into(),
            view: ProgressView::uploading(),
        });

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("IMPORT products.csv"));
        assert!(text.contains("Uploading file..."));
        assert!(text.contains("Import: Uploading file... 0%"));
    }
}
