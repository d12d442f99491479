//! TUI内での文字列入力コンポーネント（InputBox）。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// 入力完了時のコールバック識別子
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    /// インポートするCSVファイルのパス
    UploadPath,
}

/// InputBox入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// プロンプトメッセージ
    pub prompt: String,
    /// 現在の入力値
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 入力完了時のコールバック識別子
    pub callback_id: InputCallbackId,
}

impl InputBoxState {
    /// 初期値の末尾にカーソルを置いて開く。
    pub fn new(prompt: impl Into<String>, value: String, callback_id: InputCallbackId) -> Self {
        let cursor = value.chars().count();
        Self {
            prompt: prompt.into(),
            value,
            cursor,
            callback_id,
        }
    }

    /// 文字位置をバイト位置へ変換する。
    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    /// 文字を挿入
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    /// カーソルを左に移動
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// カーソルを右に移動
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    /// カーソルを先頭に移動
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// カーソルを末尾に移動
    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    /// 行全体をクリア
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// 表示幅に収まる範囲を切り出し、カーソル位置に `|` を挿入する。
    fn visible_with_cursor(&self, width: usize) -> String {
        // カーソルが右端を越えたら横スクロールする。
        let offset = self.cursor.saturating_sub(width.saturating_sub(2));
        let mut out: String = self
            .value
            .chars()
            .skip(offset)
            .take(self.cursor - offset)
            .collect();
        out.push('|');
        out.extend(self.value.chars().skip(self.cursor));
        out.chars().take(width.max(1)).collect()
    }
}

/// InputBoxをポップアップとして描画
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    // 中央に配置されたポップアップ領域を計算する。
    let popup_area = centered_popup(f.area(), 70, 7);

    // 既存の描画を消してポップアップ用の背景にする。
    f.render_widget(Clear, popup_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    // プロンプト + 入力フィールド + 空行 + ヘルプ。
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(popup_area);

    let prompt = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt, rows[0]);

    let input = Paragraph::new(state.visible_with_cursor(rows[1].width as usize))
        .style(Style::default().fg(Color::Green));
    f.render_widget(input, rows[1]);

    let help = Paragraph::new("Enter=確定 | ESC=キャンセル | Ctrl+U=クリア")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, rows[3]);
}

/// 中央配置のポップアップ領域を計算
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(value: &str) -> InputBoxState {
        InputBoxState::new("Path:", value.to_string(), InputCallbackId::UploadPath)
    }

    #[test]
    fn test_edit_in_the_middle_with_multibyte_chars() {
        // マルチバイト文字を含むパスでも文字単位で編集できる。
        let mut s = boxed("商品.csv");
        assert_eq!(s.cursor, 6);
        s.move_home();
        s.move_right();
        s.insert_char('一');
        assert_eq!(s.value, "商一品.csv");
        s.backspace();
        s.delete();
        assert_eq!(s.value, "商.csv");
        assert_eq!(s.cursor, 1);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut s = boxed("ab");
        s.move_right();
        assert_eq!(s.cursor, 2);
        s.delete();
        assert_eq!(s.value, "ab");
        s.clear_line();
        s.backspace();
        s.move_left();
        assert_eq!((s.value.as_str(), s.cursor), ("", 0));
    }

    #[test]
    fn test_visible_text_scrolls_with_cursor() {
        let s = boxed("/very/long/path/products.csv");
        let shown = s.visible_with_cursor(10);
        assert!(shown.ends_with("csv|"));
        assert!(shown.chars().count() <= 10);
    }
}
