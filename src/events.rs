//! 描画側と共有するUI状態。

use crate::import::types::{ProgressView, SessionId};

/// アップロード進捗パネルの状態。
#[derive(Clone, Debug)]
pub struct UploadPanel {
    /// 表示中のセッション。これ以外のセッションのイベントは無視する。
    pub session: SessionId,
    /// 送信したファイル名。
    pub filename: String,
    /// 最新の進捗表示。
    pub view: ProgressView,
}

/// 描画側と共有するUI状態。
#[derive(Clone, Debug)]
pub struct UiState {
    /// 商品一覧の選択行。
    pub selected: usize,
    /// 右側パネルに表示するログ。
    pub log: Vec<String>,
    /// 画面下部のステータス文言。
    pub status: String,
    /// エラーメッセージ（強調表示用）。
    pub error: Option<String>,
    /// インポート中のみSome。
    pub upload: Option<UploadPanel>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selected: 0,
            log: vec![],
            status: "Ready".into(),
            error: None,
            upload: None,
        }
    }
}

impl UiState {
    /// 指定セッションのパネルが表示中か。
    pub fn is_current(&self, session: SessionId) -> bool {
        self.upload.as_ref().is_some_and(|p| p.session == session)
    }
}
