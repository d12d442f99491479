//! インポート処理で扱うデータモデル。

use serde::{Deserialize, Deserializer};
use std::fmt;
use uuid::Uuid;

/// 受け付けるファイルの拡張子。
pub const CSV_EXTENSION: &str = ".csv";

/// 送信1回分のアップロード内容。送信後は破棄する。
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// サーバーへ申告するファイル名。
    pub filename: String,
    /// ファイル本体。
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// ファイル名が `.csv` で終わるか判定する（大文字小文字は区別する）。
pub fn has_csv_extension(filename: &str) -> bool {
    filename.ends_with(CSV_EXTENSION)
}

/// サーバーが払い出すジョブ識別子（task_id）。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// サーバーが報告するジョブ状態。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ImportStatus {
    /// 待機中。
    Queued,
    /// 処理中。
    Processing,
    /// 正常完了（終端）。
    Completed,
    /// 失敗（終端）。
    Failed,
    /// 未知の状態。非終端として扱う。
    Other(String),
}

impl From<String> for ImportStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => ImportStatus::Queued,
            "processing" => ImportStatus::Processing,
            "completed" => ImportStatus::Completed,
            "failed" => ImportStatus::Failed,
            _ => ImportStatus::Other(s),
        }
    }
}

impl ImportStatus {
    /// ワイヤ上の文字列表現。
    pub fn as_str(&self) -> &str {
        match self {
            ImportStatus::Queued => "queued",
            ImportStatus::Processing => "processing",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
            ImportStatus::Other(s) => s,
        }
    }

    /// 終端状態かどうか。
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }

    /// 先頭文字を大文字にした表示用ラベル。
    pub fn label(&self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// 進捗ストリームの1イベント。
#[derive(Clone, Debug, Deserialize)]
pub struct ProgressEvent {
    pub status: ImportStatus,
    /// 0〜100。単調増加は期待するが保証しない。nullは0。
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f64,
    #[serde(default)]
    pub processed_rows: Option<u64>,
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// `null` をその型の既定値として読む。
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

impl ProgressEvent {
    /// JSONペイロードをパースする。
    pub fn parse(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// 表示用の整数パーセント（丸めて0〜100に収める）。
    pub fn percent(&self) -> u16 {
        // NaNは `as` 変換で0になる。
        self.progress.round().clamp(0.0, 100.0) as u16
    }

    /// 表示メッセージ。行数があれば行数表示を優先する。
    pub fn display_message(&self) -> String {
        match (self.processed_rows, self.total_rows) {
            (Some(processed), Some(total)) if total > 0 => format!(
                "{} / {} products processed",
                group_thousands(processed),
                group_thousands(total)
            ),
            _ => self.message.clone(),
        }
    }
}

/// 数値を3桁区切りの文字列にする。
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// 進捗バーの見た目。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressTone {
    /// 処理中（アニメーション相当）。
    Active,
    /// 完了。
    Success,
    /// 失敗。
    Failed,
}

/// 描画側が読む進捗表示の状態。書き込むのはセッションのみ。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u16,
    pub label: String,
    pub message: String,
    pub tone: ProgressTone,
}

impl ProgressView {
    /// アップロード中（0%）の初期表示。
    pub fn uploading() -> Self {
        Self {
            percent: 0,
            label: "Uploading file...".into(),
            message: String::new(),
            tone: ProgressTone::Active,
        }
    }

    /// イベントから表示状態を作る。
    pub fn from_event(ev: &ProgressEvent) -> Self {
        let tone = match ev.status {
            ImportStatus::Completed => ProgressTone::Success,
            ImportStatus::Failed => ProgressTone::Failed,
            _ => ProgressTone::Active,
        };
        Self {
            percent: ev.percent(),
            label: ev.status.label(),
            message: ev.display_message(),
            tone,
        }
    }
}

/// トーストの種別。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// ユーザーへの通知（トースト）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub kind: NoticeKind,
}

impl Notification {
    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind: NoticeKind::Success,
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind: NoticeKind::Error,
        }
    }
}

/// アップロード試行1回ごとの識別子。
pub type SessionId = Uuid;

/// インポート処理から描画側へ送る通知。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportEvent {
    /// 検証を通過し送信を開始した（0%表示を出す）。
    Started { session: SessionId, filename: String },
    /// 進捗表示の更新。
    Progress {
        session: SessionId,
        view: ProgressView,
    },
    /// トースト表示。
    Notice {
        session: SessionId,
        notification: Notification,
    },
    /// パネルを閉じて待機状態へ戻す。
    Reset { session: SessionId },
    /// 商品一覧の1ページ目を再読み込みさせる。
    CatalogStale,
}
