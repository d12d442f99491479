//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, time::Duration};
use tokio::sync::mpsc;

use crate::{
    catalog::Product,
    config::Config,
    events::{UiState, UploadPanel},
    import::types::{ImportEvent, NoticeKind, Notification, ProgressView},
    input::InputBoxState,
    shortcuts::Shortcuts,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// ログパネルに保持する最大行数。
const LOG_CAPACITY: usize = 200;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// 選択位置やステータスなどUI固有の状態。
    pub ui: UiState,
    /// 商品一覧（1ページ目）。
    pub products: Vec<Product>,
    /// サーバー上の商品総数。
    pub products_total: u64,
    /// Workerへのコマンド送信チャネル。
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Workerからのイベント受信チャネル。
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

impl App {
    /// 初期状態のアプリを作る。
    pub fn new(
        cfg: Config,
        shortcuts: Shortcuts,
        worker_tx: mpsc::Sender<WorkerCmd>,
        worker_rx: mpsc::Receiver<WorkerEvent>,
    ) -> Self {
        Self {
            cfg,
            ui: UiState::default(),
            products: vec![],
            products_total: 0,
            worker_tx,
            worker_rx,
            input_box: None,
            shortcuts,
        }
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    // 設定ファイルを読み込む（初回はデフォルトを生成）。
    let cfg = Config::load_or_default(&PathBuf::from("config.toml"))?;
    // ショートカット設定を読み込む（無ければデフォルト）。
    let shortcuts = Shortcuts::load_or_default("shortcut.toml")?;
    tracing::info!("server: {}", cfg.server.base_url);

    // Worker通信用のコマンド/イベントチャネルを作る。
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    // 設定スナップショットでWorkerを起動する。
    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone()));

    let mut app = App::new(cfg, shortcuts, tx_cmd, rx_ev);

    // 起動時に商品一覧を読み込む。
    request_refresh(&mut app).await?;

    loop {
        // 現在の状態を描画する。
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前にWorkerイベントを消化する。
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev).await?;
        }

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            // どの状態でもCtrl+Cで終了できるようにする。
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// WorkerイベントをUI状態へ反映する。
async fn handle_worker_event(app: &mut App, ev: WorkerEvent) -> Result<()> {
    match ev {
        WorkerEvent::CatalogLoaded(page) => {
            app.products = page.items;
            app.products_total = page.total;
            app.ui.selected = 0;
            app.ui.status = format!(
                "Loaded {} of {} products (page {}/{})",
                app.products.len(),
                app.products_total,
                page.page,
                page.pages.max(1)
            );
        }
        WorkerEvent::Import(ev) => handle_import_event(app, ev).await?,
        WorkerEvent::Notice(n) => show_notice(app, n),
        WorkerEvent::Log(s) => push_log(app, s),
        WorkerEvent::Error(s) => {
            // ステータスにエラーを表示する。
            push_log(app, format!("ERROR: {s}"));
            app.ui.error = Some(s);
        }
    }
    Ok(())
}

/// インポートの進行をパネルへ反映する。
async fn handle_import_event(app: &mut App, ev: ImportEvent) -> Result<()> {
    match ev {
        ImportEvent::Started { session, filename } => {
            // 0%のパネルを出して送信中であることを示す。
            app.ui.error = None;
            app.ui.status = format!("Uploading {filename}...");
            app.ui.upload = Some(UploadPanel {
                session,
                filename,
                view: ProgressView::uploading(),
            });
        }
        ImportEvent::Progress { session, view } => {
            // 表示中のセッション以外は古いイベントなので捨てる。
            if let Some(panel) = app.ui.upload.as_mut().filter(|p| p.session == session) {
                panel.view = view;
            }
        }
        ImportEvent::Notice { notification, .. } => show_notice(app, notification),
        ImportEvent::Reset { session } => {
            if app.ui.is_current(session) {
                app.ui.upload = None;
            }
        }
        ImportEvent::CatalogStale => request_refresh(app).await?,
    }
    Ok(())
}

/// トーストをステータスバーとログへ出す。
fn show_notice(app: &mut App, n: Notification) {
    push_log(app, format!("{}: {}", n.title, n.body));
    match n.kind {
        NoticeKind::Success => {
            app.ui.error = None;
            app.ui.status = format!("{}: {}", n.title, n.body);
        }
        NoticeKind::Error => {
            app.ui.error = Some(format!("{}: {}", n.title, n.body));
        }
    }
}

/// 時刻付きでログへ追加する。
fn push_log(app: &mut App, line: String) {
    let ts = chrono::Local::now().format("%H:%M:%S");
    app.ui.log.push(format!("[{ts}] {line}"));
    if app.ui.log.len() > LOG_CAPACITY {
        let overflow = app.ui.log.len() - LOG_CAPACITY;
        app.ui.log.drain(..overflow);
    }
}

/// Workerへ商品一覧の1ページ目を要求する。
pub async fn request_refresh(app: &mut App) -> Result<()> {
    tracing::info!("catalog refresh requested");
    app.worker_tx
        .send(WorkerCmd::RefreshCatalog { page: 1 })
        .await?;
    app.ui.status = "Refreshing products...".into();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::types::ProgressTone;
    use uuid::Uuid;

    fn app() -> (App, mpsc::Receiver<WorkerCmd>) {
        let (tx_cmd, rx_cmd) = mpsc::channel(8);
        let (_tx_ev, rx_ev) = mpsc::channel(8);
        (
            App::new(Config::default(), Shortcuts::default(), tx_cmd, rx_ev),
            rx_cmd,
        )
    }

    fn view(percent: u16) -> ProgressView {
        ProgressView {
            percent,
            label: "Processing".into(),
            message: "x".into(),
            tone: ProgressTone::Active,
        }
    }

    #[tokio::test]
    async fn test_events_for_other_sessions_are_ignored() {
        let (mut app, _rx) = app();
        let current = Uuid::new_v4();
        let stale = Uuid::new_v4();

        handle_import_event(
            &mut app,
            ImportEvent::Started {
                session: current,
                filename: "p.csv".into(),
            },
        )
        .await
        .unwrap();
        handle_import_event(&mut app, ImportEvent::Progress { session: stale, view: view(90) })
            .await
            .unwrap();
        handle_import_event(&mut app, ImportEvent::Reset { session: stale })
            .await
            .unwrap();
        assert_eq!(app.ui.upload.as_ref().unwrap().view.percent, 0);

        handle_import_event(&mut app, ImportEvent::Progress { session: current, view: view(55) })
            .await
            .unwrap();
        assert_eq!(app.ui.upload.as_ref().unwrap().view.percent, 55);

        handle_import_event(&mut app, ImportEvent::Reset { session: current })
            .await
            .unwrap();
        assert!(app.ui.upload.is_none());
    }

    #[tokio::test]
    async fn test_catalog_stale_requests_first_page() {
        let (mut app, mut rx) = app();
        handle_import_event(&mut app, ImportEvent::CatalogStale)
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv(),
            Ok(WorkerCmd::RefreshCatalog { page: 1 })
        ));
    }

    #[tokio::test]
    async fn test_error_notice_is_highlighted() {
        let (mut app, _rx) = app();
        handle_worker_event(
            &mut app,
            WorkerEvent::Notice(Notification::error("Error", "Connection to server lost")),
        )
        .await
        .unwrap();
        assert_eq!(
            app.ui.error.as_deref(),
            Some("Error: Connection to server lost")
        );
        assert!(app.ui.log[0].ends_with("Error: Connection to server lost"));
    }
}
