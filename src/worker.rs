//! Background worker handling catalog API calls and import sessions.

use reqwest::Client;
use std::{path::PathBuf, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use crate::{
    catalog::{self, ProductPage},
    config::Config,
    error::ImportError,
    import::{
        api::{HttpImportApi, ImportApi},
        initiator::UploadInitiator,
        monitor::{self, MonitorSession, ResetDelays, SessionOutcome},
        types::{ImportEvent, Notification},
    },
};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Upload a CSV file and follow its import job.
    Upload(PathBuf),
    /// Reload one page of the product listing.
    RefreshCatalog { page: u32 },
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// A page of products was loaded.
    CatalogLoaded(ProductPage),
    /// Progress of the running import.
    Import(ImportEvent),
    /// Toast not tied to a session.
    Notice(Notification),
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// Main worker loop: build the HTTP client, then handle commands.
pub async fn run(rx: mpsc::Receiver<WorkerCmd>, tx: mpsc::Sender<WorkerEvent>, cfg: Config) {
    let api = match HttpImportApi::from_config(&cfg) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("HTTP client init failed: {e}");
            let _ = tx
                .send(WorkerEvent::Error(format!("HTTP client init failed: {e}")))
                .await;
            return;
        }
    };
    let http = api.http().clone();
    run_with(rx, tx, cfg, http, Arc::new(api)).await;
}

/// Command loop over an explicit API implementation.
///
/// Catalog requests are served inline; each import runs in its own task so the
/// loop stays responsive. Only one import may be active at a time.
pub async fn run_with(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    cfg: Config,
    http: Client,
    api: Arc<dyn ImportApi>,
) {
    tracing::info!("worker started");
    let initiator = UploadInitiator::new(api.clone());
    let delays = ResetDelays {
        success: cfg.import.success_reset(),
        failure: cfg.import.failure_reset(),
    };
    let mut active: Option<JoinHandle<()>> = None;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            WorkerCmd::Upload(path) => {
                if active.as_ref().is_some_and(|h| !h.is_finished()) {
                    tracing::warn!("upload rejected, import in progress: {}", path.display());
                    let err = ImportError::Busy;
                    let _ = tx
                        .send(WorkerEvent::Notice(Notification::error(
                            err.title(),
                            err.to_string(),
                        )))
                        .await;
                    continue;
                }

                tracing::info!("import requested: {}", path.display());
                let _ = tx
                    .send(WorkerEvent::Log(format!("import requested: {}", path.display())))
                    .await;
                active = Some(tokio::spawn(run_import(
                    initiator.clone(),
                    api.clone(),
                    path,
                    tx.clone(),
                    delays,
                )));
            }

            WorkerCmd::RefreshCatalog { page } => {
                tracing::info!("refresh catalog page {page}");
                match catalog::fetch_page(&http, &cfg.server, page, cfg.catalog.per_page).await {
                    Ok(p) => {
                        tracing::info!("catalog loaded: {} of {} products", p.items.len(), p.total);
                        let _ = tx.send(WorkerEvent::CatalogLoaded(p)).await;
                    }
                    Err(e) => {
                        tracing::error!("catalog load failed: {e}");
                        let _ = tx
                            .send(WorkerEvent::Error("Failed to load products".into()))
                            .await;
                    }
                }
            }
        }
    }
    tracing::info!("worker stopped");
}

/// Run one import and forward its events to the UI channel.
async fn run_import(
    initiator: UploadInitiator,
    api: Arc<dyn ImportApi>,
    path: PathBuf,
    tx: mpsc::Sender<WorkerEvent>,
    delays: ResetDelays,
) {
    let (itx, mut irx) = mpsc::channel::<ImportEvent>(64);

    let work = async move {
        import_file(&initiator, api.as_ref(), &path, &itx, delays).await;
    };
    let forward = async {
        while let Some(ev) = irx.recv().await {
            let _ = tx.send(WorkerEvent::Import(ev)).await;
        }
    };
    tokio::join!(work, forward);
}

/// Submit the file, then monitor the job. Returns `None` when no job started.
async fn import_file(
    initiator: &UploadInitiator,
    api: &dyn ImportApi,
    path: &std::path::Path,
    itx: &mpsc::Sender<ImportEvent>,
    delays: ResetDelays,
) -> Option<SessionOutcome> {
    let session = Uuid::new_v4();

    let submitted = initiator
        .submit_path(path, |filename| async move {
            let _ = itx.send(ImportEvent::Started { session, filename }).await;
        })
        .await;

    match submitted {
        Ok(handle) => {
            let outcome =
                monitor::run_session(api, MonitorSession::new(session, handle), itx, delays).await;
            Some(outcome)
        }
        Err(e) => {
            match &e {
                ImportError::Validation { filename } => {
                    tracing::warn!(%session, "not a csv file: {filename}")
                }
                ImportError::Submission { status, detail } => {
                    tracing::warn!(%session, ?status, "upload rejected: {detail}")
                }
                other => tracing::warn!(%session, "import not started: {other}"),
            }
            let _ = itx
                .send(ImportEvent::Notice {
                    session,
                    notification: Notification::error(e.title(), e.to_string()),
                })
                .await;
            // No job exists; return the panel to neutral right away.
            let _ = itx.send(ImportEvent::Reset { session }).await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{
        api::EventStream,
        types::{JobHandle, UploadRequest},
    };
    use async_trait::async_trait;
    use futures::{StreamExt, stream};
    use std::time::Duration;

    /// Accepts every upload; the progress stream is scripted.
    struct FakeApi {
        payloads: Vec<&'static str>,
        hold_open: bool,
    }

    #[async_trait]
    impl ImportApi for FakeApi {
        async fn upload(&self, _req: UploadRequest) -> Result<JobHandle, ImportError> {
            Ok(JobHandle::new("task-9"))
        }

        async fn open_progress(&self, _handle: &JobHandle) -> Result<EventStream, ImportError> {
            let items: Vec<Result<String, ImportError>> =
                self.payloads.iter().map(|p| Ok(p.to_string())).collect();
            if self.hold_open {
                Ok(stream::iter(items).chain(stream::pending()).boxed())
            } else {
                Ok(stream::iter(items).boxed())
            }
        }
    }

    fn test_cfg() -> Config {
        let mut cfg = Config::default();
        cfg.import.success_reset_ms = 10;
        cfg.import.failure_reset_ms = 10;
        cfg
    }

    async fn temp_csv() -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}.csv", Uuid::new_v4()));
        tokio::fs::write(&path, b"sku,name\nA,B\n").await.unwrap();
        path
    }

    fn start(api: FakeApi) -> (mpsc::Sender<WorkerCmd>, mpsc::Receiver<WorkerEvent>) {
        let (tx_cmd, rx_cmd) = mpsc::channel(8);
        let (tx_ev, rx_ev) = mpsc::channel(64);
        tokio::spawn(run_with(
            rx_cmd,
            tx_ev,
            test_cfg(),
            Client::new(),
            Arc::new(api),
        ));
        (tx_cmd, rx_ev)
    }

    /// Next event other than a log line.
    async fn next_event(rx: &mut mpsc::Receiver<WorkerEvent>) -> WorkerEvent {
        loop {
            let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("worker event")
                .expect("channel open");
            if !matches!(ev, WorkerEvent::Log(_)) {
                return ev;
            }
        }
    }

    #[tokio::test]
    async fn test_second_upload_is_rejected_while_active() {
        let (tx, mut rx) = start(FakeApi {
            payloads: vec![r#"{"status":"queued","progress":0,"message":"Queued"}"#],
            hold_open: true,
        });
        let path = temp_csv().await;

        tx.send(WorkerCmd::Upload(path.clone())).await.unwrap();
        // 最初のセッションが開始されるまで待つ。
        loop {
            if let WorkerEvent::Import(ImportEvent::Progress { .. }) = next_event(&mut rx).await {
                break;
            }
        }

        tx.send(WorkerCmd::Upload(path.clone())).await.unwrap();
        match next_event(&mut rx).await {
            WorkerEvent::Notice(n) => assert_eq!(n.body, "An import is already in progress"),
            other => panic!("unexpected: {other:?}"),
        }
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_completed_import_signals_catalog_refresh() {
        let (tx, mut rx) = start(FakeApi {
            payloads: vec![r#"{"status":"completed","progress":100,"message":"done"}"#],
            hold_open: false,
        });
        let path = temp_csv().await;
        tx.send(WorkerCmd::Upload(path.clone())).await.unwrap();

        let mut seen = Vec::new();
        loop {
            match next_event(&mut rx).await {
                WorkerEvent::Import(ImportEvent::CatalogStale) => break,
                WorkerEvent::Import(ev) => seen.push(ev),
                other => panic!("unexpected: {other:?}"),
            }
        }
        assert!(matches!(seen.first(), Some(ImportEvent::Started { .. })));
        assert!(matches!(seen.last(), Some(ImportEvent::Reset { .. })));

        // 完了後は次のアップロードを受け付ける（タスク終了との競合は再送で吸収）。
        let mut accepted = false;
        for _ in 0..50 {
            tx.send(WorkerCmd::Upload(path.clone())).await.unwrap();
            match next_event(&mut rx).await {
                WorkerEvent::Import(ImportEvent::Started { .. }) => {
                    accepted = true;
                    break;
                }
                WorkerEvent::Notice(_) => tokio::time::sleep(Duration::from_millis(10)).await,
                other => panic!("unexpected: {other:?}"),
            }
        }
        assert!(accepted);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_non_csv_upload_reports_validation_without_starting() {
        let (tx, mut rx) = start(FakeApi {
            payloads: vec![],
            hold_open: false,
        });
        tx.send(WorkerCmd::Upload(PathBuf::from("/tmp/products.xlsx")))
            .await
            .unwrap();

        match next_event(&mut rx).await {
            WorkerEvent::Import(ImportEvent::Notice { notification, .. }) => {
                assert_eq!(notification.title, "Error");
                assert_eq!(notification.body, "Please upload a CSV file");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            next_event(&mut rx).await,
            WorkerEvent::Import(ImportEvent::Reset { .. })
        ));
    }
}
