//! Progress Monitor: consumes one job's progress channel and drives exactly
//! one terminal transition.
//!
//! [`MonitorSession`] is the state machine and never touches I/O.
//! [`run_session`] owns the channel, forwards display updates, and applies
//! the post-terminal delays.

use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{
    api::ImportApi,
    types::{ImportEvent, ImportStatus, JobHandle, Notification, ProgressEvent, ProgressView, SessionId},
};

/// Toast text for a dropped progress channel.
pub const CONNECTION_LOST: &str = "Connection to server lost";

/// How a monitoring session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The job reported `completed`.
    Completed { message: String },
    /// The job reported `failed`.
    Failed { message: String },
    /// The channel failed or closed first; the job outcome is unknown.
    ConnectionLost,
}

/// What the driver must do with one input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Update the displayed progress.
    Progress(ProgressView),
    /// Run the terminal branch. Returned at most once per session.
    Terminal {
        view: Option<ProgressView>,
        outcome: SessionOutcome,
    },
    /// Nothing to do.
    Ignored,
}

/// One job handle bound to its displayed progress state.
#[derive(Debug)]
pub struct MonitorSession {
    id: SessionId,
    handle: JobHandle,
    view: ProgressView,
    terminated: bool,
}

impl MonitorSession {
    pub fn new(id: SessionId, handle: JobHandle) -> Self {
        Self {
            id,
            handle,
            view: ProgressView::uploading(),
            terminated: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    /// Most recent displayed state.
    pub fn view(&self) -> &ProgressView {
        &self.view
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Handle one raw `data` payload from the channel.
    pub fn on_payload(&mut self, data: &str) -> Step {
        if self.terminated {
            return Step::Ignored;
        }
        match ProgressEvent::parse(data) {
            Ok(ev) => self.on_event(&ev),
            Err(e) => {
                tracing::warn!(session = %self.id, "skipping malformed progress event: {e}");
                Step::Ignored
            }
        }
    }

    /// Handle one decoded event.
    pub fn on_event(&mut self, ev: &ProgressEvent) -> Step {
        // Closing the channel does not stop already-queued events.
        if self.terminated {
            tracing::debug!(session = %self.id, "event after terminal state ignored");
            return Step::Ignored;
        }

        let view = ProgressView::from_event(ev);
        self.view = view.clone();
        tracing::debug!(
            session = %self.id,
            "status={} progress={}%",
            ev.status.as_str(),
            view.percent
        );

        if !ev.status.is_terminal() {
            return Step::Progress(view);
        }
        let outcome = match ev.status {
            ImportStatus::Completed => SessionOutcome::Completed {
                message: ev.message.clone(),
            },
            _ => SessionOutcome::Failed {
                message: ev.message.clone(),
            },
        };
        self.terminated = true;
        Step::Terminal {
            view: Some(view),
            outcome,
        }
    }

    /// Handle a transport error or a server-side close.
    pub fn on_disconnect(&mut self) -> Step {
        if self.terminated {
            return Step::Ignored;
        }
        self.terminated = true;
        Step::Terminal {
            view: None,
            outcome: SessionOutcome::ConnectionLost,
        }
    }
}

/// Delays before the panel resets after a confirmed outcome.
#[derive(Clone, Copy, Debug)]
pub struct ResetDelays {
    pub success: Duration,
    pub failure: Duration,
}

/// Open the progress channel for `session` and run it to its terminal state.
///
/// Returns after the reset (and, on success, the catalog refresh signal) has
/// been emitted.
pub async fn run_session(
    api: &dyn ImportApi,
    mut session: MonitorSession,
    tx: &mpsc::Sender<ImportEvent>,
    delays: ResetDelays,
) -> SessionOutcome {
    let id = session.id();
    tracing::info!(session = %id, "monitoring task {}", session.handle());

    let mut stream = match api.open_progress(session.handle()).await {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(session = %id, "could not open progress stream: {e}");
            None
        }
    };

    loop {
        let step = match stream.as_mut() {
            Some(s) => match s.next().await {
                Some(Ok(data)) => session.on_payload(&data),
                Some(Err(e)) => {
                    tracing::warn!(session = %id, "progress stream error: {e}");
                    session.on_disconnect()
                }
                None => {
                    tracing::warn!(session = %id, "progress stream closed by server");
                    session.on_disconnect()
                }
            },
            None => session.on_disconnect(),
        };

        match step {
            Step::Ignored => {}
            Step::Progress(view) => {
                let _ = tx
                    .send(ImportEvent::Progress {
                        session: id,
                        view,
                    })
                    .await;
            }
            Step::Terminal { view, outcome } => {
                debug_assert!(session.is_terminated());
                // Close before acting on the outcome.
                drop(stream.take());
                if view.is_none() {
                    tracing::warn!(
                        session = %id,
                        "job outcome unknown, last seen {}%",
                        session.view().percent
                    );
                }
                finish(id, view, &outcome, tx, delays).await;
                return outcome;
            }
        }
    }
}

/// Terminal branch: show the outcome, wait if it is confirmed, then reset.
async fn finish(
    id: SessionId,
    view: Option<ProgressView>,
    outcome: &SessionOutcome,
    tx: &mpsc::Sender<ImportEvent>,
    delays: ResetDelays,
) {
    if let Some(view) = view {
        let _ = tx.send(ImportEvent::Progress { session: id, view }).await;
    }

    match outcome {
        SessionOutcome::Completed { message } => {
            tracing::info!(session = %id, "import completed: {message}");
            notify(tx, id, Notification::success("Success", message.clone())).await;
            tokio::time::sleep(delays.success).await;
            let _ = tx.send(ImportEvent::Reset { session: id }).await;
            let _ = tx.send(ImportEvent::CatalogStale).await;
        }
        SessionOutcome::Failed { message } => {
            tracing::info!(session = %id, "import failed: {message}");
            notify(tx, id, Notification::error("Import Failed", message.clone())).await;
            tokio::time::sleep(delays.failure).await;
            let _ = tx.send(ImportEvent::Reset { session: id }).await;
        }
        SessionOutcome::ConnectionLost => {
            // Outcome unknown: reset immediately and do not refresh.
            notify(tx, id, Notification::error("Error", CONNECTION_LOST)).await;
            let _ = tx.send(ImportEvent::Reset { session: id }).await;
        }
    }
}

async fn notify(tx: &mpsc::Sender<ImportEvent>, session: SessionId, notification: Notification) {
    let _ = tx
        .send(ImportEvent::Notice {
            session,
            notification,
        })
        .await;
}
