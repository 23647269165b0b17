//! # Debounced Autosave
//!
//! Field edits are saved with a trailing debounce: every edit restarts the
//! window, and one `PUT` with the latest data goes out when the window
//! expires without further edits.
//!
//! ```text
//!            push                 deadline             save done
//!   Idle ──────────▶ Pending ───────────────▶ InFlight ──────────▶ Idle
//!                    │  ▲ push (restart)         │ push             ▲
//!                    │  └────┘                   ▼                  │
//!                    │                     InFlight + queued ───────┘
//!                    │ flush                     (→ Pending on completion)
//!                    └──────────▶ InFlight
//! ```
//!
//! A failed save puts its data back as pending without a deadline, unless a
//! newer edit arrived meanwhile. It is sent again by the next `flush` or
//! superseded by the next edit; there is no timer-driven retry.
//!
//! [`Debounce`] is the pure state machine; [`AutosaveHandle`] drives it on a
//! tokio task against a [`DocumentApi`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::api::DocumentApi;
use crate::document::DocumentData;
use crate::error::DocflowError;

/// Where the saver is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    /// An edit is waiting for the window to expire.
    Pending,
    /// A save request is outstanding.
    InFlight,
}

/// Trailing-edge debounce over values of type `T`.
#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    state: SaveState,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: SaveState::Idle,
            pending: None,
            deadline: None,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    /// True when a value is waiting, including one queued behind a save.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due; `None` unless `Pending`.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SaveState::Pending => self.deadline,
            _ => None,
        }
    }

    /// Record a new value, replacing any pending one and restarting the
    /// window. During a save the value is queued.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.deadline = Some(now + self.window);
        if self.state == SaveState::Idle {
            self.state = SaveState::Pending;
        }
    }

    /// Take the pending value if its window has expired.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(at) if at <= now => self.start(),
            _ => None,
        }
    }

    /// Take the pending value immediately, cancelling its timer.
    ///
    /// Returns `None` while a save is in flight; the queued value is picked
    /// up by [`Debounce::complete`].
    pub fn flush(&mut self) -> Option<T> {
        match self.state {
            SaveState::Pending => self.start(),
            _ => None,
        }
    }

    /// The outstanding save finished. A value queued meanwhile becomes
    /// pending again with its own deadline.
    pub fn complete(&mut self) {
        if self.state != SaveState::InFlight {
            return;
        }
        self.state = if self.pending.is_some() {
            SaveState::Pending
        } else {
            self.deadline = None;
            SaveState::Idle
        };
    }

    /// The outstanding save failed. `value` becomes pending again (with no
    /// deadline) unless a newer value was queued during the save.
    pub fn fail(&mut self, value: T) {
        if self.state != SaveState::InFlight {
            return;
        }
        if self.pending.is_none() {
            self.pending = Some(value);
            self.deadline = None;
        }
        self.state = SaveState::Pending;
    }

    /// Drop the pending value. An in-flight save is not affected.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
        if self.state == SaveState::Pending {
            self.state = SaveState::Idle;
        }
    }

    fn start(&mut self) -> Option<T> {
        let value = self.pending.take()?;
        self.deadline = None;
        self.state = SaveState::InFlight;
        Some(value)
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// Observable save progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveStatus {
    pub state: SaveState,
    /// Message of the last failed save; cleared by the next success.
    pub last_error: Option<String>,
    /// Number of successful saves.
    pub saves: u64,
}

enum Command {
    Edit(DocumentData),
    Flush(oneshot::Sender<Result<(), DocflowError>>),
    Cancel,
    Shutdown(oneshot::Sender<Result<(), DocflowError>>),
}

/// Handle to a per-document autosave task.
///
/// Cheap to clone; the task stops on [`AutosaveHandle::shutdown`] or when
/// every handle is dropped (a pending edit is saved first in both cases).
#[derive(Clone)]
pub struct AutosaveHandle {
    document_id: String,
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
}

impl std::fmt::Debug for AutosaveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveHandle")
            .field("document_id", &self.document_id)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

impl AutosaveHandle {
    /// Spawn the saver task for `document_id` on the current runtime.
    pub fn spawn(api: Arc<dyn DocumentApi>, document_id: impl Into<String>, window: Duration) -> Self {
        let document_id = document_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::default());

        let saver = Saver {
            api,
            document_id: document_id.clone(),
            debounce: Debounce::new(window),
            status: status_tx,
        };
        tokio::spawn(saver.run(rx));

        Self {
            document_id,
            tx,
            status,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Queue `data` for saving after the debounce window.
    pub fn schedule(&self, data: DocumentData) {
        if self.tx.send(Command::Edit(data)).is_err() {
            tracing::warn!("[autosave] {}: saver stopped, edit dropped", self.document_id);
        }
    }

    /// Save any pending edit now and wait for the result.
    pub async fn flush(&self) -> Result<(), DocflowError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Flush(reply), rx).await
    }

    /// Discard a pending edit without saving it.
    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }

    /// Save any pending edit, then stop the task.
    ///
    /// When that save fails the error is returned and the task keeps
    /// running, so the edit can still be flushed or shut down again.
    pub async fn shutdown(&self) -> Result<(), DocflowError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Shutdown(reply), rx).await
    }

    /// Current save status.
    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    async fn request(
        &self,
        command: Command,
        rx: oneshot::Receiver<Result<(), DocflowError>>,
    ) -> Result<(), DocflowError> {
        self.tx
            .send(command)
            .map_err(|_| DocflowError::Transport("autosave task stopped".to_string()))?;
        rx.await
            .map_err(|_| DocflowError::Transport("autosave task stopped".to_string()))?
    }
}

struct Saver {
    api: Arc<dyn DocumentApi>,
    document_id: String,
    debounce: Debounce<DocumentData>,
    status: watch::Sender<SaveStatus>,
}

impl Saver {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let command = match self.debounce.deadline() {
                Some(at) => tokio::select! {
                    command = rx.recv() => command,
                    _ = tokio::time::sleep_until(at) => {
                        if let Some(data) = self.debounce.poll(Instant::now()) {
                            let _ = self.save(data).await;
                        }
                        continue;
                    }
                },
                None => rx.recv().await,
            };

            match command {
                Some(Command::Edit(data)) => {
                    self.debounce.push(data, Instant::now());
                    self.publish();
                }
                Some(Command::Flush(reply)) => {
                    let _ = reply.send(self.flush().await);
                }
                Some(Command::Cancel) => {
                    tracing::debug!("[autosave] {}: pending edit cancelled", self.document_id);
                    self.debounce.cancel();
                    self.publish();
                }
                Some(Command::Shutdown(reply)) => {
                    // A failed final save keeps the task alive with the edit pending.
                    let result = self.flush().await;
                    let stop = result.is_ok();
                    let _ = reply.send(result);
                    if stop {
                        break;
                    }
                }
                None => {
                    let _ = self.flush().await;
                    break;
                }
            }
        }
        tracing::debug!("[autosave] {}: stopped", self.document_id);
    }

    async fn flush(&mut self) -> Result<(), DocflowError> {
        match self.debounce.flush() {
            Some(data) => self.save(data).await,
            None => Ok(()),
        }
    }

    async fn save(&mut self, data: DocumentData) -> Result<(), DocflowError> {
        self.publish();
        let result = self.api.save_document(&self.document_id, &data).await;

        let outcome = match result {
            Ok(_) => {
                self.debounce.complete();
                tracing::debug!("[autosave] {}: saved", self.document_id);
                self.status.send_modify(|s| {
                    s.saves += 1;
                    s.last_error = None;
                });
                Ok(())
            }
            Err(e) => {
                self.debounce.fail(data);
                tracing::warn!("[autosave] {}: save failed: {}", self.document_id, e);
                self.status
                    .send_modify(|s| s.last_error = Some(e.to_string()));
                Err(e)
            }
        };
        self.publish();
        outcome
    }

    fn publish(&self) {
        let state = self.debounce.state();
        self.status.send_if_modified(|s| {
            let changed = s.state != state;
            s.state = state;
            changed
        });
    }
}
