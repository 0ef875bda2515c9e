use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;

use super::candidate_extractor::CandidateExtractor;
use super::candidate_store::CandidateStore;
use super::errors::ExtractionError;
use super::models::{
    Candidate, FileState, FileStatus, PreviewSnapshot, ProcessingMode, UploadedFile,
};
use super::page_selection::PageSelection;
use super::progress::ProgressReporter;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    PreviewReady {
        file_name: String,
        page_count: Option<u32>,
    },
    StatusChanged(FileStatus),
    CandidateAdded {
        id: String,
    },
}

struct PendingPreview {
    file: Arc<UploadedFile>,
    page_count: Option<u32>,
}

#[derive(Default)]
struct QueueState {
    mode: ProcessingMode,
    queued: VecDeque<Arc<UploadedFile>>,
    preview: Option<PendingPreview>,
    /// Set from manual confirmation until that file's pipeline ends.
    manual_in_flight: Option<String>,
    statuses: Vec<FileStatus>,
}

impl QueueState {
    fn is_known(&self, file_name: &str) -> bool {
        self.statuses.iter().any(|s| s.file_name == file_name)
            || self.queued.iter().any(|f| f.name == file_name)
            || self
                .preview
                .as_ref()
                .is_some_and(|p| p.file.name == file_name)
    }

    fn status_mut(&mut self, file_name: &str) -> Option<&mut FileStatus> {
        self.statuses.iter_mut().find(|s| s.file_name == file_name)
    }

    fn upsert_status(&mut self, status: FileStatus) {
        match self.status_mut(&status.file_name) {
            Some(existing) => *existing = status,
            None => self.statuses.push(status),
        }
    }
}

enum Next {
    Parse(Arc<UploadedFile>),
    Preview(Arc<UploadedFile>),
    Idle,
}

struct Inner {
    state: Mutex<QueueState>,
    store: Arc<CandidateStore>,
    extractor: Arc<CandidateExtractor>,
    events: broadcast::Sender<QueueEvent>,
    tracker: TaskTracker,
    runtime: Handle,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // No subscribers is not an error.
    fn emit(&self, event: QueueEvent) {
        let _ = self.events.send(event);
    }
}

/// Admits uploaded files, optionally holds each one for page selection, and
/// runs extraction for every dispatched file. Each file's pipeline owns its
/// status entry; a failing file never affects the others.
#[derive(Clone)]
pub struct IngestionQueue {
    inner: Arc<Inner>,
}

impl IngestionQueue {
    /// Pipelines run on `runtime`, so the queue can be driven from threads
    /// outside it.
    pub fn new(
        extractor: Arc<CandidateExtractor>,
        store: Arc<CandidateStore>,
        mode: ProcessingMode,
        runtime: Handle,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    mode,
                    ..QueueState::default()
                }),
                store,
                extractor,
                events,
                tracker: TaskTracker::new(),
                runtime,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    pub fn mode(&self) -> ProcessingMode {
        self.inner.lock().mode
    }

    /// Takes effect at the next dispatch decision; files already parsing or
    /// in preview are left alone.
    pub fn set_mode(&self, mode: ProcessingMode) {
        self.inner.lock().mode = mode;
        tracing::info!(?mode, "processing mode changed");
        self.drain();
    }

    /// Admits files whose names are not already known to the queue and
    /// returns the admitted names.
    pub fn enqueue(&self, files: Vec<UploadedFile>) -> Vec<String> {
        let mut admitted = Vec::new();
        {
            let mut state = self.inner.lock();
            let mut seen = HashSet::new();
            for file in files {
                if state.is_known(&file.name) || !seen.insert(file.name.clone()) {
                    tracing::debug!(file_name = %file.name, "duplicate upload ignored");
                    continue;
                }
                admitted.push(file.name.clone());
                state.queued.push_back(Arc::new(file));
            }
        }

        if !admitted.is_empty() {
            tracing::info!(count = admitted.len(), "files admitted");
        }
        self.drain();
        admitted
    }

    pub fn preview(&self) -> Option<PreviewSnapshot> {
        self.inner.lock().preview.as_ref().map(|p| PreviewSnapshot {
            file_name: p.file.name.clone(),
            mime_type: p.file.mime_type.clone(),
            page_count: p.page_count,
        })
    }

    /// The file in preview with its page count, if known yet.
    pub(crate) fn preview_entry(&self) -> Option<(Arc<UploadedFile>, Option<u32>)> {
        self.inner
            .lock()
            .preview
            .as_ref()
            .map(|p| (Arc::clone(&p.file), p.page_count))
    }

    /// Dispatches the file in preview with the chosen pages. `None` means
    /// every page. Returns the file name, or `None` when nothing was in
    /// preview.
    pub fn confirm_preview(&self, selection: Option<PageSelection>) -> Option<String> {
        self.confirm(None, selection)
    }

    /// Like [`Self::confirm_preview`], but only when `file` is still the one
    /// in preview. A selection chosen for one file never reaches another.
    pub(crate) fn confirm_preview_of(
        &self,
        file: &Arc<UploadedFile>,
        selection: Option<PageSelection>,
    ) -> Option<String> {
        self.confirm(Some(file), selection)
    }

    fn confirm(
        &self,
        expected: Option<&Arc<UploadedFile>>,
        selection: Option<PageSelection>,
    ) -> Option<String> {
        let file = {
            let mut state = self.inner.lock();
            let current = &state.preview.as_ref()?.file;
            if expected.is_some_and(|expected| !Arc::ptr_eq(current, expected)) {
                return None;
            }
            let preview = state.preview.take()?;
            state.manual_in_flight = Some(preview.file.name.clone());
            self.mark_parsing(&mut state, &preview.file.name);
            preview.file
        };

        let file_name = file.name.clone();
        tracing::info!(
            file_name = %file_name,
            pages = ?selection.as_ref().map(PageSelection::len),
            "preview confirmed"
        );
        self.spawn_parse(file, selection);
        self.drain();
        Some(file_name)
    }

    /// Drops the file in preview without rendering or parsing it.
    pub fn cancel_preview(&self) -> Option<String> {
        let file_name = self.inner.lock().preview.take()?.file.name.clone();
        tracing::info!(file_name = %file_name, "preview cancelled");
        self.drain();
        Some(file_name)
    }

    /// Status entries in dispatch order.
    pub fn file_statuses(&self) -> Vec<FileStatus> {
        self.inner.lock().statuses.clone()
    }

    pub fn queued_file_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .queued
            .iter()
            .map(|f| f.name.clone())
            .collect()
    }

    /// Removes finished entries. Entries still parsing stay with their
    /// pipeline. Returns how many were removed.
    pub fn clear_statuses(&self) -> usize {
        let mut state = self.inner.lock();
        let before = state.statuses.len();
        state.statuses.retain(|s| !s.status.is_terminal());
        before - state.statuses.len()
    }

    /// Resolves once every spawned parse and page count lookup has finished,
    /// including work those tasks started in turn.
    pub async fn wait_idle(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    fn drain(&self) {
        loop {
            let next = {
                let mut state = self.inner.lock();
                match state.mode {
                    ProcessingMode::Auto => match state.queued.pop_front() {
                        Some(file) => {
                            self.mark_parsing(&mut state, &file.name);
                            Next::Parse(file)
                        }
                        None => Next::Idle,
                    },
                    ProcessingMode::Manual => {
                        if state.preview.is_some() || state.manual_in_flight.is_some() {
                            Next::Idle
                        } else {
                            match state.queued.pop_front() {
                                Some(file) => {
                                    state.preview = Some(PendingPreview {
                                        file: Arc::clone(&file),
                                        page_count: None,
                                    });
                                    Next::Preview(file)
                                }
                                None => Next::Idle,
                            }
                        }
                    }
                }
            };

            match next {
                Next::Parse(file) => self.spawn_parse(file, None),
                Next::Preview(file) => {
                    self.spawn_page_count(file);
                    return;
                }
                Next::Idle => return,
            }
        }
    }

    // Events go out under the state lock so observers see them in state order.
    fn mark_parsing(&self, state: &mut QueueState, file_name: &str) {
        let status = FileStatus::parsing(file_name);
        state.upsert_status(status.clone());
        self.inner.emit(QueueEvent::StatusChanged(status));
    }

    fn record_progress(&self, file_name: &str, percent: u8) {
        let mut state = self.inner.lock();
        let Some(status) = state.status_mut(file_name) else {
            return;
        };
        if status.status != FileState::Parsing || percent <= status.progress {
            return;
        }

        status.progress = percent.min(100);
        status.updated_at = Utc::now();
        let snapshot = status.clone();
        self.inner.emit(QueueEvent::StatusChanged(snapshot));
    }

    fn finish(&self, file_name: &str, result: Result<Candidate, ExtractionError>) {
        let (state_after, error) = match result {
            Ok(candidate) => {
                let id = candidate.id.clone();
                self.inner.store.push(candidate);
                self.inner.emit(QueueEvent::CandidateAdded { id: id.clone() });
                tracing::info!(file_name, candidate_id = %id, "file parsed");
                (FileState::Success, None)
            }
            Err(err) => {
                tracing::warn!(file_name, error = %err, "file failed");
                (FileState::Error, Some(err.to_string()))
            }
        };

        {
            let mut state = self.inner.lock();
            state.upsert_status(FileStatus {
                file_name: file_name.to_string(),
                status: state_after,
                progress: 100,
                error,
                updated_at: Utc::now(),
            });
            if let Some(status) = state.status_mut(file_name) {
                self.inner.emit(QueueEvent::StatusChanged(status.clone()));
            }
            if state.manual_in_flight.as_deref() == Some(file_name) {
                state.manual_in_flight = None;
            }
        }

        self.drain();
    }

    fn spawn_parse(&self, file: Arc<UploadedFile>, selection: Option<PageSelection>) {
        let queue = self.clone();
        let task = async move {
            let progress = FileProgress {
                queue: &queue,
                file_name: &file.name,
            };
            let result = queue
                .inner
                .extractor
                .extract(&file, selection.as_ref(), &progress)
                .await;
            queue.finish(&file.name, result);
        };
        self.inner.tracker.spawn_on(task, &self.inner.runtime);
    }

    fn spawn_page_count(&self, file: Arc<UploadedFile>) {
        let queue = self.clone();
        let task = async move {
            let page_count = match queue.inner.extractor.renderer().page_count(&file).await {
                Ok(count) => count,
                Err(err) => {
                    tracing::debug!(file_name = %file.name, error = %err, "page count unavailable");
                    None
                }
            };

            let mut state = queue.inner.lock();
            let still_previewing = match state.preview.as_mut() {
                Some(preview) if Arc::ptr_eq(&preview.file, &file) => {
                    preview.page_count = page_count;
                    true
                }
                _ => false,
            };
            if still_previewing {
                queue.inner.emit(QueueEvent::PreviewReady {
                    file_name: file.name.clone(),
                    page_count,
                });
            }
        };
        self.inner.tracker.spawn_on(task, &self.inner.runtime);
    }
}

struct FileProgress<'a> {
    queue: &'a IngestionQueue,
    file_name: &'a str,
}

impl ProgressReporter for FileProgress<'_> {
    fn report(&self, percent: u8) {
        self.queue.record_progress(self.file_name, percent);
    }
}
