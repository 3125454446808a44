// src/intake.rs

use crate::store::{RemoteInvoiceStore, StoreError};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};

pub const PDF_MIME: &str = "application/pdf";

/// A file the user picked, before it is admitted to the queue.
#[derive(Clone, PartialEq, Eq)]
pub struct FileCandidate {
    name: String,
    mime_type: Option<String>,
    data: Arc<[u8]>,
}

impl FileCandidate {
    pub fn new(
        name: impl Into<String>,
        mime_type: Option<&str>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            data: data.into(),
        }
    }

    /// Read a local file. No MIME type is declared, so admission goes by
    /// the file extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, None, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Declared as `application/pdf`, or named `*.pdf` in any case.
    pub fn is_pdf(&self) -> bool {
        let by_type = self
            .mime_type
            .as_deref()
            .is_some_and(|m| m.trim().eq_ignore_ascii_case(PDF_MIME));
        by_type || self.name.to_ascii_lowercase().ends_with(".pdf")
    }
}

impl fmt::Debug for FileCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCandidate")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// The queue snapshot handed to the store for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    files: Vec<FileCandidate>,
}

impl UploadBatch {
    pub fn files(&self) -> &[FileCandidate] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.data.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakePhase {
    Idle,
    HasSelection,
    Submitting,
}

/// Last user-facing outcome of the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeStatus {
    #[default]
    Clear,
    NothingSelected,
    Uploaded,
    Failed,
}

impl IntakeStatus {
    pub fn message(&self) -> &'static str {
        match self {
            IntakeStatus::Clear => "",
            IntakeStatus::NothingSelected => "Select at least one PDF",
            IntakeStatus::Uploaded => "Uploaded and parsed!",
            IntakeStatus::Failed => "Upload failed",
        }
    }
}

/// Why `begin_submit` did not start an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    NothingSelected,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Uploaded { files: usize },
    Failed,
    Rejected(SubmitRejected),
}

/// Queue, busy flag and status message as one value.
///
/// Every transition is a plain method with no I/O; the async
/// [`FileIntakeCollector::submit`] only strings them around the store call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeState {
    queue: Vec<FileCandidate>,
    busy: bool,
    status: IntakeStatus,
}

impl IntakeState {
    pub fn queue(&self) -> &[FileCandidate] {
        &self.queue
    }

    pub fn status(&self) -> IntakeStatus {
        self.status
    }

    pub fn phase(&self) -> IntakePhase {
        if self.busy {
            IntakePhase::Submitting
        } else if self.queue.is_empty() {
            IntakePhase::Idle
        } else {
            IntakePhase::HasSelection
        }
    }

    /// Append every PDF candidate in order; anything else is dropped
    /// without a status change. The queue is locked while submitting.
    /// Returns how many were admitted.
    pub fn add_files(&mut self, candidates: impl IntoIterator<Item = FileCandidate>) -> usize {
        if self.busy {
            warn!("Ignoring file selection while an upload is in flight");
            return 0;
        }

        let before = self.queue.len();
        for candidate in candidates {
            if candidate.is_pdf() {
                self.queue.push(candidate);
            } else {
                info!(name = %candidate.name, mime = ?candidate.mime_type, "Skipping non-PDF file");
            }
        }
        self.queue.len() - before
    }

    /// Start an upload: snapshot the queue and mark the state busy.
    pub fn begin_submit(&mut self) -> Result<UploadBatch, SubmitRejected> {
        if self.busy {
            return Err(SubmitRejected::Busy);
        }
        if self.queue.is_empty() {
            self.status = IntakeStatus::NothingSelected;
            return Err(SubmitRejected::NothingSelected);
        }

        self.busy = true;
        self.status = IntakeStatus::Clear;
        Ok(UploadBatch {
            files: self.queue.clone(),
        })
    }

    /// Settle the upload started by `begin_submit`. The queue only empties
    /// on success; a failure leaves it as it was for a retry.
    pub fn finish_submit(
        &mut self,
        batch: UploadBatch,
        result: Result<(), StoreError>,
    ) -> SubmitOutcome {
        self.busy = false;
        match result {
            Ok(()) => {
                self.queue.clear();
                self.status = IntakeStatus::Uploaded;
                SubmitOutcome::Uploaded { files: batch.len() }
            }
            Err(e) => {
                warn!(error = %e, files = batch.len(), "Upload failed, keeping selection");
                self.status = IntakeStatus::Failed;
                SubmitOutcome::Failed
            }
        }
    }

    /// Release an upload that will never settle, e.g. because its future
    /// was dropped. The queue is kept for a retry.
    pub fn abandon_submit(&mut self) {
        if !self.busy {
            return;
        }
        warn!(files = self.queue.len(), "Upload abandoned before it settled, keeping selection");
        self.busy = false;
        self.status = IntakeStatus::Failed;
    }

    /// Drop the whole selection. Does nothing while submitting or when the
    /// queue is already empty.
    pub fn clear_selection(&mut self) -> bool {
        if self.busy || self.queue.is_empty() {
            return false;
        }
        self.queue.clear();
        true
    }
}

/// Holds the state busy for one upload. Dropping it before `settle`
/// abandons the upload, so a cancelled `submit` cannot leave the
/// collector locked.
struct InFlight<'a> {
    state: &'a mut IntakeState,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a mut IntakeState) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, batch: UploadBatch, result: Result<(), StoreError>) -> SubmitOutcome {
        self.settled = true;
        self.state.finish_submit(batch, result)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.abandon_submit();
        }
    }
}

type UploadListener = Box<dyn FnMut(usize) + Send>;

/// Owns the intake state and drives uploads against a store.
#[derive(Default)]
pub struct FileIntakeCollector {
    state: IntakeState,
    listeners: Vec<UploadListener>,
}

impl FileIntakeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    /// Called once per successful upload with the number of files sent.
    pub fn on_uploaded(&mut self, listener: impl FnMut(usize) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn add_files(&mut self, candidates: impl IntoIterator<Item = FileCandidate>) -> usize {
        self.state.add_files(candidates)
    }

    pub fn clear_selection(&mut self) -> bool {
        self.state.clear_selection()
    }

    pub async fn submit<S>(&mut self, store: &S) -> SubmitOutcome
    where
        S: RemoteInvoiceStore + ?Sized,
    {
        let batch = match self.state.begin_submit() {
            Ok(batch) => batch,
            Err(rejected) => {
                info!(reason = ?rejected, "Submit skipped");
                return SubmitOutcome::Rejected(rejected);
            }
        };

        let in_flight = InFlight::new(&mut self.state);
        let span = info_span!("upload", files = batch.len());
        let result = store.upload(&batch).instrument(span).await;
        let outcome = in_flight.settle(batch, result);

        if let SubmitOutcome::Uploaded { files } = outcome {
            info!(files, "Upload accepted");
            for listener in &mut self.listeners {
                listener(files);
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pdf(name: &str) -> FileCandidate {
        FileCandidate::new(name, Some(PDF_MIME), b"%PDF-1.7".to_vec())
    }

    fn names(state: &IntakeState) -> Vec<&str> {
        state.queue().iter().map(|f| f.name()).collect()
    }

    #[test]
    fn test_pdf_detection() {
        assert!(pdf("scan").is_pdf());
        assert!(FileCandidate::new("A.PDF", None, Vec::<u8>::new()).is_pdf());
        assert!(
            FileCandidate::new("a.pdf", Some("application/octet-stream"), Vec::<u8>::new())
                .is_pdf()
        );
        assert!(FileCandidate::new("blob", Some("Application/PDF"), Vec::<u8>::new()).is_pdf());
        assert!(!FileCandidate::new("notes.txt", Some("text/plain"), Vec::<u8>::new()).is_pdf());
        assert!(!FileCandidate::new("report.pdf.zip", None, Vec::<u8>::new()).is_pdf());
    }

    #[test]
    fn test_add_files_keeps_pdfs_in_order() {
        let mut state = IntakeState::default();
        let admitted = state.add_files(vec![
            FileCandidate::new("a.png", Some("image/png"), vec![1u8]),
            pdf("one"),
            FileCandidate::new("two.PDF", None, vec![2u8]),
            FileCandidate::new("notes.docx", None, vec![3u8]),
            pdf("three"),
        ]);

        assert_eq!(admitted, 3);
        assert_eq!(names(&state), vec!["one", "two.PDF", "three"]);
        assert_eq!(state.phase(), IntakePhase::HasSelection);
        assert_eq!(state.status(), IntakeStatus::Clear);
    }

    #[test]
    fn test_duplicates_are_admitted() {
        let mut state = IntakeState::default();
        state.add_files(vec![pdf("same.pdf")]);
        state.add_files(vec![pdf("same.pdf")]);
        assert_eq!(names(&state), vec!["same.pdf", "same.pdf"]);
    }

    #[test]
    fn test_begin_submit_empty_queue() {
        let mut state = IntakeState::default();
        assert_eq!(state.begin_submit(), Err(SubmitRejected::NothingSelected));
        assert_eq!(state.status(), IntakeStatus::NothingSelected);
        assert_eq!(state.phase(), IntakePhase::Idle);
    }

    #[test]
    fn test_second_submit_rejected_while_busy() {
        let mut state = IntakeState::default();
        state.add_files(vec![pdf("a.pdf")]);

        let batch = state.begin_submit().unwrap();
        assert_eq!(state.phase(), IntakePhase::Submitting);
        assert_eq!(state.begin_submit(), Err(SubmitRejected::Busy));
        assert_eq!(state.add_files(vec![pdf("late.pdf")]), 0);
        assert!(!state.clear_selection());

        state.finish_submit(batch, Ok(()));
        assert_eq!(state.phase(), IntakePhase::Idle);
    }

    #[test]
    fn test_abandon_submit_unlocks_and_keeps_queue() {
        let mut state = IntakeState::default();
        state.add_files(vec![pdf("a.pdf")]);
        state.abandon_submit();
        assert_eq!(state.status(), IntakeStatus::Clear);

        let _batch = state.begin_submit().unwrap();
        state.abandon_submit();

        assert_eq!(state.phase(), IntakePhase::HasSelection);
        assert_eq!(state.status(), IntakeStatus::Failed);
        assert_eq!(names(&state), vec!["a.pdf"]);
        assert!(state.begin_submit().is_ok());
    }

    #[test]
    fn test_failure_preserves_queue() {
        let mut state = IntakeState::default();
        state.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]);
        let before = state.queue().to_vec();

        let batch = state.begin_submit().unwrap();
        let outcome = state.finish_submit(
            batch,
            Err(StoreError::Status {
                status: 500,
                body: String::new(),
            }),
        );

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(state.queue(), before.as_slice());
        assert_eq!(state.phase(), IntakePhase::HasSelection);
        assert_eq!(state.status().message(), "Upload failed");
    }

    #[test]
    fn test_clear_selection() {
        let mut state = IntakeState::default();
        assert!(!state.clear_selection());

        state.add_files(vec![pdf("a.pdf")]);
        assert!(state.clear_selection());
        assert!(state.queue().is_empty());
        assert_eq!(state.phase(), IntakePhase::Idle);
    }

    #[tokio::test]
    async fn test_submit_empty_sends_nothing() {
        let store = FakeStore::default();
        let mut collector = FileIntakeCollector::new();

        let outcome = collector.submit(&store).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(SubmitRejected::NothingSelected)
        );
        assert_eq!(store.upload_calls(), 0);
        assert_ne!(collector.state().status(), IntakeStatus::Uploaded);
        assert_ne!(collector.state().status(), IntakeStatus::Failed);
    }

    #[tokio::test]
    async fn test_submit_success_clears_and_notifies_once() {
        let store = FakeStore::default();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut collector = FileIntakeCollector::new();
        let counter = fired.clone();
        collector.on_uploaded(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        collector.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]);

        let outcome = collector.submit(&store).await;

        assert_eq!(outcome, SubmitOutcome::Uploaded { files: 2 });
        assert!(collector.state().queue().is_empty());
        assert_eq!(collector.state().phase(), IntakePhase::Idle);
        assert_eq!(collector.state().status(), IntakeStatus::Uploaded);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(store.uploaded_names(), vec![vec!["a.pdf", "b.pdf"]]);
    }

    #[tokio::test]
    async fn test_retry_after_failure_resends_same_queue() {
        let store = FakeStore::default();
        store.fail_next_upload();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut collector = FileIntakeCollector::new();
        let counter = fired.clone();
        collector.on_uploaded(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        collector.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]);

        assert_eq!(collector.submit(&store).await, SubmitOutcome::Failed);
        assert_eq!(collector.state().phase(), IntakePhase::HasSelection);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        assert_eq!(
            collector.submit(&store).await,
            SubmitOutcome::Uploaded { files: 2 }
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.uploaded_names(),
            vec![vec!["a.pdf", "b.pdf"], vec!["a.pdf", "b.pdf"]]
        );
    }

    #[tokio::test]
    async fn test_cancelled_submit_releases_busy() {
        let store = FakeStore::default();
        store.set_upload_hanging(true);
        let mut collector = FileIntakeCollector::new();
        collector.add_files(vec![pdf("a.pdf")]);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), collector.submit(&store)).await;
        assert!(cancelled.is_err());

        assert_eq!(collector.state().phase(), IntakePhase::HasSelection);
        assert_eq!(collector.state().status(), IntakeStatus::Failed);
        assert_eq!(names(collector.state()), vec!["a.pdf"]);

        store.set_upload_hanging(false);
        assert_eq!(
            collector.submit(&store).await,
            SubmitOutcome::Uploaded { files: 1 }
        );
        assert_eq!(store.upload_calls(), 2);
        assert_eq!(collector.state().phase(), IntakePhase::Idle);
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = std::env::temp_dir().join(format!("intake-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("scan.PDF");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();

        let candidate = FileCandidate::from_path(&path).await.unwrap();
        assert_eq!(candidate.name(), "scan.PDF");
        assert_eq!(candidate.data(), b"%PDF-1.4");
        assert!(candidate.mime_type().is_none());
        assert!(candidate.is_pdf());

        let missing = FileCandidate::from_path(dir.join("missing.pdf")).await;
        assert!(matches!(missing, Err(StoreError::Io(_))));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
