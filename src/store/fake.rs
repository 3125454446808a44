// src/store/fake.rs

use super::{RemoteInvoiceStore, StoreError};
use crate::intake::UploadBatch;
use crate::invoice::{Invoice, NotReceivedRow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory store with scripted failures and call counters.
#[derive(Default)]
pub(crate) struct FakeStore {
    invoices: Mutex<Vec<Invoice>>,
    rows: Mutex<Vec<NotReceivedRow>>,
    uploads: Mutex<Vec<Vec<String>>>,
    fail_upload: AtomicBool,
    hang_upload: AtomicBool,
    fail_fetch: AtomicBool,
    list_calls: AtomicUsize,
}

fn server_error() -> StoreError {
    StoreError::Status {
        status: 500,
        body: "internal error".to_string(),
    }
}

impl FakeStore {
    pub(crate) fn with_invoices(invoices: Vec<Invoice>) -> Self {
        let store = Self::default();
        *store.invoices.lock().unwrap() = invoices;
        store
    }

    pub(crate) fn set_rows(&self, rows: Vec<NotReceivedRow>) {
        *self.rows.lock().unwrap() = rows;
    }

    /// Only the next upload fails.
    pub(crate) fn fail_next_upload(&self) {
        self.fail_upload.store(true, Ordering::SeqCst);
    }

    /// Uploads never complete until cleared.
    pub(crate) fn set_upload_hanging(&self, hanging: bool) {
        self.hang_upload.store(hanging, Ordering::SeqCst);
    }

    /// Every list/report fetch fails until cleared.
    pub(crate) fn set_fetch_failing(&self, failing: bool) {
        self.fail_fetch.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn upload_calls(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// File names of every upload received, in arrival order.
    pub(crate) fn uploaded_names(&self) -> Vec<Vec<String>> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteInvoiceStore for FakeStore {
    async fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.invoices.lock().unwrap().clone())
    }

    async fn fetch_invoice(&self, id: i64) -> Result<Invoice, StoreError> {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|inv| inv.id == id)
            .cloned()
            .ok_or_else(|| StoreError::Status {
                status: 404,
                body: "Invoice not found".to_string(),
            })
    }

    async fn fetch_not_received(&self) -> Result<Vec<NotReceivedRow>, StoreError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn upload(&self, batch: &UploadBatch) -> Result<(), StoreError> {
        let names = batch.files().iter().map(|f| f.name().to_string()).collect();
        self.uploads.lock().unwrap().push(names);
        if self.hang_upload.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_upload.swap(false, Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn trigger_parse(&self, file_ids: &[i64]) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self.invoices.lock().unwrap();
        Ok(invoices
            .iter()
            .filter(|inv| file_ids.contains(&inv.id))
            .cloned()
            .collect())
    }

    async fn download_file(&self, file_id: i64) -> Result<Vec<u8>, StoreError> {
        Ok(format!("%PDF-1.7 file {file_id}").into_bytes())
    }
}
