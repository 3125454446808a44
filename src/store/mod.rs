// src/store/mod.rs

mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpInvoiceStore;

use crate::intake::UploadBatch;
use crate::invoice::{Invoice, NotReceivedRow};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
}

/// The extraction service as seen from the client.
///
/// Every method is a single request; nothing here retries or times out on
/// its own.
#[async_trait]
pub trait RemoteInvoiceStore: Send + Sync {
    /// `GET /invoices`
    async fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError>;

    /// `GET /invoices/{id}`
    async fn fetch_invoice(&self, id: i64) -> Result<Invoice, StoreError>;

    /// `GET /reports/not-received`
    async fn fetch_not_received(&self) -> Result<Vec<NotReceivedRow>, StoreError>;

    /// `POST /upload` with one `files` part per queued document.
    async fn upload(&self, batch: &UploadBatch) -> Result<(), StoreError>;

    /// `POST /parse/trigger`: re-run extraction on already stored files.
    async fn trigger_parse(&self, file_ids: &[i64]) -> Result<Vec<Invoice>, StoreError>;

    /// `GET /files/{id}`: the original PDF bytes.
    async fn download_file(&self, file_id: i64) -> Result<Vec<u8>, StoreError>;
}
