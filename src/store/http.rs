// src/store/http.rs

use super::{RemoteInvoiceStore, StoreError};
use crate::intake::{PDF_MIME, UploadBatch};
use crate::invoice::{Invoice, NotReceivedRow};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Serialize)]
struct ParseTrigger<'a> {
    file_ids: &'a [i64],
}

/// `RemoteInvoiceStore` over HTTP.
pub struct HttpInvoiceStore {
    client: Client,
    base_url: String,
}

impl HttpInvoiceStore {
    /// `base_url` is the service root, e.g. `http://localhost:8000`.
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let url = self.url(path);
        info!(url = %url, "GET");
        let response = self.client.get(&url).send().await?;
        decode(check_status(response).await?).await
    }
}

/// Turn a non-success status into `StoreError::Status`, keeping the body
/// for the log.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(status = %status, body_len = body.len(), "Service returned an error status");
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Package the batch as a multipart form: one `files` part per document.
fn batch_form(batch: &UploadBatch) -> Result<Form, StoreError> {
    let mut form = Form::new();
    for file in batch.files() {
        let part = Part::bytes(file.data().to_vec())
            .file_name(file.name().to_string())
            .mime_str(PDF_MIME)?;
        form = form.part("files", part);
    }
    Ok(form)
}

#[async_trait]
impl RemoteInvoiceStore for HttpInvoiceStore {
    async fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        let invoices: Vec<Invoice> = self.get_json("/invoices").await?;
        info!(count = invoices.len(), "Fetched invoices");
        Ok(invoices)
    }

    async fn fetch_invoice(&self, id: i64) -> Result<Invoice, StoreError> {
        self.get_json(&format!("/invoices/{id}")).await
    }

    async fn fetch_not_received(&self) -> Result<Vec<NotReceivedRow>, StoreError> {
        let rows: Vec<NotReceivedRow> = self.get_json("/reports/not-received").await?;
        info!(count = rows.len(), "Fetched not-received report");
        Ok(rows)
    }

    async fn upload(&self, batch: &UploadBatch) -> Result<(), StoreError> {
        let url = self.url("/upload");
        info!(url = %url, files = batch.len(), bytes = batch.total_bytes(), "Uploading batch");

        let response = self
            .client
            .post(&url)
            .multipart(batch_form(batch)?)
            .send()
            .await?;
        // the body describes the parsed invoices; callers refresh the list instead
        check_status(response).await?;
        Ok(())
    }

    async fn trigger_parse(&self, file_ids: &[i64]) -> Result<Vec<Invoice>, StoreError> {
        let url = self.url("/parse/trigger");
        info!(url = %url, files = file_ids.len(), "Triggering re-parse");

        let response = self
            .client
            .post(&url)
            .json(&ParseTrigger { file_ids })
            .send()
            .await?;
        decode(check_status(response).await?).await
    }

    async fn download_file(&self, file_id: i64) -> Result<Vec<u8>, StoreError> {
        let url = self.url(&format!("/files/{file_id}"));
        info!(url = %url, "Downloading original");

        let response = check_status(self.client.get(&url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
