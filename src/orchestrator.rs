// src/orchestrator.rs

use crate::intake::{FileCandidate, FileIntakeCollector, SubmitOutcome};
use crate::invoice::{Invoice, NotReceivedRow};
use crate::reconcile::ReconciliationReport;
use crate::request::{Loadable, RequestTicket, Tracked};
use crate::store::{RemoteInvoiceStore, StoreError};
use crate::view::{InvoiceDetailView, InvoiceSummary};
use tracing::info;

/// Wires the intake collector, the invoice list and the not-received report
/// to one store.
pub struct Orchestrator<S> {
    store: S,
    intake: FileIntakeCollector,
    invoices: Tracked<Vec<Invoice>>,
    report: Tracked<Vec<NotReceivedRow>>,
    selected: Option<i64>,
    top_lines: usize,
}

impl<S: RemoteInvoiceStore> Orchestrator<S> {
    pub fn new(store: S, top_lines: usize) -> Self {
        Self {
            store,
            intake: FileIntakeCollector::new(),
            invoices: Tracked::new("invoices"),
            report: Tracked::new("not-received report"),
            selected: None,
            top_lines,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn intake(&self) -> &FileIntakeCollector {
        &self.intake
    }

    pub fn add_files(&mut self, candidates: impl IntoIterator<Item = FileCandidate>) -> usize {
        self.intake.add_files(candidates)
    }

    pub fn clear_selection(&mut self) -> bool {
        self.intake.clear_selection()
    }

    pub fn invoices(&self) -> &Loadable<Vec<Invoice>> {
        self.invoices.state()
    }

    pub fn report(&self) -> &Loadable<Vec<NotReceivedRow>> {
        self.report.state()
    }

    /// Upload the queued files; a successful upload refreshes the list once.
    pub async fn submit_uploads(&mut self) -> SubmitOutcome {
        let outcome = self.intake.submit(&self.store).await;
        if let SubmitOutcome::Uploaded { files } = outcome {
            info!(files, "Refreshing invoices after upload");
            self.refresh_invoices().await;
        }
        outcome
    }

    pub async fn refresh_invoices(&mut self) {
        let ticket = self.begin_invoice_refresh();
        let result = self.store.list_invoices().await;
        self.apply_invoices(ticket, result);
    }

    pub async fn refresh_report(&mut self) {
        let ticket = self.begin_report_refresh();
        let result = self.store.fetch_not_received().await;
        self.apply_report(ticket, result);
    }

    /// Split form of `refresh_invoices` for callers that run the request
    /// themselves. Only the response to the latest ticket is kept.
    pub fn begin_invoice_refresh(&mut self) -> RequestTicket {
        self.invoices.begin()
    }

    pub fn apply_invoices(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<Invoice>, StoreError>,
    ) -> bool {
        let applied = self.invoices.complete(ticket, result);
        if applied && self.selected.is_some_and(|id| self.find_invoice(id).is_none()) {
            self.selected = None;
        }
        applied
    }

    pub fn begin_report_refresh(&mut self) -> RequestTicket {
        self.report.begin()
    }

    pub fn apply_report(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<NotReceivedRow>, StoreError>,
    ) -> bool {
        self.report.complete(ticket, result)
    }

    pub fn summaries(&self) -> Vec<InvoiceSummary> {
        self.invoices
            .state()
            .ready()
            .map(|list| list.iter().map(InvoiceSummary::build).collect())
            .unwrap_or_default()
    }

    fn find_invoice(&self, id: i64) -> Option<&Invoice> {
        self.invoices.state().ready()?.iter().find(|inv| inv.id == id)
    }

    /// Select an invoice from the loaded list. Returns `false` if it is
    /// not in the list.
    pub fn select(&mut self, id: i64) -> bool {
        if self.find_invoice(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn selected_view(&self) -> Option<InvoiceDetailView> {
        let invoice = self.find_invoice(self.selected?)?;
        Some(InvoiceDetailView::build(invoice, self.top_lines))
    }

    /// Fetch one invoice directly, bypassing the list.
    pub async fn load_invoice_view(&self, id: i64) -> Result<InvoiceDetailView, StoreError> {
        let invoice = self.store.fetch_invoice(id).await?;
        Ok(InvoiceDetailView::build(&invoice, self.top_lines))
    }

    /// The report filtered by `query`, once it has loaded.
    pub fn report_view(&self, query: &str) -> Option<ReconciliationReport<'_>> {
        let rows = self.report.state().ready()?;
        Some(ReconciliationReport::build(rows, query))
    }
}
