// src/view/mod.rs

mod format;

pub use format::{
    PLACEHOLDER, compute_billing_period, format_currency, format_currency_number, format_date,
    format_plain_number, parse_date,
};

use crate::invoice::{Allocation, Charge, Invoice, LineItem, Page};
use serde::Serialize;

/// How many lines the detail view shows before collapsing the rest.
pub const DEFAULT_TOP_LINES: usize = 5;

/// Shown when there is no usable last-page text.
pub const SUMMARY_UNAVAILABLE: &str = "unavailable";

const DEFAULT_CURRENCY: &str = "USD";

/// The page with the strictly greatest `page_number`.
///
/// The scan only replaces the current pick on a strictly greater number,
/// so the first of several pages sharing the maximum wins. Pages without
/// a number are never picked.
pub fn select_last_page(pages: &[Page]) -> Option<&Page> {
    let mut last: Option<(i64, &Page)> = None;
    for page in pages {
        let Some(number) = page.page_number else {
            continue;
        };
        match last {
            Some((best, _)) if number <= best => {}
            _ => last = Some((number, page)),
        }
    }
    last.map(|(_, page)| page)
}

/// Trimmed text of the last page, or [`SUMMARY_UNAVAILABLE`].
pub fn last_page_summary(pages: &[Page]) -> String {
    select_last_page(pages)
        .and_then(|p| p.text_content.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map_or_else(|| SUMMARY_UNAVAILABLE.to_string(), str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopLines<'a> {
    pub lines: &'a [LineItem],
    pub has_more: bool,
}

/// First `n` lines in their original order.
pub fn truncate_top_lines(lines: &[LineItem], n: usize) -> TopLines<'_> {
    TopLines {
        lines: &lines[..lines.len().min(n)],
        has_more: lines.len() > n,
    }
}

/// Sum of all charge amounts; a charge without an amount counts as zero.
pub fn aggregate_charges(charges: &[Charge]) -> f64 {
    charges.iter().map(|c| c.amount.unwrap_or(0.0)).sum()
}

/// The formatted totals block of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsPanel {
    pub subtotal: String,
    pub tax: String,
    pub freight: String,
    pub other_charges: String,
    pub total: String,
}

impl TotalsPanel {
    pub fn build(invoice: &Invoice, currency_code: &str) -> Self {
        Self {
            subtotal: format_currency(invoice.subtotal.as_ref(), currency_code),
            tax: format_currency(invoice.tax.as_ref(), currency_code),
            freight: format_currency(invoice.freight.as_ref(), currency_code),
            other_charges: format_currency_number(
                aggregate_charges(&invoice.charges),
                currency_code,
            ),
            total: format_currency(invoice.total.as_ref(), currency_code),
        }
    }
}

/// One row of the invoice list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub id: i64,
    pub title: String,
    pub vendor: String,
    pub total: String,
}

impl InvoiceSummary {
    pub fn build(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id,
            title: invoice_title(invoice),
            vendor: non_empty(invoice.vendor_name.as_deref())
                .unwrap_or("Unknown")
                .to_string(),
            total: format_currency(invoice.total.as_ref(), currency_of(invoice)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub part_number: String,
    pub description: String,
    pub quantity: String,
    pub uom: String,
    pub unit_cost: String,
    pub extended_cost: String,
    pub received: bool,
}

impl LineView {
    fn build(line: &LineItem, currency_code: &str) -> Self {
        Self {
            part_number: or_placeholder(line.part_number.as_deref()),
            description: non_empty(line.description.as_deref())
                .unwrap_or("No description")
                .to_string(),
            quantity: line
                .quantity
                .filter(|q| q.is_finite())
                .map_or_else(|| PLACEHOLDER.to_string(), |q| q.to_string()),
            uom: or_placeholder(line.uom.as_deref()),
            unit_cost: format_currency(line.unit_cost.as_ref(), currency_code),
            extended_cost: format_currency(line.extended_cost.as_ref(), currency_code),
            received: line.received,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationView {
    pub account_code: String,
    pub amount: String,
    pub memo: String,
}

impl AllocationView {
    fn build(allocation: &Allocation, currency_code: &str) -> Self {
        Self {
            account_code: or_placeholder(allocation.account_code.as_deref()),
            amount: format_currency(allocation.amount.as_ref(), currency_code),
            memo: or_placeholder(allocation.memo.as_deref()),
        }
    }
}

/// Everything the detail panel shows for one invoice, already formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDetailView {
    pub title: String,
    pub vendor_badge: String,
    pub supplier: String,
    pub customer: String,
    pub order_number: String,
    pub invoice_date: String,
    pub due_date: String,
    pub billing_period: String,
    pub payment_terms: String,
    pub currency: String,
    pub confidence: String,
    pub lines_caption: String,
    pub top_lines: Vec<LineView>,
    pub has_more_lines: bool,
    pub line_count: usize,
    pub totals: TotalsPanel,
    pub allocations: Vec<AllocationView>,
    pub last_page_summary: String,
}

impl InvoiceDetailView {
    pub fn build(invoice: &Invoice, top_n: usize) -> Self {
        let currency = currency_of(invoice);
        let top = truncate_top_lines(&invoice.lines, top_n);

        Self {
            title: invoice_title(invoice),
            vendor_badge: non_empty(invoice.vendor_name.as_deref())
                .unwrap_or("Unknown vendor")
                .to_string(),
            supplier: not_captured(invoice.vendor_name.as_deref()),
            customer: not_captured(invoice.customer_name.as_deref()),
            order_number: or_placeholder(invoice.order_number.as_deref()),
            invoice_date: format_date(invoice.invoice_date.as_deref()),
            due_date: format_date(invoice.due_date.as_deref()),
            billing_period: compute_billing_period(
                invoice.billing_period_start.as_deref(),
                invoice.billing_period_end.as_deref(),
            ),
            payment_terms: or_placeholder(invoice.payment_terms.as_deref()),
            currency: currency.to_string(),
            confidence: format_confidence(invoice.parsing_confidence),
            lines_caption: format!("First {} of {} lines", top.lines.len(), invoice.lines.len()),
            top_lines: top
                .lines
                .iter()
                .map(|l| LineView::build(l, currency))
                .collect(),
            has_more_lines: top.has_more,
            line_count: invoice.lines.len(),
            totals: TotalsPanel::build(invoice, currency),
            allocations: invoice
                .allocations
                .iter()
                .map(|a| AllocationView::build(a, currency))
                .collect(),
            last_page_summary: last_page_summary(&invoice.pages),
        }
    }
}

fn invoice_title(invoice: &Invoice) -> String {
    match non_empty(invoice.invoice_number.as_deref()) {
        Some(number) => format!("Invoice #{number}"),
        None => format!("Invoice #{}", invoice.id),
    }
}

fn currency_of(invoice: &Invoice) -> &str {
    non_empty(invoice.currency.as_deref()).unwrap_or(DEFAULT_CURRENCY)
}

/// Whole-percent confidence, clamped to 0..=100.
fn format_confidence(confidence: Option<f64>) -> String {
    let pct = confidence
        .filter(|c| c.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);
    format!("{:.0}%", format::round_half_away(pct, 0))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn or_placeholder(value: Option<&str>) -> String {
    non_empty(value).unwrap_or(PLACEHOLDER).to_string()
}

fn not_captured(value: Option<&str>) -> String {
    non_empty(value).unwrap_or("Not captured").to_string()
}
