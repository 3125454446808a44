use invoice_intake::config::{self, Config};
use invoice_intake::intake::{FileCandidate, SubmitOutcome};
use invoice_intake::request::Loadable;
use invoice_intake::view::{InvoiceDetailView, InvoiceSummary, PLACEHOLDER};
use invoice_intake::{HttpInvoiceStore, Orchestrator, RemoteInvoiceStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: invoice-intake <command>

commands:
  upload <file.pdf>...           upload PDFs for extraction
  list                           list parsed invoices
  show <invoice_id>              show one invoice
  not-received [filter]          parts not yet received, filtered by part number
  reparse <file_id>...           re-run extraction on stored files
  download <file_id> <out_path>  save the original PDF";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg_path = std::env::var("INVOICE_INTAKE_CONFIG")
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_or_default(&cfg_path)?.with_env_overrides()?;

    // init tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter));
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    info!(config = %cfg_path, base_url = %cfg.service.base_url, "Configuration loaded");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let store = HttpInvoiceStore::new(&cfg.service.base_url, cfg.request_timeout())?;
    let mut app = Orchestrator::new(store, cfg.view.top_lines);

    match command.as_str() {
        "upload" => upload(&mut app, rest).await?,
        "list" => {
            app.refresh_invoices().await;
            print_list(&app)?;
        }
        "show" => {
            let id = parse_id(rest.first())?;
            let view = app.load_invoice_view(id).await?;
            print_detail(&view);
        }
        "not-received" => {
            app.refresh_report().await;
            print_report(&app, rest.first().map(String::as_str).unwrap_or(""))?;
        }
        "reparse" => {
            let ids = rest
                .iter()
                .map(|s| parse_id(Some(s)))
                .collect::<Result<Vec<_>, _>>()?;
            let invoices = app.store().trigger_parse(&ids).await?;
            for inv in &invoices {
                print_summary(&InvoiceSummary::build(inv));
            }
        }
        "download" => {
            let id = parse_id(rest.first())?;
            let out = rest.get(1).ok_or("download needs an output path")?;
            let bytes = app.store().download_file(id).await?;
            tokio::fs::write(out, &bytes).await?;
            println!("Saved {} bytes to {out}", bytes.len());
        }
        other => {
            eprintln!("unknown command: {other}\n\n{USAGE}");
        }
    }

    Ok(())
}

async fn upload(
    app: &mut Orchestrator<HttpInvoiceStore>,
    paths: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut candidates = Vec::with_capacity(paths.len());
    for path in paths {
        match FileCandidate::from_path(path).await {
            Ok(c) => candidates.push(c),
            Err(e) => warn!(path = %path, error = %e, "Skipping unreadable file"),
        }
    }

    let admitted = app.add_files(candidates);
    info!(admitted, selected = paths.len(), "Files queued");

    let outcome = app.submit_uploads().await;
    println!("{}", app.intake().state().status().message());

    if let SubmitOutcome::Uploaded { .. } = outcome {
        print_list(app)?;
    }
    Ok(())
}

fn parse_id(arg: Option<&String>) -> Result<i64, Box<dyn std::error::Error>> {
    let raw = arg.ok_or("missing id")?;
    raw.parse::<i64>()
        .map_err(|e| format!("invalid id {raw:?}: {e}").into())
}

fn print_summary(summary: &InvoiceSummary) {
    println!(
        "{:>6}  {:<24} {:<28} {}",
        summary.id, summary.title, summary.vendor, summary.total
    );
}

fn print_list<S: RemoteInvoiceStore>(
    app: &Orchestrator<S>,
) -> Result<(), Box<dyn std::error::Error>> {
    match app.invoices() {
        Loadable::Ready(list) if list.is_empty() => println!("No invoices parsed yet."),
        Loadable::Ready(_) => {
            for summary in app.summaries() {
                print_summary(&summary);
            }
        }
        Loadable::Failed(message) => return Err(message.clone().into()),
        Loadable::Idle | Loadable::Pending => println!("Loading…"),
    }
    Ok(())
}

fn print_detail(view: &InvoiceDetailView) {
    println!("{}  [{}]", view.title, view.vendor_badge);
    println!("  Invoice date:   {}", view.invoice_date);
    println!("  Supplier:       {}", view.supplier);
    println!("  Customer:       {}", view.customer);
    println!("  PO / Order #:   {}", view.order_number);
    println!("  Due date:       {}", view.due_date);
    println!("  Billing period: {}", view.billing_period);
    println!("  Payment terms:  {}", view.payment_terms);
    println!("  Currency:       {}", view.currency);

    println!("\n  {}", view.lines_caption);
    if view.top_lines.is_empty() {
        println!("  No line items were parsed from this invoice.");
    }
    for line in &view.top_lines {
        println!(
            "  {:<16} {:<30} {:>6} {:<4} {:>12} {:>12}{}",
            line.part_number,
            line.description,
            line.quantity,
            line.uom,
            line.unit_cost,
            line.extended_cost,
            if line.received { "  received" } else { "" }
        );
    }
    if view.has_more_lines {
        println!("  (showing first {} of {})", view.top_lines.len(), view.line_count);
    }

    if !view.allocations.is_empty() {
        println!("\n  GL allocations");
        for a in &view.allocations {
            println!("  {:<12} {:>12}  {}", a.account_code, a.amount, a.memo);
        }
    }

    let t = &view.totals;
    println!("\n  Subtotal:      {}", t.subtotal);
    println!("  Tax:           {}", t.tax);
    println!("  Freight:       {}", t.freight);
    println!("  Other charges: {}", t.other_charges);
    println!("  Total:         {}", t.total);
    println!("  Parser confidence: {}", view.confidence);
    println!("\n  Last page: {}", view.last_page_summary);
}

fn print_report<S: RemoteInvoiceStore>(
    app: &Orchestrator<S>,
    query: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Loadable::Failed(message) = app.report() {
        return Err(message.clone().into());
    }
    let Some(report) = app.report_view(query) else {
        println!("Loading…");
        return Ok(());
    };
    if report.is_caught_up() {
        println!("{}", invoice_intake::reconcile::CAUGHT_UP);
    }
    for row in &report.rows {
        println!(
            "{:<20} {:<40} Not received",
            row.part_number.as_deref().unwrap_or(PLACEHOLDER),
            row.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
