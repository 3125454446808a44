pub mod config;
pub mod intake;
pub mod invoice;
pub mod orchestrator;
pub mod reconcile;
pub mod request;
pub mod store;
pub mod view;

pub use config::Config;
pub use intake::{FileCandidate, FileIntakeCollector, SubmitOutcome};
pub use orchestrator::Orchestrator;
pub use store::{HttpInvoiceStore, RemoteInvoiceStore, StoreError};
