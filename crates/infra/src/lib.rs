//! Infrastructure layer: document store, codecs, ledger service, live views.

pub mod codec;
pub mod config;
pub mod document_store;
pub mod error;
pub mod ledger_service;
pub mod projections;
pub mod reconcile;
pub mod reference;


pub use config::LedgerConfig;
pub use document_store::{
    Collection, Document, DocumentStore, FieldValue, Filter, FilterOp, InMemoryDocumentStore, OrderBy, Query,
    Snapshot, SortDirection, StoreError, Write, WriteBatch, WriteFields,
};
pub use error::{LedgerError, LedgerResult};
pub use ledger_service::StockLedgerService;
pub use reconcile::Reconciliation;
pub use reference::{Category, Language};
