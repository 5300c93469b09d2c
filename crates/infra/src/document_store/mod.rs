//! Document store abstraction and the in-memory implementation.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{
    Collection, Document, DocumentStore, FieldValue, Filter, FilterOp, OrderBy, Query, Snapshot, SortDirection,
    StoreError, Write, WriteBatch, WriteFields,
};
