//! Infrastructure layer: document storage engines, typed collections and the
//! multi-document workflows (checkout, fulfilment, invoicing, signup) built on
//! top of them.

pub mod reports;
pub mod store;
pub mod workflows;

pub use store::{
    Collection, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, Replacement,
    StoreError, UniqueKey,
};
pub use workflows::{Shop, WorkflowError};
