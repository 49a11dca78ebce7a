pub mod access;
pub mod document;
pub mod error;
pub mod mutation;
pub mod storage;
pub mod store;
pub mod tenant;

pub use document::{PrincipalId, TripDocument};
pub use error::StoreError;
pub use mutation::{CollectionPath, TripFields, TripService};
pub use store::{default_document, DocumentStore};
pub use tenant::TenantKey;
