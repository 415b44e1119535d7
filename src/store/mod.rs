//! Remote data store access used by the health probes.
//!
//! The probes only need two read-only operations, so the store is a small
//! trait. `SupabaseStore` talks to a PostgREST endpoint over HTTP; tests
//! substitute in-memory implementations.

pub mod supabase;

pub use supabase::SupabaseStore;

use async_trait::async_trait;

/// Data store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The store rejected the query. Holds the store's own message, e.g.
    /// `relation "public.users" does not exist`.
    #[error("Query error: {0}")]
    Query(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Read-only operations the probes run against the remote store.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Lightweight existence query used to measure reachability.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Exact row count of `table`.
    async fn count_rows(&self, table: &str) -> Result<u64, StoreError>;
}
