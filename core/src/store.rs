use crate::error::Result;
use crate::models::{Credentials, HealthRecord, NewHealthRecord, Principal};

/// Authentication against the hosted backend.
///
/// The CLI implements this over HTTP with reqwest; tests use in-memory fakes.
#[allow(async_fn_in_trait)]
pub trait AuthBackend {
    /// Register a new principal. A taken handle is an `Auth` error.
    async fn sign_up(&self, credentials: &Credentials) -> Result<()>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<Principal>;
    async fn sign_out(&self, principal: &Principal) -> Result<()>;
}

/// Durable record storage scoped to a principal.
///
/// Each call is a single request/response round-trip. Nothing is cached or
/// retried at this layer.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// All records of the principal, newest date first.
    async fn list(&self, principal: &Principal) -> Result<Vec<HealthRecord>>;

    /// Insert, or overwrite the row sharing the same (principal, date).
    async fn upsert(&self, principal: &Principal, record: &NewHealthRecord)
    -> Result<HealthRecord>;

    /// Full-field replace by id. Unknown ids are a `Store` error.
    async fn update(&self, principal: &Principal, record: &HealthRecord) -> Result<HealthRecord>;

    /// Remove by id. Deleting an id that does not exist succeeds.
    async fn delete(&self, principal: &Principal, id: &str) -> Result<()>;
}
