use tracing::{debug, error, warn};

use crate::aggregate::{DEFAULT_WINDOW, Dashboard};
use crate::error::{FitlogError, Result};
use crate::export::encode_csv;
use crate::history::{HistoryFilter, HistoryPage, paginate};
use crate::models::{Credentials, HealthRecord, NewHealthRecord, Principal, validate_new_record};
use crate::reconcile::{apply_delete, apply_update, apply_upsert};
use crate::store::{AuthBackend, RecordStore};

/// Signed-in principal plus the cached copy of their records.
///
/// Created empty, filled on sign-in and load, cleared on sign-out.
#[derive(Debug, Default)]
struct Session {
    principal: Option<Principal>,
    records: Vec<HealthRecord>,
}

impl Session {
    fn teardown(&mut self) {
        self.principal = None;
        self.records.clear();
    }
}

pub struct FitlogService<B> {
    backend: B,
    session: Session,
}

impl<B: AuthBackend + RecordStore> FitlogService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: Session::default(),
        }
    }

    /// Continue a session whose principal was persisted earlier.
    pub fn resume(backend: B, principal: Principal) -> Self {
        Self {
            backend,
            session: Session {
                principal: Some(principal),
                records: Vec::new(),
            },
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.session.principal.as_ref()
    }

    /// Cached records, newest date first.
    pub fn records(&self) -> &[HealthRecord] {
        &self.session.records
    }

    pub fn find(&self, id: &str) -> Option<&HealthRecord> {
        self.session.records.iter().find(|r| r.id == id)
    }

    fn require_principal(&self) -> Result<&Principal> {
        self.session
            .principal
            .as_ref()
            .ok_or_else(|| FitlogError::Auth("not signed in".to_string()))
    }

    // --- Authentication ---

    /// Register, then sign in right away with the same credentials.
    pub async fn sign_up(&mut self, handle: &str, secret: &str) -> Result<Principal> {
        let credentials = Credentials::new(handle, secret)?;
        self.backend.sign_up(&credentials).await?;
        self.start_session(&credentials).await
    }

    pub async fn sign_in(&mut self, handle: &str, secret: &str) -> Result<Principal> {
        let credentials = Credentials::new(handle, secret)?;
        self.start_session(&credentials).await
    }

    async fn start_session(&mut self, credentials: &Credentials) -> Result<Principal> {
        let principal = self.backend.sign_in(credentials).await?;
        self.session.teardown();
        self.session.principal = Some(principal.clone());
        debug!(handle = %principal.handle, "session started");
        if let Err(e) = self.load().await {
            warn!("signed in but records could not be loaded: {e}");
        }
        Ok(principal)
    }

    /// Revoke remotely if possible; the local session is cleared either way.
    pub async fn sign_out(&mut self) {
        if let Some(principal) = self.session.principal.as_ref() {
            if let Err(e) = self.backend.sign_out(principal).await {
                warn!("remote sign-out failed: {e}");
            }
        }
        self.session.teardown();
    }

    // --- Records ---

    /// Replace the cache wholesale with the store's contents.
    pub async fn load(&mut self) -> Result<usize> {
        let principal = self.require_principal()?;
        let records = self.backend.list(principal).await.inspect_err(|e| {
            error!("failed to load records: {e}");
        })?;
        self.session.records = records;
        Ok(self.session.records.len())
    }

    /// Upsert by date. `Ok(None)` means nobody is signed in and nothing changed.
    pub async fn create_or_update(
        &mut self,
        record: NewHealthRecord,
    ) -> Result<Option<HealthRecord>> {
        validate_new_record(&record)?;
        let Some(principal) = self.session.principal.as_ref() else {
            debug!("create skipped without a signed-in principal");
            return Ok(None);
        };
        let stored = self
            .backend
            .upsert(principal, &record)
            .await
            .inspect_err(|e| error!("failed to save record for {}: {e}", record.date))?;
        apply_upsert(&mut self.session.records, stored.clone());
        Ok(Some(stored))
    }

    /// Full-field replace of a persisted record.
    pub async fn update(&mut self, record: HealthRecord) -> Result<HealthRecord> {
        validate_new_record(&record.to_new())?;
        let principal = self.require_principal()?;
        let updated = self
            .backend
            .update(principal, &record)
            .await
            .inspect_err(|e| error!("failed to update record {}: {e}", record.id))?;
        apply_update(&mut self.session.records, updated.clone());
        Ok(updated)
    }

    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let principal = self.require_principal()?;
        self.backend
            .delete(principal, id)
            .await
            .inspect_err(|e| error!("failed to delete record {id}: {e}"))?;
        apply_delete(&mut self.session.records, id);
        Ok(())
    }

    // --- Views over the cache ---

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::build(&self.session.records, DEFAULT_WINDOW)
    }

    pub fn history(&self, filter: &HistoryFilter, page: usize, per_page: usize) -> HistoryPage<'_> {
        paginate(filter.apply(&self.session.records), page, per_page)
    }

    /// CSV of the whole cache, or `None` when there is nothing to export.
    pub fn export_csv(&self) -> Option<String> {
        encode_csv(&self.session.records)
    }
}
