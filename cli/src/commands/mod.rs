mod auth;
mod dashboard;
mod export;
mod helpers;
mod history;
mod insight;
mod record;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::supabase::SupabaseClient;
use fitlog_core::service::FitlogService;

pub(crate) use auth::{cmd_login, cmd_logout, cmd_signup, cmd_whoami};
pub(crate) use dashboard::cmd_dashboard;
pub(crate) use export::{cmd_export, cmd_import};
pub(crate) use history::cmd_history;
pub(crate) use insight::cmd_insight;
pub(crate) use record::{RecordEdit, cmd_add, cmd_delete, cmd_edit};

pub(crate) type Service = FitlogService<SupabaseClient>;

fn backend_client(config: &Config) -> Result<SupabaseClient> {
    let (url, key) = config.backend()?;
    SupabaseClient::new(url, key)
}

/// Resume the stored session and load its records.
pub(super) async fn connect(config: &Config) -> Result<Service> {
    let principal = config
        .load_session()?
        .context("Not signed in. Run `fitlog login <handle>` first")?;
    let mut svc = FitlogService::resume(backend_client(config)?, principal);
    svc.load()
        .await
        .context("Failed to load records (run `fitlog login` again if the session expired)")?;
    Ok(svc)
}
