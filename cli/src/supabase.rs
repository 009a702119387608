use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use fitlog_core::error::FitlogError;
use fitlog_core::models::{Credentials, HealthRecord, NewHealthRecord, Principal};
use fitlog_core::store::{AuthBackend, RecordStore};
use fitlog_core::wire::{CONFLICT_COLUMNS, TABLE, WireRecord, decode_all};

type CoreResult<T> = fitlog_core::error::Result<T>;

const TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Supabase auth + PostgREST client for the `health_records` table.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
}

/// Auth and PostgREST both report failures as JSON, under different keys.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// A request that did not produce a 2xx response.
#[derive(Debug)]
struct Rejected {
    status: Option<StatusCode>,
    message: String,
}

impl Rejected {
    fn into_store(self) -> FitlogError {
        match self.status {
            Some(status) => FitlogError::Store(format!("{status}: {}", self.message)),
            None => FitlogError::Store(self.message),
        }
    }
}

fn error_message(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("fitlog-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{TABLE}", self.base_url)
    }

    fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        let req = self
            .client
            .request(method, url)
            .header("apikey", &self.anon_key);
        match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(req: RequestBuilder) -> std::result::Result<String, Rejected> {
        let resp = req.send().await.map_err(|e| Rejected {
            status: None,
            message: format!("Failed to reach backend: {e}"),
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| Rejected {
            status: Some(status),
            message: format!("Failed to read response: {e}"),
        })?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(Rejected {
                status: Some(status),
                message: error_message(&body),
            })
        }
    }

    /// Send a table request and decode the returned representation.
    async fn rows<T: DeserializeOwned>(req: RequestBuilder) -> CoreResult<T> {
        let body = Self::send(req).await.map_err(Rejected::into_store)?;
        serde_json::from_str(&body)
            .map_err(|e| FitlogError::Store(format!("Failed to parse backend response: {e}")))
    }

    fn credentials_body(credentials: &Credentials) -> serde_json::Value {
        serde_json::json!({
            "email": credentials.login_address(),
            "password": credentials.secret,
        })
    }
}

impl AuthBackend for SupabaseClient {
    async fn sign_up(&self, credentials: &Credentials) -> CoreResult<()> {
        debug!(handle = %credentials.handle, "signing up");
        let req = self
            .request(Method::POST, &self.auth_url("signup"), None)
            .json(&Self::credentials_body(credentials));
        match Self::send(req).await {
            Ok(_) => Ok(()),
            Err(r) if r.message.to_lowercase().contains("already registered") => Err(
                FitlogError::Auth("handle already registered".to_string()),
            ),
            Err(r) => Err(FitlogError::Auth(r.message)),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> CoreResult<Principal> {
        debug!(handle = %credentials.handle, "signing in");
        let req = self
            .request(Method::POST, &self.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&Self::credentials_body(credentials));
        let body = Self::send(req).await.map_err(|r| {
            if r.message.contains("Invalid login credentials") {
                FitlogError::Auth("invalid handle or secret".to_string())
            } else {
                FitlogError::Auth(r.message)
            }
        })?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| FitlogError::Auth(format!("Unexpected sign-in response: {e}")))?;
        Ok(Principal {
            user_id: token.user.id,
            handle: credentials.handle.clone(),
            access_token: token.access_token,
        })
    }

    async fn sign_out(&self, principal: &Principal) -> CoreResult<()> {
        let req = self.request(
            Method::POST,
            &self.auth_url("logout"),
            Some(&principal.access_token),
        );
        Self::send(req)
            .await
            .map(|_| ())
            .map_err(|r| FitlogError::Auth(r.message))
    }
}

impl RecordStore for SupabaseClient {
    async fn list(&self, principal: &Principal) -> CoreResult<Vec<HealthRecord>> {
        let req = self
            .request(Method::GET, &self.table_url(), Some(&principal.access_token))
            .query(&[("select", "*"), ("order", "date.desc")]);
        let rows: Vec<WireRecord> = Self::rows(req).await?;
        debug!(count = rows.len(), "loaded records");
        decode_all(rows)
    }

    async fn upsert(
        &self,
        principal: &Principal,
        record: &NewHealthRecord,
    ) -> CoreResult<HealthRecord> {
        let req = self
            .request(Method::POST, &self.table_url(), Some(&principal.access_token))
            .query(&[("on_conflict", CONFLICT_COLUMNS)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&WireRecord::encode(record, Some(&principal.user_id)));
        let rows: Vec<WireRecord> = Self::rows(req).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| FitlogError::Store("upsert returned no row".to_string()))?
            .decode()
    }

    async fn update(&self, principal: &Principal, record: &HealthRecord) -> CoreResult<HealthRecord> {
        let req = self
            .request(Method::PATCH, &self.table_url(), Some(&principal.access_token))
            .query(&[("id", format!("eq.{}", record.id))])
            .header("Prefer", "return=representation")
            .json(&WireRecord::encode_stored(record, Some(&principal.user_id)));
        let rows: Vec<WireRecord> = Self::rows(req).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| FitlogError::Store(format!("record {} not found", record.id)))?
            .decode()
    }

    async fn delete(&self, principal: &Principal, id: &str) -> CoreResult<()> {
        let req = self
            .request(Method::DELETE, &self.table_url(), Some(&principal.access_token))
            .query(&[("id", format!("eq.{id}"))]);
        Self::send(req).await.map_err(Rejected::into_store)?;
        Ok(())
    }
}
