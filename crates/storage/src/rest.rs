//! Realtime-database REST adapter and anonymous sign-in.
//!
//! Paths map to `{base}/{path}.json`; `GET` reads, `PATCH` merges and `PUT`
//! overwrites. The id token obtained at sign-in is shared with the store
//! through [`AuthSession`] and sent as the `auth` query parameter.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use progress_core::model::UserId;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::repository::{IdentityProvider, RemotePath, RemoteStore, StorageError};

pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Connection settings for the REST adapters.
#[derive(Clone, Debug)]
pub struct RestConfig {
    pub database_url: String,
    pub auth_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Id token shared between the identity issuer and the document store.
#[derive(Debug, Default)]
pub struct AuthSession {
    id_token: RwLock<Option<String>>,
}

impl AuthSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: String) {
        *self.id_token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.id_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Builds both adapters over one HTTP client and one session.
///
/// # Errors
///
/// Returns `StorageError` if a URL is malformed or the client cannot be built.
pub fn connect(config: &RestConfig) -> Result<(RestRemoteStore, AnonymousAuth), StorageError> {
    let client = Client::builder().timeout(config.timeout).build()?;
    let session = Arc::new(AuthSession::new());
    let remote = RestRemoteStore::new(client.clone(), &config.database_url, Arc::clone(&session))?;
    let auth = AnonymousAuth::new(client, &config.auth_url, config.api_key.clone(), session)?;
    Ok((remote, auth))
}

fn base_url(raw: &str) -> Result<Url, StorageError> {
    let trimmed = raw.trim().trim_end_matches('/');
    Ok(Url::parse(&format!("{trimmed}/"))?)
}

fn check_status(response: Response) -> Result<Response, StorageError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StorageError::Unauthorized),
        status => Err(StorageError::HttpStatus(status)),
    }
}

//
// ─── DOCUMENT STORE ────────────────────────────────────────────────────────────
//

#[derive(Clone)]
pub struct RestRemoteStore {
    client: Client,
    base: Url,
    session: Arc<AuthSession>,
}

impl RestRemoteStore {
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` if `database_url` cannot be parsed.
    pub fn new(
        client: Client,
        database_url: &str,
        session: Arc<AuthSession>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            client,
            base: base_url(database_url)?,
            session,
        })
    }

    /// Full request URL for `path`, including the auth token when present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` if the path cannot be joined.
    pub fn url_for(&self, path: &RemotePath) -> Result<Url, StorageError> {
        let mut url = self.base.join(&format!("{path}.json"))?;
        if let Some(token) = self.session.token() {
            url.query_pairs_mut().append_pair("auth", &token);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        check_status(request.send().await?)
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn read_once(&self, path: &RemotePath) -> Result<Option<Value>, StorageError> {
        debug!(%path, "remote read");
        let response = self.send(self.client.get(self.url_for(path)?)).await?;
        let value: Value = response.json().await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn update(
        &self,
        path: &RemotePath,
        fields: Map<String, Value>,
    ) -> Result<(), StorageError> {
        debug!(%path, keys = fields.len(), "remote update");
        self.send(self.client.patch(self.url_for(path)?).json(&fields))
            .await?;
        Ok(())
    }

    async fn set(&self, path: &RemotePath, value: Value) -> Result<(), StorageError> {
        debug!(%path, "remote set");
        self.send(self.client.put(self.url_for(path)?).json(&value))
            .await?;
        Ok(())
    }
}

//
// ─── ANONYMOUS SIGN-IN ─────────────────────────────────────────────────────────
//

#[derive(Clone)]
pub struct AnonymousAuth {
    client: Client,
    sign_up_url: Url,
    session: Arc<AuthSession>,
}

impl AnonymousAuth {
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` if `auth_url` cannot be parsed.
    pub fn new(
        client: Client,
        auth_url: &str,
        api_key: String,
        session: Arc<AuthSession>,
    ) -> Result<Self, StorageError> {
        let mut sign_up_url = base_url(auth_url)?.join("./accounts:signUp")?;
        sign_up_url.query_pairs_mut().append_pair("key", &api_key);
        Ok(Self {
            client,
            sign_up_url,
            session,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest {
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    id_token: String,
}

#[async_trait]
impl IdentityProvider for AnonymousAuth {
    async fn sign_in_anonymously(&self) -> Result<UserId, StorageError> {
        let response = self
            .client
            .post(self.sign_up_url.clone())
            .json(&SignUpRequest {
                return_secure_token: true,
            })
            .send()
            .await?;
        let body: SignUpResponse = check_status(response)?.json().await?;
        let user_id = UserId::new(body.local_id)?;
        self.session.set_token(body.id_token);
        debug!(%user_id, "anonymous sign-in");
        Ok(user_id)
    }
}
