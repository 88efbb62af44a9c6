use async_trait::async_trait;
use axum::headers::Cookie;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, TypedHeader};
use chrono::Utc;
use reqwest::Url;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::err::{Error, Payload};
use crate::models::{to_document, OAuthState, Role, StateStatus, StudentSession};
use crate::repo::parse;
use crate::routes::AppState;
use crate::store::{DocumentStore, Filter, OAUTH_STATES, SESSIONS};
use crate::validate::{validate, OAUTH_CALLBACK};

pub const SESSION_COOKIE: &str = "session";

/// The parts of a Microsoft Graph `/me` profile the service reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: Option<String>,
    pub job_title: Option<String>,
}

/// External identity provider performing the authorization-code flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorize_url(&self, state: &str) -> Result<String, Error>;

    /// Exchanges an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, Error>;

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, Error>;
}

pub struct EntraId {
    client: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

const GRAPH_ME: &str = "https://graph.microsoft.com/v1.0/me";
const SCOPE: &str = "User.Read";

impl EntraId {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            tenant_id: config.entra_tenant_id.clone(),
            client_id: config.entra_client_id.clone(),
            client_secret: config.entra_client_secret.clone(),
            redirect_uri: config.entra_redirect_uri.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/{}",
            self.tenant_id, path
        )
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
impl IdentityProvider for EntraId {
    fn authorize_url(&self, state: &str) -> Result<String, Error> {
        let url = Url::parse_with_params(
            &self.endpoint("authorize"),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_mode", "query"),
                ("scope", SCOPE),
                ("state", state),
            ],
        )
        .map_err(|err| Error::InternalError {
            kind: "ConfigurationError",
            message: err.to_string(),
        })?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<String, Error> {
        let token = self
            .client
            .post(self.endpoint("token"))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
                ("scope", SCOPE),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, Error> {
        let profile = self
            .client
            .get(GRAPH_ME)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<Profile>()
            .await?;
        Ok(profile)
    }
}

pub fn role_for(profile: &Profile) -> Role {
    match &profile.job_title {
        Some(title) if title.contains("Student") => Role::Student,
        _ => Role::Teacher,
    }
}

/// Records a fresh pending state and returns the provider URL to send the user to.
pub async fn start_login(store: &dyn DocumentStore, idp: &dyn IdentityProvider) -> Result<String, Error> {
    let state = OAuthState {
        state: Uuid::new_v4(),
        status: StateStatus::Pending,
        created_at: Utc::now(),
    };
    store.insert_one(OAUTH_STATES, to_document(&state)?).await?;
    idp.authorize_url(&state.state.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginCallback {
    pub state: String,
    pub code: String,
}

fn state_filter(state: &str, status: Option<StateStatus>) -> Result<Filter, Error> {
    let mut filter = Filter::new();
    filter.insert("state".to_string(), Value::String(state.to_string()));
    if let Some(status) = status {
        filter.insert("status".to_string(), serde_json::to_value(status)?);
    }
    Ok(filter)
}

/// Verifies the state token, runs the code exchange and opens a session.
pub async fn complete_login(
    store: &dyn DocumentStore,
    idp: &dyn IdentityProvider,
    mut payload: Value,
) -> Result<StudentSession, Error> {
    validate(&OAUTH_CALLBACK, &mut payload)?;
    let LoginCallback { state, code } = parse(payload)?;

    let existing = match store.find_one(OAUTH_STATES, &state_filter(&state, None)?).await? {
        Some(doc) => doc,
        None => {
            return Err(Error::InvalidState {
                message: "Invalid state token".to_string(),
            })
        }
    };
    if existing.get("status") != Some(&Value::String("pending".to_string())) {
        return Err(Error::StateAlreadyUsed {
            message: "State token has already been used".to_string(),
        });
    }

    let access_token = idp.exchange_code(&code).await.map_err(|err| {
        log::warn!("token exchange failed: {:?}", err);
        Error::upstream("Failed to authenticate user")
    })?;
    let profile = idp.fetch_profile(&access_token).await.map_err(|err| {
        log::warn!("profile fetch failed: {:?}", err);
        Error::upstream("Failed to get user info")
    })?;

    let mut used = Filter::new();
    used.insert("status".to_string(), serde_json::to_value(StateStatus::Used)?);
    let flipped = store
        .update_one(OAUTH_STATES, &state_filter(&state, Some(StateStatus::Pending))?, used)
        .await
        .map_err(|err| {
            log::error!("could not mark state token used: {:?}", err);
            Error::InternalError {
                kind: "DatabaseError",
                message: "Failed to update state token".to_string(),
            }
        })?;
    if flipped == 0 {
        return Err(Error::StateAlreadyUsed {
            message: "State token has already been used".to_string(),
        });
    }

    let session = StudentSession {
        session: Uuid::new_v4(),
        role: role_for(&profile),
        created_at: Utc::now(),
    };
    store.insert_one(SESSIONS, to_document(&session)?).await?;
    log::info!(
        "opened {:?} session for {}",
        session.role,
        profile.display_name.as_deref().unwrap_or("unnamed user")
    );
    Ok(session)
}

#[derive(Debug, Clone, Copy, Eq, Ord, PartialOrd, PartialEq)]
pub enum AuthResult {
    Success,
    InvalidSession,
}

impl Serialize for AuthResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:?}", self))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub auth_result: AuthResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

pub async fn ensure_authenticated(
    session_id: Option<&str>,
    store: &dyn DocumentStore,
) -> Result<SessionInfo, Error> {
    let invalid = SessionInfo {
        auth_result: AuthResult::InvalidSession,
        role: None,
    };
    let ssid = match session_id {
        Some(ssid) if !ssid.is_empty() => ssid,
        _ => return Ok(invalid),
    };

    let mut filter = Filter::new();
    filter.insert("session".to_string(), Value::String(ssid.to_string()));
    let session = match store.find_one(SESSIONS, &filter).await? {
        Some(doc) => doc,
        None => return Ok(invalid),
    };
    let session: StudentSession = serde_json::from_value(Value::Object(session))?;
    Ok(SessionInfo {
        auth_result: AuthResult::Success,
        role: Some(session.role),
    })
}

/// Sends the browser to the provider with `302 Found`.
pub async fn login_flow(Extension(state): Extension<AppState>) -> Payload<impl IntoResponse> {
    let url = start_login(state.store.as_ref(), state.identity.as_ref()).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]))
}

pub async fn login_callback(
    Extension(state): Extension<AppState>,
    Json(body): Json<Value>,
) -> Payload<impl IntoResponse> {
    let session = complete_login(state.store.as_ref(), state.identity.as_ref(), body).await?;
    let cookie = format!("{}={}; Path=/", SESSION_COOKIE, session.session);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], "Logged in"))
}

pub async fn session_info(
    Extension(state): Extension<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
) -> Payload<Json<SessionInfo>> {
    let ssid = cookies.as_ref().and_then(|TypedHeader(c)| c.get(SESSION_COOKIE));
    Ok(Json(ensure_authenticated(ssid, state.store.as_ref()).await?))
}
