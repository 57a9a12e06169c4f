// Admin backend HTTP client
//
// Wraps `reqwest::Client` with base-URL path joining, bearer-token
// attachment, envelope unwrapping, and a single refresh-and-retry on
// HTTP 401. Endpoint methods are thin: they describe an `ApiRequest`
// and pick the response shape.

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{
    RefreshGate, RefreshOutcome, RefreshRole, RefreshSlotGuard, TokenPair, TokenStore,
    await_outcome,
};
use crate::error::Error;
use crate::models::{Envelope, ErrorResponse, Item, Page, TokenResponse};
use crate::request::ApiRequest;
use crate::transport::TransportConfig;

const REFRESH_SEGMENTS: [&str; 2] = ["auths", "refresh"];
const LOGIN_SEGMENTS: [&str; 2] = ["auths", "login"];

/// Async client for the admin REST backend.
///
/// Every call goes through [`execute`](Self::execute), which attaches
/// `Authorization: Bearer <access>` when a token is stored and performs
/// at most one token refresh + retry when the backend answers 401.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    refresh: RefreshGate,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http, tokens)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        base_url: &str,
        http: reqwest::Client,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, Error> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let path = base_url.path().trim_end_matches('/').to_owned();
        base_url.set_path(&format!("{path}/"));

        Ok(Self {
            http,
            base_url,
            tokens,
            refresh: RefreshGate::default(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append percent-encoded path segments to the base URL.
    fn url<S: AsRef<str>>(&self, segments: &[S]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in the constructor: the base URL can be a base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments.iter().map(AsRef::as_ref));
        }
        url
    }

    // ── Request pipeline ─────────────────────────────────────────────

    fn build(&self, req: &ApiRequest, token: Option<&SecretString>) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(req.method.clone(), self.url(req.segments.as_slice()));
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    /// Send a request, refreshing the access token once on HTTP 401.
    ///
    /// A request that already went through a refresh is never retried
    /// again, even if the replay also gets a 401. On refresh failure the
    /// stored tokens are cleared and the original 401 is returned.
    pub async fn execute(&self, req: &ApiRequest) -> Result<reqwest::Response, Error> {
        let mut token = self.tokens.load().map(|t| t.access_token);
        let mut retried = false;

        loop {
            debug!(method = %req.method, path = %req.display_path(), retried, "request");
            let resp = self.build(req, token.as_ref()).send().await?;
            if resp.status() != StatusCode::UNAUTHORIZED {
                return Ok(resp);
            }

            let original = unauthorized(resp).await;
            let Some(used) = token.as_ref() else {
                return Err(original);
            };
            if retried {
                debug!(path = %req.display_path(), "401 after refresh, not retrying");
                return Err(original);
            }

            retried = true;
            match self.refreshed_token(used).await {
                Some(fresh) => token = Some(fresh),
                None => return Err(original),
            }
        }
    }

    /// Obtain a token newer than `used`, refreshing at most once across
    /// all concurrent callers.
    async fn refreshed_token(&self, used: &SecretString) -> Option<SecretString> {
        // Someone else already rotated the token after our request went out.
        if let Some(current) = self.tokens.load() {
            if current.access_token.expose_secret() != used.expose_secret() {
                return Some(current.access_token);
            }
        }

        match self.refresh.enter() {
            RefreshRole::Waiter(rx) => {
                debug!("waiting on in-flight token refresh");
                await_outcome(rx).await
            }
            RefreshRole::Refresher(tx) => {
                let _slot = RefreshSlotGuard(&self.refresh);
                // A refresh may have completed between the check above and
                // entering the gate.
                if let Some(current) = self.tokens.load() {
                    if current.access_token.expose_secret() != used.expose_secret() {
                        tx.send_replace(RefreshOutcome::Refreshed(current.access_token.clone()));
                        return Some(current.access_token);
                    }
                }
                let outcome = match self.refresh_tokens().await {
                    Ok(pair) => {
                        info!("access token refreshed");
                        RefreshOutcome::Refreshed(pair.access_token)
                    }
                    Err(e) => {
                        warn!(error = %e, "token refresh failed, clearing session");
                        if let Err(e) = self.tokens.clear() {
                            warn!(error = %e, "failed to clear token store");
                        }
                        RefreshOutcome::Failed
                    }
                };
                tx.send_replace(outcome.clone());
                match outcome {
                    RefreshOutcome::Refreshed(token) => Some(token),
                    RefreshOutcome::Pending | RefreshOutcome::Failed => None,
                }
            }
        }
    }

    /// Call `/auths/refresh` with the stored refresh token and persist the result.
    async fn refresh_tokens(&self) -> Result<TokenPair, Error> {
        let current = self.tokens.load().ok_or_else(|| Error::RefreshFailed {
            message: "no stored refresh token".into(),
        })?;

        let req = ApiRequest::post(
            REFRESH_SEGMENTS,
            json!({ "refreshToken": current.refresh_token.expose_secret() }),
        );
        let resp = self.build(&req, None).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::RefreshFailed {
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let data: TokenResponse = decode::<Envelope<TokenResponse>>(resp)
            .await?
            .into_data("auths/refresh")?;
        let pair = merge_tokens(data, Some(current));
        self.tokens.save(&pair)?;
        Ok(pair)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn fetch<T: DeserializeOwned>(&self, req: &ApiRequest) -> Result<T, Error> {
        let resp = self.execute(req).await?;
        let status = resp.status();
        if status.is_success() {
            decode(resp).await
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    /// Like `fetch`, but a 2xx with an empty body or no `data` is `None`.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        req: &ApiRequest,
    ) -> Result<Option<T>, Error> {
        let resp = self.execute(req).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(parse_body::<Envelope<T>>(body)?.data)
    }

    async fn fetch_empty(&self, req: &ApiRequest) -> Result<(), Error> {
        let resp = self.execute(req).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Auth ─────────────────────────────────────────────────────────

    /// Exchange email + password for a token pair and store it.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<TokenPair, Error> {
        let req = ApiRequest::post(
            LOGIN_SEGMENTS,
            json!({ "email": email, "password": password.expose_secret() }),
        );
        debug!("logging in at {}", req.display_path());

        let resp = self.build(&req, None).send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(unauthorized(resp).await);
        }
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }

        let data = decode::<Envelope<TokenResponse>>(resp)
            .await?
            .into_data("auths/login")?;
        let pair = merge_tokens(data, None);
        self.tokens.save(&pair)?;
        info!("login successful");
        Ok(pair)
    }

    /// Forget the stored session locally.
    pub fn logout(&self) -> Result<(), Error> {
        self.tokens.clear()
    }

    // ── Collections ──────────────────────────────────────────────────

    /// `GET /{resource}/all?page&size&sort`
    pub async fn list_page(
        &self,
        resource: &str,
        page: u32,
        size: u32,
        sort: Option<&str>,
    ) -> Result<Page<Item>, Error> {
        let mut req = ApiRequest::get([resource, "all"])
            .param("page", page)
            .param("size", size);
        if let Some(sort) = sort {
            req = req.param("sort", sort);
        }
        let env: Envelope<Page<Item>> = self.fetch(&req).await?;
        env.into_data(&format!("{resource}/all"))
    }

    /// `GET /{resource}/search?name=`
    pub async fn search(&self, resource: &str, name: &str) -> Result<Vec<Item>, Error> {
        let req = ApiRequest::get([resource, "search"]).param("name", name);
        let env: Envelope<Vec<Item>> = self.fetch(&req).await?;
        env.into_data(&format!("{resource}/search"))
    }

    /// `POST` to the resource's create route. Returns `None` if the
    /// backend confirmed without echoing the item.
    pub async fn create(&self, segments: &[&str], payload: &Value) -> Result<Option<Item>, Error> {
        let req = ApiRequest::post(segments.iter().copied(), payload.clone());
        self.fetch_optional(&req).await
    }

    /// `PUT /{resource}/{id}`
    pub async fn update(
        &self,
        resource: &str,
        id: &str,
        payload: &Value,
    ) -> Result<Option<Item>, Error> {
        let req = ApiRequest::put([resource, id], payload.clone());
        self.fetch_optional(&req).await
    }

    /// `DELETE /{resource}/{id}`
    pub async fn delete(&self, resource: &str, id: &str) -> Result<(), Error> {
        self.fetch_empty(&ApiRequest::delete([resource, id])).await
    }

    // ── Overview ─────────────────────────────────────────────────────

    /// `GET /overview/{resource}`; the aggregate shape is resource-specific.
    pub async fn overview(&self, resource: &str) -> Result<Value, Error> {
        let env: Envelope<Value> = self.fetch(&ApiRequest::get(["overview", resource])).await?;
        env.into_data(&format!("overview/{resource}"))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    parse_body(resp.text().await?)
}

fn parse_body<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

async fn unauthorized(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let raw = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&raw)
        .ok()
        .and_then(|e| e.message.or(e.error))
        .unwrap_or_else(|| "session expired or invalid credentials".into());
    Error::Unauthorized { status, message }
}

async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
    if status == StatusCode::FORBIDDEN {
        return unauthorized(resp).await;
    }

    let raw = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(err) => Error::Http {
            status: status.as_u16(),
            message: err
                .message
                .or(err.error)
                .unwrap_or_else(|| status.to_string()),
            code: err.code.map(|c| match c {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            field: err.field,
        },
        Err(_) => Error::Http {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                preview(&raw).to_owned()
            },
            code: None,
            field: None,
        },
    }
}

/// Build a stored pair from a token response, keeping the previous
/// refresh token when the backend doesn't rotate it.
fn merge_tokens(data: TokenResponse, previous: Option<TokenPair>) -> TokenPair {
    let (prev_refresh, prev_refresh_exp) = previous
        .map(|p| (Some(p.refresh_token), p.refresh_expires_at))
        .unwrap_or_default();

    let refresh_token = data
        .refresh_token
        .map(SecretString::from)
        .or(prev_refresh)
        .unwrap_or_else(|| SecretString::from(String::new()));

    TokenPair {
        access_token: SecretString::from(data.access_token),
        access_expires_at: data.access_expires_at,
        refresh_token,
        refresh_expires_at: data.refresh_expires_at.or(prev_refresh_exp),
    }
}
