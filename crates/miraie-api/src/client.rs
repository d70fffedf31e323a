// MirAIe HTTP client
//
// Wraps `reqwest::Client` with endpoint construction, bearer auth, and
// status-code mapping. The login and discovery calls are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

const DEFAULT_AUTH_BASE: &str = "https://auth.miraie.in";
const DEFAULT_APP_BASE: &str = "https://app.miraie.in";

const LOGIN_PATH: &str = "simplifi/v1/userManagement/login";
const HOMES_PATH: &str = "simplifi/v1/homeManagement/homes";
const DEVICES_PATH: &str = "simplifi/v1/deviceManagement/devices";

/// The set of HTTP endpoints the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Identity (login) endpoint.
    pub login: Url,
    /// Home listing endpoint.
    pub homes: Url,
    /// Device collection root; details live at `{devices}/{id}` and
    /// status at `{devices}/{id}/mobile/status`.
    pub devices: Url,
}

impl Endpoints {
    /// Build endpoints from separate identity and application hosts.
    pub fn new(auth_base: &Url, app_base: &Url) -> Result<Self, Error> {
        Ok(Self {
            login: join_path(auth_base, LOGIN_PATH)?,
            homes: join_path(app_base, HOMES_PATH)?,
            devices: join_path(app_base, DEVICES_PATH)?,
        })
    }

    /// Point every endpoint at a single host (used against test servers).
    pub fn with_base(base: &Url) -> Result<Self, Error> {
        Self::new(base, base)
    }

    pub(crate) fn device_details(&self, device_id: &str) -> Result<Url, Error> {
        join_path(&self.devices, device_id)
    }

    pub(crate) fn device_status(&self, device_id: &str) -> Result<Url, Error> {
        join_path(&self.devices, &format!("{device_id}/mobile/status"))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        // Both bases and every path are constants; none of these can fail.
        let auth = Url::parse(DEFAULT_AUTH_BASE).expect("invalid default auth URL");
        let app = Url::parse(DEFAULT_APP_BASE).expect("invalid default app URL");
        Self::new(&auth, &app).expect("invalid default endpoint paths")
    }
}

/// Append `path` to `base`, keeping any path prefix already on `base`.
fn join_path(base: &Url, path: &str) -> Result<Url, Error> {
    let root = base.as_str().trim_end_matches('/');
    let full = format!("{root}/{}", path.trim_start_matches('/'));
    Url::parse(&full).map_err(Error::InvalidUrl)
}

/// Raw HTTP client for the MirAIe cloud.
///
/// Stateless with respect to credentials: every authenticated call takes
/// the bearer token explicitly so the caller stays the single owner of
/// the token lifecycle.
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(endpoints: Endpoints, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, endpoints })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// The configured endpoints.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &SecretString,
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_response(resp).await
    }

    /// Send an unauthenticated POST with a JSON body and return the raw response.
    ///
    /// Status handling is left to the caller; the login flow maps specific
    /// codes onto specific error kinds.
    pub(crate) async fn post_raw(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<reqwest::Response, Error> {
        debug!("POST {}", url);

        self.http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)
    }
}

/// Map non-success statuses to errors, otherwise decode the JSON body.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "access token expired or invalid".into(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    decode(&body)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(body)),
        body: body.to_owned(),
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
