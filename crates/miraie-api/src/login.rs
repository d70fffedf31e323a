// Identity endpoint login
//
// Exchanges an identifier + secret for an access/refresh token pair.
// No retry happens here; the caller owns retry policy.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::auth::{AuthType, Credentials, generate_scope};
use crate::client::{ApiClient, decode};
use crate::error::Error;

/// Client identifier the mobile apps present to the identity endpoint.
pub const HTTP_CLIENT_ID: &str = "PBcMcfG19njNCL8AOgvRzIC8AjQa";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user_id: String,
    #[serde(default)]
    expires_in: u64,
}

impl ApiClient {
    /// Authenticate with the identity endpoint.
    ///
    /// Sends the identifier under the key selected by `auth_type`, the
    /// secret, and a freshly generated scope string. Status mapping:
    /// - `200` → [`Credentials`]
    /// - `401` → [`Error::Authentication`]
    /// - `412` → [`Error::RegistrationRequired`]
    /// - anything else → [`Error::Api`]
    pub async fn login(
        &self,
        auth_type: AuthType,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<Credentials, Error> {
        let mut body = Map::new();
        body.insert("clientId".into(), json!(HTTP_CLIENT_ID));
        body.insert("password".into(), json!(secret.expose_secret()));
        body.insert("scope".into(), json!(generate_scope()));
        body.insert(auth_type.identifier_key().into(), json!(identifier));

        debug!(auth_type = %auth_type, "logging in");

        let resp = self
            .post_raw(self.endpoints().login.clone(), &Value::Object(body))
            .await?;

        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;

        match status.as_u16() {
            200 => {
                let parsed: LoginResponse = decode(&text)?;
                debug!(user_id = %parsed.user_id, expires_in = parsed.expires_in, "login successful");
                Ok(Credentials {
                    access_token: SecretString::from(parsed.access_token),
                    refresh_token: SecretString::from(parsed.refresh_token),
                    user_id: parsed.user_id,
                    expires_in: parsed.expires_in,
                })
            }
            401 => Err(Error::Authentication {
                message: "identity endpoint rejected the credentials".into(),
            }),
            412 => Err(Error::RegistrationRequired { message: text }),
            code => Err(Error::Api {
                status: code,
                message: text,
            }),
        }
    }
}
