use std::{fmt, path::Path};

use oauth2::{basic::BasicClient, AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl, TokenUrl};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{AppResult, GetField};

type HappyClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    pub const ALL: [ClientProvider; 2] = [ClientProvider::Google, ClientProvider::Github];

    pub fn slug(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    pub fn scopes(&self) -> &'static [&'static str] {
        use ClientProvider::*;
        match self {
            Google => &["openid", "email"],
            Github => &["user:email"],
        }
    }

    fn endpoints(&self) -> (&'static str, &'static str) {
        use ClientProvider::*;
        match self {
            Google => ("https://accounts.google.com/o/oauth2/auth", "https://oauth2.googleapis.com/token"),
            Github => ("https://github.com/login/oauth/authorize", "https://github.com/login/oauth/access_token"),
        }
    }

    /// Signed-in user's email, read with a freshly issued access token.
    pub async fn fetch_email(&self, http_client: &reqwest::Client, access_token: &str) -> AppResult<String> {
        use ClientProvider::*;
        match self {
            Google => {
                let body: Value = http_client
                    .get("https://openidconnect.googleapis.com/v1/userinfo")
                    .bearer_auth(access_token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                body.get_str_field("email")
            }
            Github => {
                let emails: Vec<GithubEmail> = http_client
                    .get("https://api.github.com/user/emails")
                    .bearer_auth(access_token)
                    .header(USER_AGENT, "guestbook")
                    .header(ACCEPT, "application/vnd.github+json")
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                emails
                    .into_iter()
                    .find(|email| email.primary && email.verified)
                    .map(|email| email.email)
                    .ok_or("github account has no verified primary email".into())
            }
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Clone, Default)]
pub struct Clients {
    google_client: Option<HappyClient>,
    github_client: Option<HappyClient>,
}

impl Clients {
    /// `{"google": {"client_id", "client_secret"}, "github": {...}}`, either key optional.
    pub fn from_json(json: Value, public_url: &str) -> AppResult<Clients> {
        let build = |provider: ClientProvider| -> AppResult<Option<HappyClient>> {
            let Some(json) = json.get(provider.slug()) else {
                return Ok(None);
            };
            let client_id = ClientId::new(json.get_str_field("client_id")?);
            let client_secret = ClientSecret::new(json.get_str_field("client_secret")?);

            let (auth_url, token_url) = provider.endpoints();
            let auth_url = AuthUrl::new(auth_url.to_owned())?;
            let token_url = TokenUrl::new(token_url.to_owned())?;
            let redirect_url = RedirectUrl::new(format!("{public_url}/lockin/{}", provider.slug()))?;

            Ok(Some(
                BasicClient::new(client_id)
                .set_client_secret(client_secret)
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_redirect_uri(redirect_url)
            ))
        };

        Ok(
            Clients {
                google_client: build(ClientProvider::Google)?,
                github_client: build(ClientProvider::Github)?,
            }
        )
    }

    /// A missing file only disables sign-in.
    pub fn load(path: impl AsRef<Path>, public_url: &str) -> AppResult<Clients> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, sign-in disabled", path.display());
                return Ok(Clients::default());
            }
            Err(e) => return Err(e.into()),
        };

        let clients = Self::from_json(serde_json::from_str(&raw)?, public_url)?;
        info!(providers = ?clients.providers(), "oauth clients loaded");
        Ok(clients)
    }

    pub fn providers(&self) -> Vec<ClientProvider> {
        ClientProvider::ALL
            .into_iter()
            .filter(|provider| self.get_client(*provider).is_ok())
            .collect()
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }.ok_or(format!("OAuth provider {provider} keys not supplied").into())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_only_configured_providers_are_available() {
        let clients = Clients::from_json(
            json!({ "github": { "client_id": "id", "client_secret": "secret" } }),
            "http://localhost:8080",
        )
        .unwrap();

        assert_eq!(clients.providers(), vec![ClientProvider::Github]);
        assert!(clients.get_client(ClientProvider::Google).is_err());

        let github = clients.get_client(ClientProvider::Github).unwrap();
        assert_eq!(
            github.redirect_uri().map(|url| url.as_str().to_owned()),
            Some("http://localhost:8080/lockin/github".to_owned())
        );
    }

    #[test]
    fn test_incomplete_provider_is_an_error() {
        assert!(Clients::from_json(json!({ "google": { "client_id": "id" } }), "http://localhost").is_err());
    }

    #[test]
    fn test_missing_file_disables_sign_in() {
        let clients = Clients::load("/nonexistent/client_secret.json", "http://localhost").unwrap();
        assert!(clients.providers().is_empty());
    }
}
