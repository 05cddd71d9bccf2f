use axum::{debug_handler, extract::{Path, Query, State}, response::Redirect};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::{session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_EMAIL}, AppResult, AppState};

use super::{clients::ClientProvider, local_path, Clients, Policy};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// OAuth callback. Only the administrator gets to keep a session.
#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(clients): State<Clients>,
    State(policy): State<Policy>,
    session: Session,
) -> AppResult<Redirect> {
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err("no csrf_state".into());
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err("csrf tokens don't match".into());
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier".into());
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let email = provider.fetch_email(&http_client, access_token).await?;

    if !policy.is_privileged(Some(email.as_str())) {
        warn!(%email, %provider, "rejected non-admin sign-in");
        session.clear().await;
        return Ok(Redirect::to("/login?error=Unauthorized"));
    }

    session.cycle_id().await?;
    session.insert(USER_EMAIL, &email).await?;
    info!(%email, %provider, "administrator signed in");

    let return_url: String = local_path(session.remove(RETURN_URL).await?).unwrap_or("/".to_string());
    Ok(Redirect::to(return_url.as_str()))
}
