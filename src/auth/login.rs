use axum::{debug_handler, extract::{Path, Query, State}, response::{Html, IntoResponse, Redirect, Response}};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL}, AppResult, AppState};

use super::{clients::ClientProvider, local_path, Clients};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginPageQuery {
    pub(crate) error: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(
    State(clients): State<Clients>,
    Query(LoginPageQuery { error }): Query<LoginPageQuery>,
) -> impl IntoResponse {
    let mut links = String::new();
    for provider in clients.providers() {
        links += &format!("<li><a href='/login/{}'>Sign in with {provider}</a></li>", provider.slug());
    }

    let notice = match error.as_deref() {
        Some("Unauthorized") => "<p>That account is not allowed to administer this site.</p>",
        Some(_) => "<p>Sign-in failed.</p>",
        None => "",
    };

    Html(format!(r#"<!DOCTYPE html>
    <html lang="en">
    <head>
        <meta charset="UTF-8">
        <title>Administrator sign-in</title>
    </head>
    <body>
        {notice}
        <ul>{links}</ul>
    </body>
    </html>"#))
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    Path(provider): Path<ClientProvider>,
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes().iter().map(|scope| Scope::new(scope.to_string())))
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    if let Some(return_url) = local_path(return_url) {
        session.insert(RETURN_URL, return_url).await?;
    }

    Ok(Redirect::to(authorize_url.as_str()).into_response())
}
