mod clients;
mod login;
mod lockin;
mod logout;
mod policy;

use axum::{debug_handler, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

pub use clients::{ClientProvider, Clients};
pub use policy::{Actor, AdminEmail, Policy, PrivilegePolicy};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
        .route("/session", get(whoami))
}

#[derive(Serialize)]
pub(crate) struct Whoami {
    email: Option<String>,
    admin: bool,
}

/// Keeps `url` only if it is a path on this site. `//host` and `/\host` are
/// scheme-relative to browsers, so they are dropped along with absolute urls.
pub(crate) fn local_path(url: Option<String>) -> Option<String> {
    url.filter(|url| {
        let mut chars = url.chars();
        chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\'))
    })
}

/// Lets the front end decide whether to show moderation controls.
#[debug_handler(state = AppState)]
pub(crate) async fn whoami(actor: Actor) -> Json<Whoami> {
    Json(Whoami { email: actor.email, admin: actor.privileged })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(url: &str) -> Option<String> {
        local_path(Some(url.to_owned()))
    }

    #[test]
    fn test_local_paths_are_kept() {
        assert_eq!(check("/").as_deref(), Some("/"));
        assert_eq!(check("/comments?page=2").as_deref(), Some("/comments?page=2"));
        assert_eq!(local_path(None), None);
    }

    #[test]
    fn test_offsite_urls_are_dropped() {
        assert_eq!(check("//evil.example/phish"), None);
        assert_eq!(check("/\\evil.example"), None);
        assert_eq!(check("https://evil.example"), None);
        assert_eq!(check("comments"), None);
        assert_eq!(check(""), None);
    }
}
