//! Login portal handlers
//!
//! ```text
//! GET /  ──script──▶ GET /remote/login ──303──▶ GET /remote/login?lang=en
//!                                                    │ POST /remote/logincheck
//!                                                    ▼
//!                                  permission denied + expired cookies
//! ```

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use chrono::Utc;
use honey_store::{parse_login_body, CredentialAttempt};

use crate::fidelity::{self, Profile};
use crate::middleware::client::ClientAddr;
use crate::pages::{self, LoginError};
use crate::AppState;

pub const LOGIN_PATH: &str = "/remote/login";
const DEFAULT_LANG_LOCATION: &str = "/remote/login?lang=en";

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// `GET /` - frame-busting script redirect to the login form
pub async fn root() -> Response {
    pages::root()
}

/// `GET /remote/login`
pub async fn login(query: QueryPairs) -> Response {
    let params = query.map(|Query(pairs)| pairs).unwrap_or_default();

    if !params.iter().any(|(key, _)| key == "lang") {
        let mut response = fidelity::respond(Profile::LangRedirect, StatusCode::SEE_OTHER, "text/plain", "");
        response
            .headers_mut()
            .insert(header::LOCATION, HeaderValue::from_static(DEFAULT_LANG_LOCATION));
        return response;
    }

    let error = params
        .iter()
        .find(|(key, _)| key == "err")
        .and_then(|(_, code)| LoginError::from_code(code));

    pages::login_form(error)
}

/// `POST /remote/logincheck` - capture, then always reject
pub async fn login_check(
    State(state): State<AppState>,
    ClientAddr(source_ip): ClientAddr,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = body.unwrap_or_default();
    let submission = parse_login_body(&String::from_utf8_lossy(&body));
    let attempt = CredentialAttempt::new(submission, source_ip, Utc::now());

    tracing::debug!(
        user = %attempt.username,
        ip = %attempt.source_ip,
        "Credential attempt captured"
    );

    if let Err(e) = state.sink.record_credential(&attempt).await {
        tracing::warn!("Failed to record credential attempt from {}: {}", attempt.source_ip, e);
    }

    pages::login_rejected()
}
