//! Portal pages
//!
//! Bodies are fixed templates. The only dynamic parts are the error banner
//! on the login form and the echoed path on the forbidden page.

use axum::http::StatusCode;
use axum::response::Response;

use crate::fidelity::{self, Profile};

const ROOT_HTML: &str = include_str!("../templates/root.html");
const LOGIN_HTML: &str = include_str!("../templates/login.html");
const FORBIDDEN_HTML: &str = include_str!("../templates/forbidden.html");

pub const HTML: &str = "text/html; charset=utf-8";

/// Login check answer; the client script follows `redir`.
pub const LOGIN_REJECTED_BODY: &str =
    "ret=0,redir=/remote/login?&err=sslvpn_login_permission_denied&lang=en";

/// Error codes the login form knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    PermissionDenied,
}

impl LoginError {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "sslvpn_login_permission_denied" => Some(LoginError::PermissionDenied),
            _ => None,
        }
    }

    fn code(self) -> &'static str {
        match self {
            LoginError::PermissionDenied => "sslvpn_login_permission_denied",
        }
    }

    fn message(self) -> &'static str {
        match self {
            LoginError::PermissionDenied => "Error: Permission denied.",
        }
    }

    fn banner(self) -> String {
        format!(
            r#"
            <div class="error-message" id="err_str">
            <div class="message-content" id="err_val"
            title="{}">
            {}</div></div>
        "#,
            self.code(),
            self.message()
        )
    }
}

pub fn root() -> Response {
    fidelity::respond(Profile::Document, StatusCode::OK, HTML, ROOT_HTML)
}

pub fn login_form(error: Option<LoginError>) -> Response {
    let banner = error.map(LoginError::banner).unwrap_or_default();
    let body = LOGIN_HTML.replace("{{error_banner}}", &banner);
    fidelity::respond(Profile::LoginForm, StatusCode::OK, HTML, body)
}

pub fn login_rejected() -> Response {
    fidelity::respond(Profile::LoginCheck, StatusCode::OK, "text/plain", LOGIN_REJECTED_BODY)
}

/// Stock 403 page echoing the requested path.
pub fn forbidden(path: &str) -> Response {
    let body = FORBIDDEN_HTML.replace("{{path}}", &escape_html(path));
    fidelity::respond(Profile::Forbidden, StatusCode::FORBIDDEN, HTML, body)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_error_codes_render() {
        assert_eq!(
            LoginError::from_code("sslvpn_login_permission_denied"),
            Some(LoginError::PermissionDenied)
        );
        assert_eq!(LoginError::from_code("sslvpn_login_bogus"), None);
        assert_eq!(LoginError::from_code(""), None);
    }

    #[test]
    fn templates_have_their_placeholders() {
        assert!(LOGIN_HTML.contains("{{error_banner}}"));
        assert!(FORBIDDEN_HTML.contains("{{path}}"));
        assert!(ROOT_HTML.contains(r#"top.location="/remote/login";"#));
    }

    #[test]
    fn forbidden_path_is_escaped() {
        assert_eq!(escape_html("/<script>&\""), "/&lt;script&gt;&amp;&quot;");
    }
}
