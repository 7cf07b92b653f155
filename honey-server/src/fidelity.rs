//! Response fidelity
//!
//! Header sets copied from a genuine SSL-VPN appliance. Each route picks
//! one [`Profile`]; the profile decides which headers appear, in which
//! order, and with which values. Security headers are on every profile.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const CONTENT_SECURITY_POLICY: &str =
    "frame-ancestors 'self'; object-src 'self'; script-src 'self' https: 'unsafe-eval' 'unsafe-inline' blob:;";

/// Fixed security headers, in the order the appliance sends them
const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "SAMEORIGIN"),
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("x-xss-protection", "1; mode=block"),
    ("x-content-type-options", "nosniff"),
    ("strict-transport-security", "max-age=31536000"),
];

/// Expiry the appliance stamps on cleared session cookies
const COOKIE_EXPIRY: &str = "Sun, 11 Mar 1984 12:00:00 GMT";

/// Session cookies the appliance clears after a failed login
const SESSION_COOKIES: [(&str, &str); 2] = [
    ("SVPNCOOKIE", "/"),
    ("SVPNNETWORKCOOKIE", "/remote/network"),
];

/// Header shapes used by the portal routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Script-redirect document at `/`
    Document,
    /// 303 adding the default language
    LangRedirect,
    /// The login form itself
    LoginForm,
    /// Login check answer
    LoginCheck,
    /// css / js / svg served with revalidation
    Revalidated,
    /// Web fonts
    Font,
    /// `fgt_lang` string bundle
    LanguageBundle,
    /// Stock web server error page
    Forbidden,
}

struct HeaderPlan {
    expired_cookies: bool,
    etag: bool,
    cache_control: Option<&'static str>,
    accept_ranges: bool,
    ua_compatible: bool,
    keep_alive_max: u8,
}

impl Profile {
    fn plan(self) -> HeaderPlan {
        let base = HeaderPlan {
            expired_cookies: false,
            etag: false,
            cache_control: None,
            accept_ranges: false,
            ua_compatible: false,
            keep_alive_max: 100,
        };

        match self {
            Profile::Document => HeaderPlan { etag: true, accept_ranges: true, ..base },
            Profile::LangRedirect => HeaderPlan { keep_alive_max: 99, ..base },
            Profile::LoginForm => HeaderPlan {
                expired_cookies: true,
                ua_compatible: true,
                keep_alive_max: 98,
                ..base
            },
            Profile::LoginCheck => HeaderPlan { expired_cookies: true, etag: true, ..base },
            Profile::Revalidated => HeaderPlan {
                etag: true,
                cache_control: Some("max-age=0, must-revalidate"),
                ..base
            },
            Profile::Font => HeaderPlan { accept_ranges: true, ..base },
            Profile::LanguageBundle => base,
            Profile::Forbidden => HeaderPlan { keep_alive_max: 99, ..base },
        }
    }
}

/// Fresh cache validator: a random opaque token in quotes.
pub fn etag() -> String {
    format!("\"{}\"", Uuid::new_v4().simple())
}

/// RFC 7231 IMF-fixdate
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Set-Cookie` values that invalidate both portal session cookies.
pub fn expired_cookies() -> Vec<String> {
    SESSION_COOKIES
        .iter()
        .map(|(name, path)| {
            format!("{name}=; path={path}; expires={COOKIE_EXPIRY}; secure; httponly; SameSite=Strict;")
        })
        .collect()
}

/// Write the profile's headers into `headers`, replacing earlier values.
pub fn apply(profile: Profile, content_type: &'static str, headers: &mut HeaderMap) {
    let plan = profile.plan();

    if plan.expired_cookies {
        for cookie in expired_cookies() {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.append(header::SET_COOKIE, value);
            }
        }
    }
    if plan.etag {
        insert(headers, header::ETAG, &etag());
    }
    insert(headers, header::DATE, &http_date(Utc::now()));
    if plan.ua_compatible {
        headers.insert("x-ua-compatible", HeaderValue::from_static("requiresActiveX=true"));
    }
    if let Some(cache_control) = plan.cache_control {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    }
    if plan.accept_ranges {
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    insert(headers, HeaderName::from_static("keep-alive"), &format!("timeout=10, max={}", plan.keep_alive_max));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Keep-Alive"));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// Build a complete response with the profile's header set.
pub fn respond(profile: Profile, status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    apply(profile, content_type, response.headers_mut());
    response
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etags_are_quoted_and_unique() {
        let a = etag();
        let b = etag();

        assert!(a.starts_with('"') && a.ends_with('"'));
        assert_eq!(a.len(), 34);
        assert_ne!(a, b);
    }

    #[test]
    fn cookie_expiry_is_a_valid_past_date() {
        let parsed = DateTime::parse_from_rfc2822(COOKIE_EXPIRY).unwrap();
        assert_eq!(http_date(parsed.with_timezone(&Utc)), COOKIE_EXPIRY);
        assert!(parsed < Utc::now());
    }

    #[test]
    fn cookies_expire_in_the_past() {
        let cookies = expired_cookies();
        assert_eq!(
            cookies,
            vec![
                "SVPNCOOKIE=; path=/; expires=Sun, 11 Mar 1984 12:00:00 GMT; secure; httponly; SameSite=Strict;",
                "SVPNNETWORKCOOKIE=; path=/remote/network; expires=Sun, 11 Mar 1984 12:00:00 GMT; secure; httponly; SameSite=Strict;",
            ]
        );
    }

    #[test]
    fn every_profile_has_security_headers() {
        for profile in [
            Profile::Document,
            Profile::LangRedirect,
            Profile::LoginForm,
            Profile::LoginCheck,
            Profile::Revalidated,
            Profile::Font,
            Profile::LanguageBundle,
            Profile::Forbidden,
        ] {
            let response = respond(profile, StatusCode::OK, "text/plain", "");
            let headers = response.headers();
            for (name, value) in SECURITY_HEADERS {
                assert_eq!(headers.get(name).unwrap(), value, "{profile:?} {name}");
            }
            assert_eq!(headers.get(header::CONNECTION).unwrap(), "Keep-Alive");
        }
    }

    #[test]
    fn profiles_differ_where_the_appliance_does() {
        let form = respond(Profile::LoginForm, StatusCode::OK, "text/html; charset=utf-8", "");
        assert_eq!(form.headers().get_all(header::SET_COOKIE).iter().count(), 2);
        assert_eq!(form.headers().get("keep-alive").unwrap(), "timeout=10, max=98");
        assert!(form.headers().get(header::ETAG).is_none());

        let asset = respond(Profile::Revalidated, StatusCode::OK, "text/css", "");
        assert_eq!(asset.headers().get(header::CACHE_CONTROL).unwrap(), "max-age=0, must-revalidate");
        assert!(asset.headers().get(header::ETAG).is_some());
        assert!(asset.headers().get(header::SET_COOKIE).is_none());
    }
}
