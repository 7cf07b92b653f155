//! Static portal assets
//!
//! Every file the login page references is served from the configured
//! assets directory with the same header set the appliance uses for it.
//! A file that cannot be read is answered with the forbidden page.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::{AppError, AppResult};
use crate::fidelity::{self, Profile};
use crate::AppState;

#[derive(Debug)]
pub struct Asset {
    /// Route path
    pub route: &'static str,
    /// File, relative to the assets directory
    pub file: &'static str,
    pub content_type: &'static str,
    pub profile: Profile,
}

pub const ASSETS: &[Asset] = &[
    Asset { route: "/styles.css", file: "css/styles.css", content_type: "text/css", profile: Profile::Revalidated },
    Asset { route: "/css/legacy-main.css", file: "css/legacy-main.css", content_type: "text/css", profile: Profile::Revalidated },
    Asset { route: "/js/legacy_theme_setup.js", file: "js/legacy_theme_setup.js", content_type: "application/x-javascript", profile: Profile::Revalidated },
    Asset { route: "/sslvpn/js/login.js", file: "js/login.js", content_type: "application/x-javascript", profile: Profile::Revalidated },
    Asset { route: "/remote/fgt_lang", file: "js/fgt_lang_en.js", content_type: "application/javascript", profile: Profile::LanguageBundle },
    Asset { route: "/assets/brand-login-left.svg", file: "assets/brand-login-left.svg", content_type: "image/svg+xml", profile: Profile::Revalidated },
    Asset { route: "/assets/brand-login-right.svg", file: "assets/brand-login-right.svg", content_type: "image/svg+xml", profile: Profile::Revalidated },
    Asset { route: "/assets/sslvpn-portal-login.svg", file: "assets/sslvpn-portal-login.svg", content_type: "image/svg+xml", profile: Profile::Revalidated },
    Asset { route: "/fonts/ftnt-icons.woff", file: "fonts/ftnt-icons.woff", content_type: "application/font-woff", profile: Profile::Font },
    Asset { route: "/lato-regular.woff2", file: "fonts/lato-regular.woff2", content_type: "application/font-woff", profile: Profile::Font },
];

pub async fn serve(State(state): State<AppState>, asset: &'static Asset) -> AppResult<Response> {
    let path = state.config.assets_dir.join(asset.file);

    let contents = tokio::fs::read(&path)
        .await
        .map_err(|source| AppError::AssetUnavailable {
            path: asset.route.to_string(),
            source,
        })?;

    Ok(fidelity::respond(asset.profile, StatusCode::OK, asset.content_type, contents))
}
