//! HTTP handlers

pub mod assets;
pub mod forbidden;
pub mod portal;

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::Body;
    use axum::http::{Request, Response};
    use axum::Router;
    use honey_store::{db, CredentialSink};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::{create_router, AppState};

    /// Router over a fresh store and an assets dir with a couple of files.
    pub async fn test_app() -> (Router, AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("honeypot.db").display());
        let pool = db::create_pool(&url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let assets_dir = dir.path().join("static");
        std::fs::create_dir_all(assets_dir.join("css")).unwrap();
        std::fs::write(assets_dir.join("css/styles.css"), "body{}").unwrap();
        std::fs::create_dir_all(assets_dir.join("fonts")).unwrap();
        std::fs::write(assets_dir.join("fonts/ftnt-icons.woff"), [0x77u8, 0x4f, 0x46, 0x46]).unwrap();

        let config = Config {
            bind_addr: "127.0.0.1".parse().unwrap(),
            port: 0,
            database_url: url,
            assets_dir,
            creds_log: Some(dir.path().join("creds.log")),
            environment: "test".into(),
        };

        let sink = CredentialSink::new(pool).with_log_mirror(dir.path().join("creds.log"));
        let state = AppState { sink, config };
        (create_router(state.clone()), state, dir)
    }

    pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
