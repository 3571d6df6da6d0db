//! Axum server setup
//!
//! - Request scope middleware around every route
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use axum::middleware::from_fn_with_state;
use axum::Router;
use quire_core::{create_pool, AuthResolver, SessionKeys};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::error::{AppError, ServerError};
use super::middleware::request_scope;
use super::routes;
use crate::config::ServerConfig;
use crate::db;
use crate::state::AppState;

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::pages::router(&state))
        .merge(routes::auth::router(&state))
        .merge(routes::api::router())
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), request_scope))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Run the HTTP server.
///
/// Connects the pool, makes sure the schema exists, then serves until a
/// shutdown signal arrives.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let pool = create_pool(&config.database_url).await?;
    db::migrations::run(&pool).await?;

    let keys = SessionKeys::new(&config.secret_key, config.session_ttl);
    let state = AppState::new(pool, AuthResolver::new(keys), config.cookie_secure());
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(environment = %config.environment, "Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{HeaderMap, Request, StatusCode};
    use axum::response::Response;
    use axum_extra::extract::cookie::CookieJar;
    use tower::ServiceExt;

    use crate::http::cookies;

    use super::*;

    fn test_state() -> AppState {
        AppState::for_tests()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_owned())
            .collect()
    }

    /// Jar a browser would send back after `response`.
    fn returned_jar(response: &Response) -> CookieJar {
        let mut headers = HeaderMap::new();
        for cookie in set_cookies(response) {
            let pair = cookie.split("; ").next().unwrap_or_default().to_owned();
            headers.append(COOKIE, pair.parse().unwrap());
        }
        CookieJar::from_headers(&headers)
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = build_router(test_state()).oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"status":"healthy"}"#);
    }

    #[tokio::test]
    async fn profile_redirects_anonymous_to_login() {
        let response = build_router(test_state()).oneshot(get("/profile")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/login");
        let flash = cookies::read_flash(&returned_jar(&response));
        assert_eq!(flash.as_deref(), Some("You need to be logged in to view this page."));
    }

    #[tokio::test]
    async fn post_form_requires_login() {
        let response = build_router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/posts/create")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("title=Hello&content=World"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/login");
    }

    #[tokio::test]
    async fn api_create_rejects_anonymous() {
        let response = build_router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/posts")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"title":"Hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, r#"{"error":"unauthorized"}"#);
    }

    #[tokio::test]
    async fn unknown_route_renders_404_page() {
        let response = build_router(test_state()).oneshot(get("/nowhere")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn non_numeric_post_id_is_404_page() {
        let response = build_router(test_state()).oneshot(get("/posts/abc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn non_numeric_api_post_id_is_json_404() {
        let response = build_router(test_state())
            .oneshot(get("/api/posts/abc"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, r#"{"error":"Post not found"}"#);
    }

    #[tokio::test]
    async fn api_store_outage_answers_json() {
        let state = test_state();
        let token = state.resolver().keys().issue(1).unwrap();
        let request = Request::builder()
            .uri("/api/posts")
            .header(COOKIE, format!("quire_session={}", token.as_str()))
            .body(Body::empty())
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            body_text(response).await,
            r#"{"error":"an internal error occurred"}"#
        );
        assert_eq!(state.lifecycle().counters().active(), 0);
    }

    #[tokio::test]
    async fn forged_session_is_anonymous() {
        let request = Request::builder()
            .uri("/login")
            .header(COOKIE, "quire_session=not.a.token")
            .body(Body::empty())
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains(r#"action="/login""#));
        assert!(!body.contains("/logout"));
    }

    #[tokio::test]
    async fn pending_flash_is_shown_then_cleared() {
        let request = Request::builder()
            .uri("/register")
            .header(COOKIE, "quire_flash=Hello%20there")
            .body(Body::empty())
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();

        assert!(set_cookies(&response).iter().any(|c| c.starts_with("quire_flash=;")));
        assert!(body_text(response).await.contains("Hello there"));
    }

    #[tokio::test]
    async fn logout_clears_session_cookie() {
        let response = build_router(test_state()).oneshot(get("/logout")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/");
        let headers = set_cookies(&response);
        assert!(headers
            .iter()
            .any(|c| c.starts_with("quire_session=;") && c.contains("Max-Age=0")));
        let flash = cookies::read_flash(&returned_jar(&response));
        assert_eq!(flash.as_deref(), Some("You have been logged out."));
    }

    #[tokio::test]
    async fn invalid_registration_rerenders_form_without_store() {
        let state = test_state();
        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("username=bob&email=&password=pw"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Email is required."));
        assert!(body.contains(r#"value="bob""#));
    }

    #[tokio::test]
    async fn store_outage_renders_500_and_still_ends_scope() {
        let state = test_state();
        let response = build_router(state.clone()).oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let counters = state.lifecycle().counters();
        assert_eq!(counters.opened(), 1);
        assert_eq!(counters.closed(), 1);
    }

    #[tokio::test]
    async fn every_request_ends_its_scope() {
        let state = test_state();
        let app = build_router(state.clone());

        for uri in ["/health", "/login", "/profile", "/nowhere"] {
            app.clone().oneshot(get(uri)).await.unwrap();
        }

        let counters = state.lifecycle().counters();
        assert_eq!(counters.opened(), 4);
        assert_eq!(counters.active(), 0);
    }

    // Run with: DATABASE_URL=postgres://... cargo test -p quire-server -- --ignored

    async fn db_state() -> AppState {
        use secrecy::SecretString;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        db::migrations::run(&pool).await.expect("migrations failed");
        let secret = SecretString::from("router-test-secret-router-test-secret".to_owned());
        let keys = SessionKeys::new(&secret, chrono::Duration::hours(1));
        AppState::new(pool, AuthResolver::new(keys), false)
    }

    fn form(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    /// Register `username`, log in, and return the session cookie pair.
    async fn signed_in(app: &Router, username: &str) -> String {
        let registration =
            format!("username={username}&email={username}%40example.com&password=pw");
        let response = app.clone().oneshot(form("/register", registration)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/login");

        let login = format!("username={username}&password=pw");
        let response = app.clone().oneshot(form("/login", login)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/");

        let token = cookies::session_token(&returned_jar(&response)).expect("session cookie set");
        format!("quire_session={}", token.as_str())
    }

    fn unique(prefix: &str) -> String {
        format!("{prefix}{}", chrono::Utc::now().timestamp_micros())
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn login_opens_profile() {
        let app = build_router(db_state().await);
        let username = unique("alice");
        let session = signed_in(&app, &username).await;

        let request = Request::builder()
            .uri("/profile")
            .header(COOKIE, session)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains(&format!("<h1>{username}</h1>")));
        assert!(body.contains("/logout"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn signed_in_api_create_returns_201() {
        let app = build_router(db_state().await);
        let username = unique("poster");
        let session = signed_in(&app, &username).await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/posts")
            .header(COOKIE, session)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"From the API","content":"hi"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let post: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(post["title"], "From the API");
        assert_eq!(post["username"], username.as_str());
    }
}
