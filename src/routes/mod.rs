//! Router assembly: public riddle routes, admin routes, CORS, and HTTP tracing.

use std::{collections::HashMap, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::error::ApiError;
use crate::state::AppState;

pub mod admin;
pub mod http;

/// JSON body whose rejections render as the uniform error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Admin JSON body. `auth_code` is checked against the gate before the rest
/// of the body is validated, so callers without the secret never see schema
/// errors. A body that is not JSON carries no credential and fails the gate.
pub struct AdminJson<T>(pub T);

#[async_trait]
impl<T> FromRequest<Arc<AppState>> for AdminJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await.map_err(|_| ApiError::Auth)?;
        state.gate.authorize(value.get("auth_code").and_then(Value::as_str))?;
        serde_json::from_value(value)
            .map(Self)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))
    }
}

/// Admin query string, gated the same way as `AdminJson`.
pub struct AdminQuery<T>(pub T);

#[async_trait]
impl<T> FromRequestParts<Arc<AppState>> for AdminQuery<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Auth)?;
        state.gate.authorize(params.get("auth_code").map(String::as_str))?;
        let params: Map<String, Value> = params.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        serde_json::from_value(Value::Object(params))
            .map(Self)
            .map_err(|e| ApiError::Validation(format!("Invalid query: {e}")))
    }
}

/// Build the application router with:
/// - public contract under `/riddles/active` and `/riddles/check`
/// - admin lifecycle operations under `/riddles/...`, each gated by `auth_code`
///   through `AdminJson` / `AdminQuery`
/// - health probe at `/api/v1/health`
/// - unknown paths and wrong methods answered with the error envelope
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", envelope(get(http::http_health)))
        // Public
        .route("/riddles/active", envelope(get(http::http_get_active)))
        .route("/riddles/check", envelope(post(http::http_post_check)))
        // Admin
        .route("/riddles/submit", envelope(post(admin::http_post_submit)))
        .route("/riddles/activate", envelope(post(admin::http_post_activate)))
        .route("/riddles/deactivate", envelope(post(admin::http_post_deactivate)))
        .route("/riddles/expire", envelope(post(admin::http_post_expire)))
        .route("/riddles/expire-week", envelope(post(admin::http_post_expire_week)))
        .route("/riddles/all", envelope(get(admin::http_get_all)))
        .fallback(unknown_route)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Answer unsupported methods on a known path with the error envelope.
fn envelope(route: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    route.fallback(method_not_allowed)
}

async fn unknown_route() -> ApiError { ApiError::UnknownRoute }

async fn method_not_allowed() -> ApiError { ApiError::MethodNotAllowed }


#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::AdminGate;
    use crate::state::AppState;
    use crate::store::RiddleStore;

    pub const SECRET: &str = "letmein";

    pub fn app() -> Router {
        super::build_router(Arc::new(AppState::new(
            RiddleStore::in_memory(),
            AdminGate::new(Some(SECRET.into())),
        )))
    }

    pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&v).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Submit and activate a riddle through the admin routes; returns its id.
    pub async fn seed_active(app: &Router, answer: &str, digit: u8, position: u8) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/riddles/submit",
            Some(serde_json::json!({
                "auth_code": SECRET,
                "riddle_text": format!("riddle for {answer}"),
                "answer": answer,
                "digit": digit,
                "position": position,
                "week": 1
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["riddle_id"].as_str().unwrap().to_string();
        let (status, _) = send(
            app,
            "POST",
            "/riddles/activate",
            Some(serde_json::json!({ "auth_code": SECRET, "riddle_id": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        id
    }
}
