use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::limit::RequestBodyLimitLayer;

use fitlog_core::db::DocumentDb;
use fitlog_core::models::Identity;
use fitlog_core::sync::SYNC_COLLECTIONS;

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<DocumentDb>>,
    api_key: Option<String>,
}

impl AppState {
    fn db(&self) -> std::sync::MutexGuard<'_, DocumentDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Internal(err) => {
                log::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

fn check_collection(name: &str) -> Result<(), ApiError> {
    if SYNC_COLLECTIONS.contains(&name) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Unknown collection '{name}'. Must be one of: {}",
            SYNC_COLLECTIONS.join(", ")
        )))
    }
}

// --- Handlers ---

async fn signup(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<(StatusCode, Json<Identity>), ApiError> {
    let identity = state
        .db()
        .create_user(&creds.email, &creds.password)
        .map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;
    Ok((StatusCode::CREATED, Json(identity)))
}

async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Json<Identity>, ApiError> {
    let identity = state
        .db()
        .authenticate(&creds.email, &creds.password)
        .context("database error")?;
    identity.map(Json).ok_or_else(|| {
        ApiError::Unauthorized("Invalid email or password".to_string())
    })
}

async fn list_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    check_collection(&collection)?;
    let docs = state
        .db()
        .list_documents(&collection)
        .context("database error")?;
    Ok(Json(docs.into_iter().map(|d| d.body).collect()))
}

async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_collection(&collection)?;
    let doc = state
        .db()
        .get_document(&collection, &id)
        .context("database error")?;
    doc.map(|d| Json(d.body))
        .ok_or_else(|| ApiError::NotFound(format!("No document '{id}' in {collection}")))
}

async fn put_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    check_collection(&collection)?;
    let Some(owner) = body["user_id"].as_str().map(str::to_string) else {
        return Err(ApiError::BadRequest(
            "Document body must carry a user_id field".to_string(),
        ));
    };
    state
        .db()
        .put_document(&collection, &id, &owner, &body)
        .context("database error")?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_collection(&collection)?;
    let deleted = state
        .db()
        .delete_document(&collection, &id)
        .context("database error")?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

// --- Router / entry point ---

fn build_router(db: DocumentDb, api_key: Option<String>) -> Router {
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        api_key,
    };

    let api = Router::new()
        .route("/api/{collection}", get(list_collection))
        .route(
            "/api/{collection}/{id}",
            get(get_document).put(put_document).delete(delete_document),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .merge(api)
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(state)
}

pub async fn start_server(
    db: DocumentDb,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> Result<()> {
    let router = build_router(db, api_key.clone());

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    eprintln!("fitlog sync backend listening on http://{addr}");
    match (&api_key, new_api_key) {
        (Some(_), false) => eprintln!("API key auth enabled (key on file)"),
        (Some(_), true) => {}
        (None, _) => eprintln!("WARNING: API key auth disabled"),
    }

    axum::serve(listener, router)
        .await
        .context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    fn router(api_key: Option<&str>) -> Router {
        build_router(
            DocumentDb::open_in_memory().unwrap(),
            api_key.map(str::to_string),
        )
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let app = router(None);

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/signup",
                serde_json::json!({ "email": "sam@example.com", "password": "correct horse" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let identity = body_json(resp).await;
        assert_eq!(identity["email"], "sam@example.com");

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/login",
                serde_json::json!({ "email": "sam@example.com", "password": "correct horse" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(json_request(
                "POST",
                "/auth/login",
                serde_json::json!({ "email": "sam@example.com", "password": "wrong" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_document_round_trip() {
        let app = router(None);

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/weights/w1",
                serde_json::json!({ "id": "w1", "weight_kg": 80.0, "user_id": "u1" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/weights")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let listed = body_json(resp).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["weight_kg"], serde_json::json!(80.0));

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/weights/w1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["deleted"], serde_json::json!(true));

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/weights/w1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_collection_rejected() {
        let app = router(None);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/secrets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_put_requires_owner_field() {
        let app = router(None);
        let resp = app
            .oneshot(json_request(
                "PUT",
                "/api/weights/w1",
                serde_json::json!({ "id": "w1", "weight_kg": 80.0 }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let app = router(Some("secret"));

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/weights")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/weights")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // The identity gate itself stays open.
        let resp = app
            .oneshot(json_request(
                "POST",
                "/auth/signup",
                serde_json::json!({ "email": "a@b.com", "password": "long enough" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
