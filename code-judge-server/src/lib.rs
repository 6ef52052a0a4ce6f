mod config;
mod cors;

pub use config::{RunLimits, ServerConfig};
pub use cors::{OriginPolicy, DEFAULT_ALLOWED_ORIGINS};

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use code_judge::{
    capture_limit_for, DirectExecutor, EvaluationReport, ExecutionRequest, JudgeService,
    LanguageRegistry, TestCase,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const SERVICE_NAME: &str = "code-judge-runner";
pub const SECRET_HEADER: &str = "x-runner-secret";
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("language, sourceCode, testcases[] required")]
    InvalidRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Not found")]
    NotFound,
    #[error("RUNNER_SECRET not set")]
    SecretNotConfigured,
    #[error("Invalid origin pattern: {0}")]
    InvalidOrigin(#[from] regex::Error),
    #[error("{0}")]
    ExecutionError(#[from] code_judge::Error),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::InvalidRequest => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            ServerError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::SecretNotConfigured | ServerError::ExecutionError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ServerError::InvalidOrigin(_) | ServerError::ServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}

/// Body of `POST /run`. Every field is optional here so that a missing one
/// yields the same 400 as an empty one.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPayload {
    pub language: Option<String>,
    pub source_code: Option<String>,
    pub testcases: Option<Vec<TestCase>>,
}

impl RunPayload {
    pub fn into_request(self, limits: RunLimits) -> Result<ExecutionRequest, ServerError> {
        match (self.language, self.source_code, self.testcases) {
            (Some(language), Some(source_code), Some(testcases))
                if !language.is_empty() && !source_code.is_empty() && !testcases.is_empty() =>
            {
                Ok(ExecutionRequest {
                    language,
                    source_code,
                    testcases,
                    timeout_ms: limits.timeout_ms,
                    max_output_chars: limits.max_output_chars,
                })
            }
            _ => Err(ServerError::InvalidRequest),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<JudgeService>,
    limits: RunLimits,
    secret: Option<Arc<str>>,
}

pub async fn create_app(config: ServerConfig) -> Result<Router, ServerError> {
    let languages =
        LanguageRegistry::with_interpreters(config.python_bin.clone(), config.node_bin.clone());
    let unavailable = languages.unavailable();
    if !unavailable.is_empty() {
        warn!(
            languages = ?unavailable,
            "Some interpreters are missing; their test cases will fail"
        );
    }

    let executor =
        DirectExecutor::new().with_capture_limit(capture_limit_for(config.max_output_chars));
    let service = JudgeService::new(executor, languages, config.max_concurrent);

    let secret = config
        .runner_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .map(Arc::from);
    if secret.is_none() {
        warn!("RUNNER_SECRET is not set; /run will refuse every request");
    }

    let state = AppState {
        service: Arc::new(service),
        limits: RunLimits::from(&config),
        secret,
    };

    let cors = OriginPolicy::new(&config.allowed_origins)?.layer();

    // Everything except /health sits behind the secret, unknown paths included
    let protected = Router::new()
        .route("/run", post(run))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_secret));

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting code judge runner on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    warn!("Received shutdown signal, finishing in-flight evaluations...");
}

async fn require_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(expected) = state.secret.as_deref() else {
        return Err(ServerError::SecretNotConfigured);
    };

    let provided = request
        .headers()
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        warn!(path = %request.uri().path(), "Rejected request with bad runner secret");
        return Err(ServerError::Unauthorized);
    }

    Ok(next.run(request).await)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "languages": state.service.languages().languages(),
    }))
}

async fn not_found() -> ServerError {
    ServerError::NotFound
}

async fn run(
    State(state): State<AppState>,
    payload: Result<Json<RunPayload>, JsonRejection>,
) -> Result<Json<EvaluationReport>, ServerError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected malformed run request");
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ServerError::PayloadTooLarge,
            _ => ServerError::InvalidRequest,
        }
    })?;
    let request = payload.into_request(state.limits)?;

    let report = state.service.execute(&request).await.map_err(|e| {
        error!("Evaluation failed: {}", e);
        ServerError::ExecutionError(e)
    })?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use tower::ServiceExt;

    const SECRET: &str = "s3cret";

    async fn test_app() -> Router {
        create_app(ServerConfig {
            runner_secret: Some(SECRET.to_string()),
            ..ServerConfig::default()
        })
        .await
        .expect("Failed to create app")
    }

    fn run_request(secret: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/run")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(secret) = secret {
            builder = builder.header(SECRET_HEADER, secret);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn python_available() -> bool {
        !LanguageRegistry::default().unavailable().contains(&"python")
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["languages"], json!(["javascript", "python"]));
    }

    #[tokio::test]
    async fn test_run_requires_secret() {
        let app = test_app().await;
        let body = json!({
            "language": "python",
            "sourceCode": "print(1)",
            "testcases": [{ "output": "1" }]
        });

        let missing = app.clone().oneshot(run_request(None, body.clone())).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(missing).await,
            json!({ "ok": false, "error": "Unauthorized" })
        );

        let wrong = app.oneshot(run_request(Some("nope"), body)).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_run_without_configured_secret() {
        let app = create_app(ServerConfig::default()).await.unwrap();
        let response = app
            .oneshot(run_request(Some(""), json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "ok": false, "error": "RUNNER_SECRET not set" })
        );
    }

    #[tokio::test]
    async fn test_unknown_paths_require_secret() {
        let request_for = |uri: &str, secret: Option<&str>| {
            let mut builder = Request::builder().uri(uri);
            if let Some(secret) = secret {
                builder = builder.header(SECRET_HEADER, secret);
            }
            builder.body(Body::empty()).unwrap()
        };
        let app = test_app().await;

        let anonymous = app.clone().oneshot(request_for("/admin", None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let wrong_method = app.clone().oneshot(request_for("/run", None)).await.unwrap();
        assert_eq!(wrong_method.status(), StatusCode::UNAUTHORIZED);

        let authorized = app.oneshot(request_for("/admin", Some(SECRET))).await.unwrap();
        assert_eq!(authorized.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(authorized).await,
            json!({ "ok": false, "error": "Not found" })
        );

        let unconfigured = create_app(ServerConfig::default()).await.unwrap();
        let response = unconfigured.oneshot(request_for("/admin", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_run_validates_body() {
        let app = test_app().await;
        let invalid = [
            json!({}),
            json!({ "language": "python", "sourceCode": "print(1)" }),
            json!({ "language": "python", "sourceCode": "print(1)", "testcases": [] }),
            json!({ "language": "", "sourceCode": "print(1)", "testcases": [{ "output": "1" }] }),
            json!({ "language": "python", "sourceCode": "", "testcases": [{ "output": "1" }] }),
            json!({ "language": "python", "sourceCode": "x", "testcases": "nope" }),
        ];

        for body in invalid {
            let response = app
                .clone()
                .oneshot(run_request(Some(SECRET), body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(
                body_json(response).await,
                json!({ "ok": false, "error": "language, sourceCode, testcases[] required" })
            );
        }
    }

    #[tokio::test]
    async fn test_run_rejects_malformed_json() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/run")
            .header(header::CONTENT_TYPE, "application/json")
            .header(SECRET_HEADER, SECRET)
            .body(Body::from("{not json"))
            .unwrap();

        let response = test_app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_run_rejects_oversized_body() {
        let body = json!({
            "language": "python",
            "sourceCode": "x".repeat(BODY_LIMIT_BYTES + 1),
            "testcases": [{ "output": "" }]
        });
        let response = test_app()
            .await
            .oneshot(run_request(Some(SECRET), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_run_unsupported_language() {
        let body = json!({
            "language": "ruby",
            "sourceCode": "puts 1",
            "testcases": [{ "input": "", "output": "1" }]
        });
        let response = test_app()
            .await
            .oneshot(run_request(Some(SECRET), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "ok": false, "error": "Unsupported language" })
        );
    }

    #[tokio::test]
    async fn test_run_python() {
        if !python_available() {
            eprintln!("Skipping test: python3 not available");
            return;
        }

        let body = json!({
            "language": "python",
            "sourceCode": "import sys\nsys.stdout.write(sys.stdin.read())",
            "testcases": [
                { "input": "5\n", "output": "5" },
                { "input": 7, "output": "8" }
            ]
        });
        let response = test_app()
            .await
            .oneshot(run_request(Some(SECRET), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["ok"], true);
        assert_eq!(report["results"][0]["passed"], true);
        assert_eq!(report["results"][0]["actualOutput"], "5");
        assert_eq!(report["results"][1]["passed"], false);
        assert_eq!(report["results"][1]["actualOutput"], "7");
        assert!(report["results"][1]["runtimeMs"].is_u64());
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/run")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-runner-secret")
                .body(Body::empty())
                .unwrap()
        };
        let app = test_app().await;

        let allowed = app.clone().oneshot(preflight("http://localhost:5173")).await.unwrap();
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );

        let denied = app.oneshot(preflight("https://evil.example.com")).await.unwrap();
        assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_origin_policy() {
        let policy = OriginPolicy::new(&[r"^https://(www\.)?judge\.example$".to_string()]).unwrap();

        assert!(policy.allows("http://localhost"));
        assert!(policy.allows("https://localhost:3000"));
        assert!(policy.allows("http://127.0.0.1:8080"));
        assert!(policy.allows("https://my-team.github.io"));
        assert!(policy.allows("https://www.judge.example"));
        assert!(!policy.allows("https://127.0.0.1"));
        assert!(!policy.allows("http://my-team.github.io"));
        assert!(!policy.allows("https://localhost.evil.com"));
    }

    #[test]
    fn test_site_origin_comes_from_configuration() {
        let site = r"^https://(www\.)?syedishaq\.me$".to_string();

        assert!(!OriginPolicy::new(&[]).unwrap().allows("https://syedishaq.me"));

        let policy = OriginPolicy::new(&[site]).unwrap();
        assert!(policy.allows("https://syedishaq.me"));
        assert!(policy.allows("https://www.syedishaq.me"));
        assert!(!policy.allows("http://syedishaq.me"));
    }

    #[test]
    fn test_invalid_origin_pattern() {
        assert!(OriginPolicy::new(&["(unclosed".to_string()]).is_err());
    }

    #[test]
    fn test_empty_origin_pattern_is_ignored() {
        let policy = OriginPolicy::new(&[String::new()]).unwrap();
        assert!(!policy.allows("https://evil.example.com"));
    }

    #[test]
    fn test_payload_carries_configured_limits() {
        let payload = RunPayload {
            language: Some("python".to_string()),
            source_code: Some("print(1)".to_string()),
            testcases: Some(vec![TestCase::new("", "1")]),
        };
        let limits = RunLimits {
            timeout_ms: 750,
            max_output_chars: 64,
        };

        let request = payload.into_request(limits).unwrap();
        assert_eq!(request.timeout_ms, 750);
        assert_eq!(request.max_output_chars, 64);
    }
}
