//! Integration test fixtures: mock passport issuer, mock backend, token minting.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use passport_gateway::{app, config::Config};
use serde_json::{Value, json};

pub const SECRET: &[u8] = b"943cb527164de7a08667b48ae9279a3888545bdcb83f1da6d178370eb015aecb";

/// How the mock issuer answers `POST /api/passport`.
#[derive(Clone, Debug)]
pub enum IssuerMode {
    Claims(Value),
    Status(u16),
    Delay(Duration, Value),
    Garbage,
}

#[derive(Clone)]
pub struct MockIssuer {
    pub mode: Arc<Mutex<IssuerMode>>,
    pub calls: Arc<AtomicUsize>,
    pub last_authorization: Arc<Mutex<Option<String>>>,
    pub last_body: Arc<Mutex<Option<Value>>>,
}

impl MockIssuer {
    pub fn new(mode: IssuerMode) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            calls: Arc::new(AtomicUsize::new(0)),
            last_authorization: Arc::new(Mutex::new(None)),
            last_body: Arc::new(Mutex::new(None)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn issue(State(mock): State<MockIssuer>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    mock.calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_authorization.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *mock.last_body.lock().unwrap() = Some(body);

    let mode = mock.mode.lock().unwrap().clone();
    match mode {
        IssuerMode::Claims(claims) => Json(claims).into_response(),
        IssuerMode::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        IssuerMode::Delay(delay, claims) => {
            tokio::time::sleep(delay).await;
            Json(claims).into_response()
        }
        IssuerMode::Garbage => "<html>oops</html>".into_response(),
    }
}

/// Mock backend: echoes the request it received as JSON.
#[derive(Clone, Default)]
pub struct MockBackend {
    pub calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn echo(State(backend): State<MockBackend>, req: Request<Body>) -> Response {
    backend.calls.fetch_add(1, Ordering::SeqCst);

    let headers: BTreeMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();

    Json(json!({
        "method": req.method().as_str(),
        "path": req.uri().path(),
        "headers": headers,
    }))
    .into_response()
}

pub async fn spawn(router: Router) -> String {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let local_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", local_addr)
}

pub struct TestGateway {
    pub router: Router,
    pub issuer: MockIssuer,
    pub backend: MockBackend,
}

pub async fn gateway(mode: IssuerMode, overrides: &[(&str, &str)]) -> TestGateway {
    let issuer = MockIssuer::new(mode);
    let issuer_url = spawn(
        Router::new()
            .route("/api/passport", post(issue))
            .with_state(issuer.clone()),
    )
    .await;

    let backend = MockBackend::default();
    let backend_url = spawn(Router::new().fallback(echo).with_state(backend.clone())).await;

    let secret = STANDARD.encode(SECRET);
    let config = Config::from_lookup(|key| {
        if let Some((_, v)) = overrides.iter().find(|(k, _)| *k == key) {
            return Some(v.to_string());
        }
        match key {
            "PASSPORT_ISSUER_BASE_URL" => Some(issuer_url.clone()),
            "UPSTREAM_BASE_URL" => Some(backend_url.clone()),
            "JWT_SECRET_KEY" => Some(secret.clone()),
            "ISSUER_CONNECT_TIMEOUT_MS" => Some("500".to_string()),
            "ISSUER_RESPONSE_TIMEOUT_MS" => Some("300".to_string()),
            "REQUEST_TIMEOUT_SECONDS" => Some("5".to_string()),
            _ => None,
        }
    })
    .unwrap();

    let state = app::build_state(&config).unwrap();
    let router = app::build_router(state, &config);

    TestGateway {
        router,
        issuer,
        backend,
    }
}

pub fn user_claims() -> Value {
    json!({"userId": "42", "role": "user"})
}

pub fn mint_token(exp_offset_secs: i64) -> String {
    mint_token_with(SECRET, exp_offset_secs)
}

pub fn mint_token_with(secret: &[u8], exp_offset_secs: i64) -> String {
    let claims = json!({
        "sub": "1",
        "role": "user",
        "type": "ACCESS",
        "email": "someone@example.com",
        "exp": Utc::now().timestamp() + exp_offset_secs,
    });

    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
}

pub fn get(path: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
