use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::State,
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use entity::User;
use platform_store::{SessionStore, load_json, save_json};
use products_deals::{DealRoom, DealRoomError, Registration};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    graphql::{SchemaType, Viewer},
};

pub const SESSION_COOKIE: &str = "dealroom_session";

#[derive(Clone)]
pub struct AppState {
    pub room: DealRoom,
    pub schema: SchemaType,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "deal room server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(AllowOrigin::list(allowed))
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler))
        .route("/register", post(register_handler))
        .route("/logout", post(logout_handler))
        .route("/graphql", post(graphql_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
}

async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> HttpResult<(CookieJar, Json<User>)> {
    let user = state
        .room
        .login(&body.email)
        .map_err(|err| HttpError::from_room(StatusCode::UNAUTHORIZED, err))?;
    let jar = start_session(&state, jar, &user)?;
    Ok((jar, Json(user)))
}

async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Registration>,
) -> HttpResult<(StatusCode, CookieJar, Json<User>)> {
    let user = state
        .room
        .register(body)
        .map_err(|err| HttpError::from_room(StatusCode::BAD_REQUEST, err))?;
    let jar = start_session(&state, jar, &user)?;
    Ok((StatusCode::CREATED, jar, Json(user)))
}

fn start_session(state: &AppState, jar: CookieJar, user: &User) -> HttpResult<CookieJar> {
    let session_id = Uuid::new_v4().to_string();
    save_json(state.sessions.as_ref(), &session_key(&session_id), user)
        .map_err(|err| HttpError::internal(err.into()))?;
    info!(user_id = %user.id, "session started");
    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies)
        .same_site(SameSite::Lax)
        .build();
    Ok(jar.add(cookie))
}

async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.clear(&session_key(cookie.value()));
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (jar, StatusCode::NO_CONTENT)
}

async fn graphql_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let viewer = Viewer(load_session(&state, &jar));
    let req = request.into_inner().data(viewer);
    state.schema.execute(req).await.into()
}

/// The signed-in user, if the cookie points at a readable session.
fn load_session(state: &AppState, jar: &CookieJar) -> Option<User> {
    let cookie = jar.get(SESSION_COOKIE)?;
    match load_json::<User>(state.sessions.as_ref(), &session_key(cookie.value())) {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "discarding unreadable session");
            None
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let deals = state.room.deals().map(|deals| deals.len()).ok();
    Json(HealthResponse {
        ok: deals.is_some(),
        deals,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    deals: Option<usize>,
    version: &'static str,
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl HttpError {
    fn from_room(status: StatusCode, err: DealRoomError) -> Self {
        Self {
            status,
            message: err.to_string(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal server error".into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use platform_store::MemorySessionStore;
    use products_deals::seed_demo;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::graphql::build_schema;

    fn app() -> Router {
        app_with(AppConfig::default())
    }

    fn app_with(config: AppConfig) -> Router {
        let room = DealRoom::in_memory();
        seed_demo(&room).unwrap();
        build_router(AppState {
            schema: build_schema(room.clone()),
            room,
            sessions: Arc::new(MemorySessionStore::new()),
            config: Arc::new(config),
        })
    }

    async fn health_from(app: Router, origin: &str) -> Response {
        app.oneshot(
            Request::get("/health")
                .header(header::ORIGIN, origin)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok_with_request_id() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["deals"], json!(4));
    }

    #[tokio::test]
    async fn listed_origin_gets_credentialed_cors() {
        let response = health_from(app(), "http://localhost:5173").await;
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn foreign_origin_is_not_echoed() {
        let response = health_from(app(), "https://evil.example").await;
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn empty_origin_list_allows_no_origin() {
        let config = AppConfig {
            cors_allowed_origins: Vec::new(),
            ..AppConfig::default()
        };
        let response = health_from(app_with(config), "https://evil.example").await;
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn unknown_email_is_rejected() {
        let response = app()
            .oneshot(post_json("/login", json!({"email": "who@example.com"}), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({"error": "Invalid credentials"}));
    }

    #[tokio::test]
    async fn login_then_query_as_viewer_then_logout() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post_json("/login", json!({"email": "Sarah@Example.com"}), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);
        assert!(cookie.starts_with("dealroom_session="));

        let me = json!({"query": "{ me { name } }"});
        let response = app
            .clone()
            .oneshot(post_json("/graphql", me.clone(), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(
            json_body(response).await["data"],
            json!({"me": {"name": "Sarah Seller"}})
        );

        let response = app
            .clone()
            .oneshot(post_json("/logout", json!({}), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(post_json("/graphql", me, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["data"], json!({"me": null}));
    }

    #[tokio::test]
    async fn register_refuses_duplicate_email() {
        let app = app();
        let body = json!({"name": "Emma Again", "email": "emma@example.com", "role": "seller"});
        let response = app.oneshot(post_json("/register", body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"error": "User with this email already exists"})
        );
    }

    #[tokio::test]
    async fn register_creates_session() {
        let app = app();
        let body = json!({"name": "Nora Buyer", "email": "nora@example.com", "role": "buyer"});
        let response = app.oneshot(post_json("/register", body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(session_cookie(&response).starts_with("dealroom_session="));
        assert_eq!(json_body(response).await["role"], json!("buyer"));
    }
}
