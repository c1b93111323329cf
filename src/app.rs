use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tower_http::services::ServeDir;

use crate::client::ApiClient;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::{DocumentRetrievalError, ExportError, FetchError, SessionError, ViewError};
use crate::export::{self, ExportFormat};
use crate::session::{LoginForm, Navigation, Route, SessionRegistry, SessionState, guard};
use crate::store::LoadOutcome;
use crate::view::{ViewAction, ViewController};

pub const SESSION_COOKIE: &str = "session";

/// The report screens of one signed-in user.
#[derive(Debug)]
pub struct UserViews {
    invoices: Mutex<ViewController>,
    crypto: Mutex<ViewController>,
}

impl UserViews {
    pub fn new(config: &Config) -> Self {
        UserViews {
            invoices: Mutex::new(ViewController::new(
                Dataset::Invoices,
                config.page_size(Dataset::Invoices),
            )),
            crypto: Mutex::new(ViewController::new(
                Dataset::Crypto,
                config.page_size(Dataset::Crypto),
            )),
        }
    }

    pub fn get(&self, dataset: Dataset) -> &Mutex<ViewController> {
        match dataset {
            Dataset::Invoices => &self.invoices,
            Dataset::Crypto => &self.crypto,
        }
    }
}

pub struct AppState {
    config: Config,
    client: ApiClient,
    sessions: RwLock<SessionRegistry<Arc<UserViews>>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = ApiClient::new(&config)?;
        let ttl = Duration::from_secs(config.session_ttl_secs);
        Ok(AppState {
            config,
            client,
            sessions: RwLock::new(SessionRegistry::new(ttl)),
        })
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct Workflow {
    title: &'static str,
    description: &'static str,
    path: &'static str,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

fn error_response(code: StatusCode, message: impl Into<String>) -> Response {
    (
        code,
        Json(StatusResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        }),
    )
        .into_response()
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_GATEWAY, self.to_string())
    }
}

impl IntoResponse for DocumentRetrievalError {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_GATEWAY, self.to_string())
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let code = match self {
            ViewError::NotReady(_) => StatusCode::CONFLICT,
            ViewError::UnknownSortField(_) => StatusCode::BAD_REQUEST,
        };
        error_response(code, self.to_string())
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        match self {
            ExportError::View(e) => e.into_response(),
            other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let code = match self {
            SessionError::InvalidForm(_) => StatusCode::BAD_REQUEST,
            SessionError::Rejected(_) => StatusCode::UNAUTHORIZED,
            SessionError::Unreachable(_) => StatusCode::BAD_GATEWAY,
        };
        error_response(code, self.to_string())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(serve_landing))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/main", get(serve_main))
        .route("/api/:dataset/load", post(load_dataset))
        .route("/api/:dataset/view", get(get_view))
        .route("/api/:dataset/action", post(apply_action))
        .route("/api/:dataset/export", get(export_dataset))
        .route("/api/invoices/:id/pdf", get(invoice_pdf))
        .nest_service("/static", static_dir)
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let app_state = Arc::new(AppState::new(config)?);
    let app = router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn session_state(state: &AppState, jar: &CookieJar) -> SessionState {
    match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.read().await.state(cookie.value()),
        None => SessionState::signed_out(),
    }
}

/// The caller's report screens, or a 401 when not signed in.
async fn user_views(state: &AppState, jar: &CookieJar) -> Result<Arc<UserViews>, Response> {
    let sessions = state.sessions.read().await;
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| sessions.data(cookie.value()).cloned())
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Not signed in"))
}

fn parse_dataset(slug: &str) -> Result<Dataset, Response> {
    slug.parse::<Dataset>()
        .map_err(|e| error_response(StatusCode::NOT_FOUND, e))
}

async fn serve_landing(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = session_state(&state, &jar).await;
    match guard(Route::Login, &session) {
        Navigation::Redirect(route) => Redirect::to(route.path()).into_response(),
        Navigation::Render(_) => Json(serde_json::json!({
            "page": "login",
            "action": "/login",
            "fields": ["email", "password"],
            "min_password_length": crate::session::MIN_PASSWORD_LEN,
        }))
        .into_response(),
    }
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Err(e) = form.validate() {
        return e.into_response();
    }

    let grant = match state.client.login(&form.email, &form.password).await {
        Ok(grant) => grant,
        Err(e) => {
            warn!("login failed for {}: {}", form.email, e);
            return e.into_response();
        }
    };

    let views = Arc::new(UserViews::new(&state.config));
    let session_id = state
        .sessions
        .write()
        .await
        .create(SessionState::signed_in(grant), views);

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true);
    (jar.add(cookie), Redirect::to(Route::Main.path())).into_response()
}

async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.write().await.remove(cookie.value());
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to(Route::Login.path()),
    )
}

async fn serve_main(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = session_state(&state, &jar).await;
    match guard(Route::Main, &session) {
        Navigation::Redirect(route) => Redirect::to(route.path()).into_response(),
        Navigation::Render(_) => Json(serde_json::json!({
            "username": session.username,
            "workflows": [
                Workflow {
                    title: "e-Invoice Report",
                    description: "View list e-Invoice input",
                    path: Route::InvoiceReport.path(),
                },
                Workflow {
                    title: "Coins Markets",
                    description: "Get coins list",
                    path: Route::CryptoReport.path(),
                },
            ],
        }))
        .into_response(),
    }
}

async fn load_dataset(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(slug): Path<String>,
) -> Response {
    let dataset = match parse_dataset(&slug) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let views = match user_views(&state, &jar).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // the fetch runs without holding the controller lock
    let ticket = views.get(dataset).lock().await.begin_load();
    let result = state.client.fetch(dataset).await;
    let failure = result.as_ref().err().cloned();

    let mut controller = views.get(dataset).lock().await;
    if controller.finish_load(ticket, result) == LoadOutcome::Stale {
        return error_response(StatusCode::CONFLICT, "A newer load is in progress");
    }
    if let Some(e) = failure {
        return e.into_response();
    }

    match controller.derive() {
        Ok(view) => Json(view).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(slug): Path<String>,
) -> Response {
    let dataset = match parse_dataset(&slug) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let views = match user_views(&state, &jar).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let controller = views.get(dataset).lock().await;
    match controller.derive() {
        Ok(view) => Json(view).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn apply_action(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(slug): Path<String>,
    Json(action): Json<ViewAction>,
) -> Response {
    let dataset = match parse_dataset(&slug) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let views = match user_views(&state, &jar).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut controller = views.get(dataset).lock().await;
    match controller.dispatch(action) {
        Ok(view) => Json(view).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn export_dataset(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(slug): Path<String>,
    Query(params): Query<ExportQuery>,
) -> Response {
    let dataset = match parse_dataset(&slug) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let format = match params.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::default(),
        Some(Ok(format)) => format,
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    let views = match user_views(&state, &jar).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let artifact = match views.get(dataset).lock().await.export(format) {
        Ok(artifact) => artifact,
        Err(e) => {
            error!("{} export failed: {}", dataset, e);
            return e.into_response();
        }
    };

    if let Some(dir) = &state.config.export_dir {
        if let Err(e) = export::write_artifact(&artifact, dir) {
            error!("{} export could not be archived: {}", dataset, e);
            return e.into_response();
        }
    }

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
    (
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response()
}

async fn invoice_pdf(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(invoice_id): Path<String>,
) -> Response {
    if let Err(resp) = user_views(&state, &jar).await {
        return resp;
    }

    match state.client.fetch_invoice_pdf(&invoice_id).await {
        Ok(document) => {
            // ids come from the URL path and may hold quotes or control bytes
            let disposition = format!(
                "inline; filename=\"{}.pdf\"",
                urlencoding::encode(&document.invoice_id)
            );
            (
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.bytes,
            )
                .into_response()
        }
        Err(e) => {
            warn!("PDF for invoice {} unavailable: {}", invoice_id, e);
            e.into_response()
        }
    }
}
