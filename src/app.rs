use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::chart::{ChartConfig, ChartData};
use crate::config::AppConfig;
use crate::dataset::{Dataset, DatasetError, FieldUpdate, RawRecord};
use crate::downloader::{self, DownloadFormat, TEMPLATE_NAME};
use crate::field::{Field, FieldType, Row};
use crate::graph::{self, GraphOptions};
use crate::import::{ImportError, ImportPreview};
use crate::loader::MAX_IMPORT_BYTES;
use crate::login::{SESSION_COOKIE, SessionRegistry, UserCredentials};
use crate::saving;
use crate::storage::FileStore;
use crate::workspace::{Workspace, WorkspaceError};

// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;
const UPLOAD_FIELD: &str = "file";
const EXPORT_NAME: &str = "dataset";

pub struct AppState {
    workspace: Mutex<Workspace>,
    sessions: RwLock<SessionRegistry>,
}

impl AppState {
    pub fn new(workspace: Workspace) -> Self {
        AppState {
            workspace: Mutex::new(workspace),
            sessions: RwLock::new(SessionRegistry::new()),
        }
    }
}

#[derive(Serialize)]
struct ApiMessage {
    status: String,
    message: Option<String>,
}

type ApiError = (StatusCode, Json<ApiMessage>);

#[derive(Serialize)]
struct SessionStatus {
    authenticated: bool,
    processing: bool,
    pending_import: bool,
}

#[derive(Deserialize)]
struct NewField {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    required: bool,
}

#[derive(Deserialize)]
struct MoveField {
    index: usize,
}

#[derive(Deserialize)]
struct FormatQuery {
    format: Option<String>,
}

#[derive(Deserialize)]
struct ChartImageRequest {
    #[serde(flatten)]
    config: ChartConfig,
    width: Option<u32>,
    height: Option<u32>,
}

fn ok_message(message: &str) -> Json<ApiMessage> {
    Json(ApiMessage {
        status: "ok".to_string(),
        message: Some(message.to_string()),
    })
}

fn error_response(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ApiMessage {
            status: "error".to_string(),
            message: Some(message.to_string()),
        }),
    )
}

fn workspace_error(e: WorkspaceError) -> ApiError {
    let status = match &e {
        WorkspaceError::NotAuthenticated | WorkspaceError::InvalidCredentials => {
            StatusCode::UNAUTHORIZED
        }
        WorkspaceError::ImportInProgress => StatusCode::CONFLICT,
        WorkspaceError::NoPendingImport => StatusCode::NOT_FOUND,
        WorkspaceError::Import(ImportError::FileTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        WorkspaceError::Import(ImportError::InvalidFileType(_)) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        WorkspaceError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkspaceError::Dataset(DatasetError::FieldNotFound(_))
        | WorkspaceError::Dataset(DatasetError::RowNotFound(_)) => StatusCode::NOT_FOUND,
        WorkspaceError::Dataset(_) => StatusCode::BAD_REQUEST,
        WorkspaceError::Storage(_) => {
            error!("Storage failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e)
}

fn lock(state: &AppState) -> Result<MutexGuard<'_, Workspace>, ApiError> {
    state
        .workspace
        .lock()
        .map_err(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "workspace lock poisoned"))
}

pub fn router(state: Arc<AppState>, config: &AppConfig) -> Router {
    let protected = Router::new()
        .route("/api/dataset", get(get_dataset))
        .route("/api/fields", post(add_field))
        .route("/api/fields/:id", put(update_field).delete(delete_field))
        .route("/api/fields/:id/move", post(move_field))
        .route("/api/rows", post(add_row))
        .route("/api/rows/:id", put(update_row).delete(delete_row))
        .route("/api/import", post(upload_import))
        .route("/api/import/confirm", post(confirm_import))
        .route("/api/import/cancel", post(cancel_import))
        .route("/api/chart", post(chart_data))
        .route("/api/chart/png", post(chart_png))
        .route("/api/template", get(download_template))
        .route("/api/export", get(export_dataset))
        .route("/api/restore", post(restore_snapshot))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/session", get(session_status))
        .merge(protected)
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES as usize + MULTIPART_OVERHEAD))
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Restore the persisted workspace
    let store = FileStore::open(&config.data_dir)?;
    info!("Using store at {}", store.path().display());
    let state = Arc::new(AppState::new(Workspace::open(Box::new(store))));

    let app = router(state, &config);

    // Start server
    let listener = TcpListener::bind(&config.bind_addr).await?;
    println!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let valid = match (jar.get(SESSION_COOKIE), state.sessions.read()) {
        (Some(cookie), Ok(sessions)) => sessions.validate(cookie.value()).is_some(),
        _ => false,
    };

    if !valid {
        return error_response(StatusCode::UNAUTHORIZED, "login required").into_response();
    }
    next.run(request).await
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(credentials): Json<UserCredentials>,
) -> Result<(CookieJar, Json<ApiMessage>), ApiError> {
    lock(&state)?
        .login(&credentials.username, &credentials.password)
        .map_err(workspace_error)?;

    let session_id = state
        .sessions
        .write()
        .map_err(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "session lock poisoned"))?
        .create(&credentials.username);

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true);
    Ok((jar.add(cookie), ok_message("logged in")))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiMessage>), ApiError> {
    if let Ok(mut sessions) = state.sessions.write() {
        sessions.revoke_all();
    }
    lock(&state)?.logout().map_err(workspace_error)?;
    Ok((jar.remove(Cookie::build(SESSION_COOKIE).path("/")), ok_message("logged out")))
}

async fn session_status(State(state): State<Arc<AppState>>) -> Result<Json<SessionStatus>, ApiError> {
    let workspace = lock(&state)?;
    Ok(Json(SessionStatus {
        authenticated: workspace.is_authenticated(),
        processing: workspace.is_processing(),
        pending_import: workspace.preview().is_some(),
    }))
}

async fn get_dataset(State(state): State<Arc<AppState>>) -> Result<Json<Dataset>, ApiError> {
    Ok(Json(lock(&state)?.dataset().clone()))
}

async fn add_field(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewField>,
) -> Result<(StatusCode, Json<Field>), ApiError> {
    let field = lock(&state)?
        .add_field(&payload.name, payload.field_type, payload.required)
        .map_err(workspace_error)?;
    Ok((StatusCode::CREATED, Json(field)))
}

async fn update_field(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<FieldUpdate>,
) -> Result<Json<Field>, ApiError> {
    let field = lock(&state)?
        .update_field(&id, update)
        .map_err(workspace_error)?;
    Ok(Json(field))
}

async fn delete_field(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Field>, ApiError> {
    let field = lock(&state)?.delete_field(&id).map_err(workspace_error)?;
    Ok(Json(field))
}

async fn move_field(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MoveField>,
) -> Result<Json<Vec<Field>>, ApiError> {
    let mut workspace = lock(&state)?;
    workspace
        .move_field(&id, payload.index)
        .map_err(workspace_error)?;
    Ok(Json(workspace.dataset().fields.clone()))
}

async fn add_row(
    State(state): State<Arc<AppState>>,
    Json(record): Json<RawRecord>,
) -> Result<(StatusCode, Json<Row>), ApiError> {
    let row = lock(&state)?.add_row(&record).map_err(workspace_error)?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn update_row(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(record): Json<RawRecord>,
) -> Result<Json<Row>, ApiError> {
    let row = lock(&state)?
        .update_row(&id, &record)
        .map_err(workspace_error)?;
    Ok(Json(row))
}

async fn delete_row(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Row>, ApiError> {
    let row = lock(&state)?.delete_row(&id).map_err(workspace_error)?;
    Ok(Json(row))
}

/// Pull the `file` part out of the upload form.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Bytes), ImportError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return Err(ImportError::ReadFailure(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no file in upload",
                )));
            }
            Err(e) => return Err(upload_error(e)),
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(upload_error)?;
        return Ok((file_name, bytes));
    }
}

fn upload_error(e: axum::extract::multipart::MultipartError) -> ImportError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ImportError::FileTooLarge {
            size: (MAX_IMPORT_BYTES as usize + MULTIPART_OVERHEAD) as u64,
            limit: MAX_IMPORT_BYTES,
        }
    } else {
        ImportError::ReadFailure(io::Error::new(io::ErrorKind::Other, e.body_text()))
    }
}

async fn upload_import(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportPreview>, ApiError> {
    lock(&state)?.begin_import().map_err(workspace_error)?;

    let upload = read_upload(&mut multipart).await;

    let mut workspace = lock(&state)?;
    match upload {
        Ok((file_name, bytes)) => {
            info!("Received upload {} ({} bytes)", file_name, bytes.len());
            let preview = workspace
                .finish_import(&file_name, &bytes)
                .map_err(workspace_error)?;
            Ok(Json(preview.clone()))
        }
        Err(e) => {
            warn!("Upload failed: {}", e);
            workspace.abort_import();
            Err(workspace_error(e.into()))
        }
    }
}

async fn confirm_import(State(state): State<Arc<AppState>>) -> Result<Json<Dataset>, ApiError> {
    let mut workspace = lock(&state)?;
    let dataset = workspace.confirm_import().map_err(workspace_error)?;
    Ok(Json(dataset.clone()))
}

async fn cancel_import(State(state): State<Arc<AppState>>) -> Result<Json<ApiMessage>, ApiError> {
    if lock(&state)?.cancel_import() {
        Ok(ok_message("import discarded"))
    } else {
        Ok(ok_message("no pending import"))
    }
}

async fn chart_data(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ChartConfig>,
) -> Result<Json<ChartData>, ApiError> {
    Ok(Json(lock(&state)?.chart(&config)))
}

async fn chart_png(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChartImageRequest>,
) -> Result<Response, ApiError> {
    let data = lock(&state)?.chart(&request.config);

    let defaults = GraphOptions::default();
    let options = GraphOptions {
        width: request.width.unwrap_or(defaults.width).clamp(200, 2000),
        height: request.height.unwrap_or(defaults.height).clamp(200, 2000),
        ..defaults
    };

    let png = graph::render_png(&data, &options)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

fn parse_format(format: Option<&str>) -> Result<DownloadFormat, ApiError> {
    match format.unwrap_or("xlsx") {
        "xlsx" => Ok(DownloadFormat::Xlsx),
        "csv" => Ok(DownloadFormat::Csv),
        other => Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("unsupported format `{}`", other),
        )),
    }
}

fn attachment(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn download_template(Query(query): Query<FormatQuery>) -> Result<Response, ApiError> {
    let format = parse_format(query.format.as_deref())?;
    let bytes = downloader::template(format)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let file_name = format!("{}.{}", TEMPLATE_NAME, format.extension());
    Ok(attachment(bytes, format.content_type(), &file_name))
}

async fn export_dataset(
    Query(query): Query<FormatQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let dataset = lock(&state)?.dataset().clone();

    if query.format.as_deref() == Some("snapshot") {
        let bytes = saving::snapshot_to_bytes(&dataset)
            .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;
        let file_name = format!("{}.json.gz", EXPORT_NAME);
        return Ok(attachment(bytes, "application/gzip", &file_name));
    }

    let format = parse_format(query.format.as_deref())?;
    let bytes = match format {
        DownloadFormat::Csv => downloader::dataset_to_csv(&dataset).map(String::into_bytes),
        DownloadFormat::Xlsx => downloader::dataset_to_xlsx(&dataset),
    }
    .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let file_name = format!("{}.{}", EXPORT_NAME, format.extension());
    Ok(attachment(bytes, format.content_type(), &file_name))
}

async fn restore_snapshot(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Dataset>, ApiError> {
    let dataset = saving::snapshot_from_bytes(&body).map_err(|e| {
        error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Failed to load snapshot: {}", e),
        )
    })?;

    let mut workspace = lock(&state)?;
    let dataset = workspace.restore(dataset).map_err(workspace_error)?;
    Ok(Json(dataset.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_default_to_xlsx() {
        assert!(matches!(parse_format(None), Ok(DownloadFormat::Xlsx)));
        assert!(matches!(parse_format(Some("csv")), Ok(DownloadFormat::Csv)));
        let (status, _) = parse_format(Some("pdf")).err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn errors_map_to_statuses() {
        let status = |e: WorkspaceError| workspace_error(e).0;
        assert_eq!(status(WorkspaceError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status(WorkspaceError::ImportInProgress), StatusCode::CONFLICT);
        assert_eq!(
            status(ImportError::InvalidFileType("txt".to_string()).into()),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status(ImportError::InsufficientRows.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(DatasetError::RowNotFound("r1".to_string()).into()),
            StatusCode::NOT_FOUND
        );
    }
}
