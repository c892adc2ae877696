// Bookstore Inventory - REST API
// Axum router over BookStore; built by bin/server.rs and driven directly in tests

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::backup::BackupInfo;
use crate::csv_io::CSV_EXPORT_FILE;
use crate::db::{Book, NewBook};
use crate::error::StoreError;
use crate::report::ReportFormat;
use crate::store::BookStore;
use crate::validation::{
    validate_price, validate_year, MSG_INVALID_PRICE, MSG_INVALID_YEAR, MSG_TITLE_AUTHOR_REQUIRED,
};

const MSG_BOOK_NOT_FOUND: &str = "Livro não encontrado.";
const MSG_NO_FILE: &str = "Nenhum arquivo enviado.";
const MSG_INTERNAL: &str = "Erro interno do servidor.";

/// Request body cap on /api/import; axum's 2 MB default is too small for a full catalog
pub const IMPORT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<BookStore>,
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

/// Store errors rendered as JSON with a matching status code
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            StoreError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, MSG_BOOK_NOT_FOUND.to_string()),
            other => {
                error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
            }
        };

        (status, Json(ApiResponse::err(message))).into_response()
    }
}

// Malformed or mistyped bodies get the same envelope and 400 as any other bad input
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(StoreError::Validation(format!(
            "JSON inválido: {}",
            rejection.body_text()
        )))
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn invalid(message: &str) -> ApiError {
    ApiError(StoreError::Validation(message.to_string()))
}

// ============================================================================
// Request / response bodies
// ============================================================================

/// POST /api/books body; accepts the column names or their English aliases
#[derive(Deserialize)]
pub struct AddBookRequest {
    #[serde(default, alias = "title")]
    titulo: Option<String>,
    #[serde(default, alias = "author")]
    autor: Option<String>,
    #[serde(default, alias = "year")]
    ano_publicacao: Option<Value>,
    #[serde(default, alias = "price")]
    preco: Option<Value>,
}

#[derive(Deserialize)]
pub struct PriceRequest {
    #[serde(default, alias = "price")]
    preco: Option<Value>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: i64,
}

#[derive(Serialize)]
struct ImportResponse {
    inserted: usize,
}

#[derive(Serialize)]
struct BackupResponse {
    backup: String,
}

/// Optional JSON field: null or blank means absent, anything else must validate
fn optional_field<T>(
    value: Option<Value>,
    validate: fn(&str) -> Option<T>,
    message: &str,
) -> ApiResult<Option<T>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => validate(&s).map(Some).ok_or_else(|| invalid(message)),
        Some(Value::Number(n)) => validate(&n.to_string())
            .map(Some)
            .ok_or_else(|| invalid(message)),
        Some(_) => Err(invalid(message)),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/books - All books ordered by id
async fn list_books(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Book>>>> {
    Ok(Json(ApiResponse::ok(state.store.list()?)))
}

/// POST /api/books - Add a book
async fn add_book(
    State(state): State<AppState>,
    body: Result<Json<AddBookRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let title = req.titulo.unwrap_or_default();
    let author = req.autor.unwrap_or_default();
    if title.trim().is_empty() || author.trim().is_empty() {
        return Err(invalid(MSG_TITLE_AUTHOR_REQUIRED));
    }

    let year = optional_field(req.ano_publicacao, validate_year, MSG_INVALID_YEAR)?;
    let price = optional_field(req.preco, validate_price, MSG_INVALID_PRICE)?;

    let id = state.store.add(NewBook {
        title,
        author,
        year,
        price,
    })?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(CreatedResponse { id }))))
}

/// GET /api/books/:id - One book
async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Book>>> {
    Ok(Json(ApiResponse::ok(state.store.get(id)?)))
}

/// PUT /api/books/:id/price - Update price
async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<PriceRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let Json(req) = body?;
    let price = optional_field(req.preco, validate_price, MSG_INVALID_PRICE)?
        .ok_or_else(|| invalid(MSG_INVALID_PRICE))?;

    state.store.update_price(id, price)?;
    Ok(Json(ApiResponse::ok(true)))
}

/// DELETE /api/books/:id - Delete a book
async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    state.store.delete(id)?;
    Ok(Json(ApiResponse::ok(true)))
}

/// GET /api/search?q= - Books by author substring
async fn search_books(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<ApiResponse<Vec<Book>>>> {
    Ok(Json(ApiResponse::ok(state.store.search_by_author(&params.q)?)))
}

/// GET /api/export - CSV download
async fn export_csv(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let bytes = state.store.export_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", CSV_EXPORT_FILE),
            ),
        ],
        bytes,
    ))
}

/// POST /api/import - Multipart upload, field `file` (up to IMPORT_BODY_LIMIT bytes)
async fn import_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<ImportResponse>>> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid(&format!("Upload inválido: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| invalid(&format!("Upload inválido: {}", e)))?;
            data = Some(bytes);
            break;
        }
    }

    let data = data.ok_or_else(|| invalid(MSG_NO_FILE))?;
    let inserted = state.store.import_csv(&data)?;
    Ok(Json(ApiResponse::ok(ImportResponse { inserted })))
}

/// GET|POST /api/backup - Manual snapshot
async fn create_backup(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<BackupResponse>>> {
    let path = state.store.backup()?;
    Ok(Json(ApiResponse::ok(BackupResponse {
        backup: path.display().to_string(),
    })))
}

/// GET /api/backups - Snapshots, newest first
async fn list_backups(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<BackupInfo>>>> {
    Ok(Json(ApiResponse::ok(state.store.list_backups()?)))
}

async fn download_report(state: &AppState, format: ReportFormat) -> ApiResult<Response> {
    let (path, bytes) = state.store.write_report(format)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("relatorio.{}", format.extension()));

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/report/html
async fn report_html(State(state): State<AppState>) -> ApiResult<Response> {
    download_report(&state, ReportFormat::Html).await
}

/// GET /api/report/pdf
async fn report_pdf(State(state): State<AppState>) -> ApiResult<Response> {
    download_report(&state, ReportFormat::Pdf).await
}

/// Build the application router
pub fn router(store: BookStore) -> Router {
    let state = AppState {
        store: Arc::new(store),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/books", get(list_books).post(add_book))
        .route("/books/:id", get(get_book).delete(delete_book))
        .route("/books/:id/price", put(update_price))
        .route("/search", get(search_books))
        .route("/export", get(export_csv))
        .route(
            "/import",
            axum::routing::post(import_csv).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/backup", get(create_backup).post(create_backup))
        .route("/backups", get(list_backups))
        .route("/report/html", get(report_html))
        .route("/report/pdf", get(report_pdf))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
