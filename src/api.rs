// IE Bank - REST API for account resources

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db;
use crate::entities::account::{Account, AccountUpdate, NewAccount};
use crate::error::{json_error, ApiError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::LockPoisoned)
    }
}

/// List response wrapper
#[derive(Serialize)]
pub struct AccountList {
    pub accounts: Vec<Account>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    accounts: i64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check (touches the database)
async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let conn = state.conn()?;
    let accounts = db::count_accounts(&conn)?;

    Ok(Json(HealthResponse {
        status: "ok",
        accounts,
    }))
}

/// GET /accounts - Get all accounts
async fn list_accounts(State(state): State<AppState>) -> Result<Json<AccountList>, ApiError> {
    let conn = state.conn()?;
    let accounts = db::list_accounts(&conn)?;

    Ok(Json(AccountList { accounts }))
}

/// GET /accounts/:id - Get one account
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, ApiError> {
    let conn = state.conn()?;

    db::get_account(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::account_not_found(id))
}

/// POST /accounts - Open a new account
async fn create_account(
    State(state): State<AppState>,
    Json(new): Json<NewAccount>,
) -> Result<Json<Account>, ApiError> {
    new.validate().map_err(ApiError::Validation)?;

    let conn = state.conn()?;
    let account = db::insert_account(&conn, &new)?;
    tracing::info!(account_id = account.id, "account created");

    Ok(Json(account))
}

/// PUT /accounts/:id - Partial update; omitted fields keep their values
async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<Account>, ApiError> {
    update.validate().map_err(ApiError::Validation)?;

    let conn = state.conn()?;
    let account =
        db::update_account(&conn, id, &update)?.ok_or_else(|| ApiError::account_not_found(id))?;
    tracing::info!(account_id = id, "account updated");

    Ok(Json(account))
}

/// DELETE /accounts/:id - Remove an account, returning the removed record
async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, ApiError> {
    let conn = state.conn()?;
    let account = db::delete_account(&conn, id)?.ok_or_else(|| ApiError::account_not_found(id))?;
    tracing::info!(account_id = id, "account deleted");

    Ok(Json(account))
}

/// Anything unrouted
async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "no route");
    json_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("no route for {}", uri.path()),
    )
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
