use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};
use todo_core::{Envelope, Todo, TodoPayload, TodoQuery, validate_create, validate_update};

use crate::{error::ApiError, http::AppState};

/// Query string of the list endpoint. Repeated `status`/`priority` keys add
/// to the set; for `search` and `sort` the last one wins. Anything else,
/// `page` included, is ignored and never truncates results.
#[derive(Debug, Default, PartialEq)]
pub struct ListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

fn append(slot: &mut Option<String>, value: String) {
    match slot {
        Some(existing) if !existing.is_empty() => {
            existing.push(',');
            existing.push_str(&value);
        }
        _ => *slot = Some(value),
    }
}

impl ListParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "status" => append(&mut params.status, value),
                "priority" => append(&mut params.priority, value),
                "search" => params.search = Some(value),
                "sort" => params.sort = Some(value),
                _ => {}
            }
        }
        params
    }

    fn to_query(&self) -> TodoQuery {
        TodoQuery::from_params(
            self.status.as_deref(),
            self.priority.as_deref(),
            self.search.as_deref(),
            self.sort.as_deref(),
        )
    }
}

pub async fn list_todos(
    State(state): State<AppState>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Todo>>>, ApiError> {
    let Query(pairs) = pairs?;
    let params = ListParams::from_pairs(pairs);
    let todos = state.db().list_todos(&params.to_query()).await?;
    Ok(Json(Envelope::new(todos)))
}

pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Todo>>), ApiError> {
    let Json(payload) = payload?;
    let new_todo = validate_create(&payload)?;

    tracing::debug!("Creating todo '{}'", new_todo.title);
    let todo = state.db().create_todo(&new_todo).await?;

    Ok((StatusCode::CREATED, Json(Envelope::new(todo))))
}

pub async fn get_todo(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<Todo>>, ApiError> {
    let Path(id) = id?;
    let todo = state.db().get_todo(id).await?;
    Ok(Json(Envelope::new(todo)))
}

/// Partial update. Serves both PATCH and PUT; only supplied fields change.
pub async fn update_todo(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<Json<Envelope<Todo>>, ApiError> {
    let Path(id) = id?;
    // Unknown ids answer 404 before the body is looked at.
    state.db().get_todo(id).await?;

    let Json(payload) = payload?;
    let patch = validate_update(&payload)?;
    let todo = state.db().update_todo(id, &patch).await?;

    Ok(Json(Envelope::new(todo)))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.db().delete_todo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo)
                .patch(update_todo)
                .put(update_todo)
                .delete(delete_todo),
        )
}
