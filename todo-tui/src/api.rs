use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use thiserror::Error;
use todo_core::{
    Envelope, ErrorBody, SortSpec, Todo, TodoPayload, TodoPriority, TodoStatus, ValidationErrors,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach the todo service: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} ({status})")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

/// The list view's filter state, as sent to the list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub status: Vec<TodoStatus>,
    pub priority: Vec<TodoPriority>,
    pub search: String,
    pub sort: SortSpec,
}

impl ListFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.status.is_empty() {
            pairs.push(("status", join(self.status.iter().map(|s| s.as_str()))));
        }
        if !self.priority.is_empty() {
            pairs.push(("priority", join(self.priority.iter().map(|p| p.as_str()))));
        }
        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push(("search", search.to_string()));
        }
        pairs.push(("sort", self.sort.to_string()));
        pairs
    }
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(",")
}

#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list_todos(&self, filter: &ListFilter) -> Result<Vec<Todo>, ClientError>;
    async fn create_todo(&self, payload: &TodoPayload) -> Result<Todo, ClientError>;
    async fn update_todo(&self, id: i64, payload: &TodoPayload) -> Result<Todo, ClientError>;
    async fn delete_todo(&self, id: i64) -> Result<(), ClientError>;
}

/// HTTP client for the todo service's JSON API.
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn todos_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn todo_url(&self, id: i64) -> String {
        format!("{}/todos/{}", self.base_url, id)
    }
}

async fn error_from(resp: Response) -> ClientError {
    let status = resp.status();
    let body = resp.json::<ErrorBody>().await.ok();
    match body {
        Some(ErrorBody {
            errors: Some(errors),
            ..
        }) if status == StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::Validation(ValidationErrors::from_field_map(errors))
        }
        Some(body) => ClientError::Api {
            status,
            message: body.message,
        },
        None => ClientError::Api {
            status,
            message: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        },
    }
}

async fn data<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    if !resp.status().is_success() {
        let err = error_from(resp).await;
        tracing::warn!("todo service rejected request: {}", err);
        return Err(err);
    }
    let envelope = resp.json::<Envelope<T>>().await?;
    Ok(envelope.data)
}

#[async_trait]
impl TodoApi for ApiClient {
    async fn list_todos(&self, filter: &ListFilter) -> Result<Vec<Todo>, ClientError> {
        let resp = self
            .http
            .get(self.todos_url())
            .header(header::ACCEPT, "application/json")
            .query(&filter.query_pairs())
            .send()
            .await?;
        data(resp).await
    }

    async fn create_todo(&self, payload: &TodoPayload) -> Result<Todo, ClientError> {
        tracing::debug!(?payload, "creating todo");
        let resp = self
            .http
            .post(self.todos_url())
            .header(header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;
        data(resp).await
    }

    async fn update_todo(&self, id: i64, payload: &TodoPayload) -> Result<Todo, ClientError> {
        tracing::debug!(id, ?payload, "updating todo");
        let resp = self
            .http
            .patch(self.todo_url(id))
            .header(header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;
        data(resp).await
    }

    async fn delete_todo(&self, id: i64) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.todo_url(id))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from(resp).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use todo_core::{Database, SortDirection, SortField};
    use todo_server::{AppState, router};

    use super::*;

    /// Serves the real router over an in-memory database on a free port.
    async fn spawn_service() -> ApiClient {
        let db = Database::in_memory().await.unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(AppState::new(db))).await.unwrap();
        });
        ApiClient::new(&format!("http://{addr}/api"), Duration::from_secs(5)).unwrap()
    }

    fn payload(body: Value) -> TodoPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn default_filter_only_sends_sort() {
        assert_eq!(
            ListFilter::default().query_pairs(),
            vec![("sort", "createdAt:desc".to_string())]
        );
    }

    #[test]
    fn filter_joins_sets_with_commas() {
        let filter = ListFilter {
            status: vec![TodoStatus::Done, TodoStatus::InProgress],
            priority: vec![TodoPriority::High],
            search: "  milk ".to_string(),
            sort: SortSpec::new(SortField::Title, SortDirection::Asc),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("status", "done,in_progress".to_string()),
                ("priority", "high".to_string()),
                ("search", "milk".to_string()),
                ("sort", "title:asc".to_string()),
            ]
        );
    }

    #[test]
    fn client_normalizes_base_url() {
        let client = ApiClient::new("http://localhost:8000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.todo_url(4), "http://localhost:8000/api/todos/4");
    }

    #[tokio::test]
    async fn crud_round_trip_unwraps_data() {
        let client = spawn_service().await;

        let created = client
            .create_todo(&payload(json!({
                "title": "Buy milk",
                "status": "todo",
                "priority": "low"
            })))
            .await
            .unwrap();
        assert_eq!(created.title, "Buy milk");
        assert_eq!(created.priority, TodoPriority::Low);

        let updated = client
            .update_todo(created.id, &payload(json!({ "status": "done" })))
            .await
            .unwrap();
        assert_eq!(updated.status, TodoStatus::Done);
        assert_eq!(updated.title, "Buy milk");

        let filter = ListFilter {
            status: vec![TodoStatus::Done],
            ..ListFilter::default()
        };
        let listed = client.list_todos(&filter).await.unwrap();
        assert_eq!(listed, vec![updated]);

        client.delete_todo(created.id).await.unwrap();
        assert!(client.list_todos(&ListFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_fields_come_back_as_validation_errors() {
        let client = spawn_service().await;

        let err = client
            .create_todo(&payload(json!({
                "title": "",
                "status": "blocked",
                "priority": "low"
            })))
            .await
            .unwrap_err();
        let errors = match err {
            ClientError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };
        let mut fields: Vec<String> = errors.by_field().into_keys().collect();
        fields.sort();
        assert_eq!(fields, vec!["status".to_string(), "title".to_string()]);
    }

    #[tokio::test]
    async fn missing_records_report_status_and_message() {
        let client = spawn_service().await;

        for err in [
            client
                .update_todo(999, &payload(json!({ "status": "done" })))
                .await
                .unwrap_err(),
            client.delete_todo(999).await.unwrap_err(),
        ] {
            match err {
                ClientError::Api { status, message } => {
                    assert_eq!(status, StatusCode::NOT_FOUND);
                    assert_eq!(message, "todo 999 not found");
                }
                other => panic!("expected api error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_an_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(&format!("http://{addr}/api"), Duration::from_secs(2)).unwrap();
        let err = client.list_todos(&ListFilter::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
