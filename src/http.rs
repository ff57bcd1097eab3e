use axum::{Router, routing::get};
use todo_core::Database;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::routes;

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new().merge(routes::todos::router());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn setup_app() -> Router {
        let db = Database::in_memory().await.unwrap();
        router(AppState::new(db))
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router, body: Value) -> Value {
        let response = send(app, json_request(Method::POST, "/api/todos", body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["data"].clone()
    }

    async fn list(app: &Router, query: &str) -> Vec<Value> {
        let response = send(app, empty_request(Method::GET, &format!("/api/todos{query}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["data"]
            .as_array()
            .cloned()
            .unwrap()
    }

    fn titles(todos: &[Value]) -> Vec<&str> {
        todos.iter().map(|t| t["title"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = setup_app().await;
        let response = send(&app, empty_request(Method::GET, "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn buy_milk_round_trip() {
        let app = setup_app().await;

        let created = create(
            &app,
            json!({ "title": "Buy milk", "status": "todo", "priority": "low" }),
        )
        .await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["status"], "todo");
        assert_eq!(created["priority"], "low");
        assert!(created["createdAt"].is_string());
        assert!(created["updatedAt"].is_string());
        assert!(created.get("description").is_none());
        assert!(created.get("dueDate").is_none());

        let todos = list(&app, "?status=todo").await;
        assert!(todos.iter().any(|t| t["id"] == id));

        let response = send(
            &app,
            json_request(Method::PATCH, &format!("/api/todos/{id}"), json!({ "status": "done" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, empty_request(Method::GET, &format!("/api/todos/{id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let read = json_body(response).await["data"].clone();
        assert_eq!(read["status"], "done");
        assert_eq!(read["title"], "Buy milk");

        let response = send(&app, empty_request(Method::DELETE, &format!("/api/todos/{id}"))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        let response = send(&app, empty_request(Method::GET, &format!("/api/todos/{id}"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn create_rejects_invalid_fields_with_422() {
        let app = setup_app().await;

        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/todos",
                json!({ "title": "", "status": "blocked", "priority": "low", "dueDate": "soon" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_body(response).await;
        assert!(body["message"].is_string());
        let mut fields: Vec<&String> = body["errors"].as_object().unwrap().keys().collect();
        fields.sort();
        assert_eq!(fields, vec!["dueDate", "status", "title"]);
    }

    #[tokio::test]
    async fn malformed_json_is_reported_with_a_message() {
        let app = setup_app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/todos")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn put_and_patch_are_both_partial_updates() {
        let app = setup_app().await;
        let created = create(
            &app,
            json!({
                "title": "Report",
                "description": "quarterly",
                "status": "todo",
                "priority": "medium",
                "dueDate": "2025-05-01"
            }),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        for (method, body) in [
            (Method::PUT, json!({ "priority": "high" })),
            (Method::PATCH, json!({ "description": null })),
        ] {
            let response = send(&app, json_request(method, &format!("/api/todos/{id}"), body)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = send(&app, empty_request(Method::GET, &format!("/api/todos/{id}"))).await;
        let read = json_body(response).await["data"].clone();
        assert_eq!(read["title"], "Report");
        assert_eq!(read["priority"], "high");
        assert_eq!(read["dueDate"], "2025-05-01");
        assert!(read.get("description").is_none());
    }

    #[tokio::test]
    async fn update_validates_supplied_fields() {
        let app = setup_app().await;
        let created = create(
            &app,
            json!({ "title": "Report", "status": "todo", "priority": "medium" }),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let response = send(
            &app,
            json_request(
                Method::PATCH,
                &format!("/api/todos/{id}"),
                json!({ "title": "x".repeat(256) }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(response).await["errors"]["title"].is_array());
    }

    #[tokio::test]
    async fn unknown_ids_are_404() {
        let app = setup_app().await;

        for request in [
            empty_request(Method::GET, "/api/todos/999"),
            json_request(Method::PATCH, "/api/todos/999", json!({ "status": "bogus" })),
            empty_request(Method::DELETE, "/api/todos/999"),
            empty_request(Method::GET, "/api/todos/not-a-number"),
        ] {
            let response = send(&app, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert!(json_body(response).await["message"].is_string());
        }
    }

    #[tokio::test]
    async fn list_filters_searches_and_sorts() {
        let app = setup_app().await;
        create(&app, json!({ "title": "Pay rent", "status": "done", "priority": "high" })).await;
        create(
            &app,
            json!({ "title": "Groceries", "description": "milk, eggs", "status": "in_progress", "priority": "low" }),
        )
        .await;
        create(&app, json!({ "title": "Buy Milk", "status": "todo", "priority": "low" })).await;
        create(&app, json!({ "title": "Walk dog", "status": "todo", "priority": "medium" })).await;

        let by_status = list(&app, "?status=done,in_progress&sort=title:asc").await;
        assert_eq!(titles(&by_status), vec!["Groceries", "Pay rent"]);

        let by_both = list(&app, "?status=todo&priority=low").await;
        assert_eq!(titles(&by_both), vec!["Buy Milk"]);

        let searched = list(&app, "?search=MILK&sort=title:asc").await;
        assert_eq!(titles(&searched), vec!["Buy Milk", "Groceries"]);

        let sorted = list(&app, "?sort=title:desc&page=2").await;
        assert_eq!(titles(&sorted), vec!["Walk dog", "Pay rent", "Groceries", "Buy Milk"]);
    }

    #[tokio::test]
    async fn list_never_rejects_its_query_string() {
        let app = setup_app().await;
        create(&app, json!({ "title": "Pay rent", "status": "done", "priority": "high" })).await;
        create(&app, json!({ "title": "Walk dog", "status": "todo", "priority": "low" })).await;
        create(&app, json!({ "title": "Groceries", "status": "in_progress", "priority": "low" })).await;

        for query in ["?page=abc", "?page=", "?page=-1", "?limit=%zz&page=2"] {
            assert_eq!(list(&app, query).await.len(), 3, "query {query}");
        }

        let repeated = list(&app, "?status=todo&status=done&sort=title:asc").await;
        assert_eq!(titles(&repeated), vec!["Pay rent", "Walk dog"]);
    }

    #[tokio::test]
    async fn responses_allow_cross_origin_requests() {
        let app = setup_app().await;
        let request = Request::builder()
            .uri("/api/todos")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();

        let response = send(&app, request).await;
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
