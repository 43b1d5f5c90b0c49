mod error;

pub use error::{ApiError, NoteId};

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{delete, get, post, put},
};
use axum_macros::debug_handler;

use std::sync::Arc;

use crate::{
    dto::{
        GrammarCheckRequest, MessageResponse, NoteRequest, RenderRequest, RenderResponse,
    },
    grammar::GrammarService,
    markdown::{MarkdownRenderer, render_page},
    service::NoteService,
};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Room for field names, the title and escaping on top of a note body.
const JSON_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<NoteService>,
    pub markdown: Arc<dyn MarkdownRenderer>,
    pub grammar: Arc<GrammarService>,
    pub max_upload_bytes: usize,
}

/// JSON bodies must fit any note an upload can produce, escaped.
const fn json_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(2)
        .saturating_add(JSON_OVERHEAD_BYTES)
}

pub fn router(state: AppState) -> Router {
    let upload_body_limit = state
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let json_limit = json_body_limit(state.max_upload_bytes);

    Router::new()
        .route("/", get(root))
        .route("/api/notes", post(create_note))
        .route("/api/notes", get(get_all_notes))
        .route(
            "/api/notes/upload",
            post(upload_note).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/api/notes/check-grammar", post(check_text_grammar))
        .route("/api/notes/render", post(render_markdown))
        .route("/api/notes/{id}", get(get_one_note))
        .route("/api/notes/{id}", put(update_note))
        .route("/api/notes/{id}", delete(delete_note))
        .route("/api/notes/{id}/check-grammar", post(check_note_grammar))
        .route("/api/notes/{id}/render", get(render_note))
        .layer(DefaultBodyLimit::max(json_limit))
        .with_state(state)
}

#[debug_handler]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "application": "Markdown Note-taking API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "RESTful API for managing markdown notes with grammar checking and HTML rendering",
        "endpoints": {
            "POST /api/notes": "Create a new note (send title and content)",
            "POST /api/notes/upload": "Upload a markdown file",
            "GET /api/notes": "List all saved notes",
            "GET /api/notes/{id}": "Get a specific note",
            "PUT /api/notes/{id}": "Update a note",
            "DELETE /api/notes/{id}": "Delete a note",
            "POST /api/notes/{id}/check-grammar": "Check grammar of a note",
            "POST /api/notes/check-grammar": "Check grammar of provided text",
            "GET /api/notes/{id}/render": "Get HTML rendered version of a note",
            "POST /api/notes/render": "Convert markdown text to HTML",
        },
    }))
}

#[debug_handler]
pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let note = state.notes.create_note(payload).await?;

    Ok((StatusCode::CREATED, Json(note)))
}

#[debug_handler]
pub async fn upload_note(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let limit = state.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(&e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::from_multipart(&e, limit))?;

        if bytes.len() > limit {
            return Err(ApiError::PayloadTooLarge { limit });
        }

        let note = state
            .notes
            .upload_note(file_name.as_deref(), &bytes)
            .await?;

        return Ok((StatusCode::CREATED, Json(note)));
    }

    Err(ApiError::Validation(
        "Missing multipart field 'file'".to_string(),
    ))
}

#[debug_handler]
pub async fn get_all_notes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let notes = state.notes.get_all_notes().await?;

    Ok(Json(notes))
}

#[debug_handler]
pub async fn get_one_note(
    State(state): State<AppState>,
    NoteId(id): NoteId,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.notes.get_one_note(id).await?;

    Ok(Json(note))
}

#[debug_handler]
pub async fn update_note(
    State(state): State<AppState>,
    NoteId(id): NoteId,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let note = state.notes.update_note(id, payload).await?;

    Ok(Json(note))
}

#[debug_handler]
pub async fn delete_note(
    State(state): State<AppState>,
    NoteId(id): NoteId,
) -> Result<impl IntoResponse, ApiError> {
    state.notes.delete_note(id).await?;

    Ok(Json(MessageResponse {
        message: "Note deleted successfully".to_string(),
    }))
}

#[debug_handler]
pub async fn check_note_grammar(
    State(state): State<AppState>,
    NoteId(id): NoteId,
) -> Result<impl IntoResponse, ApiError> {
    let content = state.notes.get_note_content(id).await?;
    let result = state.grammar.check_grammar(Some(content.as_str())).await?;

    Ok(Json(result))
}

#[debug_handler]
pub async fn check_text_grammar(
    State(state): State<AppState>,
    payload: Result<Json<GrammarCheckRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let result = state.grammar.check_grammar(payload.text.as_deref()).await?;

    Ok(Json(result))
}

#[debug_handler]
pub async fn render_note(
    State(state): State<AppState>,
    NoteId(id): NoteId,
) -> Result<impl IntoResponse, ApiError> {
    let content = state.notes.get_note_content(id).await?;
    let fragment = state.markdown.render(&content);

    Ok(Html(render_page(&fragment)))
}

#[debug_handler]
pub async fn render_markdown(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let html = state
        .markdown
        .render(payload.markdown.as_deref().unwrap_or_default());

    Ok(Json(RenderResponse { html }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, header::CONTENT_TYPE},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{
        grammar::{EngineMatch, GrammarEngine, GrammarError, RuleEngine},
        markdown::CommonMarkRenderer,
        repository::MemoryNoteRepository,
    };

    const BOUNDARY: &str = "notes-test-boundary";

    struct BrokenEngine;

    #[async_trait]
    impl GrammarEngine for BrokenEngine {
        async fn check(&self, _text: &str) -> Result<Vec<EngineMatch>, GrammarError> {
            Err(GrammarError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: "engine offline".to_string(),
            })
        }
    }

    fn app_with(engine: Arc<dyn GrammarEngine>, max_upload_bytes: usize) -> Router {
        router(AppState {
            notes: Arc::new(NoteService::new(Arc::new(MemoryNoteRepository::new()))),
            markdown: Arc::new(CommonMarkRenderer),
            grammar: Arc::new(GrammarService::new(engine)),
            max_upload_bytes,
        })
    }

    fn app() -> Router {
        app_with(Arc::new(RuleEngine::new().unwrap()), 10 * 1024 * 1024)
    }

    fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
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

    fn upload_request(field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/markdown\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/notes/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, body)
    }

    async fn create(app: &Router, title: &str, content: &str) -> Value {
        let (status, body) = send(
            app,
            json_request(
                Method::POST,
                "/api/notes",
                &json!({ "title": title, "content": content }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let (status, body) = send(&app(), empty_request(Method::GET, "/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["application"], "Markdown Note-taking API");
        assert_eq!(body["endpoints"].as_object().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let app = app();
        let created = create(&app, "Title", "Some *markdown*").await;

        assert_eq!(created["title"], "Title");
        assert_eq!(created["content"], "Some *markdown*");
        assert_eq!(created["fileName"], Value::Null);
        assert_eq!(created["createdAt"], created["updatedAt"]);

        let uri = format!("/api/notes/{}", created["id"]);
        let (status, fetched) = send(&app, empty_request(Method::GET, &uri)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_invalid_input() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/notes", &json!({ "content": "no title" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["message"], "Title is required");

        let malformed = Request::builder()
            .method(Method::POST)
            .uri("/api/notes")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_ids() {
        let app = app();

        let (status, body) = send(&app, empty_request(Method::GET, "/api/notes/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Note not found with id: 42");

        let (status, _) = send(&app, empty_request(Method::GET, "/api/notes/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let app = app();
        for title in ["A", "B", "C"] {
            create(&app, title, "").await;
        }

        let (status, body) = send(&app, empty_request(Method::GET, "/api/notes")).await;
        let titles: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["title"].as_str().unwrap())
            .collect();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_update() {
        let app = app();
        let created = create(&app, "old", "old body").await;
        let uri = format!("/api/notes/{}", created["id"]);

        let (status, updated) = send(
            &app,
            json_request(Method::PUT, &uri, &json!({ "title": "new", "content": "new body" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["title"], "new");
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_ne!(updated["updatedAt"], created["updatedAt"]);

        let (status, _) = send(
            &app,
            json_request(Method::PUT, &uri, &json!({ "title": "only title" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/notes/999",
                &json!({ "title": "t", "content": "c" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete() {
        let app = app();
        let created = create(&app, "doomed", "").await;
        let uri = format!("/api/notes/{}", created["id"]);

        let (status, body) = send(&app, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Note deleted successfully");

        let (status, _) = send(&app, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, empty_request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload() {
        let (status, body) = send(&app(), upload_request("file", "plan.md", b"# Hi")).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "plan");
        assert_eq!(body["content"], "# Hi");
        assert_eq!(body["fileName"], "plan.md");
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let app = app();

        let (status, body) = send(&app, upload_request("file", "plan.txt", b"# Hi")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Only .md files are allowed");

        let (status, body) = send(&app, upload_request("file", "plan.md", b"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "File is empty");

        let (status, _) = send(&app, upload_request("attachment", "plan.md", b"# Hi")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let not_multipart = json_request(Method::POST, "/api/notes/upload", &json!({}));
        let (status, _) = send(&app, not_multipart).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let app = app_with(Arc::new(RuleEngine::new().unwrap()), 16);

        let (status, body) = send(&app, upload_request("file", "big.md", &[b'x'; 32])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["status"], 413);

        // Past the request body limit as well.
        let huge = vec![b'x'; MULTIPART_OVERHEAD_BYTES + 1024];
        let (status, _) = send(&app, upload_request("file", "huge.md", &huge)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (_, notes) = send(&app, empty_request(Method::GET, "/api/notes")).await;
        assert!(notes.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_large_uploaded_note_can_be_rewritten() {
        let app = app();
        let content = "x".repeat(3 * 1024 * 1024);

        let (status, uploaded) =
            send(&app, upload_request("file", "big.md", content.as_bytes())).await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/notes/{}", uploaded["id"]);
        let (status, updated) = send(
            &app,
            json_request(Method::PUT, &uri, &json!({ "title": "big", "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["content"].as_str().unwrap().len(), content.len());

        let created = create(&app, "big copy", &content).await;
        assert_eq!(created["content"].as_str().unwrap().len(), content.len());

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/notes/render", &json!({ "markdown": content })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["html"].as_str().unwrap().starts_with("<p>x"));
    }

    #[tokio::test]
    async fn test_json_body_too_large() {
        let app = app_with(Arc::new(RuleEngine::new().unwrap()), 16);
        let content = "x".repeat(JSON_OVERHEAD_BYTES + 1024);

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/notes", &json!({ "title": "t", "content": content })),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["status"], 413);
        assert_eq!(body["error"], "Payload Too Large");

        let (_, notes) = send(&app, empty_request(Method::GET, "/api/notes")).await;
        assert!(notes.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_text_grammar() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/notes/check-grammar",
                &json!({ "text": "This are a test." }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["totalErrors"].as_u64().unwrap() >= 1);
        assert!(body["summary"].as_str().unwrap().starts_with("Found"));
        assert_eq!(body["errors"][0]["line"], 1);
        assert_eq!(body["errors"][0]["column"], 1);

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/notes/check-grammar", &json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalErrors"], 0);
        assert_eq!(body["summary"], "No text provided for grammar check.");
    }

    #[tokio::test]
    async fn test_check_note_grammar() {
        let app = app();
        let created = create(&app, "draft", "It was the the end.").await;

        let uri = format!("/api/notes/{}/check-grammar", created["id"]);
        let (status, body) = send(&app, empty_request(Method::POST, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalErrors"], 1);
        assert_eq!(body["errors"][0]["suggestions"], json!(["the"]));

        let (status, _) = send(
            &app,
            empty_request(Method::POST, "/api/notes/7/check-grammar"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_grammar_engine_failure() {
        let app = app_with(Arc::new(BrokenEngine), 1024);

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/notes/check-grammar",
                &json!({ "text": "anything" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Error checking grammar")
        );
    }

    #[tokio::test]
    async fn test_render_note_page() {
        let app = app();
        let created = create(&app, "page", "# Hi").await;

        let uri = format!("/api/notes/{}/render", created["id"]);
        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, &uri))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<h1>Hi</h1>"));

        let (status, _) = send(&app, empty_request(Method::GET, "/api/notes/5/render")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_render_markdown() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/notes/render", &json!({ "markdown": "# Hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["html"], "<h1>Hi</h1>\n");

        let (_, body) = send(
            &app,
            json_request(Method::POST, "/api/notes/render", &json!({ "markdown": null })),
        )
        .await;
        assert_eq!(body["html"], "");
    }
}
