use axum::{
    extract::{Multipart, Path, State},
    response::Redirect,
};

use crate::error::ApiError;
use crate::routes::images;
use crate::state::AppState;

/// POST /upload — the gallery form. Field errors come back as 400 JSON with
/// the submitted values echoed; success redirects to the gallery.
pub async fn submit_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let form = images::parse_upload(multipart).await?;
    let upload = images::validate_upload(form)?;
    images::store_image(&state, upload).await?;
    Ok(Redirect::to("/"))
}

/// POST /images/:id with an `intent=delete` field. Failures are
/// surfaced as real error responses rather than an unconditional redirect.
pub async fn delete_intent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let mut intent = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name == "intent" {
            intent = Some(
                field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?,
            );
        }
    }

    if intent.as_deref() != Some("delete") {
        return Err(ApiError::BadRequest("Unsupported operation".to_string()));
    }

    images::remove_image(&state, &id).await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use tower::util::ServiceExt;

    use crate::state::AppState;
    use crate::storage::MemoryStore;

    const BOUNDARY: &str = "form-test-boundary";

    async fn test_app() -> (tempfile::TempDir, Router, Arc<MemoryStore>) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("gallery.db");
        let db = crate::db::init_pool(db_path.to_str().unwrap()).await;
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(db, store.clone());
        (dir, crate::app(state), store)
    }

    fn form_request(uri: &str, fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        if let Some((filename, content_type, bytes)) = file {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn form_upload_redirects_to_gallery() {
        let (_dir, app, store) = test_app().await;

        let response = app
            .clone()
            .oneshot(form_request(
                "/upload",
                &[("title", "From the form"), ("description", "uploaded via form")],
                Some(("pic.webp", "image/webp", b"webp bytes")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert_eq!(store.len(), 1);

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list = body_json(response).await;
        assert_eq!(list.as_array().unwrap()[0]["title"], "From the form");
    }

    #[tokio::test]
    async fn form_errors_echo_submitted_values() {
        let (_dir, app, store) = test_app().await;

        let response = app
            .oneshot(form_request(
                "/upload",
                &[("title", ""), ("description", "kept for re-display")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["errors"]["title"].is_string());
        assert!(body["errors"]["image"].is_string());
        assert_eq!(body["values"]["description"], "kept for re-display");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_intent_removes_the_image() {
        let (_dir, app, store) = test_app().await;

        let response = app
            .clone()
            .oneshot(form_request(
                "/upload",
                &[("title", "Short lived")],
                Some(("x.png", "image/png", b"png")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = app
            .clone()
            .oneshot(Request::get("/api/images").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list = body_json(response).await;
        let id = list.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(form_request(
                format!("/images/{id}").as_str(),
                &[("intent", "delete")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(store.is_empty());

        let response = app
            .oneshot(Request::get("/api/images").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn bare_delete_on_detail_route_is_method_not_allowed() {
        let (_dir, app, _store) = test_app().await;

        // The form delete is the POST-with-intent path; a bodiless DELETE
        // belongs to /api/images/:id only.
        let response = app
            .oneshot(
                Request::delete("/images/some-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_intent_is_rejected() {
        let (_dir, app, _store) = test_app().await;

        let response = app
            .oneshot(form_request(
                "/images/whatever",
                &[("intent", "archive")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
