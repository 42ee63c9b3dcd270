use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::RelayState;
use crate::errors::{AppError, AppResult};
use crate::uploader::relay_client::{
    ChunkRequest, ChunkResponse, CompleteRequest, CompleteResponse,
};

/// POST /upload-chunk
pub async fn upload_chunk(
    State(state): State<RelayState>,
    method: Method,
    body: Bytes,
) -> Response {
    match method {
        Method::OPTIONS => StatusCode::OK.into_response(),
        Method::POST => forward_chunk(&state, body).await.into_response(),
        _ => AppError::MethodNotAllowed.into_response(),
    }
}

/// POST /complete-upload
pub async fn complete_upload(
    State(state): State<RelayState>,
    method: Method,
    body: Bytes,
) -> Response {
    match method {
        Method::OPTIONS => StatusCode::OK.into_response(),
        Method::POST => forward_completion(&state, body).await.into_response(),
        _ => AppError::MethodNotAllowed.into_response(),
    }
}

async fn forward_chunk(state: &RelayState, body: Bytes) -> AppResult<Json<ChunkResponse>> {
    let payload: serde_json::Value = serde_json::from_slice(&body)?;

    // The payload check comes before any metadata is read.
    let has_chunk = payload
        .get("chunk")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|chunk| !chunk.is_empty());
    if !has_chunk {
        return Err(AppError::ChunkMissing);
    }

    let request: ChunkRequest = serde_json::from_value(payload)?;

    log::info!(
        "Processing chunk {}/{} for file: {}",
        request.chunk_index + 1,
        request.total_chunks,
        request.file_name
    );

    forward(state, "upload-chunk", body).await?;

    Ok(Json(ChunkResponse {
        success: true,
        chunk_index: request.chunk_index,
        message: format!("Chunk {} uploaded successfully", request.chunk_index + 1),
    }))
}

async fn forward_completion(
    state: &RelayState,
    body: Bytes,
) -> AppResult<Json<CompleteResponse>> {
    let request: CompleteRequest = serde_json::from_slice(&body)?;

    log::info!(
        "Completing upload for: {}, total chunks: {}",
        request.file_name,
        request.total_chunks
    );

    forward(state, "combine-chunks", body).await?;

    Ok(Json(CompleteResponse {
        success: true,
        message: "File upload completed successfully!".to_string(),
        file_name: request.file_name,
    }))
}

/// Pass the body through to upstream storage untouched.
async fn forward(state: &RelayState, path: &str, body: Bytes) -> AppResult<()> {
    let url = state.upstream_endpoint(path);
    log::debug!("Forwarding {} bytes to {}", body.len(), url);

    let response = state
        .client
        .post(&url)
        .header(header::CONTENT_TYPE.as_str(), "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Internal(format!(
            "Upstream storage error {} from {}",
            status.as_u16(),
            url
        )));
    }

    // Upstream must answer with JSON, even on success.
    let bytes = response.bytes().await?;
    serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|e| {
        AppError::Internal(format!("Invalid upstream response from {}: {}", url, e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{router, RelayState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Fake upstream that records what it receives and answers with `status`.
    async fn spawn_upstream(status: StatusCode) -> (String, Arc<Mutex<Vec<(String, Vec<u8>)>>>) {
        spawn_upstream_with_body(status, "{}").await
    }

    async fn spawn_upstream_with_body(
        status: StatusCode,
        reply: &'static str,
    ) -> (String, Arc<Mutex<Vec<(String, Vec<u8>)>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let app = Router::new().route(
            "/api/{endpoint}",
            axum::routing::post(
                move |axum::extract::Path(endpoint): axum::extract::Path<String>,
                      body: axum::body::Bytes| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().unwrap().push((endpoint, body.to_vec()));
                        (status, reply)
                    }
                },
            ),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), received)
    }

    fn relay(upstream_url: &str) -> Router {
        router(RelayState::new(upstream_url, Duration::from_secs(5)).unwrap())
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_cors(response: &axum::response::Response) {
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_options_returns_empty_ok_with_cors() {
        for uri in ["/upload-chunk", "/complete-upload", "/.netlify/functions/upload-chunk"] {
            let response = relay("http://127.0.0.1:9")
                .oneshot(
                    Request::builder()
                        .method(Method::OPTIONS)
                        .uri(uri)
                        .body(Body::from("ignored payload"))
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_cors(&response);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert!(bytes.is_empty());
        }
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let response = relay("http://127.0.0.1:9")
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/complete-upload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_cors(&response);
        assert_eq!(json_body(response).await["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_missing_chunk_is_bad_request() {
        let response = relay("http://127.0.0.1:9")
            .oneshot(post(
                "/upload-chunk",
                serde_json::json!({
                    "fileName": "a.bin",
                    "chunkIndex": 0,
                    "totalChunks": 1,
                    "uploadId": "abc"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No chunk data provided");
    }

    #[tokio::test]
    async fn test_chunk_is_checked_before_metadata() {
        let bodies = [
            serde_json::json!({}),
            serde_json::json!({"chunk": ""}),
            serde_json::json!({"chunkIndex": 0}),
            serde_json::json!({"chunk": null, "fileName": "a.bin"}),
        ];

        for body in bodies {
            let response = relay("http://127.0.0.1:9")
                .oneshot(post("/upload-chunk", body.clone()))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
            assert_cors(&response);
            assert_eq!(json_body(response).await["error"], "No chunk data provided");
        }
    }

    #[tokio::test]
    async fn test_non_json_upstream_reply_is_internal_error() {
        let (upstream, received) = spawn_upstream_with_body(StatusCode::OK, "<html>ok</html>").await;

        let response = relay(&upstream)
            .oneshot(post(
                "/upload-chunk",
                serde_json::json!({
                    "chunk": "aGVsbG8=",
                    "fileName": "a.bin",
                    "chunkIndex": 0,
                    "totalChunks": 1,
                    "uploadId": "abc"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Invalid upstream response"));
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_internal_error() {
        let response = relay("http://127.0.0.1:9")
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload-chunk")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&response);
        let body = json_body(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Internal server error:"));
    }

    #[tokio::test]
    async fn test_chunk_is_forwarded_unchanged() {
        let (upstream, received) = spawn_upstream(StatusCode::OK).await;
        let payload = serde_json::json!({
            "chunk": "aGVsbG8=",
            "fileName": "a.bin",
            "chunkIndex": 1,
            "totalChunks": 3,
            "uploadId": "abc"
        });

        let response = relay(&upstream)
            .oneshot(post("/upload-chunk", payload.clone()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["chunkIndex"], 1);
        assert_eq!(body["message"], "Chunk 2 uploaded successfully");

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "upload-chunk");
        let forwarded: serde_json::Value = serde_json::from_slice(&received[0].1).unwrap();
        assert_eq!(forwarded, payload);
    }

    #[tokio::test]
    async fn test_completion_forwards_to_combine() {
        let (upstream, received) = spawn_upstream(StatusCode::OK).await;

        let response = relay(&upstream)
            .oneshot(post(
                "/complete-upload",
                serde_json::json!({"fileName": "a.bin", "totalChunks": 3, "uploadId": "abc"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["fileName"], "a.bin");
        assert_eq!(body["message"], "File upload completed successfully!");
        assert_eq!(received.lock().unwrap()[0].0, "combine-chunks");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_internal_error() {
        let (upstream, _) = spawn_upstream(StatusCode::BAD_GATEWAY).await;

        let response = relay(&upstream)
            .oneshot(post(
                "/complete-upload",
                serde_json::json!({"fileName": "a.bin", "totalChunks": 1, "uploadId": "abc"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&response);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("502"));
    }
}
