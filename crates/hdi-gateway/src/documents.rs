//! Document upload: extract text from a multipart `file` field

use axum::Json;
use axum::extract::Multipart;
use hdi_core::parse_document;
use tracing::{debug, error, warn};

use crate::protocol::{ApiError, ParsedDocument};

/// Upload cap for `/api/documents/parse`
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub async fn parse_handler(mut multipart: Multipart) -> Result<Json<ParsedDocument>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart upload: {}", e);
        ApiError::bad_request(format!("Invalid upload: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read {}: {}", filename, e)))?;
        debug!("Parsing uploaded document {} ({} bytes)", filename, bytes.len());

        // PDF and spreadsheet extraction is CPU-bound
        let name = filename.clone();
        let content = tokio::task::spawn_blocking(move || parse_document(&bytes, &name))
            .await
            .unwrap_or_else(|e| {
                error!("Document parser task for {} failed: {}", filename, e);
                format!("Error parsing file {}: {}", filename, e)
            });
        return Ok(Json(ParsedDocument {
            length: content.chars().count(),
            filename,
            content,
        }));
    }

    Err(ApiError::bad_request("Missing 'file' field"))
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::server::tests::{call, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    const BOUNDARY: &str = "hdi-boundary";

    fn upload(field: &str, filename: &str, body: &str) -> Request<Body> {
        let payload = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{body}\r\n--{BOUNDARY}--\r\n"
        );
        Request::post("/api/documents/parse")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(payload))
            .unwrap()
    }

    #[tokio::test]
    async fn test_parse_text_upload() {
        let (status, json) = call(
            build_router(test_state()),
            upload("file", "catatan.md", "# Uji\nTekanan 30 bar"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["filename"], "catatan.md");
        assert_eq!(json["content"], "# Uji\nTekanan 30 bar");
        assert_eq!(json["length"], 20);
    }

    #[tokio::test]
    async fn test_upload_larger_than_axum_default_limit() {
        let body = "a".repeat(3 * 1024 * 1024);
        let (status, json) = call(build_router(test_state()), upload("file", "besar.txt", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["filename"], "besar.txt");
        assert_eq!(json["length"], 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_upload_over_cap_is_rejected() {
        let body = "a".repeat(super::MAX_UPLOAD_BYTES + 1);
        let (status, _) = call(build_router(test_state()), upload("file", "raksasa.txt", &body)).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let (status, json) = call(
            build_router(test_state()),
            upload("attachment", "catatan.md", "isi"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "Missing 'file' field");
    }
}
