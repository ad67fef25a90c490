//! QR image proxy.
//!
//! Codes are rendered by an external image service; the dashboard fetches
//! the PNG and hands it back as a download.

use thiserror::Error;

/// Pixel size requested from the image service.
pub const QR_SIZE: &str = "220x220";

const DEFAULT_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Missing data parameter.")]
    MissingData,

    #[error("Failed to generate QR code.")]
    Upstream(#[source] Option<reqwest::Error>),
}

/// A rendered QR code ready to send.
#[derive(Debug)]
pub struct QrImage {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl QrImage {
    /// `Content-Disposition` value for the download.
    #[must_use]
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

/// Download file name for `data`: `qr-<safe>.png`.
///
/// Runs of characters outside `[A-Za-z0-9_-]` become `-`, repeated `-`
/// collapse, and an empty result becomes `code`.
#[must_use]
pub fn file_name(data: &str) -> String {
    let mut safe = String::with_capacity(data.len());
    for c in data.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && safe.ends_with('-') {
            continue;
        }
        safe.push(c);
    }
    if safe.is_empty() {
        safe.push_str("code");
    }
    format!("qr-{safe}.png")
}

/// Build the image service URL for `data`.
///
/// # Errors
///
/// Returns an error if `base` is not a valid URL.
pub fn service_url(base: &str, data: &str) -> Result<url::Url, url::ParseError> {
    url::Url::parse_with_params(base, &[("size", QR_SIZE), ("data", data)])
}

/// Fetch the QR image for `data` from the service at `base`.
///
/// # Errors
///
/// Returns `QrError::MissingData` for blank input and `QrError::Upstream`
/// when the service is unreachable or answers with a non-success status.
#[tracing::instrument(skip(client))]
pub async fn fetch(client: &reqwest::Client, base: &str, data: &str) -> Result<QrImage, QrError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(QrError::MissingData);
    }

    let url = service_url(base, data).map_err(|e| {
        tracing::error!(error = %e, "Invalid QR service URL");
        QrError::Upstream(None)
    })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| QrError::Upstream(Some(e)))?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "QR service returned an error");
        return Err(QrError::Upstream(None));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| QrError::Upstream(Some(e)))?;

    Ok(QrImage {
        content_type,
        file_name: file_name(data),
        bytes: bytes.to_vec(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_sanitizes() {
        assert_eq!(file_name("ICT-2024-001"), "qr-ICT-2024-001.png");
        assert_eq!(file_name("PC 01/a b"), "qr-PC-01-a-b.png");
        assert_eq!(file_name("a -- b"), "qr-a-b.png");
        assert_eq!(file_name("snake_case"), "qr-snake_case.png");
    }

    #[test]
    fn test_file_name_empty_becomes_code() {
        assert_eq!(file_name(""), "qr-code.png");
        assert_eq!(file_name("///"), "qr--.png");
    }

    #[test]
    fn test_service_url_encodes_data() {
        let url = service_url("https://api.qrserver.com/v1/create-qr-code/", "A&B 1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.qrserver.com/v1/create-qr-code/?size=220x220&data=A%26B+1"
        );
    }

    #[test]
    fn test_content_disposition() {
        let image = QrImage {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            file_name: file_name("X1"),
            bytes: vec![],
        };
        assert_eq!(
            image.content_disposition(),
            "attachment; filename=\"qr-X1.png\""
        );
    }

    #[tokio::test]
    async fn test_blank_data_is_rejected_before_fetch() {
        let client = reqwest::Client::new();
        let err = fetch(&client, "http://127.0.0.1:9/", "   ").await.unwrap_err();
        assert!(matches!(err, QrError::MissingData));
        assert_eq!(err.to_string(), "Missing data parameter.");
    }
}
