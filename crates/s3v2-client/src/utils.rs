//! Shared helpers: HTTP dates and content-type lookup.

use std::path::Path;

use chrono::{DateTime, Utc};
use mime::Mime;

/// Format `time` as an RFC 1123 HTTP date, e.g. `Tue, 14 Nov 2023 22:13:20 GMT`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use s3v2_client::utils::http_date;
///
/// let time = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// assert_eq!(http_date(time), "Tue, 14 Nov 2023 22:13:20 GMT");
/// ```
#[must_use]
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Guess the content type of a file from its extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
#[must_use]
pub fn content_type_for(path: &Path) -> Mime {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => mime::APPLICATION_JSON,
        Some("txt" | "md") => mime::TEXT_PLAIN,
        Some("html" | "htm") => mime::TEXT_HTML,
        Some("css") => mime::TEXT_CSS,
        Some("csv") => mime::TEXT_CSV,
        Some("xml") => mime::TEXT_XML,
        Some("js") => mime::APPLICATION_JAVASCRIPT,
        Some("pdf") => mime::APPLICATION_PDF,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("svg") => mime::IMAGE_SVG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
