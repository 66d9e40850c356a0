use mime::Mime;
use std::path::Path;

/// Extension-based content type lookup; unknown extensions map to
/// `application/octet-stream`.
pub fn lookup(path: &Path) -> Mime {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        // Web
        Some("html" | "htm") => mime::TEXT_HTML,
        Some("css") => mime::TEXT_CSS,
        Some("js" | "mjs") => mime::APPLICATION_JAVASCRIPT,
        Some("json" | "map") => mime::APPLICATION_JSON,
        Some("xml") => mime::TEXT_XML,
        Some("txt") => mime::TEXT_PLAIN,
        Some("csv") => mime::TEXT_CSV,
        Some("wasm") => parse_known("application/wasm"),
        Some("webmanifest") => parse_known("application/manifest+json"),
        // Images
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("svg") => mime::IMAGE_SVG,
        Some("bmp") => mime::IMAGE_BMP,
        Some("webp") => parse_known("image/webp"),
        Some("ico") => parse_known("image/x-icon"),
        // Fonts
        Some("woff") => mime::FONT_WOFF,
        Some("woff2") => mime::FONT_WOFF2,
        Some("ttf") => parse_known("font/ttf"),
        Some("otf") => parse_known("font/otf"),
        Some("eot") => parse_known("application/vnd.ms-fontobject"),
        // Media
        Some("mp3") => parse_known("audio/mpeg"),
        Some("mp4") => parse_known("video/mp4"),
        Some("webm") => parse_known("video/webm"),
        // Documents and archives
        Some("pdf") => mime::APPLICATION_PDF,
        Some("zip") => parse_known("application/zip"),
        Some("gz") => parse_known("application/gzip"),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

fn parse_known(essence: &str) -> Mime {
    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
