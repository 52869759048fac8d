//! Content-Type helpers and content sniffing

use base64::Engine;

/// Fallback type for bodies that cannot be identified
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Lowercased `type/subtype` of a Content-Type header, parameters dropped
#[must_use]
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[must_use]
pub fn is_html(content_type: &str) -> bool {
    matches!(essence(content_type).as_str(), "text/html" | "application/xhtml+xml")
}

#[must_use]
pub fn is_css(content_type: &str) -> bool {
    essence(content_type) == "text/css"
}

/// Preferred file extension for a MIME type
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let ext = match essence(content_type).as_str() {
        "text/html" | "application/xhtml+xml" => "html",
        "text/css" => "css",
        "text/javascript" | "application/javascript" | "application/x-javascript" => "js",
        "application/json" => "json",
        "text/plain" => "txt",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "font/woff" | "application/font-woff" => "woff",
        "font/woff2" => "woff2",
        "font/ttf" | "application/x-font-ttf" => "ttf",
        "font/otf" => "otf",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "application/pdf" => "pdf",
        _ => return None,
    };
    Some(ext)
}

/// MIME type guessed from a URL path extension
#[must_use]
pub fn type_for_path(path: &str) -> Option<&'static str> {
    let file = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file.rsplit_once('.')?;

    let mime = match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Identify a body from its leading bytes, then from the URL path
///
/// Used when a server omits Content-Type or sends an empty one.
#[must_use]
pub fn sniff_content_type(content: &[u8], url_path: &str) -> String {
    sniff_magic(content)
        .or_else(|| type_for_path(url_path))
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

fn sniff_magic(content: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"wOFF", "font/woff"),
        (b"wOF2", "font/woff2"),
        (b"\x00\x00\x01\x00", "image/x-icon"),
        (b"OTTO", "font/otf"),
        (b"\x00\x01\x00\x00", "font/ttf"),
    ];

    if let Some((_, mime)) = SIGNATURES
        .iter()
        .find(|(signature, _)| content.starts_with(signature))
    {
        return Some(mime);
    }

    if content.len() >= 12 && &content[..4] == b"RIFF" && &content[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    let head = String::from_utf8_lossy(&content[..content.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some("image/svg+xml");
    }
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Some("text/html");
    }

    None
}

/// Encode a body as `data:<mime>;base64,<payload>`
///
/// Parameters such as `charset` are dropped from the MIME type.
#[must_use]
pub fn to_data_url(content: &[u8], content_type: &str) -> String {
    let mime = essence(content_type);
    let mime = if mime.is_empty() { OCTET_STREAM.to_string() } else { mime };
    let payload = base64::engine::general_purpose::STANDARD.encode(content);
    format!("data:{mime};base64,{payload}")
}
