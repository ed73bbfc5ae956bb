//! MIME types the ingestion step cares about.

pub const DOC: &str = "application/msword";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ODT: &str = "application/vnd.oasis.opendocument.text";
pub const RTF: &str = "application/rtf";
pub const TXT: &str = "text/plain";

/// Strips parameters (`; charset=...`) and normalizes case.
pub fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Documents that must go through the conversion service.
pub fn is_convertible(essence: &str) -> bool {
    [DOC, DOCX, ODT, RTF].contains(&essence)
}
