//! Parse HTTP response header lines into a ResponseHead.

use super::ResponseHead;

/// Parse collected header lines into a ResponseHead. `status` comes from curl.
///
/// Only the last response in a redirect chain is considered: lines are
/// expected to have been reset at each status line.
pub(crate) fn parse_headers(status: u32, lines: &[String]) -> ResponseHead {
    let mut content_type = None;
    let mut content_length = None;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.to_string());
            }
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    content_length = Some(n);
                }
            }
        }
    }

    ResponseHead {
        status,
        content_type,
        content_length,
    }
}

/// Bare media type of a Content-Type value, lower-cased, without parameters.
pub(crate) fn media_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    let (kind, subtype) = essence.split_once('/')?;
    if kind.trim().is_empty() || subtype.trim().is_empty() {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}
