//! JSON extraction from free-form model text.
//!
//! Attempts run in a fixed order: strict parse, first fenced code block, first brace-delimited
//! object. Each attempt is a pure function so it can be exercised on its own.

use serde::de::DeserializeOwned;

/// Which attempt produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedFrom {
    Strict,
    Fenced,
    Braced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<T> {
    pub value: T,
    pub from: ExtractedFrom,
}

/// The whole text, trimmed, is the JSON value.
pub fn parse_strict<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::from_str(text.trim()).ok()
}

/// The body of the first Markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn parse_fenced<T: DeserializeOwned>(text: &str) -> Option<T> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip the info string (e.g. `json`) up to the end of the fence line.
    let body_start = after_open.find('\n').map_or(0, |idx| idx + 1);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    serde_json::from_str(body[..close].trim()).ok()
}

/// The first balanced `{ ... }` span that parses, scanning left to right.
pub fn parse_braced<T: DeserializeOwned>(text: &str) -> Option<T> {
    text.match_indices('{').find_map(|(start, _)| {
        let end = balanced_object_end(&text[start..])?;
        serde_json::from_str(&text[start..start + end]).ok()
    })
}

/// Run every attempt in order.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<Extracted<T>> {
    if let Some(value) = parse_strict(text) {
        return Some(Extracted {
            value,
            from: ExtractedFrom::Strict,
        });
    }
    if let Some(value) = parse_fenced(text) {
        return Some(Extracted {
            value,
            from: ExtractedFrom::Fenced,
        });
    }
    parse_braced(text).map(|value| Extracted {
        value,
        from: ExtractedFrom::Braced,
    })
}

/// Byte length of the object starting at `text[0] == '{'`, honouring JSON strings.
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
