//! Response body decoding for the catalog client.

use anyhow::Result;

/// Decode `body`, reporting the JSON path and a snippet of the offending line
/// on failure so malformed upstream payloads can be diagnosed from logs.
pub fn decode_with_context<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let (line, column) = (inner.line(), inner.column());

        let message = inner.to_string();
        let suffix = format!(" at line {line} column {column}");
        let message = message.strip_suffix(&suffix).unwrap_or(&message);

        let location = if path.is_empty() || path == "." {
            String::new()
        } else {
            format!("at '{path}': ")
        };
        anyhow::anyhow!(
            "{location}{message} (line {line} col {column})\n{}",
            snippet(body, line, column, 24)
        )
    })
}

/// A window of `width` characters around `column` on `line` (both 1-based),
/// with a caret under the error position.
fn snippet(body: &str, line: usize, column: usize, width: usize) -> String {
    let Some(text) = body.lines().nth(line.saturating_sub(1)) else {
        return "(no such line)".to_owned();
    };
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return "(empty line)".to_owned();
    }

    let at = column.saturating_sub(1).min(chars.len());
    let start = at.saturating_sub(width / 2);
    let end = (at + width / 2).min(chars.len());
    let window: String = chars[start..end].iter().collect();

    format!("...{window}...\n   {}^", " ".repeat(at - start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogResponse;

    #[test]
    fn reports_path_for_type_mismatch() {
        let body = r#"{"success": true, "meta": {"cursor": {"next": 12}}}"#;
        let err = decode_with_context::<CatalogResponse>(body).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("meta.cursor.next"), "{msg}");
        assert!(msg.contains('^'), "{msg}");
    }

    #[test]
    fn not_json_is_an_error() {
        let err = decode_with_context::<CatalogResponse>("<html>502</html>").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn snippet_handles_multibyte_text() {
        let out = snippet("{\"name\": \"Müller Sturzbügel\"}", 1, 12, 8);
        assert!(out.starts_with("..."));
        assert!(out.ends_with('^'));
    }

    #[test]
    fn snippet_past_end_of_body() {
        assert_eq!(snippet("{}", 5, 1, 8), "(no such line)");
    }
}
