use crate::error::{LlmError, LlmResult};
use serde_json::Value;

/// First balanced JSON object in `text` that parses, ignoring surrounding prose and fences
pub fn extract_json(text: &str) -> LlmResult<Value> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_object_end(&text[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end]) {
                return Ok(value);
            }
        }
        search_from = start + 1;
    }
    Err(LlmError::Unparseable {
        expected: "JSON object",
    })
}

/// Byte length of the object starting at `text[0] == '{'`, if it closes
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Body of the first fenced code block, or the whole text when there is none
pub fn extract_code(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.trim().to_string();
    };
    let after_fence = &text[open + 3..];
    // skip the language tag line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
    let body = &after_fence[body_start..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_prose_and_fences() {
        let text = "Here is the query:\n```json\n{\"query\": {\"name\": {\"$regex\": \"^ecephys\"}}}\n```\nDone.";
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"query": {"name": {"$regex": "^ecephys"}}})
        );
    }

    #[test]
    fn test_extract_json_handles_braces_in_strings_and_bad_candidates() {
        let text = r#"{not json} then {"a": "}{", "b": [1, {"c": 2}]}"#;
        assert_eq!(extract_json(text).unwrap(), json!({"a": "}{", "b": [1, {"c": 2}]}));
        assert!(matches!(
            extract_json("no braces here"),
            Err(LlmError::Unparseable { .. })
        ));
    }

    #[test]
    fn test_extract_code() {
        let text = "Sure.\n```python\nimport json\nprint(1)\n```\nthanks";
        assert_eq!(extract_code(text), "import json\nprint(1)");
        assert_eq!(extract_code("  print(2)\n"), "print(2)");
        assert_eq!(extract_code("```\nunterminated"), "unterminated");
    }
}
