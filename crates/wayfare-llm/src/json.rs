//! Extraction of a single JSON object from a model completion.
//!
//! Stage prompts demand exactly one JSON object, but models still wrap
//! output in code fences or surround it with prose often enough that
//! parsing the raw completion directly would fail. The extractor locates
//! the first balanced `{...}` span and returns it for strict parsing.

/// Extract the first complete JSON object from a completion.
///
/// Code fences (```` ``` ````/```` ```json ````) are stripped before
/// scanning. Returns `None` when no balanced object is present. Brace
/// characters inside JSON string literals are skipped so addresses like
/// `"{unit 4}"` do not unbalance the scan.
pub fn extract_json_object(input: &str) -> Option<String> {
    let cleaned = input.replace("```json", "").replace("```", "");
    let trimmed = cleaned.trim();
    let start = trimmed.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in trimmed[start..].char_indices() {
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
                depth -= 1;
                if depth == 0 {
                    return Some(trimmed[start..=start + idx].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
