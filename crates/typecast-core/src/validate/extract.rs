//! Tolerant JSON extraction from raw model output
//!
//! Models wrap their answer in prose, markdown fences, or trailing
//! commentary. Extraction finds the first syntactically balanced JSON object
//! or array in the text, honoring string literals and escapes so braces
//! inside strings do not confuse the scan.

/// Locate the first balanced JSON object or array in `text`
///
/// Returns the candidate span without parsing it; the caller decides whether
/// the span is valid JSON. An opener that never balances (a stray brace in
/// the surrounding prose, say) is skipped and the scan resumes at the next
/// opener.
pub fn extract_json(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(offset) = bytes[from..].iter().position(|&b| b == b'{' || b == b'[') {
        let start = from + offset;
        if let Some(end) = balanced_end(&bytes[start..]) {
            return Some(&text[start..start + end]);
        }
        from = start + 1;
    }
    None
}

/// Scan for the index just past the close of the value opening at `bytes[0]`
fn balanced_end(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                // Unbalanced closer before the opener closes
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
