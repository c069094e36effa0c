//! Credential scrubbing for diagnostics that leave the process.
//!
//! Delivery failures persist the upstream error text into dead-letter
//! records and logs. Those messages can embed `Authorization` header values
//! or `password=` fragments from request URLs, so everything passes through
//! [`mask_credentials`] first.

const MASK: &str = "*****";

/// Replace credential material in a free-form diagnostic string.
///
/// Masks `Basic ` / `Bearer ` header tokens and `password=` / `token=`
/// assignments. The surrounding text is preserved verbatim.
pub fn mask_credentials(input: &str) -> String {
    let mut masked = mask_after_keyword(input, "Basic ");
    masked = mask_after_keyword(&masked, "Bearer ");
    masked = mask_assignment(&masked, "password");
    masked = mask_assignment(&masked, "token");
    masked
}

fn mask_after_keyword(
    input: &str,
    keyword: &str,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find(keyword) {
        let after = idx + keyword.len();
        out.push_str(&rest[..after]);
        let tail = &rest[after..];
        let token_len = tail
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || matches!(c, '"' | '\'' | ','))
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        if token_len > 0 {
            out.push_str(MASK);
        }
        rest = &tail[token_len..];
    }
    out.push_str(rest);
    out
}

fn mask_assignment(
    input: &str,
    key: &str,
) -> String {
    let needle = format!("{key}=");
    // ASCII lowering preserves byte offsets, so indices found in `lower`
    // stay valid in `input`
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    while let Some(found) = lower[cursor..].find(&needle) {
        let value_start = cursor + found + needle.len();
        out.push_str(&input[cursor..value_start]);
        let tail = &input[value_start..];
        let value_len = tail
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || matches!(c, '&' | '"' | '\'' | ','))
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        if value_len > 0 {
            out.push_str(MASK);
        }
        cursor = value_start + value_len;
    }
    out.push_str(&input[cursor..]);
    out
}
