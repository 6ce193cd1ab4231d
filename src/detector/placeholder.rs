//! Redaction placeholder generation.
//!
//! Format: `[RID_PATTERN_HEX16]` when a request id is present, otherwise
//! `[PATTERN_HEX16]` — an 8-byte (16 hex character) crypto-random suffix
//! generated with `ring`'s `SystemRandom`, the same RNG idiom the teacher
//! uses in `wg_bastion::prompt::honeytoken` for token generation. On RNG
//! failure (practically unreachable, but the contract requires it) the
//! literal string `randomid` is substituted instead of the hex suffix.

use ring::rand::{SecureRandom, SystemRandom};

fn random_suffix() -> String {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 8];
    match rng.fill(&mut bytes) {
        Ok(()) => hex::encode(bytes),
        Err(_) => "randomid".to_string(),
    }
}

/// Build a redaction placeholder for `pattern_name`, optionally scoped to a
/// request id.
#[must_use]
pub fn generate(request_id: &str, pattern_name: &str) -> String {
    let suffix = random_suffix();
    if request_id.is_empty() {
        format!("[{pattern_name}_{suffix}]")
    } else {
        format!("[{request_id}_{pattern_name}_{suffix}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_without_request_id() {
        let placeholder = generate("", "aws_key");
        assert!(placeholder.starts_with("[aws_key_"));
        assert!(placeholder.ends_with(']'));
    }

    #[test]
    fn placeholder_with_request_id() {
        let placeholder = generate("req-42", "aws_key");
        assert!(placeholder.starts_with("[req-42_aws_key_"));
    }

    #[test]
    fn suffix_is_sixteen_hex_chars() {
        let placeholder = generate("", "p");
        let suffix = placeholder
            .trim_start_matches("[p_")
            .trim_end_matches(']');
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn successive_placeholders_differ() {
        assert_ne!(generate("", "p"), generate("", "p"));
    }
}
