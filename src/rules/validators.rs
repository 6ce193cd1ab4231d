//! Format validators — post-match confirmation that a candidate span is a
//! true positive before it is reported as a [`crate::model::Detection`].

use crate::model::{FormatValidator, ValidatorKind};
use regex::Regex;

/// The result of running a [`FormatValidator`] against a candidate span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The candidate is confirmed — treat the match as a true positive.
    Confirmed,
    /// The candidate failed validation — treat the match as a false
    /// positive and drop it.
    Rejected,
}

impl ValidationOutcome {
    /// `true` if confirmed.
    #[must_use]
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Run a validator against a candidate matched span.
#[must_use]
pub fn run_validator(validator: &FormatValidator, candidate: &str) -> ValidationOutcome {
    let confirmed = match validator.kind {
        ValidatorKind::Luhn => luhn_check(candidate),
        ValidatorKind::Uuid => uuid_check(candidate),
        ValidatorKind::EmailDns => email_syntax_check(candidate),
        ValidatorKind::Regex => validator
            .rule
            .as_deref()
            .and_then(|rule| Regex::new(rule).ok())
            .is_some_and(|re| re.is_match(candidate)),
    };

    if confirmed {
        ValidationOutcome::Confirmed
    } else {
        ValidationOutcome::Rejected
    }
}

fn luhn_check(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 2 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

fn uuid_check(candidate: &str) -> bool {
    static PATTERN: &str = r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";
    Regex::new(PATTERN)
        .expect("static uuid pattern always compiles")
        .is_match(candidate.trim())
}

/// Syntax-only email shape check. No network I/O is performed — a real
/// MX/DNS lookup is explicitly out of scope for the core crate (see
/// `SPEC_FULL.md` §4.A); this confirms the candidate *looks like* an email
/// address with a plausible domain shape.
fn email_syntax_check(candidate: &str) -> bool {
    static PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[A-Za-z]{2,}$";
    Regex::new(PATTERN)
        .expect("static email pattern always compiles")
        .is_match(candidate.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(kind: ValidatorKind, rule: Option<&str>) -> FormatValidator {
        FormatValidator {
            name: "test".to_string(),
            kind,
            rule: rule.map(str::to_string),
            description: String::new(),
        }
    }

    #[test]
    fn luhn_accepts_known_valid_number() {
        // well-known test Visa number
        assert!(luhn_check("4111111111111111"));
    }

    #[test]
    fn luhn_rejects_invalid_number() {
        assert!(!luhn_check("4111111111111112"));
    }

    #[test]
    fn uuid_accepts_well_formed_value() {
        let v = validator(ValidatorKind::Uuid, None);
        assert_eq!(
            run_validator(&v, "550e8400-e29b-41d4-a716-446655440000"),
            ValidationOutcome::Confirmed
        );
    }

    #[test]
    fn uuid_rejects_malformed_value() {
        let v = validator(ValidatorKind::Uuid, None);
        assert_eq!(run_validator(&v, "not-a-uuid"), ValidationOutcome::Rejected);
    }

    #[test]
    fn email_dns_accepts_plausible_address() {
        let v = validator(ValidatorKind::EmailDns, None);
        assert_eq!(
            run_validator(&v, "user@example.com"),
            ValidationOutcome::Confirmed
        );
    }

    #[test]
    fn regex_validator_uses_its_own_rule() {
        let v = validator(ValidatorKind::Regex, Some(r"^[A-Z]{2}\d{6}$"));
        assert_eq!(run_validator(&v, "AB123456"), ValidationOutcome::Confirmed);
        assert_eq!(run_validator(&v, "ab123456"), ValidationOutcome::Rejected);
    }

    #[test]
    fn regex_validator_without_rule_rejects() {
        let v = validator(ValidatorKind::Regex, None);
        assert_eq!(run_validator(&v, "anything"), ValidationOutcome::Rejected);
    }
}
