//! Default SQL-safety validator
//!
//! Regex screens for forbidden statement types and common injection
//! patterns. Destructive statements must never pass, so the screens are
//! deliberately coarse.

use lazy_static::lazy_static;
use regex::Regex;

use crate::contracts::{SecurityCheck, SecurityValidator};
use crate::error::Result;

lazy_static! {
    static ref FORBIDDEN_STATEMENTS: Regex = Regex::new(
        r"(?i)\b(drop|truncate|alter|create|grant|revoke|merge|exec|execute|shutdown)\b"
    )
    .expect("forbidden statement regex");
    static ref MULTI_STATEMENT: Regex = Regex::new(r";\s*\S").expect("multi-statement regex");
    static ref COMMENT_INJECTION: Regex =
        Regex::new(r"(--|/\*|\bxp_\w+|\bsp_\w+)").expect("comment injection regex");
    static ref TAUTOLOGY: Regex =
        Regex::new(r"(?i)\bor\s+'?\d+'?\s*=\s*'?\d+'?").expect("tautology regex");
}

#[derive(Debug, Default)]
pub struct RegexSecurityValidator;

impl RegexSecurityValidator {
    pub fn new() -> Self {
        Self
    }
}

impl SecurityValidator for RegexSecurityValidator {
    fn validate(&self, sql: &str) -> Result<SecurityCheck> {
        let mut warnings = Vec::new();

        if let Some(found) = FORBIDDEN_STATEMENTS.find(sql) {
            warnings.push(format!(
                "Forbidden statement keyword '{}' detected",
                found.as_str()
            ));
        }
        if MULTI_STATEMENT.is_match(sql) {
            warnings.push("Multiple statements are not allowed".to_string());
        }
        if COMMENT_INJECTION.is_match(sql) {
            warnings.push("Comment or procedure-call injection pattern detected".to_string());
        }
        if TAUTOLOGY.is_match(sql) {
            warnings.push("Tautology injection pattern detected".to_string());
        }

        Ok(SecurityCheck {
            is_valid: warnings.is_empty(),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_passes() {
        let validator = RegexSecurityValidator::new();
        let check = validator
            .validate("SELECT Name FROM Players WHERE Status = 'Blocked'")
            .unwrap();
        assert!(check.is_valid);
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn test_drop_table_is_rejected() {
        let validator = RegexSecurityValidator::new();
        let check = validator.validate("DROP TABLE Players").unwrap();
        assert!(!check.is_valid);
    }

    #[test]
    fn test_stacked_statement_is_rejected() {
        let validator = RegexSecurityValidator::new();
        let check = validator
            .validate("SELECT 1; DELETE FROM Players")
            .unwrap();
        assert!(!check.is_valid);
    }

    #[test]
    fn test_tautology_injection_is_rejected() {
        let validator = RegexSecurityValidator::new();
        let check = validator
            .validate("SELECT * FROM Players WHERE Name = '' OR 1=1")
            .unwrap();
        assert!(!check.is_valid);
    }

    #[test]
    fn test_comment_injection_is_rejected() {
        let validator = RegexSecurityValidator::new();
        let check = validator
            .validate("SELECT Name FROM Players -- WHERE Status = 'Blocked'")
            .unwrap();
        assert!(!check.is_valid);
    }
}
