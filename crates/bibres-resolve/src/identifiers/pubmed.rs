use crate::error::{ResolveError, Result};

/// PubMed identifier: 1–9 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pmid(pub String);

/// PubMed Central identifier, always rendered `PMC<digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pmcid(pub String);

impl Pmid {
    pub fn parse(input: &str) -> Result<Self> {
        let value = strip_label(input.trim(), "pmid:");
        if is_numeric_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ResolveError::InvalidPmid(input.trim().to_string()))
        }
    }
}

impl Pmcid {
    pub fn parse(input: &str) -> Result<Self> {
        let value = strip_label(input.trim(), "pmcid:");
        let digits = if value.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("pmc")) {
            &value[3..]
        } else {
            value
        };
        if is_numeric_id(digits) {
            Ok(Self(format!("PMC{digits}")))
        } else {
            Err(ResolveError::InvalidPmcid(input.trim().to_string()))
        }
    }
}

fn strip_label<'a>(value: &'a str, label: &str) -> &'a str {
    if value.get(..label.len()).is_some_and(|p| p.eq_ignore_ascii_case(label)) {
        value[label.len()..].trim_start()
    } else {
        value
    }
}

fn is_numeric_id(value: &str) -> bool {
    (1..=9).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_digit())
        && value.bytes().any(|b| b != b'0')
}
