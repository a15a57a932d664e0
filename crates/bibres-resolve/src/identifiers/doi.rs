use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

const RESOLVER_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// Path segments publishers append after the DOI in article URLs.
const LANDING_SUFFIXES: &[&str] = &[
    "/full", "/abstract", "/pdf", "/epdf", "/pdfdirect", "/html", "/meta", "/suppl", ".pdf",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let mut stripped = input;
        for prefix in RESOLVER_PREFIXES {
            if let Some(rest) = stripped.strip_prefix(prefix) {
                stripped = rest;
                break;
            }
        }
        if let Some(rest) = stripped
            .strip_prefix("doi:")
            .or_else(|| stripped.strip_prefix("DOI:"))
        {
            stripped = rest.trim_start();
        }
        let stripped = trim_landing_suffix(stripped.trim_end_matches('/'));

        // Must start with "10.", contain "/", and have a non-empty suffix
        if !stripped.starts_with("10.") {
            return Err(ResolveError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| ResolveError::InvalidDoi(input.to_string()))?;
        let suffix = &stripped[slash_pos + 1..];
        if suffix.is_empty() {
            return Err(ResolveError::InvalidDoi(input.to_string()));
        }

        let normalized = stripped.to_lowercase();
        let url = format!("https://doi.org/{normalized}");

        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }
}

fn trim_landing_suffix(value: &str) -> &str {
    let lower = value.to_ascii_lowercase();
    for suffix in LANDING_SUFFIXES {
        if lower.ends_with(suffix) {
            return &value[..value.len() - suffix.len()];
        }
    }
    value
}
