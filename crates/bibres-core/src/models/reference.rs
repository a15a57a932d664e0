use serde::{Deserialize, Serialize};

/// A position in the input bibliography.
///
/// `ref_id` is the 1-based input position rendered as a string. It is set
/// once on construction and has no setter; deduplication only ever touches
/// `canonical_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    ref_id: String,
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    canonical_id: Option<String>,
}

impl Reference {
    /// `position` is 1-based.
    pub fn new(position: usize, url: impl Into<String>) -> Self {
        Self {
            ref_id: position.to_string(),
            url: url.into(),
            canonical_id: None,
        }
    }

    pub fn ref_id(&self) -> &str {
        &self.ref_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn canonical_id(&self) -> Option<&str> {
        self.canonical_id.as_deref()
    }

    pub fn set_canonical_id(&mut self, canonical: impl Into<String>) {
        self.canonical_id = Some(canonical.into());
    }
}

/// Number an ordered URL list, `"1"` for the first entry.
pub fn number_references<S: AsRef<str>>(urls: &[S]) -> Vec<Reference> {
    urls.iter()
        .enumerate()
        .map(|(idx, url)| Reference::new(idx + 1, url.as_ref()))
        .collect()
}
