use serde::{Deserialize, Serialize};

/// The categorical axes along which reader preferences are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Tag,
    Category,
    Author,
}

impl FacetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Tag => "tag",
            FacetKind::Category => "category",
            FacetKind::Author => "author",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tag" => Some(FacetKind::Tag),
            "category" => Some(FacetKind::Category),
            "author" => Some(FacetKind::Author),
            _ => None,
        }
    }
}

impl std::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A book with its facet sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub authors: Vec<String>,
}

impl Book {
    /// The facet values this book carries along the given axis.
    pub fn facet_values(&self, kind: FacetKind) -> &[String] {
        match kind {
            FacetKind::Tag => &self.tags,
            FacetKind::Category => &self.categories,
            FacetKind::Author => &self.authors,
        }
    }
}
