use serde::{Deserialize, Serialize};

/// One learned pattern: a normalized description mapped to its category
/// pair. Serde field names follow the corpus file's column headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "description")]
    pub pattern: String,
    pub category: String,
    #[serde(rename = "subcategory")]
    pub sub_category: String,
}

impl ReferenceEntry {
    pub fn new(
        pattern: impl Into<String>,
        category: impl Into<String>,
        sub_category: impl Into<String>,
    ) -> Self {
        ReferenceEntry {
            pattern: pattern.into(),
            category: category.into(),
            sub_category: sub_category.into(),
        }
    }
}
