use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::eid::Eid;
use crate::semantic::Metadata;

const META_TAGS: &str = "tags";
const META_FAVORITE: &str = "favorite";
const META_CREATED_AT: &str = "created_at";
const META_PROPERTY_PREFIX: &str = "prop_";

/// A stored memory. Only `content` feeds the embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Eid,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DocumentCreate {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub favorite: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DocumentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

/// Split a comma separated tag list, dropping blanks.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Re-split tags so none carries a comma (the metadata encoding joins on commas).
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.iter().flat_map(|tag| parse_tags(tag)).collect()
}

impl Document {
    pub fn new(create: DocumentCreate) -> Self {
        Self {
            id: Eid::new(),
            content: create.content,
            tags: clean_tags(create.tags),
            properties: create.properties,
            favorite: create.favorite,
            created_at: Utc::now(),
        }
    }

    /// Apply the fields present in `update`. Refreshes `created_at`.
    pub fn apply(&mut self, update: DocumentUpdate) {
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(tags) = update.tags {
            self.tags = clean_tags(tags);
        }
        if let Some(properties) = update.properties {
            self.properties = properties;
        }
        if let Some(favorite) = update.favorite {
            self.favorite = favorite;
        }
        self.created_at = Utc::now();
    }

    /// Flatten everything but id and content into store metadata.
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(META_TAGS.to_string(), self.tags.join(","));
        metadata.insert(META_FAVORITE.to_string(), self.favorite.to_string());
        metadata.insert(META_CREATED_AT.to_string(), self.created_at.to_rfc3339());

        for (key, value) in &self.properties {
            metadata.insert(format!("{META_PROPERTY_PREFIX}{key}"), value.clone());
        }

        metadata
    }

    /// Rebuild a document from what the store returns.
    ///
    /// Missing or unparsable `created_at` falls back to now; unknown keys are ignored.
    pub fn from_stored(id: &str, content: &str, metadata: &Metadata) -> Self {
        let tags = metadata
            .get(META_TAGS)
            .map(|tags| parse_tags(tags))
            .unwrap_or_default();

        let favorite = metadata
            .get(META_FAVORITE)
            .map(|value| value == "true")
            .unwrap_or(false);

        let created_at = metadata
            .get(META_CREATED_AT)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let properties = metadata
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(META_PROPERTY_PREFIX)
                    .map(|key| (key.to_string(), value.clone()))
            })
            .collect();

        Self {
            id: Eid::from(id),
            content: content.to_string(),
            tags,
            properties,
            favorite,
            created_at,
        }
    }
}
