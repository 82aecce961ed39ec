use crate::semantic::{DEFAULT_HASH_MULTIPLIER, SCALAR_FEATURES};
use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

/// Default n-gram slots (embedding 10..100)
const DEFAULT_NGRAM_SLOTS: usize = 90;
/// Default word-frequency buckets (embedding 100..300)
const DEFAULT_WORD_BUCKETS: usize = 200;
/// Default positional buckets (embedding 300..384)
const DEFAULT_POSITION_BUCKETS: usize = 84;

const DEFAULT_SEARCH_LIMIT: usize = 10;
const DEFAULT_SEARCH_THRESHOLD: f32 = 0.1;
const DEFAULT_FAVORITE_BOOST: f32 = 1.2;
/// Probe size used when listing every document through the vector store
const DEFAULT_LIST_LIMIT: usize = 1000;

const DEFAULT_WEB_LISTEN: &str = "127.0.0.1:8080";

/// Layout of the statistical embedding.
///
/// Changing any of these invalidates vectors computed under the old layout.
/// Vectors are never persisted, so a restart re-embeds everything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Ranked character n-grams kept
    #[serde(default = "default_ngram_slots")]
    pub ngram_slots: usize,

    /// Buckets for hashed word frequencies
    #[serde(default = "default_word_buckets")]
    pub word_buckets: usize,

    /// Buckets for hashed word positions; also caps how many tokens are visited
    #[serde(default = "default_position_buckets")]
    pub position_buckets: usize,

    /// Multiplier of the polynomial string hash
    #[serde(default = "default_hash_multiplier")]
    pub hash_multiplier: i64,

    /// Measure the capital-letter ratio over the raw input instead of the
    /// lowercased text (where it is always 0).
    #[serde(default)]
    pub capital_ratio_over_original: bool,
}

impl EmbeddingConfig {
    /// Total vector length: 10 scalar slots plus every hashed region.
    pub fn dimensions(&self) -> usize {
        SCALAR_FEATURES + self.ngram_slots + self.word_buckets + self.position_buckets
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.word_buckets == 0 {
            bail!("embedding.word_buckets must be greater than 0");
        }
        if self.position_buckets == 0 {
            bail!("embedding.position_buckets must be greater than 0");
        }
        if self.hash_multiplier == 0 {
            bail!("embedding.hash_multiplier must not be 0");
        }
        Ok(())
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            ngram_slots: DEFAULT_NGRAM_SLOTS,
            word_buckets: DEFAULT_WORD_BUCKETS,
            position_buckets: DEFAULT_POSITION_BUCKETS,
            hash_multiplier: DEFAULT_HASH_MULTIPLIER,
            capital_ratio_over_original: false,
        }
    }
}

/// Search defaults and ranking policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Default similarity threshold [0.0, 1.0]
    #[serde(default = "default_search_threshold")]
    pub default_threshold: f32,

    /// Score multiplier applied to favorite documents
    #[serde(default = "default_favorite_boost")]
    pub favorite_boost: f32,

    /// How many neighbors a list-all probe asks the store for
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

impl SearchConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.default_limit == 0 {
            bail!("search.default_limit must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.default_threshold) {
            bail!(
                "search.default_threshold must be between 0.0 and 1.0, got {}",
                self.default_threshold
            );
        }
        if !(self.favorite_boost > 0.0) {
            bail!(
                "search.favorite_boost must be greater than 0, got {}",
                self.favorite_boost
            );
        }
        if self.list_limit == 0 {
            bail!("search.list_limit must be greater than 0");
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_SEARCH_LIMIT,
            default_threshold: DEFAULT_SEARCH_THRESHOLD,
            favorite_boost: DEFAULT_FAVORITE_BOOST,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_WEB_LISTEN.to_string(),
        }
    }
}

fn default_ngram_slots() -> usize {
    DEFAULT_NGRAM_SLOTS
}

fn default_word_buckets() -> usize {
    DEFAULT_WORD_BUCKETS
}

fn default_position_buckets() -> usize {
    DEFAULT_POSITION_BUCKETS
}

fn default_hash_multiplier() -> i64 {
    DEFAULT_HASH_MULTIPLIER
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_search_threshold() -> f32 {
    DEFAULT_SEARCH_THRESHOLD
}

fn default_favorite_boost() -> f32 {
    DEFAULT_FAVORITE_BOOST
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn default_web_listen() -> String {
    DEFAULT_WEB_LISTEN.to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub web: WebConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.embedding.validate()?;
        self.search.validate()?;
        if self.web.listen.trim().is_empty() {
            bail!("web.listen must not be empty");
        }
        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("failed to open config directory {base_path}"))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("Writing default config to {base_path}/{CONFIG_FILE}");
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }
}
