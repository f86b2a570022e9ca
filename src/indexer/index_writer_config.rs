use serde::{Deserialize, Serialize};

use crate::{ScrivenerError, MAX_DOCS};

/// Smallest memory budget accepted.
pub const MEMORY_BUDGET_MIN: usize = 1_000_000;
/// Default memory budget shared by all the buffers of an index writer.
pub const MEMORY_BUDGET_DEFAULT: usize = 16_000_000;
/// Default per buffer hard limit.
pub const PER_BUFFER_HARD_LIMIT_DEFAULT: usize = 1_945 * 1024 * 1024;
/// A buffer addresses its arena with `u32` offsets.
pub const ARENA_ADDRESS_SPACE: usize = u32::MAX as usize;

/// Configuration of an [`IndexWriter`](super::IndexWriter).
///
/// It can be loaded from JSON. Missing fields take their default value:
///
/// ```rust
/// use scrivener::indexer::IndexWriterConfig;
///
/// let config = IndexWriterConfig::from_json_str(r#"{"max_buffered_docs": 10000}"#).unwrap();
/// assert_eq!(config.max_buffered_docs, Some(10_000));
/// assert_eq!(config.memory_budget_in_bytes, Some(16_000_000));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexWriterConfig {
    /// A buffer is marked flush-pending once it holds that many documents.
    /// `None` disables the trigger.
    pub max_buffered_docs: Option<u32>,
    /// When the buffers and the delete log use more memory than that, the
    /// largest buffer is marked flush-pending. `None` disables the trigger.
    pub memory_budget_in_bytes: Option<usize>,
    /// A buffer using more memory than that is marked flush-pending,
    /// whatever the triggers say.
    pub per_buffer_hard_limit_in_bytes: usize,
    /// Maximum number of documents in the index.
    pub max_docs: u64,
    /// Documents get reordered when a buffer is sealed. Sealing then
    /// requires a [`DocIdMapping`](super::DocIdMapping).
    pub reorder_on_seal: bool,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            max_buffered_docs: None,
            memory_budget_in_bytes: Some(MEMORY_BUDGET_DEFAULT),
            per_buffer_hard_limit_in_bytes: PER_BUFFER_HARD_LIMIT_DEFAULT,
            max_docs: MAX_DOCS,
            reorder_on_seal: false,
        }
    }
}

impl IndexWriterConfig {
    /// Parses a JSON configuration.
    pub fn from_json_str(json: &str) -> crate::Result<IndexWriterConfig> {
        let config: IndexWriterConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    // Ensures the `IndexWriterConfig` is correct.
    //
    // This method checks that the values in the `IndexWriterConfig`
    // are valid, and returns an error with an explicit error message otherwise.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_buffered_docs.is_none() && self.memory_budget_in_bytes.is_none() {
            return Err(ScrivenerError::InvalidArgument(
                "at least one of max_buffered_docs and memory_budget_in_bytes must be set"
                    .to_string(),
            ));
        }
        if let Some(max_buffered_docs) = self.max_buffered_docs {
            if max_buffered_docs < 2 {
                return Err(ScrivenerError::InvalidArgument(format!(
                    "max_buffered_docs must be at least 2, got {max_buffered_docs}"
                )));
            }
        }
        if let Some(memory_budget) = self.memory_budget_in_bytes {
            if memory_budget < MEMORY_BUDGET_MIN {
                return Err(ScrivenerError::InvalidArgument(format!(
                    "The memory budget needs to be at least {MEMORY_BUDGET_MIN}, got \
                     {memory_budget}."
                )));
            }
            if memory_budget >= ARENA_ADDRESS_SPACE {
                return Err(ScrivenerError::InvalidArgument(format!(
                    "The memory budget cannot exceed {ARENA_ADDRESS_SPACE}, got {memory_budget}."
                )));
            }
        }
        if self.per_buffer_hard_limit_in_bytes >= ARENA_ADDRESS_SPACE {
            return Err(ScrivenerError::InvalidArgument(format!(
                "The per buffer hard limit must be below {ARENA_ADDRESS_SPACE}, got {}.",
                self.per_buffer_hard_limit_in_bytes
            )));
        }
        if self.max_docs == 0 || self.max_docs > MAX_DOCS {
            return Err(ScrivenerError::InvalidArgument(format!(
                "max_docs must be within [1, {MAX_DOCS}], got {}",
                self.max_docs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_writer_config_default_is_valid() {
        assert!(IndexWriterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_index_writer_config_no_trigger() {
        let config = IndexWriterConfig {
            max_buffered_docs: None,
            memory_budget_in_bytes: None,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScrivenerError::InvalidArgument(msg)) if msg.contains("at least one")
        ));
    }

    #[test]
    fn test_index_writer_config_not_enough_memory() {
        let config = IndexWriterConfig {
            memory_budget_in_bytes: Some(MEMORY_BUDGET_MIN - 1),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScrivenerError::InvalidArgument(msg)) if msg.contains("needs to be at least")
        ));
    }

    #[test]
    fn test_index_writer_config_too_much_memory() {
        let config = IndexWriterConfig {
            per_buffer_hard_limit_in_bytes: ARENA_ADDRESS_SPACE,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_index_writer_config_max_docs() {
        for max_docs in [0, MAX_DOCS + 1] {
            let config = IndexWriterConfig {
                max_docs,
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
        let config = IndexWriterConfig {
            max_buffered_docs: Some(1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_index_writer_config_from_json() {
        let json = r#"{
            "max_buffered_docs": 100,
            "memory_budget_in_bytes": null,
            "reorder_on_seal": true
        }"#;
        let config = IndexWriterConfig::from_json_str(json).unwrap();
        assert_eq!(config.max_buffered_docs, Some(100));
        assert_eq!(config.memory_budget_in_bytes, None);
        assert!(config.reorder_on_seal);
        assert_eq!(config.max_docs, MAX_DOCS);
        assert!(config.validate().is_ok());
        assert!(matches!(
            IndexWriterConfig::from_json_str(r#"{"heap_size": 3}"#),
            Err(ScrivenerError::Deserialize(_))
        ));
    }
}
