//! Store configuration.

/// Tuning knobs for the campaign store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key the whole collection is persisted under.
    pub storage_key: String,
    /// New campaigns are named `"{name_prefix} #{n}"`, n = collection size + 1.
    pub name_prefix: String,
    /// Appended to the name of a cloned campaign.
    pub copy_suffix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: "campaigns".to_string(),
            name_prefix: "New campaign".to_string(),
            copy_suffix: " (copy)".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub(crate) fn default_name(&self, index: usize) -> String {
        format!("{} #{}", self.name_prefix, index)
    }

    /// Key a stored collection that could not be read in full is copied to.
    pub fn backup_key(&self) -> String {
        format!("{}.corrupt", self.storage_key)
    }

    pub(crate) fn copy_name(&self, original: &str) -> String {
        format!("{original}{}", self.copy_suffix)
    }
}
