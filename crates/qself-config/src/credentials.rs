use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

const GOODREADS_KEY: &str = "goodreads_key";
const TWITTER_BEARER_TOKEN: &str = "twitter_bearer_token";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: BTreeMap<String, String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: BTreeMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: BTreeMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;
            let creds_data: CredentialsData = toml::from_str(&content)
                .with_context(|| format!("Failed to parse credentials in {}", self.path.display()))?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Overlay `GOODREADS_KEY` and `TWITTER_BEARER_TOKEN` from the process
    /// environment. Overrides live in memory only until `save` is called.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (env_key, key) in [("GOODREADS_KEY", GOODREADS_KEY), ("TWITTER_BEARER_TOKEN", TWITTER_BEARER_TOKEN)] {
            if let Some(value) = lookup(env_key).filter(|v| !v.is_empty()) {
                self.set(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_goodreads_key(&self) -> Option<&String> {
        self.get(GOODREADS_KEY)
    }

    pub fn set_goodreads_key(&mut self, key: String) {
        self.set(GOODREADS_KEY.to_string(), key);
    }

    pub fn get_twitter_bearer_token(&self) -> Option<&String> {
        self.get(TWITTER_BEARER_TOKEN)
    }

    pub fn set_twitter_bearer_token(&mut self, token: String) {
        self.set(TWITTER_BEARER_TOKEN.to_string(), token);
    }

    pub fn get_all_keys(&self) -> Vec<String> {
        self.credentials.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_goodreads_key("gr_key".to_string());
        store.set_twitter_bearer_token("bearer".to_string());
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        assert_eq!(loaded_store.get_goodreads_key(), Some(&"gr_key".to_string()));
        assert_eq!(loaded_store.get_twitter_bearer_token(), Some(&"bearer".to_string()));
    }

    #[test]
    fn test_credential_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CredentialStore::new(dir.path().join("credentials.toml"));
        store.load().unwrap();
        assert!(store.get_all_keys().is_empty());
    }

    #[test]
    fn test_env_overrides_replace_stored_values() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        store.set_goodreads_key("from_file".to_string());
        store.set_twitter_bearer_token("from_file".to_string());

        let env: HashMap<&str, &str> = [("GOODREADS_KEY", "from_env"), ("TWITTER_BEARER_TOKEN", "")]
            .into_iter()
            .collect();
        store.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(store.get_goodreads_key(), Some(&"from_env".to_string()));
        // Empty values don't clobber
        assert_eq!(store.get_twitter_bearer_token(), Some(&"from_file".to_string()));
    }

    #[test]
    fn test_credential_store_remove() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        store.set("key1".to_string(), "value1".to_string());
        store.set("key2".to_string(), "value2".to_string());

        store.remove("key1");
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.get("key2"), Some(&"value2".to_string()));
    }
}
