use crate::action::{CacheUpdate, WritableCache};
use async_trait::async_trait;
use sensorcache_common::{Error, Result};
use tracing::debug;

/// Adds locales to the supported language set
#[derive(Clone, Debug)]
pub struct SupportedLanguagesUpdate {
    locales: Vec<String>,
}

impl SupportedLanguagesUpdate {
    pub fn new<I, S>(locales: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locales: Vec<String> = locales
            .into_iter()
            .map(Into::into)
            .map(|l: String| l.trim().to_string())
            .collect();
        if locales.is_empty() || locales.iter().any(String::is_empty) {
            return Err(Error::invalid_argument("locales must be non-empty"));
        }
        Ok(Self { locales })
    }
}

#[async_trait]
impl CacheUpdate for SupportedLanguagesUpdate {
    fn name(&self) -> &str {
        "SupportedLanguagesUpdate"
    }

    async fn execute(&self, cache: &WritableCache) -> Result<()> {
        cache.write(|store| {
            for locale in &self.locales {
                store.add_supported_language(locale);
            }
        });
        debug!("Added supported languages {:?}", self.locales);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_adds_languages() {
        let cache = WritableCache::default();
        SupportedLanguagesUpdate::new(["ger", " eng "])
            .unwrap()
            .execute(&cache)
            .await
            .unwrap();
        let store = cache.into_inner();
        assert!(store.get_supported_languages().contains("eng"));
        assert_eq!(store.get_supported_languages().len(), 2);
    }

    #[test]
    fn test_rejects_blank_locale() {
        assert!(SupportedLanguagesUpdate::new(["eng", ""]).is_err());
        assert!(SupportedLanguagesUpdate::new(Vec::<String>::new()).is_err());
    }
}
