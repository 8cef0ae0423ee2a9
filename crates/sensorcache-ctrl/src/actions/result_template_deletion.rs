use crate::action::{CacheUpdate, WritableCache};
use async_trait::async_trait;
use sensorcache_common::{Error, Result};
use sensorcache_store::IdSet;
use tracing::debug;

/// Forgets deleted result templates and their links
#[derive(Clone, Debug)]
pub struct ResultTemplateDeletion {
    templates: IdSet,
}

impl ResultTemplateDeletion {
    pub fn new<I, S>(templates: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let templates: IdSet = templates.into_iter().map(Into::into).collect();
        if templates.is_empty() {
            return Err(Error::invalid_argument("no result templates to delete"));
        }
        Ok(Self { templates })
    }
}

#[async_trait]
impl CacheUpdate for ResultTemplateDeletion {
    fn name(&self) -> &str {
        "ResultTemplateDeletion"
    }

    fn identifiers(&self) -> IdSet {
        self.templates.clone()
    }

    async fn execute(&self, cache: &WritableCache) -> Result<()> {
        cache.write(|store| {
            for template in &self.templates {
                store.remove_offerings_for_result_template(template);
                store.remove_observable_properties_for_result_template(template);
                store.remove_features_of_interest_for_result_template(template);
            }
            store.remove_result_templates(&self.templates);
        });
        debug!("Deleted {} result templates", self.templates.len());
        Ok(())
    }
}
