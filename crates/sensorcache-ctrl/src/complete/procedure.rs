//! Last phase of the complete update: procedure level data
//!
//! Reads the procedure links written by the offering phase, so it has to run
//! after it. Localized procedure names are resolved here as well, since the
//! procedure set is only known once the offerings are loaded.

use super::i18n::apply_entity_name;
use crate::action::WritableCache;
use crate::gateway::{DataSourceGateway, EntityKind, ProcedureRow, TimeExtremaScope};
use futures::stream::{self, StreamExt};
use sensorcache_common::{Error, Result};
use sensorcache_store::CacheStore;
use std::collections::HashMap;
use tracing::{debug, info};

fn apply_procedure(store: &mut CacheStore, procedure: &str, row: Option<&ProcedureRow>) {
    store.add_procedure(procedure);
    if let Some(row) = row {
        if row.published {
            store.add_published_procedure(procedure);
        }
        if let Some(name) = &row.name {
            store.set_name_for_procedure(procedure, name);
        }
    }

    store.clear_composite_phenomenon_for_procedure(procedure);
    for observable_property in store.get_observable_properties_for_procedure(procedure) {
        for composite in store.get_composite_phenomena_for_observable_property(&observable_property)
        {
            store.add_composite_phenomenon_for_procedure(procedure, &composite);
        }
    }
}

/// Update every known procedure, at most `thread_count` at a time
pub async fn update_procedures(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
    thread_count: usize,
    default_locale: &str,
) -> Result<()> {
    let rows: HashMap<String, ProcedureRow> = gateway
        .fetch_procedures()
        .await?
        .into_iter()
        .map(|row| (row.identifier.clone(), row))
        .collect();

    let mut procedures = cache.read(|store| store.get_procedures().clone());
    procedures.extend(rows.keys().cloned());
    info!(
        "Updating {} procedures with {} concurrent tasks",
        procedures.len(),
        thread_count
    );

    let rows = &rows;
    let tasks: Vec<_> = procedures
        .iter()
        .map(|procedure| async move {
            let extrema = gateway
                .fetch_time_extrema(&TimeExtremaScope::Procedure(procedure.clone()))
                .await?;
            let metadata = gateway
                .fetch_i18n_metadata(EntityKind::Procedure, procedure)
                .await?;
            cache.write(|store| {
                apply_procedure(store, procedure, rows.get(procedure));
                // localized metadata wins over the row name
                if let Some(metadata) = &metadata {
                    apply_entity_name(
                        store,
                        EntityKind::Procedure,
                        procedure,
                        metadata,
                        default_locale,
                    );
                }
                store.set_phenomenon_time_for_procedure(procedure, extrema.phenomenon_time);
            });
            debug!("Updated procedure {}", procedure);
            Ok::<(), Error>(())
        })
        .collect();
    let results: Vec<Result<()>> = stream::iter(tasks)
        .buffer_unordered(thread_count.max(1))
        .collect()
        .await;

    Error::from_errors(results.into_iter().filter_map(Result::err).collect())
}
