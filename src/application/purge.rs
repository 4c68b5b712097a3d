// Namespace purge: delete every key of one namespace.
//
// Responsibilities
// - Discover the namespace's keys with its key pattern.
// - Delete them in one transaction watching exactly those keys.
//
// Concurrency
// - If any discovered key changes before the commit, nothing is deleted and the purge fails.
// - Keys created after discovery are not watched and survive; running the purge again removes them.

use crate::core::errors::{BackendError, EventStoreError};
use crate::core::keys::{Namespace, namespace_pattern};
use crate::core::ports::{CommitOutcome, KeyValueBackend, StagedWrite};
use tracing::{debug, warn};

/// Returns how many keys were removed.
pub async fn purge_namespace(backend: &dyn KeyValueBackend, namespace: &Namespace) -> Result<usize, EventStoreError> {
    let clear_error = |source: BackendError| EventStoreError::Clear {
        namespace: namespace.to_string(),
        source,
    };

    let pattern = namespace_pattern(namespace);
    let keys = backend.scan(&pattern).await.map_err(clear_error)?;
    if keys.is_empty() {
        debug!(%namespace, "nothing to clear");
        return Ok(0);
    }

    let mut tx = backend.watch(&keys).await.map_err(clear_error)?;
    for key in &keys {
        tx.stage(StagedWrite::Delete { key: key.clone() });
    }
    match tx.commit().await.map_err(clear_error)? {
        CommitOutcome::Committed => Ok(keys.len()),
        CommitOutcome::Aborted => {
            warn!(%namespace, keys = keys.len(), "namespace changed while clearing");
            Err(clear_error(BackendError::TransactionAborted))
        }
    }
}
