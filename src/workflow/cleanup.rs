use log::{debug, warn};

use crate::errors::{CleanupError, StorageError};
use crate::identity::ArtifactNames;
use crate::storage::BlobStore;

/// Delete both staged artifacts
///
/// Both deletions are always attempted. An object that is already gone counts
/// as deleted; any other failure is reported.
pub async fn cleanup(store: &dyn BlobStore, names: &ArtifactNames) -> Result<(), CleanupError> {
    let source_failure = delete_staged(store, &names.source)
        .await
        .err()
        .map(|e| (names.source.clone(), e));
    let destination_failure = delete_staged(store, &names.destination)
        .await
        .err()
        .map(|e| (names.destination.clone(), e));

    if source_failure.is_none() && destination_failure.is_none() {
        return Ok(());
    }

    Err(CleanupError {
        source_failure,
        destination_failure,
    })
}

async fn delete_staged(store: &dyn BlobStore, name: &str) -> Result<(), StorageError> {
    match store.delete(name).await {
        Ok(()) => {
            debug!("Deleted staged object '{}'", name);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!("Staged object '{}' already absent", name);
            Ok(())
        }
        Err(e) => {
            warn!("Failed to delete staged object '{}': {}", name, e);
            Err(e)
        }
    }
}
