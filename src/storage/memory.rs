/*!
 * In-memory object store.
 *
 * Keeps objects in a map and records every call, so tests can check exactly
 * which operations a workflow performed. Failures can be injected per
 * operation, and objects can be scheduled to appear only after a number of
 * unsuccessful reads to simulate a remote writer.
 */

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::{SigningError, StorageError};
use crate::storage::{BlobStore, Permissions, SignedAccessGrant, SignedScope};

/// A call received by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put(String),
    Get(String),
    Delete(String),
    Sign(SignedScope),
}

#[derive(Debug)]
struct PendingObject {
    misses_left: u32,
    data: Bytes,
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Bytes>,
    pending: HashMap<String, PendingObject>,
    calls: Vec<StoreCall>,
    fail_puts: bool,
    fail_gets: bool,
    fail_delete: Option<fn(&str) -> bool>,
    signing_failure: Option<SigningError>,
}

/// Object store backed by a hash map
#[derive(Debug)]
pub struct InMemoryBlobStore {
    container: String,
    state: Mutex<StoreState>,
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("documents")
    }
}

impl InMemoryBlobStore {
    /// Create an empty store for the named container
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Store an object directly, without recording a call
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.state.lock().objects.insert(name.into(), data.into());
    }

    /// Make `name` readable only after `misses` reads have failed with `NotFound`
    pub fn publish_after(&self, name: impl Into<String>, data: impl Into<Bytes>, misses: u32) {
        self.state.lock().pending.insert(
            name.into(),
            PendingObject {
                misses_left: misses,
                data: data.into(),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().objects.contains_key(name)
    }

    /// Names of the stored objects, sorted
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().objects.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    /// Names passed to `delete`, in order
    pub fn deleted_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Delete(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Number of `get` calls received
    pub fn get_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, StoreCall::Get(_)))
            .count()
    }

    /// Make every `put` fail
    pub fn fail_puts(&self) {
        self.state.lock().fail_puts = true;
    }

    /// Make every `get` fail with a transport error
    pub fn fail_gets(&self) {
        self.state.lock().fail_gets = true;
    }

    /// Make `delete` fail for names matching `predicate`
    pub fn fail_deletes_when(&self, predicate: fn(&str) -> bool) {
        self.state.lock().fail_delete = Some(predicate);
    }

    /// Make every `sign` fail with `error`
    pub fn fail_signing(&self, error: SigningError) {
        self.state.lock().signing_failure = Some(error);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Put(name.to_string()));
        if state.fail_puts {
            return Err(StorageError::RequestFailed(format!("Injected upload failure for '{}'", name)));
        }
        state.objects.insert(name.to_string(), data);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StorageError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Get(name.to_string()));
        if state.fail_gets {
            return Err(StorageError::RequestFailed(format!("Injected download failure for '{}'", name)));
        }
        if let Some(data) = state.objects.get(name) {
            return Ok(data.clone());
        }

        let ready = match state.pending.get_mut(name) {
            Some(pending) if pending.misses_left > 0 => {
                pending.misses_left -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if ready {
            if let Some(pending) = state.pending.remove(name) {
                state.objects.insert(name.to_string(), pending.data.clone());
                return Ok(pending.data);
            }
        }

        Err(StorageError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Delete(name.to_string()));
        if state.fail_delete.is_some_and(|predicate| predicate(name)) {
            return Err(StorageError::ApiError {
                status_code: 500,
                message: format!("Injected delete failure for '{}'", name),
            });
        }
        state.pending.remove(name);
        match state.objects.remove(name) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(name.to_string())),
        }
    }

    fn sign(
        &self,
        scope: SignedScope,
        permissions: Permissions,
        expiry: Duration,
    ) -> Result<SignedAccessGrant, SigningError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Sign(scope.clone()));
        if let Some(error) = &state.signing_failure {
            return Err(error.clone());
        }
        if permissions.is_empty() {
            return Err(SigningError::InvalidRequest("permission set is empty".to_string()));
        }

        let lifetime = chrono::Duration::from_std(expiry)
            .map_err(|e| SigningError::InvalidRequest(format!("invalid expiry: {}", e)))?;
        let resource_url = match &scope {
            SignedScope::Container => format!("https://memory.blob.local/{}", self.container),
            SignedScope::Object(name) => format!("https://memory.blob.local/{}/{}", self.container, name),
        };
        let query = format!("sp={}&sig=in-memory", permissions.as_sas_string());

        Ok(SignedAccessGrant {
            url: format!("{}?{}", resource_url, query),
            query,
            resource_url,
            expires_at: Utc::now() + lifetime,
            permissions,
            scope,
        })
    }
}
