/*!
 * Object storage used to stage documents for the translation service.
 *
 * This module contains the storage abstraction and its implementations:
 * - `azure`: Azure Blob Storage REST client
 * - `memory`: In-process store for tests and dry runs
 * - `sas`: Shared Access Signature signing
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::{SigningError, StorageError};

pub mod azure;
pub mod memory;
pub mod sas;

pub use sas::{Permissions, SignedAccessGrant, SignedScope};

/// Common trait for object storage backends
///
/// Implementations must report a missing object as `StorageError::NotFound`
/// so callers can tell absence apart from transport failures.
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// Store `data` under `name`, replacing any existing object
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StorageError>;

    /// Fetch the object stored under `name`
    async fn get(&self, name: &str) -> Result<Bytes, StorageError>;

    /// Delete the object stored under `name`
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Issue a time-limited signed URL for `scope`
    fn sign(
        &self,
        scope: SignedScope,
        permissions: Permissions,
        expiry: Duration,
    ) -> Result<SignedAccessGrant, SigningError>;
}
