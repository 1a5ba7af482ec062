/*!
 * Shared Access Signature signing for Azure Blob Storage.
 *
 * Grants are service SAS tokens signed with the storage account key
 * (HMAC-SHA256 over the canonical string-to-sign). Every grant is HTTPS-only
 * and is minted with a fresh timestamp; nothing is cached between calls.
 */

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use url::Url;
use url::form_urlencoded;

use crate::errors::SigningError;

/// Storage service version the signature is computed for
pub const SAS_VERSION: &str = "2021-08-06";

/// Default lifetime of the grants handed to the translation service
pub const DEFAULT_GRANT_EXPIRY: Duration = Duration::from_secs(48 * 60 * 60);

/// Set of permissions carried by a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub read: bool,
    pub add: bool,
    pub create: bool,
    pub write: bool,
    pub delete: bool,
    pub list: bool,
}

impl Permissions {
    /// Read and write on a whole container
    pub fn container_default() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }

    /// Add, read, write and list on a single object
    pub fn object_default() -> Self {
        Self {
            add: true,
            read: true,
            write: true,
            list: true,
            ..Self::default()
        }
    }

    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Self::default()
        }
    }

    pub fn delete_only() -> Self {
        Self {
            delete: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Permission letters in the order the service expects (`racwdl`)
    pub fn as_sas_string(&self) -> String {
        [
            (self.read, 'r'),
            (self.add, 'a'),
            (self.create, 'c'),
            (self.write, 'w'),
            (self.delete, 'd'),
            (self.list, 'l'),
        ]
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, letter)| *letter)
        .collect()
    }
}

/// What a grant gives access to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedScope {
    /// Every object in the configured container
    Container,
    /// One named object
    Object(String),
}

impl SignedScope {
    fn resource_code(&self) -> &'static str {
        match self {
            Self::Container => "c",
            Self::Object(_) => "b",
        }
    }
}

/// A time-limited signed URL
#[derive(Debug, Clone, PartialEq)]
pub struct SignedAccessGrant {
    /// Full URL including the signature query
    pub url: String,
    /// The signature query alone, without the leading `?`
    pub query: String,
    /// URL of the granted resource without any query
    pub resource_url: String,
    /// Moment the grant stops being valid
    pub expires_at: DateTime<Utc>,
    pub permissions: Permissions,
    pub scope: SignedScope,
}

impl SignedAccessGrant {
    /// URL of an object inside a container grant, carrying this grant's signature
    ///
    /// Returns `None` for object-scoped grants, which cannot be reused for other objects.
    pub fn object_url(&self, object_name: &str) -> Option<String> {
        if self.scope != SignedScope::Container {
            return None;
        }
        let mut url = Url::parse(&self.resource_url).ok()?;
        url.path_segments_mut().ok()?.pop_if_empty().push(object_name);
        url.set_query(Some(&self.query));
        Some(url.to_string())
    }
}

/// Storage account name and decoded account key
#[derive(Clone)]
pub struct SharedKeyCredential {
    account_name: String,
    key: Vec<u8>,
}

impl SharedKeyCredential {
    /// Create a credential from an account name and its base64 account key
    pub fn new(account_name: impl Into<String>, account_key: &str) -> Result<Self, SigningError> {
        let account_name = account_name.into();
        if account_name.trim().is_empty() {
            return Err(SigningError::InvalidCredential("account name is empty".to_string()));
        }
        if account_key.trim().is_empty() {
            return Err(SigningError::InvalidCredential("account key is empty".to_string()));
        }
        let key = STANDARD
            .decode(account_key.trim())
            .map_err(|e| SigningError::InvalidCredential(format!("account key is not valid base64: {}", e)))?;

        Ok(Self { account_name, key })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Base64 HMAC-SHA256 of `string_to_sign` under the account key
    fn compute_hmac(&self, string_to_sign: &str) -> Result<String, SigningError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .map_err(|e| SigningError::InvalidCredential(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account_name", &self.account_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Issues signed URLs for one container
#[derive(Debug, Clone)]
pub struct SasSigner {
    credential: SharedKeyCredential,
    container: String,
    endpoint_suffix: String,
}

impl SasSigner {
    pub fn new(
        credential: SharedKeyCredential,
        container: impl Into<String>,
        endpoint_suffix: impl Into<String>,
    ) -> Self {
        Self {
            credential,
            container: container.into(),
            endpoint_suffix: endpoint_suffix.into(),
        }
    }

    /// Public HTTPS URL of the container
    pub fn container_url(&self) -> String {
        format!(
            "https://{}.blob.{}/{}",
            self.credential.account_name(),
            self.endpoint_suffix,
            self.container
        )
    }

    /// Issue a grant valid for `expiry` from now
    pub fn sign(
        &self,
        scope: SignedScope,
        permissions: Permissions,
        expiry: Duration,
    ) -> Result<SignedAccessGrant, SigningError> {
        self.sign_at(scope, permissions, expiry, Utc::now())
    }

    /// Issue a grant valid for `expiry` from `issued_at`
    pub fn sign_at(
        &self,
        scope: SignedScope,
        permissions: Permissions,
        expiry: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<SignedAccessGrant, SigningError> {
        if permissions.is_empty() {
            return Err(SigningError::InvalidRequest("permission set is empty".to_string()));
        }
        if self.container.trim().is_empty() {
            return Err(SigningError::InvalidRequest("container name is empty".to_string()));
        }
        if let SignedScope::Object(name) = &scope {
            if name.is_empty() {
                return Err(SigningError::InvalidRequest("object name is empty".to_string()));
            }
        }

        let lifetime = chrono::Duration::from_std(expiry)
            .map_err(|e| SigningError::InvalidRequest(format!("invalid expiry: {}", e)))?;
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .ok_or_else(|| SigningError::InvalidRequest("expiry is out of range".to_string()))?;

        let signed_permissions = permissions.as_sas_string();
        let signed_expiry = expires_at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let string_to_sign = self.string_to_sign(&scope, &signed_permissions, &signed_expiry);
        let signature = self.credential.compute_hmac(&string_to_sign)?;

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("sv", SAS_VERSION)
            .append_pair("spr", "https")
            .append_pair("se", &signed_expiry)
            .append_pair("sr", scope.resource_code())
            .append_pair("sp", &signed_permissions)
            .append_pair("sig", &signature)
            .finish();

        let resource_url = match &scope {
            SignedScope::Container => self.container_url(),
            SignedScope::Object(name) => {
                let mut url = Url::parse(&self.container_url())
                    .map_err(|e| SigningError::InvalidRequest(e.to_string()))?;
                url.path_segments_mut()
                    .map_err(|_| SigningError::InvalidRequest("container URL cannot hold a path".to_string()))?
                    .push(name);
                url.to_string()
            }
        };

        Ok(SignedAccessGrant {
            url: format!("{}?{}", resource_url, query),
            query,
            resource_url,
            expires_at,
            permissions,
            scope,
        })
    }

    /// Canonical string-to-sign for a blob service SAS
    pub(crate) fn string_to_sign(&self, scope: &SignedScope, permissions: &str, expiry: &str) -> String {
        let canonicalized_resource = match scope {
            SignedScope::Container => {
                format!("/blob/{}/{}", self.credential.account_name(), self.container)
            }
            SignedScope::Object(name) => {
                format!("/blob/{}/{}/{}", self.credential.account_name(), self.container, name)
            }
        };

        [
            permissions,
            "", // signed start
            expiry,
            &canonicalized_resource,
            "", // signed identifier
            "", // signed IP
            "https",
            SAS_VERSION,
            scope.resource_code(),
            "", // snapshot time
            "", // encryption scope
            "", // rscc
            "", // rscd
            "", // rsce
            "", // rscl
            "", // rsct
        ]
        .join("\n")
    }
}

/// Replace the signature of a signed URL so it can be logged
pub fn redact_signature(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == "sig" { "REDACTED".to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();
    if pairs.is_empty() {
        return url.to_string();
    }
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
