use std::fmt;
use std::path::Path;
use uuid::Uuid;

// @module: Job identities and staged artifact naming

/// Opaque identifier minted once per translation job
///
/// Rendered as 32 lowercase hex characters with no separators, so it can be
/// embedded directly in object names and URL paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobIdentity(String);

impl JobIdentity {
    /// Mint a fresh identity from a random (v4) UUID
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The identity as it appears in object names
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object names of the two artifacts staged for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    /// Name of the uploaded source document
    pub source: String,
    /// Name the translation service writes the result to
    pub destination: String,
}

impl ArtifactNames {
    /// Derive artifact names from a job identity and a file base name
    pub fn derive(job: &JobIdentity, file_name: &str) -> Self {
        Self {
            source: format!("{}-{}", job, file_name),
            destination: format!("{}-translated-{}", job, file_name),
        }
    }

    /// Derive artifact names from the final component of a local path
    pub fn for_path<P: AsRef<Path>>(job: &JobIdentity, path: P) -> Self {
        let file_name = path
            .as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::derive(job, &file_name)
    }
}
