//! Common types for the object-storage client

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A container, as returned by a JSON account listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Container name
    pub name: String,
    /// Number of objects
    #[serde(default)]
    pub count: u64,
    /// Total size in bytes
    #[serde(default)]
    pub bytes: u64,
}

/// Container metadata from a HEAD request
#[derive(Clone, Debug, Default)]
pub struct ContainerMetadata {
    /// Container name
    pub name: String,
    /// Number of objects
    pub object_count: u64,
    /// Total size in bytes
    pub bytes_used: u64,
    /// User-defined metadata (`X-Container-Meta-*`)
    pub metadata: HashMap<String, String>,
}

/// One entry of a JSON container listing
///
/// Listings with a delimiter mix objects with `{"subdir": ...}` entries.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListingEntry {
    Object(ObjectInfo),
    Subdir { subdir: String },
}

/// An object in a container
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object name
    pub name: String,
    /// MD5 of the content
    #[serde(default)]
    pub hash: String,
    /// Size in bytes
    #[serde(default)]
    pub bytes: u64,
    /// Content type
    #[serde(default)]
    pub content_type: Option<String>,
    /// Last modified time (server-local, no offset)
    #[serde(default)]
    pub last_modified: Option<NaiveDateTime>,
}

/// Options for listing objects
#[derive(Clone, Debug, Default)]
pub struct ListObjectsOptions {
    /// Filter by prefix
    pub prefix: Option<String>,
    /// Delimiter for grouping
    pub delimiter: Option<char>,
    /// Maximum entries to return
    pub limit: Option<usize>,
    /// Start listing after this name
    pub marker: Option<String>,
}

impl ListObjectsOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Only list names starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Group names sharing a prefix up to `delimiter`
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Cap the number of entries
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continue after `marker`
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }
}

/// Result of listing objects
#[derive(Clone, Debug, Default)]
pub struct ListObjectsResult {
    /// Container name
    pub container: String,
    /// Objects matching the query
    pub objects: Vec<ObjectInfo>,
    /// Common prefixes (pseudo-directories)
    pub common_prefixes: Vec<String>,
}

impl ListObjectsResult {
    /// Marker for fetching the next page
    pub fn next_marker(&self) -> Option<&str> {
        self.objects.last().map(|o| o.name.as_str())
    }
}

/// Object metadata sent on upload
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Content type
    pub content_type: Option<String>,
    /// User-defined metadata
    pub user_metadata: HashMap<String, String>,
}

impl ObjectMetadata {
    /// Create new empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set content type
    pub fn with_content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_type = Some(ct.into());
        self
    }

    /// Add user metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }
}

/// Object headers from a HEAD or GET
#[derive(Clone, Debug, Default)]
pub struct ObjectHead {
    /// ETag
    pub etag: String,
    /// Content type
    pub content_type: Option<String>,
    /// Content length
    pub content_length: u64,
    /// User metadata (`X-Object-Meta-*`)
    pub metadata: HashMap<String, String>,
}

/// A downloaded object
#[derive(Clone, Debug)]
pub struct ObjectData {
    /// Object content
    pub data: Bytes,
    /// Object headers
    pub head: ObjectHead,
}
