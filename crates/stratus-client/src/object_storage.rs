//! Object-storage client built on the transport client and identity catalog

use crate::client::{RequestOptions, TransportClient};
use crate::identity::IdentityService;
use crate::types::*;
use bytes::Bytes;
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use stratus_core::{Error, Message, Method, Response, Result, Url, AUTH_TOKEN_HEADER};
use tracing::{debug, instrument};

/// Catalog type of the object-storage service
pub const OBJECT_STORE_SERVICE: &str = "object-store";

/// Client for a Swift-style object store
pub struct ObjectStorage {
    url: Url,
    token: String,
    client: Arc<TransportClient>,
}

impl ObjectStorage {
    /// Create a client for the storage account at `url`
    pub fn new(url: Url, token: impl Into<String>, client: Arc<TransportClient>) -> Self {
        Self {
            url,
            token: token.into(),
            client,
        }
    }

    /// Discover the storage endpoint from an authenticated identity service
    pub fn from_identity(identity: &IdentityService, region: Option<&str>) -> Result<Self> {
        if identity.is_expired() {
            return Err(Error::authentication("identity token is missing or expired"));
        }
        let token = identity
            .token()
            .ok_or_else(|| Error::authentication("identity service has no token"))?;
        let url = identity.public_url(OBJECT_STORE_SERVICE, region)?;
        Ok(Self::new(url, token, Arc::clone(identity.client())))
    }

    /// Storage account URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    // ==================== Container Operations ====================

    /// List all containers
    #[instrument(skip(self))]
    pub async fn containers(&self) -> Result<Vec<ContainerInfo>> {
        let mut url = self.url.clone();
        url.add_query([("format", "json")]);

        let response = self.request(Method::Get, url, None, &[]).await?;
        if is_empty_listing(&response) {
            return Ok(Vec::new());
        }
        response.json_as()
    }

    /// Create a container
    #[instrument(skip(self))]
    pub async fn create_container(&self, container: &str) -> Result<()> {
        let url = self.container_url(container)?;
        self.request(Method::Put, url, None, &[]).await?;
        Ok(())
    }

    /// Delete an empty container
    #[instrument(skip(self))]
    pub async fn delete_container(&self, container: &str) -> Result<()> {
        let url = self.container_url(container)?;
        self.request(Method::Delete, url, None, &[]).await?;
        Ok(())
    }

    /// Check if a container exists
    #[instrument(skip(self))]
    pub async fn has_container(&self, container: &str) -> Result<bool> {
        match self.container(container).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fetch container metadata; a missing container is an error
    #[instrument(skip(self))]
    pub async fn container(&self, container: &str) -> Result<ContainerMetadata> {
        let url = self.container_url(container)?;
        let response = self.request(Method::Head, url, None, &[]).await?;
        let headers = response.headers();

        Ok(ContainerMetadata {
            name: container.to_string(),
            object_count: header_u64(headers, "X-Container-Object-Count"),
            bytes_used: header_u64(headers, "X-Container-Bytes-Used"),
            metadata: prefixed_headers(headers, "x-container-meta-"),
        })
    }

    // ==================== Object Operations ====================

    /// List objects in a container
    #[instrument(skip(self))]
    pub async fn objects(
        &self,
        container: &str,
        options: &ListObjectsOptions,
    ) -> Result<ListObjectsResult> {
        let mut url = self.container_url(container)?;
        let mut query = vec![("format", "json".to_string())];

        if let Some(prefix) = &options.prefix {
            query.push(("prefix", prefix.clone()));
        }
        if let Some(delimiter) = options.delimiter {
            query.push(("delimiter", delimiter.to_string()));
        }
        if let Some(limit) = options.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(marker) = &options.marker {
            query.push(("marker", marker.clone()));
        }
        url.add_query(query);

        let response = self.request(Method::Get, url, None, &[]).await?;
        let mut result = ListObjectsResult {
            container: container.to_string(),
            ..Default::default()
        };
        if is_empty_listing(&response) {
            return Ok(result);
        }

        for entry in response.json_as::<Vec<ListingEntry>>()? {
            match entry {
                ListingEntry::Object(info) => result.objects.push(info),
                ListingEntry::Subdir { subdir } => result.common_prefixes.push(subdir),
            }
        }
        debug!(
            objects = result.objects.len(),
            prefixes = result.common_prefixes.len(),
            "listed container"
        );
        Ok(result)
    }

    /// Upload an object; returns its ETag
    #[instrument(skip(self, data, metadata))]
    pub async fn save_object(
        &self,
        container: &str,
        name: &str,
        data: impl Into<Bytes>,
        metadata: Option<&ObjectMetadata>,
    ) -> Result<String> {
        let url = self.object_url(container, name)?;

        let mut headers = Vec::new();
        if let Some(meta) = metadata {
            if let Some(ct) = &meta.content_type {
                headers.push(("Content-Type".to_string(), ct.clone()));
            }
            for (k, v) in &meta.user_metadata {
                headers.push((format!("X-Object-Meta-{k}"), v.clone()));
            }
        }

        let response = self
            .request(Method::Put, url, Some(data.into()), &headers)
            .await?;
        Ok(etag(response.headers()))
    }

    /// Download an object
    #[instrument(skip(self))]
    pub async fn object(&self, container: &str, name: &str) -> Result<ObjectData> {
        let url = self.object_url(container, name)?;
        let response = self.request(Method::Get, url, None, &[]).await?;

        Ok(ObjectData {
            head: object_head(response.headers()),
            data: response.body().clone(),
        })
    }

    /// Fetch object headers without the content
    #[instrument(skip(self))]
    pub async fn object_info(&self, container: &str, name: &str) -> Result<ObjectHead> {
        let url = self.object_url(container, name)?;
        let response = self.request(Method::Head, url, None, &[]).await?;
        Ok(object_head(response.headers()))
    }

    /// Check if an object exists
    #[instrument(skip(self))]
    pub async fn has_object(&self, container: &str, name: &str) -> Result<bool> {
        match self.object_info(container, name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete an object
    #[instrument(skip(self))]
    pub async fn delete_object(&self, container: &str, name: &str) -> Result<()> {
        let url = self.object_url(container, name)?;
        self.request(Method::Delete, url, None, &[]).await?;
        Ok(())
    }

    /// Server-side copy of an object
    #[instrument(skip(self))]
    pub async fn copy_object(
        &self,
        source_container: &str,
        source_name: &str,
        dest_container: &str,
        dest_name: &str,
    ) -> Result<()> {
        let url = self.object_url(source_container, source_name)?;
        let destination = format!(
            "/{}/{}",
            encode_segment(dest_container)?,
            encode_object_name(dest_name)?
        );

        self.request(
            Method::Copy,
            url,
            None,
            &[("Destination".to_string(), destination)],
        )
        .await?;
        Ok(())
    }

    // ==================== Helper Methods ====================

    fn container_url(&self, container: &str) -> Result<Url> {
        Ok(self.url.join_path(&encode_segment(container)?))
    }

    fn object_url(&self, container: &str, name: &str) -> Result<Url> {
        let mut url = self.container_url(container)?;
        // Empty segments are part of the name ("dir/" markers, "a//b")
        for segment in encode_object_name(name)?.split('/') {
            url.push_segment(segment)?;
        }
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
        headers: &[(String, String)],
    ) -> Result<Response> {
        let options = headers
            .iter()
            .fold(
                RequestOptions::new().header(AUTH_TOKEN_HEADER, self.token.as_str()),
                |options, (k, v)| options.header(k.as_str(), v.as_str()),
            );
        let request = self.client.create_request(method, url, body, &options)?;
        self.client.send_checked(&request).await
    }
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("url", &self.url.without_credentials().to_string())
            .finish_non_exhaustive()
    }
}

fn encode_segment(segment: &str) -> Result<String> {
    if segment.is_empty() || segment.contains('/') {
        return Err(Error::InvalidArgument(format!(
            "invalid container name '{segment}'"
        )));
    }
    Ok(urlencoding::encode(segment).into_owned())
}

fn encode_object_name(name: &str) -> Result<String> {
    if name.trim_matches('/').is_empty() {
        return Err(Error::InvalidArgument(format!("invalid object name '{name}'")));
    }
    Ok(name
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

fn is_empty_listing(response: &Response) -> bool {
    response.status_code() == 204 || response.body().iter().all(u8::is_ascii_whitespace)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    header_str(headers, name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn etag(headers: &HeaderMap) -> String {
    header_str(headers, "ETag")
        .map(|s| s.trim_matches('"').to_string())
        .unwrap_or_default()
}

fn prefixed_headers(headers: &HeaderMap, prefix: &str) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(prefix)?;
            Some((key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect()
}

fn object_head(headers: &HeaderMap) -> ObjectHead {
    ObjectHead {
        etag: etag(headers),
        content_type: header_str(headers, "Content-Type").map(str::to_string),
        content_length: header_u64(headers, "Content-Length"),
        metadata: prefixed_headers(headers, "x-object-meta-"),
    }
}
