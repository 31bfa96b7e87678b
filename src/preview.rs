//! Preview URL builder for files held in the hosted storage service.

use anyhow::Context;
use url::Url;

use crate::cache::{ImageCacheKeyParams, UrlGenerator};

/// Builds `{endpoint}/storage/buckets/{bucket}/files/{file}/preview` URLs
/// with the rendering options as query parameters.
#[derive(Debug, Clone)]
pub struct PreviewUrlBuilder {
    endpoint: Url,
    project_id: String,
}

impl PreviewUrlBuilder {
    pub fn new(endpoint: &str, project_id: impl Into<String>) -> anyhow::Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("Invalid preview endpoint: {}", endpoint))?;
        if endpoint.cannot_be_a_base() {
            anyhow::bail!("Preview endpoint cannot be a base URL: {}", endpoint);
        }
        Ok(Self {
            endpoint,
            project_id: project_id.into(),
        })
    }
}

impl UrlGenerator for PreviewUrlBuilder {
    fn generate(&self, params: &ImageCacheKeyParams) -> anyhow::Result<String> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Preview endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend([
                "storage",
                "buckets",
                params.bucket_id.as_str(),
                "files",
                params.file_id.as_str(),
                "preview",
            ]);

        {
            let mut query = url.query_pairs_mut();
            if !self.project_id.is_empty() {
                query.append_pair("project", &self.project_id);
            }
            if let Some(width) = params.width {
                query.append_pair("width", &width.to_string());
            }
            if let Some(height) = params.height {
                query.append_pair("height", &height.to_string());
            }
            query.append_pair("gravity", params.gravity.as_str());
            if let Some(quality) = params.quality {
                query.append_pair("quality", &quality.to_string());
            }
        }

        Ok(url.into())
    }
}
