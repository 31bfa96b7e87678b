//! Request DTOs for the diagnostics API
//!
//! Defines the query strings accepted by the endpoints.

use serde::Deserialize;

use crate::cache::{Gravity, ImageCacheKeyParams};

/// Query for GET /images/preview
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewQuery {
    /// Bucket holding the file
    #[serde(default)]
    pub bucket: String,
    /// File id within the bucket
    #[serde(default)]
    pub file: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub gravity: Gravity,
    pub quality: Option<u8>,
}

impl PreviewQuery {
    /// Converts into cache key parameters.
    pub fn into_params(self) -> ImageCacheKeyParams {
        ImageCacheKeyParams {
            bucket_id: self.bucket,
            file_id: self.file,
            width: self.width,
            height: self.height,
            gravity: self.gravity,
            quality: self.quality,
        }
    }
}

/// Query for DELETE /cache/data
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearDataQuery {
    /// Regex selecting the keys to drop; everything when absent
    pub pattern: Option<String>,
}

/// Query for DELETE /cache/images
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearImagesQuery {
    /// Resource (file) id whose previews are dropped; everything when absent
    pub resource: Option<String>,
}
