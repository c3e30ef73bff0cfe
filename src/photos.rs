//! Inspection photographs attached to observations.
//!
//! Photos live in a remote store: a table of records keyed by observation id, and
//! an object bucket holding the files. Each photo is fetched, decoded, scaled to fit
//! a maximum box and placed below the previous one. A photo that can't be fetched
//! or decoded is logged and skipped; it never fails the export.

use crate::config::PhotosSection;
use crate::document::Document;
use crate::image::Image;
use crate::layout::{ensure_space, place_image, Cursor};
use crate::rect::Area;
use crate::units::*;
use crate::{CertificateError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Gap left under each photo
const PHOTO_GAP: Mm = Mm(4.0);

/// A photo record as stored against an observation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObservationPhoto {
    pub file_path: String,
}

/// Where inspection photos come from
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Photo records for an observation, oldest upload first
    async fn photos_for_observation(&self, observation_id: &str) -> Result<Vec<ObservationPhoto>>;

    /// The public URL a stored file can be downloaded from
    fn public_url(&self, file_path: &str) -> String;

    /// Download the bytes at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// A store with no photos in it, for exports without a photo store configured
#[derive(Debug, Default, Copy, Clone)]
pub struct NoPhotos;

#[async_trait]
impl PhotoStore for NoPhotos {
    async fn photos_for_observation(&self, _observation_id: &str) -> Result<Vec<ObservationPhoto>> {
        Ok(Vec::new())
    }

    fn public_url(&self, file_path: &str) -> String {
        file_path.to_string()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Err(CertificateError::Layout(format!("no photo store to fetch {url} from")))
    }
}

/// A REST photo store: records are queried from `{base}/rest/v1/{table}` and files
/// served from `{base}/storage/v1/object/public/{bucket}/{path}`
pub struct HttpPhotoStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    table: String,
    bucket: String,
}

impl HttpPhotoStore {
    /// Build a store from configuration. Returns [None] when no base URL is set.
    pub fn from_config(config: &PhotosSection) -> Result<Option<HttpPhotoStore>> {
        let Some(base_url) = config.base_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Some(HttpPhotoStore {
            client: builder.build()?,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            bucket: config.bucket.clone(),
        }))
    }

    fn records_url(&self, observation_id: &str) -> String {
        format!(
            "{}/rest/v1/{}?select=file_path&observation_id=eq.{}&order=uploaded_at.asc",
            self.base_url,
            self.table,
            urlencoding::encode(observation_id)
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn checked(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CertificateError::PhotoStoreStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl PhotoStore for HttpPhotoStore {
    async fn photos_for_observation(&self, observation_id: &str) -> Result<Vec<ObservationPhoto>> {
        let url = self.records_url(observation_id);
        let response = self.checked(&url).await?;
        Ok(response.json::<Vec<ObservationPhoto>>().await?)
    }

    fn public_url(&self, file_path: &str) -> String {
        let path: Vec<_> = file_path
            .trim_start_matches('/')
            .split('/')
            .map(urlencoding::encode)
            .collect();
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            path.join("/")
        )
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.checked(url).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Size an image of `width` x `height` pixels (at 96 DPI) to fit within the box,
/// keeping its aspect ratio. Images already smaller than the box keep their size.
pub fn scale_to_fit(width: Px, height: Px, max_width: Mm, max_height: Mm) -> (Mm, Mm) {
    let (width, height) = (Mm::from(width), Mm::from(height));
    if width <= Mm(0.0) || height <= Mm(0.0) {
        return (Mm(0.0), Mm(0.0));
    }
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

/// Where a photo ended up
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PhotoPlacement {
    /// Top of the photo; may be on a new page if the guard broke the page
    pub cursor: Cursor,
    /// Zero when the photo couldn't be loaded
    pub height: Mm,
}

/// Fetch the photo at `url` and place it at the cursor, breaking the page first if
/// it doesn't fit. Load failures give a zero height.
pub async fn embed_photo(
    document: &mut Document,
    store: &dyn PhotoStore,
    url: &str,
    cursor: Cursor,
    x: Mm,
    config: &PhotosSection,
) -> Result<PhotoPlacement> {
    let image = match load_photo(store, url).await {
        Ok(image) => image,
        Err(e) => {
            warn!(%url, error = %e, "could not load photo");
            return Ok(PhotoPlacement {
                cursor,
                height: Mm(0.0),
            });
        }
    };

    let (width, height) = scale_to_fit(
        Px(image.width),
        Px(image.height),
        config.max_width,
        config.max_height,
    );
    let cursor = ensure_space(document, cursor, height + PHOTO_GAP)?;
    let image_id = document.add_image(image);
    place_image(
        document,
        cursor.page,
        image_id,
        Area::new(x, cursor.y, width, height),
    )?;
    debug!(%url, %width, %height, "embedded photo");
    Ok(PhotoPlacement { cursor, height })
}

async fn load_photo(store: &dyn PhotoStore, url: &str) -> Result<Image> {
    let bytes = store.fetch(url).await?;
    Image::from_bytes(&bytes)
}

/// Place every photo of an observation one below the other, in upload order,
/// returning the cursor below the last one
pub async fn attach_observation_photos(
    document: &mut Document,
    store: &dyn PhotoStore,
    observation_id: &str,
    cursor: Cursor,
    x: Mm,
    config: &PhotosSection,
) -> Result<Cursor> {
    let observation_id = observation_id.trim();
    if observation_id.is_empty() {
        return Ok(cursor);
    }

    let photos = match store.photos_for_observation(observation_id).await {
        Ok(photos) => photos,
        Err(e) => {
            warn!(observation_id, error = %e, "could not list observation photos");
            return Ok(cursor);
        }
    };

    let mut cursor = cursor;
    for photo in photos {
        let url = store.public_url(&photo.file_path);
        let placed = embed_photo(document, store, &url, cursor, x, config).await?;
        cursor = if placed.height > Mm(0.0) {
            placed.cursor.down(placed.height + PHOTO_GAP)
        } else {
            placed.cursor
        };
    }
    Ok(cursor)
}
