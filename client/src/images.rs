//! Lazily loaded avatar images
//!
//! Loads never block the frame loop: the first request for a URL starts a
//! load and returns nothing, later requests poll the pending handle. Entries
//! are never evicted.

use log::{debug, warn};
use macroquad::texture::Image;
use shared::MAX_IMAGE_URL_LEN;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::oneshot::{self, error::TryRecvError};

#[derive(Debug, Clone, PartialEq)]
pub enum ImageError {
    UnsupportedScheme(String),
    UrlTooLong(usize),
    Io(String),
    Decode(String),
    Abandoned,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnsupportedScheme(scheme) => write!(f, "unsupported scheme: {}", scheme),
            ImageError::UrlTooLong(len) => write!(
                f,
                "URL is {} bytes, at most {} are allowed",
                len, MAX_IMAGE_URL_LEN
            ),
            ImageError::Io(e) => write!(f, "read failed: {}", e),
            ImageError::Decode(e) => write!(f, "decode failed: {}", e),
            ImageError::Abandoned => write!(f, "loader dropped the request"),
        }
    }
}

impl std::error::Error for ImageError {}

/// Checks an avatar URL before it is published to other players.
pub fn validate_image_url(url: &str) -> Result<String, ImageError> {
    if url.len() > MAX_IMAGE_URL_LEN {
        return Err(ImageError::UrlTooLong(url.len()));
    }
    local_path(url)?;
    Ok(url.to_string())
}

/// Completion side of an in-flight load.
pub type LoadHandle = oneshot::Receiver<Result<Image, ImageError>>;

pub trait ImageLoader {
    /// Starts loading `url` in the background.
    fn load(&self, url: &str) -> LoadHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Loading,
    Ready,
    Failed,
}

enum ImageSlot {
    Loading(LoadHandle),
    Ready(Image),
    Failed,
}

pub struct ImageCache {
    slots: HashMap<String, ImageSlot>,
    loader: Box<dyn ImageLoader>,
}

impl ImageCache {
    pub fn new(loader: Box<dyn ImageLoader>) -> Self {
        Self {
            slots: HashMap::new(),
            loader,
        }
    }

    /// Returns the image for `url` once it has loaded. Starts the load on
    /// first request.
    pub fn request(&mut self, url: &str) -> Option<&Image> {
        let loader = &self.loader;
        let slot = self.slots.entry(url.to_string()).or_insert_with(|| {
            debug!("Loading image {}", url);
            ImageSlot::Loading(loader.load(url))
        });

        let polled = match slot {
            ImageSlot::Loading(handle) => Some(handle.try_recv()),
            _ => None,
        };

        match polled {
            Some(Ok(Ok(image))) => {
                debug!("Image {} ready ({}x{})", url, image.width, image.height);
                *slot = ImageSlot::Ready(image);
            }
            Some(Ok(Err(e))) => {
                warn!("Failed to load image {}: {}", url, e);
                *slot = ImageSlot::Failed;
            }
            Some(Err(TryRecvError::Closed)) => {
                warn!("Failed to load image {}: {}", url, ImageError::Abandoned);
                *slot = ImageSlot::Failed;
            }
            Some(Err(TryRecvError::Empty)) | None => {}
        }

        match &*slot {
            ImageSlot::Ready(image) => Some(image),
            _ => None,
        }
    }

    /// Returns an already loaded image without starting or polling a load.
    pub fn get(&self, url: &str) -> Option<&Image> {
        match self.slots.get(url) {
            Some(ImageSlot::Ready(image)) => Some(image),
            _ => None,
        }
    }

    pub fn status(&self, url: &str) -> Option<ImageStatus> {
        self.slots.get(url).map(|slot| match slot {
            ImageSlot::Loading(_) => ImageStatus::Loading,
            ImageSlot::Ready(_) => ImageStatus::Ready,
            ImageSlot::Failed => ImageStatus::Failed,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Reads images from the local filesystem on a tokio runtime.
/// Accepts plain paths and `file://` URLs.
pub struct FileImageLoader {
    runtime: tokio::runtime::Handle,
}

impl FileImageLoader {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self, url: &str) -> LoadHandle {
        let (tx, rx) = oneshot::channel();
        let url = url.to_string();

        self.runtime.spawn(async move {
            let result = read_image(&url).await;
            let _ = tx.send(result);
        });

        rx
    }
}

async fn read_image(url: &str) -> Result<Image, ImageError> {
    let path = local_path(url)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ImageError::Io(format!("{}: {}", path.display(), e)))?;
    Image::from_file_with_format(&bytes, None).map_err(|e| ImageError::Decode(format!("{:?}", e)))
}

fn local_path(url: &str) -> Result<PathBuf, ImageError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }

    match url.split_once("://") {
        Some((scheme, _)) => Err(ImageError::UnsupportedScheme(scheme.to_string())),
        None => Ok(PathBuf::from(url)),
    }
}
