//! Sources of encoded image bytes, keyed by the locator string an image element
//! would carry as its `src`.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported locator scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("invalid locator '{locator}': {source}")]
    InvalidLocator {
        locator: String,
        source: url::ParseError,
    },
    #[error("malformed data uri: {0}")]
    MalformedDataUri(&'static str),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("http fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no image available at '{0}'")]
    NotFound(String),
}

#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, LoadError>;
}

pub fn decode_data_uri(locator: &str) -> Result<Vec<u8>, LoadError> {
    let rest = locator
        .strip_prefix("data:")
        .ok_or(LoadError::MalformedDataUri("missing 'data:' prefix"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or(LoadError::MalformedDataUri("missing ',' separator"))?;
    if !header
        .split(';')
        .any(|part| part.eq_ignore_ascii_case("base64"))
    {
        return Err(LoadError::MalformedDataUri(
            "only base64 payloads are supported",
        ));
    }
    Ok(STANDARD.decode(payload.trim())?)
}

pub struct DataUriLoader;

#[async_trait]
impl ImageLoader for DataUriLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        decode_data_uri(locator)
    }
}

/// Reads `file://` URLs and bare filesystem paths.
pub struct FileLoader;

impl FileLoader {
    async fn read(path: &Path) -> Result<Vec<u8>, LoadError> {
        tokio::fs::read(path).await.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[async_trait]
impl ImageLoader for FileLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        if locator.starts_with("file:") {
            let url = Url::parse(locator).map_err(|source| LoadError::InvalidLocator {
                locator: locator.to_string(),
                source,
            })?;
            let path = url
                .to_file_path()
                .map_err(|()| LoadError::UnsupportedScheme(format!("non-local {locator}")))?;
            return Self::read(&path).await;
        }
        Self::read(Path::new(locator)).await
    }
}

pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl ImageLoader for HttpLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        let bytes = self
            .client
            .get(locator)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Fixed set of images held in memory. Unknown locators fail to load.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, locator: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(locator.into(), bytes);
        self
    }
}

#[async_trait]
impl ImageLoader for MemoryLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        self.images
            .get(locator)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(locator.to_string()))
    }
}

/// Picks a loader from the locator's scheme. Strings that do not parse as an
/// absolute URL are treated as filesystem paths.
#[derive(Default)]
pub struct SchemeLoader {
    http: HttpLoader,
}

impl SchemeLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            http: HttpLoader::new(client),
        }
    }
}

#[async_trait]
impl ImageLoader for SchemeLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        let scheme = match Url::parse(locator) {
            Ok(url) => url.scheme().to_ascii_lowercase(),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return FileLoader.load(locator).await;
            }
            Err(source) => {
                return Err(LoadError::InvalidLocator {
                    locator: locator.to_string(),
                    source,
                })
            }
        };
        debug!(scheme = %scheme, "pixelate: loading image");

        match scheme.as_str() {
            "data" => DataUriLoader.load(locator).await,
            "file" => FileLoader.load(locator).await,
            "http" | "https" => self.http.load(locator).await,
            // `C:\images\a.png` parses with a one-letter scheme
            drive if drive.len() == 1 => FileLoader.load(locator).await,
            other => Err(LoadError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
