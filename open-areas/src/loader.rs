//! Loading of the GeoJSON assets the overlays are drawn from.

use std::collections::HashMap;

use geojson::GeoJson;
use maybe_sync::{MaybeSend, MaybeSync};
use thiserror::Error;

/// Error that can occur when loading a GeoJSON asset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Could not reach the server.
    #[error("network error loading {url}: {message}")]
    Network {
        /// Requested location.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// Asset does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Asset is not valid GeoJSON.
    #[error("failed to decode {url}: {source}")]
    Decoding {
        /// Requested location.
        url: String,
        /// Parser error.
        #[source]
        source: geojson::Error,
    },
    /// Local file could not be read.
    #[error("failed to read {url}: {source}")]
    Io {
        /// Requested location.
        url: String,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Loader of GeoJSON assets by URL.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait GeoJsonLoader: MaybeSend + MaybeSync {
    /// Load and parse the asset at the URL.
    async fn load(&self, url: &str) -> Result<GeoJson, LoadError>;
}

fn decode(url: &str, text: &str) -> Result<GeoJson, LoadError> {
    text.parse::<GeoJson>().map_err(|source| LoadError::Decoding {
        url: url.to_string(),
        source,
    })
}

/// Serves assets from memory. Useful for embedded data and in tests.
#[derive(Debug, Default, Clone)]
pub struct StaticLoader {
    assets: HashMap<String, String>,
}

impl StaticLoader {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset.
    pub fn with_asset(mut self, url: impl Into<String>, geojson: impl Into<String>) -> Self {
        self.assets.insert(url.into(), geojson.into());
        self
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl GeoJsonLoader for StaticLoader {
    async fn load(&self, url: &str) -> Result<GeoJson, LoadError> {
        let text = self
            .assets
            .get(url)
            .ok_or_else(|| LoadError::NotFound(url.to_string()))?;
        decode(url, text)
    }
}

/// Reads assets from a local directory that mirrors the deployment base path.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: std::path::PathBuf,
    base_path: String,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileLoader {
    /// Loader resolving `{base_path}{relative}` URLs to `{root}/{relative}`.
    pub fn new(root: impl Into<std::path::PathBuf>, base_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, url: &str) -> std::path::PathBuf {
        let relative = url.strip_prefix(&self.base_path).unwrap_or(url);
        self.root.join(relative.trim_start_matches('/'))
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait::async_trait]
impl GeoJsonLoader for FileLoader {
    async fn load(&self, url: &str) -> Result<GeoJson, LoadError> {
        let path = self.path_for(url);
        log::debug!("Reading {url} from {}", path.display());

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => LoadError::NotFound(url.to_string()),
                _ => LoadError::Io {
                    url: url.to_string(),
                    source,
                },
            })?;

        decode(url, &text)
    }
}

/// Downloads assets over HTTP from the origin the map is deployed on.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
    origin: reqwest::Url,
}

#[cfg(feature = "http")]
impl HttpLoader {
    /// Loader resolving URLs against the origin.
    pub fn new(client: reqwest::Client, origin: reqwest::Url) -> Self {
        Self { client, origin }
    }

    async fn load_text(&self, url: &str) -> Result<String, LoadError> {
        let network = |err: reqwest::Error| LoadError::Network {
            url: url.to_string(),
            message: err.to_string(),
        };

        let full_url = self.origin.join(url).map_err(|err| LoadError::Network {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        log::info!("Downloading {full_url}");
        let response = self.client.get(full_url).send().await.map_err(network)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            log::warn!("Asset not found (404): {url}");
            return Err(LoadError::NotFound(url.to_string()));
        }

        let response = response.error_for_status().map_err(network)?;
        response.text().await.map_err(network)
    }
}

#[cfg(feature = "http")]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl GeoJsonLoader for HttpLoader {
    async fn load(&self, url: &str) -> Result<GeoJson, LoadError> {
        let text = self.load_text(url).await?;
        log::trace!("Loaded {} bytes from {url}", text.len());
        decode(url, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_loader_serves_assets() {
        let loader = StaticLoader::new().with_asset(
            "/base/data/a.geojson",
            r#"{"type":"FeatureCollection","features":[]}"#,
        );

        let loaded = tokio_test::block_on(loader.load("/base/data/a.geojson")).unwrap();
        assert!(matches!(loaded, GeoJson::FeatureCollection(_)));

        let missing = tokio_test::block_on(loader.load("/base/data/b.geojson"));
        assert!(matches!(missing, Err(LoadError::NotFound(url)) if url == "/base/data/b.geojson"));
    }

    #[test]
    fn malformed_geojson_is_a_decoding_error() {
        let loader = StaticLoader::new().with_asset("bad.geojson", "{ not json");
        let result = tokio_test::block_on(loader.load("bad.geojson"));
        assert!(matches!(result, Err(LoadError::Decoding { .. })));
    }

    #[test]
    fn file_loader_strips_base_path() {
        let loader = FileLoader::new("/srv/public", "/open-areas-inventory-map/");
        assert_eq!(
            loader.path_for("/open-areas-inventory-map/data/streams.geojson"),
            std::path::Path::new("/srv/public/data/streams.geojson")
        );
        assert_eq!(
            loader.path_for("data/streams.geojson"),
            std::path::Path::new("/srv/public/data/streams.geojson")
        );
    }

    #[test]
    fn file_loader_reads_files() {
        let dir = std::env::temp_dir().join(format!("open-areas-loader-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("data")).unwrap();
        std::fs::write(
            dir.join("data/borough.geojson"),
            r#"{"type":"Point","coordinates":[1.0,2.0]}"#,
        )
        .unwrap();

        let loader = FileLoader::new(&dir, "/base/");
        let loaded = tokio_test::block_on(loader.load("/base/data/borough.geojson")).unwrap();
        assert!(matches!(loaded, GeoJson::Geometry(_)));

        let missing = tokio_test::block_on(loader.load("/base/data/none.geojson"));
        assert!(matches!(missing, Err(LoadError::NotFound(_))));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
