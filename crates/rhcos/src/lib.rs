//! RHCOS machine image lookup.
//!
//! The release server publishes, per channel, a `builds.json` index whose
//! first entry is the newest build, and a `meta.json` per build listing the
//! AMI published in each AWS region.

use mao_config_common::DEFAULT_RHCOS_BASE_URL;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize RHCOS HTTP client (timeout={timeout_seconds}s): {source}"))]
    ClientInit {
        timeout_seconds: u64,
        source: reqwest::Error,
    },
    #[snafu(display("RHCOS request failed during {operation} {url}: {source}"))]
    Request {
        operation: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("RHCOS server returned non-success during {operation} {url}: {source}"))]
    ResponseStatus {
        operation: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("failed to decode RHCOS response during {operation} {url}: {source}"))]
    Decode {
        operation: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("no RHCOS builds found in channel {channel}"))]
    NoBuilds { channel: String },
    #[snafu(display("no RHCOS AMIs found in {region} for build {build}"))]
    NoImageForRegion { region: String, build: String },
}

/// Looks up the machine image to boot for a release channel and region.
pub trait ImageResolver {
    fn resolve_image(
        &self,
        channel: &str,
        region: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpImageResolverConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for HttpImageResolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RHCOS_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Clone)]
pub struct HttpImageResolver {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct BuildIndex {
    #[serde(default)]
    pub builds: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BuildMeta {
    #[serde(default)]
    pub amis: Vec<RegionImage>,
}

#[derive(Debug, Deserialize)]
pub struct RegionImage {
    pub name: String,
    pub hvm: String,
}

impl BuildIndex {
    pub fn latest(&self, channel: &str) -> Result<&str, Error> {
        self.builds
            .first()
            .map(String::as_str)
            .ok_or_else(|| Error::NoBuilds {
                channel: channel.to_string(),
            })
    }
}

impl BuildMeta {
    pub fn image_for_region(&self, build: &str, region: &str) -> Result<&str, Error> {
        self.amis
            .iter()
            .find(|ami| ami.name == region)
            .map(|ami| ami.hvm.as_str())
            .ok_or_else(|| Error::NoImageForRegion {
                region: region.to_string(),
                build: build.to_string(),
            })
    }
}

impl HttpImageResolver {
    pub fn new(cfg: &HttpImageResolverConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()
            .context(ClientInitSnafu {
                timeout_seconds: cfg.timeout_seconds,
            })?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_build_index(&self, channel: &str) -> Result<BuildIndex, Error> {
        let url = format!("{}/{}/builds.json", self.base_url, channel);
        self.get_json("get_builds", url).await
    }

    async fn fetch_build_meta(&self, channel: &str, build: &str) -> Result<BuildMeta, Error> {
        let url = format!("{}/{}/{}/meta.json", self.base_url, channel, build);
        self.get_json("get_build_meta", url).await
    }

    async fn get_json<T>(&self, operation: &'static str, url: String) -> Result<T, Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context(RequestSnafu {
                operation,
                url: url.clone(),
            })?;
        let resp = resp.error_for_status().context(ResponseStatusSnafu {
            operation,
            url: url.clone(),
        })?;
        resp.json().await.context(DecodeSnafu { operation, url })
    }
}

impl ImageResolver for HttpImageResolver {
    async fn resolve_image(&self, channel: &str, region: &str) -> Result<String, Error> {
        let index = self.fetch_build_index(channel).await?;
        let build = index.latest(channel)?;
        debug!(channel, build, "resolved latest RHCOS build");
        let meta = self.fetch_build_meta(channel, build).await?;
        let image = meta.image_for_region(build, region)?;
        debug!(channel, build, region, image, "resolved RHCOS AMI");
        Ok(image.to_string())
    }
}

/// Fixed region to image table; the channel is ignored.
#[derive(Clone, Debug, Default)]
pub struct StaticImageResolver {
    images: BTreeMap<String, String>,
    fallback: Option<String>,
}

impl StaticImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that answers every region with the same image.
    pub fn any_region(image: impl Into<String>) -> Self {
        Self {
            images: BTreeMap::new(),
            fallback: Some(image.into()),
        }
    }

    pub fn with_image(mut self, region: impl Into<String>, image: impl Into<String>) -> Self {
        self.images.insert(region.into(), image.into());
        self
    }
}

impl ImageResolver for StaticImageResolver {
    async fn resolve_image(&self, _channel: &str, region: &str) -> Result<String, Error> {
        self.images
            .get(region)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| Error::NoImageForRegion {
                region: region.to_string(),
                build: "static".to_string(),
            })
    }
}
