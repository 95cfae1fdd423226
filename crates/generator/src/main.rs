use mao_config_api::{CertificateAuthority, CertificateError, InstallConfig};
use mao_config_common::{AssetFile, DEFAULT_RHCOS_BASE_URL, digest_short};
use mao_config_manifest::{Asset, DirectoryFetcher, FetchError, MachineApiOperator, WritableAsset};
use mao_config_rhcos::{
    HttpImageResolver, HttpImageResolverConfig, ImageResolver, StaticImageResolver,
};
use snafu::{ResultExt, Snafu};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const AGGREGATOR_CA_NAME: &str = "aggregator-ca";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("missing env {key}: {source}"))]
    MissingEnv {
        key: &'static str,
        source: std::env::VarError,
    },
    #[snafu(display("invalid env {key}: {source}"))]
    InvalidEnv {
        key: &'static str,
        source: std::num::ParseIntError,
    },
    #[snafu(display("failed to read {what} from {}: {source}", path.display()))]
    ReadInput {
        what: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse install-config {}: {source}", path.display()))]
    ParseInstallConfig {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[snafu(display("failed to load aggregator CA: {source}"))]
    LoadCertificateAuthority { source: CertificateError },
    #[snafu(display("failed to initialize image resolver: {source}"))]
    ResolverInit { source: mao_config_rhcos::Error },
    #[snafu(display("failed to load {asset} from previous run: {source}"))]
    LoadAsset {
        asset: &'static str,
        source: FetchError,
    },
    #[snafu(display("failed to generate {asset}: {source}"))]
    Generate {
        asset: &'static str,
        source: mao_config_manifest::Error,
    },
    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
struct GeneratorConfig {
    install_config_path: PathBuf,
    aggregator_ca_path: PathBuf,
    output_dir: PathBuf,
    rhcos_base_url: String,
    rhcos_timeout_seconds: u64,
    static_image: Option<String>,
}

impl GeneratorConfig {
    fn from_env() -> Result<Self, Error> {
        Ok(Self {
            install_config_path: required_env("INSTALL_CONFIG_PATH")?.into(),
            aggregator_ca_path: required_env("AGGREGATOR_CA_PATH")?.into(),
            output_dir: env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| ".".to_string())
                .into(),
            rhcos_base_url: env::var("RHCOS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_RHCOS_BASE_URL.to_string()),
            rhcos_timeout_seconds: parse_env_u64("RHCOS_TIMEOUT_SECONDS", 30)?,
            static_image: env::var("RHCOS_STATIC_IMAGE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }
}

fn required_env(key: &'static str) -> Result<String, Error> {
    env::var(key).context(MissingEnvSnafu { key })
}

fn parse_env_u64(key: &'static str, default: u64) -> Result<u64, Error> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().context(InvalidEnvSnafu { key }),
        Err(_) => Ok(default),
    }
}

enum Resolver {
    Http(HttpImageResolver),
    Static(StaticImageResolver),
}

impl Resolver {
    fn from_config(cfg: &GeneratorConfig) -> Result<Self, Error> {
        match &cfg.static_image {
            Some(image) => Ok(Self::Static(StaticImageResolver::any_region(image.clone()))),
            None => HttpImageResolver::new(&HttpImageResolverConfig {
                base_url: cfg.rhcos_base_url.clone(),
                timeout_seconds: cfg.rhcos_timeout_seconds,
            })
            .map(Self::Http)
            .context(ResolverInitSnafu),
        }
    }
}

impl ImageResolver for Resolver {
    async fn resolve_image(
        &self,
        channel: &str,
        region: &str,
    ) -> Result<String, mao_config_rhcos::Error> {
        match self {
            Resolver::Http(http) => http.resolve_image(channel, region).await,
            Resolver::Static(fixed) => fixed.resolve_image(channel, region).await,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mao_config_generator=debug".into()),
        )
        .init();

    match run().await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(error = %err, "machine-api-operator config generation failed");
            Err(err)
        }
    }
}

async fn run() -> Result<(), Error> {
    let cfg = GeneratorConfig::from_env()?;
    let resolver = Resolver::from_config(&cfg)?;
    if cfg.static_image.is_some() {
        warn!("RHCOS_STATIC_IMAGE set; skipping RHCOS metadata lookup");
    }
    let written = generate_into(&cfg, resolver).await?;
    info!(files = written.len(), output_dir = %cfg.output_dir.display(), "assets written");
    Ok(())
}

async fn generate_into<R: ImageResolver>(
    cfg: &GeneratorConfig,
    resolver: R,
) -> Result<Vec<PathBuf>, Error> {
    let install_config = read_install_config(&cfg.install_config_path)?;
    let aggregator_ca = read_certificate_authority(&cfg.aggregator_ca_path)?;

    let mut asset = MachineApiOperator::new(resolver);
    let asset_name = asset.name();
    info!(
        asset = asset_name,
        dependencies = ?dependency_names(&asset),
        "generating asset"
    );
    let fetcher = DirectoryFetcher::new(&cfg.output_dir);
    debug!(root = %fetcher.root().display(), "checking for output of a previous run");
    let loaded = asset
        .load(&fetcher)
        .context(LoadAssetSnafu { asset: asset_name })?;
    if loaded {
        info!(asset = asset_name, "asset loaded from previous run");
    } else {
        asset
            .generate(&install_config, &aggregator_ca)
            .await
            .context(GenerateSnafu { asset: asset_name })?;
    }

    write_files(&cfg.output_dir, asset.files())
}

fn read_install_config(path: &Path) -> Result<InstallConfig, Error> {
    let raw = fs::read_to_string(path).context(ReadInputSnafu {
        what: "install-config",
        path,
    })?;
    serde_yaml::from_str(&raw).context(ParseInstallConfigSnafu { path })
}

fn read_certificate_authority(path: &Path) -> Result<CertificateAuthority, Error> {
    let pem = fs::read_to_string(path).context(ReadInputSnafu {
        what: "aggregator CA",
        path,
    })?;
    let ca = CertificateAuthority::from_pem(AGGREGATOR_CA_NAME, pem)
        .context(LoadCertificateAuthoritySnafu)?;
    debug!(ca = ca.name(), path = %path.display(), "loaded certificate authority");
    Ok(ca)
}

fn dependency_names(asset: &impl Asset) -> Vec<&'static str> {
    asset
        .dependencies()
        .into_iter()
        .map(|dependency| dependency.name())
        .collect()
}

fn write_files(output_dir: &Path, files: Vec<&AssetFile>) -> Result<Vec<PathBuf>, Error> {
    fs::create_dir_all(output_dir).context(CreateOutputDirSnafu { path: output_dir })?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = output_dir.join(&file.filename);
        fs::write(&path, &file.data).context(WriteFileSnafu { path: &path })?;
        info!(
            path = %path.display(),
            bytes = file.data.len(),
            digest = %digest_short(&file.digest()),
            "wrote asset file"
        );
        written.push(path);
    }
    Ok(written)
}
