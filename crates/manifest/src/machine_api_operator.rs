use crate::asset::{Asset, Dependency, FetchError, FileFetcher, WritableAsset};
use mao_config_api::{
    ActivePlatform, AwsConfig, CertificateAuthority, InstallConfig, LibvirtConfig,
    OpenStackConfig, OperatorConfig, ProviderConfig,
};
use mao_config_common::{AssetFile, DEFAULT_CHANNEL, MAO_CONFIG_FILENAME};
use mao_config_rhcos::ImageResolver;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

pub const ASSET_NAME: &str = "Machine API Operator";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unknown provider for machine-api-operator"))]
    UnsupportedProvider,
    #[snafu(display("failed to get AMI for {asset} config: {source}"))]
    ResolveImage {
        asset: &'static str,
        source: mao_config_rhcos::Error,
    },
    #[snafu(display("failed to marshal {asset} config: {source}"))]
    Marshal {
        asset: &'static str,
        source: serde_yaml::Error,
    },
}

/// Generates `machine-api-operator-config.yml`.
///
/// Inputs are passed to [`MachineApiOperator::generate`] directly; the asset
/// only keeps the image resolver it was built with.
pub struct MachineApiOperator<R> {
    resolver: R,
    config: Option<OperatorConfig>,
    file: Option<AssetFile>,
}

impl<R: ImageResolver> MachineApiOperator<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            config: None,
            file: None,
        }
    }

    pub fn config(&self) -> Option<&OperatorConfig> {
        self.config.as_ref()
    }

    pub fn file(&self) -> Option<&AssetFile> {
        self.file.as_ref()
    }

    pub async fn generate(
        &mut self,
        install_config: &InstallConfig,
        aggregator_ca: &CertificateAuthority,
    ) -> Result<(), Error> {
        let config = render_operator_config(&self.resolver, install_config, aggregator_ca).await?;
        let file = marshal_operator_config(&config)?;
        info!(
            file = %file.filename,
            provider = config.provider_name(),
            digest = %file.digest(),
            "generated machine-api-operator config"
        );
        self.config = Some(config);
        self.file = Some(file);
        Ok(())
    }
}

impl<R> Asset for MachineApiOperator<R> {
    fn name(&self) -> &'static str {
        ASSET_NAME
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::InstallConfig, Dependency::AggregatorCa]
    }
}

impl<R> WritableAsset for MachineApiOperator<R> {
    fn files(&self) -> Vec<&AssetFile> {
        self.file.iter().collect()
    }

    // Always regenerated; a file left by an earlier run is never read back.
    fn load(&mut self, _fetcher: &dyn FileFetcher) -> Result<bool, FetchError> {
        Ok(false)
    }
}

pub async fn render_operator_config<R: ImageResolver>(
    resolver: &R,
    install_config: &InstallConfig,
    aggregator_ca: &CertificateAuthority,
) -> Result<OperatorConfig, Error> {
    let platform = install_config
        .platform
        .active()
        .ok_or(Error::UnsupportedProvider)?;
    let cluster_name = install_config.cluster_name();
    debug!(
        provider = platform.name(),
        cluster = cluster_name,
        "rendering machine-api-operator config"
    );

    // Replicas stay at zero for every provider: the installer owns the initial machines.
    let provider = match platform {
        ActivePlatform::Aws(aws) => {
            let image = resolver
                .resolve_image(DEFAULT_CHANNEL, &aws.region)
                .await
                .context(ResolveImageSnafu { asset: ASSET_NAME })?;
            ProviderConfig::Aws(AwsConfig::new(
                cluster_name,
                install_config.cluster_id.as_str(),
                aws.region.as_str(),
                image,
            ))
        }
        ActivePlatform::Libvirt(libvirt) => ProviderConfig::Libvirt(LibvirtConfig::new(
            cluster_name,
            libvirt.uri.as_str(),
            libvirt.network.name.as_str(),
            libvirt.network.ip_range.as_str(),
        )),
        ActivePlatform::OpenStack(openstack) => ProviderConfig::OpenStack(OpenStackConfig::new(
            cluster_name,
            install_config.cluster_id.as_str(),
            openstack.region.as_str(),
        )),
    };

    Ok(OperatorConfig::new(aggregator_ca.cert(), provider))
}

pub fn marshal_operator_config(config: &OperatorConfig) -> Result<AssetFile, Error> {
    let data = serde_yaml::to_string(config).context(MarshalSnafu { asset: ASSET_NAME })?;
    Ok(AssetFile::new(MAO_CONFIG_FILENAME, data.into_bytes()))
}
