use mao_config_api::{
    AwsPlatform, CertificateAuthority, InstallConfig, LibvirtNetwork, LibvirtPlatform,
    OpenStackPlatform, Platform,
};
use mao_config_manifest::{marshal_operator_config, render_operator_config};
use mao_config_rhcos::StaticImageResolver;
use std::error::Error;

type DynError = Box<dyn Error + Send + Sync>;

const SAMPLE_CA: &str = "-----BEGIN CERTIFICATE-----\nMIIBszCCAVmgAwIBAgIBADAKBggqhkjOPQQDAjAAMB4XDTI2MDEwMTAwMDAwMFoX\n-----END CERTIFICATE-----\n";

// Prints the machine-api-operator config rendered for each supported provider.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), DynError> {
    let resolver = StaticImageResolver::any_region("ami-00000000000000000");
    let ca = CertificateAuthority::from_pem("aggregator-ca", SAMPLE_CA)?;

    for platform in sample_platforms() {
        let name = platform.name();
        let install_config: InstallConfig = serde_yaml::from_str(
            "metadata:\n  name: sample\nclusterID: 00000000-0000-0000-0000-000000000000\nplatform: {}\n",
        )?;
        let install_config = InstallConfig {
            platform,
            ..install_config
        };
        let config = render_operator_config(&resolver, &install_config, &ca).await?;
        let file = marshal_operator_config(&config)?;
        println!("# {name}: {}", file.filename);
        println!("---\n{}", String::from_utf8(file.data)?);
    }
    Ok(())
}

fn sample_platforms() -> Vec<Platform> {
    vec![
        Platform {
            aws: Some(AwsPlatform {
                region: "us-east-1".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
        Platform {
            libvirt: Some(LibvirtPlatform {
                uri: "qemu+tcp://192.168.122.1/system".to_string(),
                network: LibvirtNetwork {
                    name: "tt0".to_string(),
                    ip_range: "192.168.126.0/24".to_string(),
                },
            }),
            ..Default::default()
        },
        Platform {
            openstack: Some(OpenStackPlatform {
                region: "RegionOne".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
    ]
}
