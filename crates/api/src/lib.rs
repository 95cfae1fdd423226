mod operator;

pub use operator::{
    AwsConfig, LibvirtConfig, OpenStackConfig, OperatorConfig, OperatorConfigError,
    ProviderConfig, UNMANAGED_REPLICAS,
};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use mao_config_common::{PROVIDER_AWS, PROVIDER_LIBVIRT, PROVIDER_OPENSTACK};
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::collections::BTreeMap;

const PEM_CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// Resolved and validated cluster specification consumed by asset generators.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machines: Vec<MachinePool>,
    pub platform: Platform,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachinePool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
}

/// Cloud platform selection. Upstream validation leaves exactly one variant populated.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Platform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsPlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libvirt: Option<LibvirtPlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<OpenStackPlatform>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AwsPlatform {
    pub region: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "vpcCIDRBlock"
    )]
    pub vpc_cidr_block: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibvirtPlatform {
    #[serde(rename = "URI")]
    pub uri: String,
    pub network: LibvirtNetwork,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibvirtNetwork {
    #[serde(rename = "if")]
    pub name: String,
    #[serde(rename = "ipRange")]
    pub ip_range: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenStackPlatform {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_network: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivePlatform<'a> {
    Aws(&'a AwsPlatform),
    Libvirt(&'a LibvirtPlatform),
    OpenStack(&'a OpenStackPlatform),
}

impl InstallConfig {
    pub fn cluster_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

impl Platform {
    /// First populated variant in AWS, Libvirt, OpenStack order.
    pub fn active(&self) -> Option<ActivePlatform<'_>> {
        if let Some(aws) = self.aws.as_ref() {
            return Some(ActivePlatform::Aws(aws));
        }
        if let Some(libvirt) = self.libvirt.as_ref() {
            return Some(ActivePlatform::Libvirt(libvirt));
        }
        self.openstack.as_ref().map(ActivePlatform::OpenStack)
    }

    pub fn name(&self) -> &'static str {
        self.active().map(|p| p.name()).unwrap_or("")
    }
}

impl ActivePlatform<'_> {
    pub fn name(self) -> &'static str {
        match self {
            ActivePlatform::Aws(_) => PROVIDER_AWS,
            ActivePlatform::Libvirt(_) => PROVIDER_LIBVIRT,
            ActivePlatform::OpenStack(_) => PROVIDER_OPENSTACK,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum CertificateError {
    #[snafu(display("certificate authority {name} does not contain a PEM certificate block"))]
    MissingPemBlock { name: String },
}

/// Certificate authority whose PEM certificate is handed to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateAuthority {
    name: String,
    cert_pem: String,
}

impl CertificateAuthority {
    pub fn from_pem(
        name: impl Into<String>,
        cert_pem: impl Into<String>,
    ) -> Result<Self, CertificateError> {
        let name = name.into();
        let cert_pem = cert_pem.into();
        if !cert_pem.contains(PEM_CERTIFICATE_HEADER) {
            return Err(CertificateError::MissingPemBlock { name });
        }
        Ok(Self { name, cert_pem })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cert(&self) -> &str {
        &self.cert_pem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CA_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIBszCCAVmgAwIBAgIB\n-----END CERTIFICATE-----\n";

    fn install_config(yaml: &str) -> InstallConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn parses_aws_install_config() {
        let cfg = install_config(
            r#"
apiVersion: v1beta1
metadata:
  name: demo
clusterID: 6d1c4b4e-1f7c-4d2a-9a43-7f0e3d2c1b00
baseDomain: example.test
machines:
  - name: master
    replicas: 3
  - name: worker
    replicas: 2
platform:
  aws:
    region: us-east-1
    vpcCIDRBlock: 10.0.0.0/16
    userTags:
      team: infra
"#,
        );

        assert_eq!(cfg.cluster_name(), "demo");
        assert_eq!(cfg.base_domain.as_deref(), Some("example.test"));
        assert_eq!(cfg.machines[1].replicas, Some(2));
        let aws = cfg.platform.aws.as_ref().unwrap();
        assert_eq!(aws.region, "us-east-1");
        assert_eq!(aws.vpc_cidr_block.as_deref(), Some("10.0.0.0/16"));
        assert_eq!(aws.user_tags["team"], "infra");
        assert_eq!(cfg.platform.name(), "aws");
    }

    #[test]
    fn parses_libvirt_network_keys() {
        let cfg = install_config(
            r#"
metadata:
  name: dev
clusterID: abc
platform:
  libvirt:
    URI: qemu:///system
    network:
      if: tectonic
      ipRange: 10.0.0.0/24
"#,
        );

        assert_eq!(
            cfg.platform.active(),
            Some(ActivePlatform::Libvirt(&LibvirtPlatform {
                uri: "qemu:///system".to_string(),
                network: LibvirtNetwork {
                    name: "tectonic".to_string(),
                    ip_range: "10.0.0.0/24".to_string(),
                },
            }))
        );
    }

    #[test]
    fn empty_platform_has_no_name() {
        let platform = Platform::default();
        assert!(platform.active().is_none());
        assert_eq!(platform.name(), "");
    }

    #[test]
    fn aws_wins_when_several_variants_are_populated() {
        let platform = Platform {
            aws: Some(AwsPlatform {
                region: "us-east-1".to_string(),
                ..Default::default()
            }),
            libvirt: None,
            openstack: Some(OpenStackPlatform {
                region: "RegionOne".to_string(),
                ..Default::default()
            }),
        };

        assert_eq!(platform.name(), "aws");
    }

    #[test]
    fn missing_cluster_name_reads_as_empty() {
        let cfg = install_config(
            r#"
clusterID: abc
platform:
  openstack:
    region: RegionOne
"#,
        );
        assert_eq!(cfg.cluster_name(), "");
        assert_eq!(cfg.platform.name(), "openstack");
    }

    #[test]
    fn certificate_authority_requires_pem_block() {
        let ca = CertificateAuthority::from_pem("aggregator-ca", CA_PEM).unwrap();
        assert_eq!(ca.cert(), CA_PEM);
        assert_eq!(ca.name(), "aggregator-ca");

        assert!(matches!(
            CertificateAuthority::from_pem("aggregator-ca", "not a certificate"),
            Err(CertificateError::MissingPemBlock { .. })
        ));
    }
}
