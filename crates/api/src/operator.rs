use kube::core::TypeMeta;
use mao_config_common::{
    MAO_CONFIG_API_VERSION, MAO_CONFIG_KIND, MAO_TARGET_NAMESPACE, PROVIDER_AWS,
    PROVIDER_LIBVIRT, PROVIDER_OPENSTACK,
};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Replica count written for every provider so the operator does not create
/// MachineSets that compete with the ones the installer provisions.
pub const UNMANAGED_REPLICAS: i32 = 0;

/// Startup configuration of the machine-api-operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "OperatorConfigDocument", try_from = "OperatorConfigDocument")]
pub struct OperatorConfig {
    pub types: TypeMeta,
    pub target_namespace: String,
    pub api_service_ca: String,
    pub provider: ProviderConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderConfig {
    Aws(AwsConfig),
    Libvirt(LibvirtConfig),
    OpenStack(OpenStackConfig),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    pub region: String,
    // Filled in by a later stage; left empty here.
    #[serde(rename = "availabilityZone")]
    pub availability_zone: String,
    pub image: String,
    pub replicas: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibvirtConfig {
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    pub uri: String,
    #[serde(rename = "networkName")]
    pub network_name: String,
    pub iprange: String,
    pub replicas: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenStackConfig {
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    pub region: String,
    pub replicas: i32,
}

#[derive(Debug, Snafu)]
pub enum OperatorConfigError {
    #[snafu(display("operator config for provider '{provider}' has no provider section"))]
    MissingProviderSection { provider: String },
    #[snafu(display("operator config has more than one provider section: {sections}"))]
    MultipleProviderSections { sections: String },
    #[snafu(display(
        "operator config declares provider '{provider}' but carries a '{section}' section"
    ))]
    ProviderMismatch { provider: String, section: String },
}

impl OperatorConfig {
    pub fn new(api_service_ca: impl Into<String>, provider: ProviderConfig) -> Self {
        Self {
            types: TypeMeta {
                api_version: MAO_CONFIG_API_VERSION.to_string(),
                kind: MAO_CONFIG_KIND.to_string(),
            },
            target_namespace: MAO_TARGET_NAMESPACE.to_string(),
            api_service_ca: api_service_ca.into(),
            provider,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn replicas(&self) -> i32 {
        match &self.provider {
            ProviderConfig::Aws(aws) => aws.replicas,
            ProviderConfig::Libvirt(libvirt) => libvirt.replicas,
            ProviderConfig::OpenStack(openstack) => openstack.replicas,
        }
    }
}

impl ProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Aws(_) => PROVIDER_AWS,
            ProviderConfig::Libvirt(_) => PROVIDER_LIBVIRT,
            ProviderConfig::OpenStack(_) => PROVIDER_OPENSTACK,
        }
    }

    pub fn as_aws(&self) -> Option<&AwsConfig> {
        match self {
            ProviderConfig::Aws(aws) => Some(aws),
            _ => None,
        }
    }

    pub fn as_libvirt(&self) -> Option<&LibvirtConfig> {
        match self {
            ProviderConfig::Libvirt(libvirt) => Some(libvirt),
            _ => None,
        }
    }

    pub fn as_openstack(&self) -> Option<&OpenStackConfig> {
        match self {
            ProviderConfig::OpenStack(openstack) => Some(openstack),
            _ => None,
        }
    }
}

impl AwsConfig {
    pub fn new(
        cluster_name: impl Into<String>,
        cluster_id: impl Into<String>,
        region: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            cluster_id: cluster_id.into(),
            region: region.into(),
            availability_zone: String::new(),
            image: image.into(),
            replicas: UNMANAGED_REPLICAS,
        }
    }
}

impl LibvirtConfig {
    pub fn new(
        cluster_name: impl Into<String>,
        uri: impl Into<String>,
        network_name: impl Into<String>,
        iprange: impl Into<String>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            uri: uri.into(),
            network_name: network_name.into(),
            iprange: iprange.into(),
            replicas: UNMANAGED_REPLICAS,
        }
    }
}

impl OpenStackConfig {
    pub fn new(
        cluster_name: impl Into<String>,
        cluster_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            cluster_id: cluster_id.into(),
            region: region.into(),
            replicas: UNMANAGED_REPLICAS,
        }
    }
}

// Wire shape: one nullable key per provider, in the order the operator reads them.
#[derive(Serialize, Deserialize)]
struct OperatorConfigDocument {
    #[serde(rename = "apiVersion", default)]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(rename = "targetNamespace")]
    target_namespace: String,
    #[serde(rename = "apiServiceCA")]
    api_service_ca: String,
    provider: String,
    #[serde(default)]
    aws: Option<AwsConfig>,
    #[serde(default)]
    libvirt: Option<LibvirtConfig>,
    #[serde(default)]
    openstack: Option<OpenStackConfig>,
}

impl From<OperatorConfig> for OperatorConfigDocument {
    fn from(config: OperatorConfig) -> Self {
        let provider = config.provider_name().to_string();
        let (aws, libvirt, openstack) = match config.provider {
            ProviderConfig::Aws(aws) => (Some(aws), None, None),
            ProviderConfig::Libvirt(libvirt) => (None, Some(libvirt), None),
            ProviderConfig::OpenStack(openstack) => (None, None, Some(openstack)),
        };
        Self {
            api_version: config.types.api_version,
            kind: config.types.kind,
            target_namespace: config.target_namespace,
            api_service_ca: config.api_service_ca,
            provider,
            aws,
            libvirt,
            openstack,
        }
    }
}

impl TryFrom<OperatorConfigDocument> for OperatorConfig {
    type Error = OperatorConfigError;

    fn try_from(doc: OperatorConfigDocument) -> Result<Self, Self::Error> {
        let mut sections = Vec::with_capacity(1);
        if let Some(aws) = doc.aws {
            sections.push(ProviderConfig::Aws(aws));
        }
        if let Some(libvirt) = doc.libvirt {
            sections.push(ProviderConfig::Libvirt(libvirt));
        }
        if let Some(openstack) = doc.openstack {
            sections.push(ProviderConfig::OpenStack(openstack));
        }

        if sections.len() > 1 {
            return Err(OperatorConfigError::MultipleProviderSections {
                sections: sections
                    .iter()
                    .map(ProviderConfig::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        let provider = sections
            .pop()
            .ok_or_else(|| OperatorConfigError::MissingProviderSection {
                provider: doc.provider.clone(),
            })?;
        if provider.name() != doc.provider {
            return Err(OperatorConfigError::ProviderMismatch {
                provider: doc.provider,
                section: provider.name().to_string(),
            });
        }

        Ok(Self {
            types: TypeMeta {
                api_version: doc.api_version,
                kind: doc.kind,
            },
            target_namespace: doc.target_namespace,
            api_service_ca: doc.api_service_ca,
            provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn libvirt_config() -> OperatorConfig {
        OperatorConfig::new(
            "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n",
            ProviderConfig::Libvirt(LibvirtConfig::new(
                "demo",
                "qemu:///system",
                "tectonic",
                "10.0.0.0/24",
            )),
        )
    }

    #[test]
    fn serializes_inactive_providers_as_null() {
        let yaml = serde_yaml::to_string(&libvirt_config()).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "machineAPIOperatorConfig");
        assert_eq!(value["targetNamespace"], "openshift-cluster-api");
        assert_eq!(value["provider"], "libvirt");
        assert!(value["aws"].is_null());
        assert!(value["openstack"].is_null());
        assert_eq!(value["libvirt"]["networkName"], "tectonic");
        assert_eq!(value["libvirt"]["iprange"], "10.0.0.0/24");
        assert_eq!(value["libvirt"]["replicas"], 0);
    }

    #[test]
    fn document_round_trips() {
        let config = OperatorConfig::new(
            "ca",
            ProviderConfig::Aws(AwsConfig::new("demo", "id-1", "us-east-1", "ami-1234")),
        );
        let yaml = serde_yaml::to_string(&config).unwrap();
        let decoded: OperatorConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(decoded, config);
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value["aws"]["availabilityZone"], "");
    }

    #[test]
    fn rejects_document_with_two_provider_sections() {
        let err = serde_yaml::from_str::<OperatorConfig>(
            r#"
apiVersion: v1
kind: machineAPIOperatorConfig
targetNamespace: openshift-cluster-api
apiServiceCA: ca
provider: aws
aws:
  clusterName: demo
  clusterID: id
  region: us-east-1
  availabilityZone: ""
  image: ami-1
  replicas: 0
openstack:
  clusterName: demo
  clusterID: id
  region: RegionOne
  replicas: 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than one provider section"));
    }

    #[test]
    fn rejects_document_without_provider_section() {
        let err = serde_yaml::from_str::<OperatorConfig>(
            r#"
targetNamespace: openshift-cluster-api
apiServiceCA: ca
provider: libvirt
aws: null
libvirt: null
openstack: null
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("has no provider section"));
    }

    #[test]
    fn rejects_provider_name_mismatch() {
        let err = serde_yaml::from_str::<OperatorConfig>(
            r#"
targetNamespace: openshift-cluster-api
apiServiceCA: ca
provider: aws
openstack:
  clusterName: demo
  clusterID: id
  region: RegionOne
  replicas: 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declares provider 'aws'"));
    }

    #[test]
    fn constructors_pin_replicas_to_zero() {
        assert_eq!(libvirt_config().replicas(), 0);
        assert_eq!(OpenStackConfig::new("a", "b", "c").replicas, 0);
        assert_eq!(AwsConfig::new("a", "b", "c", "d").replicas, 0);
    }
}
