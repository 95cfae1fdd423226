use sha2::{Digest, Sha256};
use std::fmt;

pub const MAO_TARGET_NAMESPACE: &str = "openshift-cluster-api";
pub const MAO_CONFIG_FILENAME: &str = "machine-api-operator-config.yml";
pub const MAO_CONFIG_API_VERSION: &str = "v1";
pub const MAO_CONFIG_KIND: &str = "machineAPIOperatorConfig";
/// Default RHCOS channel for the cluster.
pub const DEFAULT_CHANNEL: &str = "tested";
pub const DEFAULT_RHCOS_BASE_URL: &str =
    "https://releases-rhcos.svc.ci.openshift.org/storage/releases/maipo";

pub const PROVIDER_AWS: &str = "aws";
pub const PROVIDER_LIBVIRT: &str = "libvirt";
pub const PROVIDER_OPENSTACK: &str = "openstack";

/// A generated file payload, named relative to the asset output directory.
#[derive(Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl AssetFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    pub fn digest(&self) -> String {
        content_digest(&self.data)
    }
}

impl fmt::Debug for AssetFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetFile")
            .field("filename", &self.filename)
            .field("bytes", &self.data.len())
            .field("digest", &self.digest())
            .finish()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn content_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(bytes))
}

pub fn digest_short(digest: &str) -> String {
    let trimmed = digest.strip_prefix("sha256:").unwrap_or(digest);
    trimmed.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_prefixed_and_stable() {
        let a = AssetFile::new(MAO_CONFIG_FILENAME, b"provider: aws\n".to_vec());
        let b = AssetFile::new("other.yml", b"provider: aws\n".to_vec());

        assert!(a.digest().starts_with("sha256:"));
        assert_eq!(a.digest(), b.digest());
        assert_eq!(
            content_digest(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn short_digest_drops_prefix() {
        assert_eq!(digest_short("sha256:0123456789abcdef"), "01234567");
        assert_eq!(digest_short("abc"), "abc");
    }

    #[test]
    fn debug_output_omits_payload() {
        let file = AssetFile::new(MAO_CONFIG_FILENAME, b"apiServiceCA: secret".to_vec());
        let rendered = format!("{file:?}");
        assert!(rendered.contains(MAO_CONFIG_FILENAME));
        assert!(!rendered.contains("secret"));
    }
}
