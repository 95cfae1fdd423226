use mao_config_common::AssetFile;
use snafu::{ResultExt, Snafu};
use std::io;
use std::path::{Path, PathBuf};

/// Upstream assets that must be resolved before an asset can generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dependency {
    InstallConfig,
    AggregatorCa,
}

impl Dependency {
    pub fn name(self) -> &'static str {
        match self {
            Dependency::InstallConfig => "Install Config",
            Dependency::AggregatorCa => "Certificate (aggregator)",
        }
    }
}

pub trait Asset {
    /// Human friendly name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn dependencies(&self) -> Vec<Dependency>;
}

pub trait WritableAsset: Asset {
    fn files(&self) -> Vec<&AssetFile>;

    /// Restores the asset from a previous run. Returns whether anything was found.
    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, FetchError>;
}

#[derive(Debug, Snafu)]
pub enum FetchError {
    #[snafu(display("failed to read asset file {}: {source}", path.display()))]
    Read { path: PathBuf, source: io::Error },
}

pub trait FileFetcher {
    fn fetch_by_name(&self, name: &str) -> Result<Option<AssetFile>, FetchError>;
}

/// Reads previously written asset files from an output directory.
#[derive(Clone, Debug)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileFetcher for DirectoryFetcher {
    fn fetch_by_name(&self, name: &str) -> Result<Option<AssetFile>, FetchError> {
        let path = self.root.join(name);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(AssetFile::new(name, data))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).context(ReadSnafu { path }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mao-config-asset-{}-{}",
            tag,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn dependency_names() {
        assert_eq!(Dependency::InstallConfig.name(), "Install Config");
        assert_eq!(Dependency::AggregatorCa.name(), "Certificate (aggregator)");
    }

    #[test]
    fn directory_fetcher_reads_existing_file() {
        let dir = scratch_dir("read");
        fs::write(dir.join("config.yml"), b"provider: aws\n").unwrap();

        let fetcher = DirectoryFetcher::new(&dir);
        assert_eq!(fetcher.root(), dir.as_path());
        let fetched = fetcher
            .fetch_by_name("config.yml")
            .unwrap()
            .unwrap();
        assert_eq!(fetched.filename, "config.yml");
        assert_eq!(fetched.data, b"provider: aws\n");

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn directory_fetcher_reports_missing_file_as_none() {
        let dir = scratch_dir("missing");
        assert!(
            DirectoryFetcher::new(&dir)
                .fetch_by_name("absent.yml")
                .unwrap()
                .is_none()
        );
        fs::remove_dir_all(dir).unwrap();
    }
}
