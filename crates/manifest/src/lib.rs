pub mod asset;
mod machine_api_operator;

pub use asset::{Asset, Dependency, DirectoryFetcher, FetchError, FileFetcher, WritableAsset};
pub use machine_api_operator::{
    ASSET_NAME, Error, MachineApiOperator, marshal_operator_config, render_operator_config,
};
