//! Layers a `ChainConfig` from a TOML file, `FLOWCHAIN_*` environment
//! variables, and CLI overrides, the config-file-then-env-then-flags order
//! the broader ecosystem uses (§2.1 Configuration).

use std::path::Path;

use anyhow::Context;
use flowchain_core::config::ChainConfig;

/// Loads and validates a [`ChainConfig`]. `path` is optional — a missing
/// file is not an error, since the environment/CLI layers alone are enough
/// for a single-node dev setup.
pub fn load(path: Option<&Path>) -> anyhow::Result<ChainConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(false));
    } else {
        builder = builder.add_source(config::File::with_name("flowchain").required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix("FLOWCHAIN").separator("__"));

    let layered = builder.build().context("loading configuration layers")?;
    let cfg: ChainConfig = layered.try_deserialize().context("deserializing ChainConfig")?;
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}
