use std::path::Path;

use shotpack_export_core::ExportConfig;

/// Layer the export configuration: built-in defaults, then an optional
/// `shotpack.{toml,json,...}` in the working directory, then `--config`,
/// then `SHOTPACK__*` environment overrides
/// (e.g. `SHOTPACK__FLOAT_MANTISSA_BITS=16`).
pub fn load(explicit: Option<&Path>) -> Result<ExportConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("shotpack").required(false));
    if let Some(path) = explicit {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    builder
        .add_source(config::Environment::with_prefix("SHOTPACK").separator("__"))
        .build()?
        .try_deserialize()
}
