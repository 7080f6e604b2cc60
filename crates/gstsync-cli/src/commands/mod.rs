//! Subcommands and the helpers they share.

pub mod config;
pub mod preview;
pub mod push;

use std::path::{Path, PathBuf};

use tracing::debug;

use gstsync_core::models::config::GstSyncConfig;
use gstsync_core::SourceFormat;

/// Return file format, as chosen on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum FormatArg {
    /// GSTR-2A invoice export (CSV)
    Gstr2a,
    /// GSTR-2B return document (JSON)
    Gstr2b,
}

impl From<FormatArg> for SourceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Gstr2a => SourceFormat::Gstr2a,
            FormatArg::Gstr2b => SourceFormat::Gstr2b,
        }
    }
}

/// Use the explicit format if given, otherwise go by file extension.
pub fn resolve_format(input: &Path, arg: Option<FormatArg>) -> anyhow::Result<SourceFormat> {
    if let Some(arg) = arg {
        return Ok(arg.into());
    }

    SourceFormat::from_path(input).ok_or_else(|| {
        anyhow::anyhow!(
            "Cannot tell the format of {} from its extension. Pass --format gstr2a or --format gstr2b.",
            input.display()
        )
    })
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gstsync")
        .join("config.json")
}

/// Config path in effect: the `--config` flag, else the default location.
pub fn config_path(flag: Option<&str>) -> PathBuf {
    flag.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the config from `--config`, the default location, or defaults.
pub fn load_config(flag: Option<&str>) -> anyhow::Result<GstSyncConfig> {
    if let Some(path) = flag {
        return Ok(GstSyncConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(GstSyncConfig::from_file(&path)?)
    } else {
        Ok(GstSyncConfig::default())
    }
}
