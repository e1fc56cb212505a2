//! Preferences: credentials and service endpoints.
//!
//! Values come from command line flags, then environment variables (both
//! through clap), then a TOML preferences file in the user's config
//! directory.

use clap::Args;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_TATUM_API_URL: &str = "https://api.tatum.io";
pub const DEFAULT_MARKETPLACE_URL: &str = "https://testnets.opensea.io";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing preference `{name}`: pass --{flag} or set {env}")]
    Missing {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },
    #[error("invalid URL for `{name}` ({value}): {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read preferences file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse preferences file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Raw, possibly incomplete preferences. Parsed from flags/env by clap and
/// from the preferences file by serde, using the same field names.
#[derive(Debug, Clone, Default, Args, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreferenceArgs {
    /// Pinata JWT used as bearer token for both pinning endpoints
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pub pinata_jwt: Option<String>,

    /// Dedicated IPFS gateway, used to print a link to the pinned image
    #[arg(long, env = "GATEWAY")]
    pub gateway: Option<String>,

    /// Tatum API key sent as `x-api-key` to the minting endpoint
    #[arg(long, env = "TATUM_KEY", hide_env_values = true)]
    pub tatum_key: Option<String>,

    /// Base URL of the Pinata API
    #[arg(long, env = "PINATA_API_URL")]
    pub pinata_api_url: Option<String>,

    /// Base URL of the Tatum API
    #[arg(long, env = "TATUM_API_URL")]
    pub tatum_api_url: Option<String>,

    /// Marketplace base URL; the wallet address is appended to it
    #[arg(long, env = "MARKETPLACE_URL")]
    pub marketplace_url: Option<String>,
}

impl PreferenceArgs {
    /// Fill every unset value from `fallback`.
    pub fn merge(self, fallback: PreferenceArgs) -> PreferenceArgs {
        PreferenceArgs {
            pinata_jwt: self.pinata_jwt.or(fallback.pinata_jwt),
            gateway: self.gateway.or(fallback.gateway),
            tatum_key: self.tatum_key.or(fallback.tatum_key),
            pinata_api_url: self.pinata_api_url.or(fallback.pinata_api_url),
            tatum_api_url: self.tatum_api_url.or(fallback.tatum_api_url),
            marketplace_url: self.marketplace_url.or(fallback.marketplace_url),
        }
    }

    /// Read a TOML preferences file.
    pub fn from_file(path: &Path) -> Result<PreferenceArgs, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved preferences, built once at startup and handed to the API
/// client and the orchestrator.
#[derive(Clone)]
pub struct Preferences {
    pub pinata_jwt: String,
    pub gateway: Option<Url>,
    pub tatum_key: String,
    pub pinata_api_url: Url,
    pub tatum_api_url: Url,
    pub marketplace_url: Url,
}

impl Preferences {
    /// Resolve `args` against the preferences file. An explicit `config`
    /// path must exist; the default file is optional.
    pub fn load(args: PreferenceArgs, config: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config {
            Some(path) => Some(PreferenceArgs::from_file(path)?),
            None => match default_config_path() {
                Some(path) if path.is_file() => Some(PreferenceArgs::from_file(&path)?),
                _ => None,
            },
        };
        let args = match file {
            Some(file) => args.merge(file),
            None => args,
        };
        Preferences::try_from(args)
    }

    /// Link to the pinned content on the configured gateway, if any.
    pub fn gateway_link(&self, hash: &str) -> Option<Url> {
        self.gateway
            .as_ref()
            .and_then(|gateway| gateway.join(&format!("ipfs/{}", hash)).ok())
    }
}

impl TryFrom<PreferenceArgs> for Preferences {
    type Error = ConfigError;

    fn try_from(args: PreferenceArgs) -> Result<Self, Self::Error> {
        let pinata_jwt = required(args.pinata_jwt, "pinata_jwt", "pinata-jwt", "PINATA_JWT")?;
        let tatum_key = required(args.tatum_key, "tatum_key", "tatum-key", "TATUM_KEY")?;
        let gateway = args
            .gateway
            .filter(|g| !g.is_empty())
            .map(|g| parse_url("gateway", &g))
            .transpose()?;

        Ok(Preferences {
            pinata_jwt,
            gateway,
            tatum_key,
            pinata_api_url: parse_url(
                "pinata_api_url",
                args.pinata_api_url.as_deref().unwrap_or(DEFAULT_PINATA_API_URL),
            )?,
            tatum_api_url: parse_url(
                "tatum_api_url",
                args.tatum_api_url.as_deref().unwrap_or(DEFAULT_TATUM_API_URL),
            )?,
            marketplace_url: parse_url(
                "marketplace_url",
                args.marketplace_url.as_deref().unwrap_or(DEFAULT_MARKETPLACE_URL),
            )?,
        })
    }
}

/// `<config dir>/nft-mint/preferences.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nft-mint").join("preferences.toml"))
}

fn required(
    value: Option<String>,
    name: &'static str,
    flag: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { name, flag, env })
}

// Base URLs always end in `/` so joining relative paths keeps any prefix.
fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
