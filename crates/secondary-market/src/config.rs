use {
    alloy::primitives::Address,
    anyhow::{Context, Result, ensure},
    model::order::ReplayScheme,
    serde::Deserialize,
    std::path::Path,
};

/// Deployment configuration of a market, read from a TOML file.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Chain the market is deployed on. Any chain is accepted if unset.
    pub chain_id: Option<u64>,

    /// Address of the market contract. It is part of the EIP-712 domain.
    pub market: Address,

    #[serde(default)]
    pub replay_protection: ReplayScheme,

    #[serde(default)]
    pub logging: Logging,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Logging {
    #[serde(default = "default_env_filter")]
    pub env_filter: String,

    #[serde(default)]
    pub use_json_format: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            env_filter: default_env_filter(),
            use_json_format: false,
        }
    }
}

fn default_env_filter() -> String {
    "info,secondary_market=debug".to_string()
}

/// Address and replay protection scheme of a market instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deployment {
    pub address: Address,
    pub replay_protection: ReplayScheme,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read market config {}", path.display()))?;
        data.parse()
            .with_context(|| format!("failed to parse market config {}", path.display()))
    }

    /// Returns the deployment this config describes on the chain with
    /// `chain_id`.
    pub fn deployment(&self, chain_id: u64) -> Result<Deployment> {
        if let Some(expected) = self.chain_id {
            ensure!(
                expected == chain_id,
                "market is configured for chain {expected} but storage is on chain {chain_id}"
            );
        }
        Ok(Deployment {
            address: self.market,
            replay_protection: self.replay_protection,
        })
    }

    pub fn observe(&self) -> observe::Config {
        observe::Config::new(&self.logging.env_filter, self.logging.use_json_format)
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
