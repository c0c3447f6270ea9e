//! Consensus and runtime configuration for **flowchain** core.
//!
//! [`ChainConfig`] centralises every tunable DESIGN NOTES calls for: no
//! ambient state, one explicit struct threaded into every `BlockFlow` and
//! validator constructor. It is built via the fluent [`ChainConfigBuilder`],
//! the same pattern the teacher crate used for its (much smaller) `Config`.
//!
//! Loading from TOML/env/CLI is plumbing that lives in `flowchain-cli`;
//! this module only owns the struct and its field-level validation.
//!
//! ```
//! use flowchain_core::config::ChainConfig;
//!
//! let cfg = ChainConfig::default();
//! assert_eq!(cfg.consensus.num_zeros_at_least_in_hash, 8);
//! assert_eq!(cfg.broker.group_num, 4);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which shards this broker serves, and how many total groups the network has.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Total shard groups `G` in the network. Total chains = `G * G`.
    pub group_num: u32,
    /// This broker's 0-based index among `broker_num` colocated brokers.
    pub broker_id: u32,
    /// Number of brokers in the clique; each serves a contiguous slice of
    /// `from` groups.
    pub broker_num: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { group_num: 4, broker_id: 0, broker_num: 1 }
    }
}

/// PoW difficulty and confirmation-depth parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsensusConfig {
    /// Target milliseconds between blocks on a single chain.
    pub block_target_time_ms: u64,
    /// Genesis leading-zero-bit difficulty; retargeted thereafter.
    pub num_zeros_at_least_in_hash: u32,
    /// Confirmation depth `K` (§4.2 Confirmation).
    pub block_confirm_num: u64,
    /// Number of blocks between difficulty retarget evaluations.
    pub difficulty_retarget_interval: u64,
    /// Maximum milliseconds a header's timestamp may be ahead of local time.
    pub clock_drift_tolerance_ms: i64,
    /// Maximum total gas a single block may spend across its transactions.
    pub block_gas_limit: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            block_target_time_ms: 64_000,
            num_zeros_at_least_in_hash: 8,
            block_confirm_num: 5,
            difficulty_retarget_interval: 2048,
            clock_drift_tolerance_ms: 15 * 60 * 1000,
            block_gas_limit: 10_000_000,
        }
    }
}

/// Endpoints the node binds/dials; owned here only so the core can be
/// constructed from one config value, per DESIGN NOTES.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub bind_address: String,
    pub external_address: Option<String>,
    pub coordinator_address: Option<String>,
    pub rest_port: u16,
    pub ws_port: u16,
    pub miner_api_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9973".into(),
            external_address: None,
            coordinator_address: None,
            rest_port: 12973,
            ws_port: 11973,
            miner_api_port: 10973,
        }
    }
}

/// Miner-facing parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    pub batch_delay_ms: u64,
    pub miner_addresses: Vec<String>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self { batch_delay_ms: 0, miner_addresses: Vec::new() }
    }
}

/// Wallet service parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    pub port: u16,
    pub secret_dir: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self { port: 15973, secret_dir: "./wallets".into() }
    }
}

/// The single explicit configuration object threaded into every `BlockFlow`,
/// `ForkTree`, and validator constructor (DESIGN NOTES: "implicit configuration
/// objects").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChainConfig {
    pub network: NetworkConfig,
    pub broker: BrokerConfig,
    pub consensus: ConsensusConfig,
    pub mining: MiningConfig,
    pub wallet: WalletConfig,
}

impl ChainConfig {
    /// Validates cross-field invariants that a bare `Deserialize` cannot
    /// express: group count must be positive, this broker's id must be in
    /// range, and the confirmation depth must be reachable.
    pub fn validate(&self) -> Result<()> {
        if self.broker.group_num == 0 {
            return Err(Error::Compiler("broker.group_num must be >= 1".into()));
        }
        if self.broker.broker_num == 0 || self.broker.broker_id >= self.broker.broker_num {
            return Err(Error::Compiler("broker.broker_id out of range".into()));
        }
        if self.broker.group_num % self.broker.broker_num != 0 {
            return Err(Error::Compiler(
                "broker.group_num must be evenly divisible by broker.broker_num".into(),
            ));
        }
        if self.consensus.block_confirm_num == 0 {
            return Err(Error::Compiler("consensus.block_confirm_num must be >= 1".into()));
        }
        Ok(())
    }

    /// Total number of chains in the grid, `G * G`.
    pub fn chain_num(&self) -> u32 {
        self.broker.group_num * self.broker.group_num
    }

    /// The contiguous `from`-group range `[start, end)` this broker serves.
    pub fn group_range(&self) -> (u32, u32) {
        let groups_per_broker = self.broker.group_num / self.broker.broker_num;
        let start = self.broker.broker_id * groups_per_broker;
        (start, start + groups_per_broker)
    }
}

/// Fluent builder for [`ChainConfig`], mirroring the teacher crate's
/// `ConfigBuilder` but composed over the nested sub-configs.
#[derive(Default)]
pub struct ChainConfigBuilder {
    inner: ChainConfig,
}

impl ChainConfigBuilder {
    pub fn new() -> Self {
        Self { inner: ChainConfig::default() }
    }

    pub fn group_num(mut self, group_num: u32) -> Self {
        self.inner.broker.group_num = group_num;
        self
    }

    pub fn broker(mut self, broker_id: u32, broker_num: u32) -> Self {
        self.inner.broker.broker_id = broker_id;
        self.inner.broker.broker_num = broker_num;
        self
    }

    pub fn block_confirm_num(mut self, k: u64) -> Self {
        self.inner.consensus.block_confirm_num = k;
        self
    }

    pub fn difficulty(mut self, num_zeros: u32) -> Self {
        self.inner.consensus.num_zeros_at_least_in_hash = num_zeros;
        self
    }

    /// Consumes the builder, validating before returning.
    pub fn finish(self) -> Result<ChainConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ChainConfig::default();
        cfg.validate().expect("default config is valid");
        assert_eq!(cfg.chain_num(), 16);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ChainConfigBuilder::new()
            .group_num(4)
            .broker(1, 2)
            .block_confirm_num(3)
            .difficulty(16)
            .finish()
            .expect("valid config");
        assert_eq!(cfg.consensus.block_confirm_num, 3);
        assert_eq!(cfg.broker.broker_id, 1);
        assert_eq!(cfg.group_range(), (2, 4));
    }

    #[test]
    fn rejects_out_of_range_broker_id() {
        let err = ChainConfigBuilder::new().broker(2, 2).finish();
        assert!(err.is_err());
    }

    #[test]
    fn rejects_zero_confirm_num() {
        let err = ChainConfigBuilder::new().block_confirm_num(0).finish();
        assert!(err.is_err());
    }
}
