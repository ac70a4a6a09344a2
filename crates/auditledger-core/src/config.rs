//! Ledger configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! block_size = 10
//! difficulty = 4
//! max_mining_attempts = 50000000
//! chain_path = "data/chain.jsonl"
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use auditledger_contracts::error::{LedgerError, LedgerResult};

use crate::miner::MAX_DIFFICULTY;

/// Tunables for batching and mining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Pending entries that trigger mining of a new block.
    pub block_size: usize,

    /// Required leading `'0'` hex characters in every block hash.
    ///
    /// Mining cost grows 16x per step.
    pub difficulty: usize,

    /// Cap on nonce attempts per block. `None` searches without bound.
    ///
    /// Read by `Ledger::with_proof_of_work`; a ledger built with
    /// `Ledger::new` uses whatever cap its injected miner carries.
    pub max_mining_attempts: Option<u64>,

    /// Where the JSON-lines chain file lives, for binaries that persist it.
    pub chain_path: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            block_size: 10,
            difficulty: 4,
            max_mining_attempts: None,
            chain_path: None,
        }
    }
}

impl LedgerConfig {
    /// Parse `s` as TOML and validate the result.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML ledger configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read ledger config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.block_size == 0 {
            return Err(LedgerError::Config {
                reason: "block_size must be at least 1".to_string(),
            });
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config {
                reason: format!("difficulty must be at most {}, got {}", MAX_DIFFICULTY, self.difficulty),
            });
        }
        if self.max_mining_attempts == Some(0) {
            return Err(LedgerError::Config {
                reason: "max_mining_attempts must be positive when set".to_string(),
            });
        }
        Ok(())
    }
}
