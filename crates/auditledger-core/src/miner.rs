//! Single-threaded proof-of-work miner.
//!
//! Starting at nonce 0, the miner hashes the candidate and increments the
//! nonce until the hash's first `difficulty` hex characters are all `'0'`.
//! Expected work is 16^difficulty hashes, so every extra unit of difficulty
//! costs roughly 16x more CPU time; values past single digits are not
//! practical on one core.

use tracing::{debug, warn};

use auditledger_chain::{meets_difficulty, BlockHasher};
use auditledger_contracts::{
    block::{Block, CandidateBlock},
    error::{LedgerError, LedgerResult},
};

use crate::{config::LedgerConfig, traits::Miner};

/// Hash width in hex characters; no hash can have more leading zeros.
pub const MAX_DIFFICULTY: usize = 64;

/// Brute-force nonce search with an optional attempt cap.
#[derive(Debug, Clone, Default)]
pub struct ProofOfWorkMiner {
    max_attempts: Option<u64>,
}

impl ProofOfWorkMiner {
    /// A miner that searches until it succeeds.
    pub fn new() -> Self {
        Self { max_attempts: None }
    }

    /// A miner that gives up with `LedgerError::Mining` after `max_attempts`
    /// hashes.
    pub fn with_max_attempts(max_attempts: u64) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// A miner capped by `config.max_mining_attempts`, if set.
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            max_attempts: config.max_mining_attempts,
        }
    }

    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }
}

impl Miner for ProofOfWorkMiner {
    fn mine(&self, candidate: CandidateBlock, difficulty: usize) -> LedgerResult<Block> {
        if difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config {
                reason: format!("difficulty {} exceeds hash width {}", difficulty, MAX_DIFFICULTY),
            });
        }

        let hasher = BlockHasher::new(&candidate);
        let mut nonce: u64 = 0;

        loop {
            if let Some(cap) = self.max_attempts {
                if nonce >= cap {
                    warn!(
                        index = candidate.index,
                        difficulty,
                        attempts = nonce,
                        "nonce search hit attempt cap"
                    );
                    return Err(LedgerError::Mining {
                        reason: format!(
                            "no nonce satisfied difficulty {} for block {} within {} attempts",
                            difficulty, candidate.index, cap
                        ),
                    });
                }
            }

            let hash = hasher.hash(nonce);
            if meets_difficulty(&hash, difficulty) {
                debug!(
                    index = candidate.index,
                    difficulty,
                    nonce,
                    hash = %hash,
                    "block mined"
                );
                return Ok(candidate.seal(nonce, hash));
            }

            nonce = nonce.checked_add(1).ok_or_else(|| LedgerError::Mining {
                reason: format!("nonce space exhausted for block {}", candidate.index),
            })?;
        }
    }
}
