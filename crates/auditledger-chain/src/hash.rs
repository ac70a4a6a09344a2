//! SHA-256 hashing over canonical encodings.

use sha2::{Digest, Sha256};

use auditledger_contracts::{
    block::{Block, CandidateBlock},
    entry::AuditEntry,
};

use crate::canonical::{encode_block_preimage, encode_entry};

/// SHA-256 of `bytes` as 64 lowercase hex characters.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// The transaction hash identifying an entry within the chain.
pub fn hash_entry(entry: &AuditEntry) -> String {
    sha256_hex(&encode_entry(entry))
}

/// Recompute a sealed block's hash from its own fields.
pub fn hash_block(block: &Block) -> String {
    let preimage =
        encode_block_preimage(block.index, &block.timestamp, &block.previous_hash, &block.entries);
    BlockHasher::from_preimage(&preimage).hash(block.nonce)
}

/// True when `hash` starts with at least `difficulty` `'0'` characters.
///
/// A difficulty of 0 accepts every hash.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Hashes one block's content for many nonces.
///
/// The preimage is absorbed once; each `hash(nonce)` clones the absorbed
/// state and feeds only the 8 nonce bytes. The result is identical to
/// `hash_block` on the sealed block.
#[derive(Clone)]
pub struct BlockHasher {
    prefix: Sha256,
}

impl BlockHasher {
    pub fn new(candidate: &CandidateBlock) -> Self {
        let preimage = encode_block_preimage(
            candidate.index,
            &candidate.timestamp,
            &candidate.previous_hash,
            &candidate.entries,
        );
        Self::from_preimage(&preimage)
    }

    fn from_preimage(preimage: &[u8]) -> Self {
        Self {
            prefix: Sha256::new_with_prefix(preimage),
        }
    }

    pub fn hash(&self, nonce: u64) -> String {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}
