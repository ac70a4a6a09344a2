//! The ledger: owner of the chain and the pending buffer.
//!
//! Write path for one event:
//!
//!   validate → build entry → persist row → hash → buffer → [seal batch]
//!
//! Locking discipline: a single `Mutex<LedgerState>` guards the chain, the
//! buffer, `last_block_hash` and the `mining` flag. Persistence and the nonce
//! search both run outside the lock. A batch is copied out under the lock,
//! mined on that private copy, and appended by re-acquiring the lock. The
//! `mining` flag makes the check-then-act on buffer size race-free: only the
//! caller that set it may seal, and it keeps sealing while full batches
//! remain, so entries buffered by others during mining are picked up.
//!
//! Recovery: rows whose chain hash could not be attached after sealing are
//! kept in an `unlinked` list and retried on every later seal. On startup,
//! durable rows with no chain hash are either relinked (their entry is
//! already in the restored chain) or re-buffered in row-id order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use auditledger_chain::{hash_block, hash_entry, meets_difficulty};
use auditledger_contracts::{
    block::{Block, CandidateBlock},
    entry::{AuditEntry, EventRequest},
    error::{LedgerError, LedgerResult},
    row::AuditRow,
};

use crate::{
    config::LedgerConfig,
    miner::ProofOfWorkMiner,
    traits::{ChainStore, DurableAuditStore, Miner},
};

// ── Internal mutable state ────────────────────────────────────────────────────

/// An entry that is durable but not yet sealed into a block.
#[derive(Debug, Clone)]
pub(crate) struct PendingEntry {
    pub(crate) entry: AuditEntry,
    pub(crate) row_id: u64,
    pub(crate) transaction_hash: String,
}

/// A sealed entry whose durable row still lacks its chain hash.
#[derive(Debug, Clone)]
pub(crate) struct RowLink {
    pub(crate) row_id: u64,
    pub(crate) transaction_hash: String,
}

pub(crate) struct LedgerState {
    /// Append-only arena of sealed blocks; position == block index.
    pub(crate) chain: Vec<Block>,
    /// Entries awaiting sealing, in submission order.
    pub(crate) pending: Vec<PendingEntry>,
    /// Hash the next block must link to. Empty before initialization.
    pub(crate) last_block_hash: String,
    /// Sealed rows whose attach failed; retried after every seal.
    pub(crate) unlinked: Vec<RowLink>,
    /// Set while one caller owns the nonce search.
    pub(crate) mining: bool,
}

// ── Public ledger ─────────────────────────────────────────────────────────────

/// The process-wide audit ledger.
///
/// Construct once at startup, call `initialize()`, then share it behind an
/// `Arc`. All methods take `&self` and are safe to call from many threads.
pub struct Ledger {
    config: LedgerConfig,
    store: Arc<dyn DurableAuditStore>,
    chain_store: Box<dyn ChainStore>,
    miner: Box<dyn Miner>,
    pub(crate) state: Mutex<LedgerState>,
}

impl Ledger {
    /// Build a ledger around its collaborators. The chain stays empty until
    /// `initialize()` runs.
    pub fn new(
        config: LedgerConfig,
        store: Arc<dyn DurableAuditStore>,
        chain_store: Box<dyn ChainStore>,
        miner: Box<dyn Miner>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            chain_store,
            miner,
            state: Mutex::new(LedgerState {
                chain: Vec::new(),
                pending: Vec::new(),
                last_block_hash: String::new(),
                unlinked: Vec::new(),
                mining: false,
            }),
        })
    }

    /// Build a ledger with a `ProofOfWorkMiner` capped by
    /// `config.max_mining_attempts`.
    pub fn with_proof_of_work(
        config: LedgerConfig,
        store: Arc<dyn DurableAuditStore>,
        chain_store: Box<dyn ChainStore>,
    ) -> LedgerResult<Self> {
        let miner = ProofOfWorkMiner::from_config(&config);
        Self::new(config, store, chain_store, Box::new(miner))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> usize {
        self.config.difficulty
    }

    /// The durable store this ledger writes rows to.
    pub fn store(&self) -> Arc<dyn DurableAuditStore> {
        Arc::clone(&self.store)
    }

    /// Load the persisted chain, or mine and persist a genesis block when
    /// there is none, then recover durable rows that were never sealed.
    ///
    /// On reload `last_block_hash` is recomputed from the last block's own
    /// fields rather than taken from its stored `hash`. Unsealed rows are
    /// re-buffered in row-id order; if that fills a batch it is sealed
    /// before returning. A mining error there is returned with the ledger
    /// already initialized and the entries still pending. Calling this on
    /// an initialized ledger is a no-op.
    pub fn initialize(&self) -> LedgerResult<()> {
        let pending_len = {
            let mut state = self.lock_state()?;
            if !state.chain.is_empty() {
                debug!(blocks = state.chain.len(), "ledger already initialized");
                return Ok(());
            }

            // Nothing can submit before initialization completes, so the work
            // below blocks no one even though it holds the lock.
            let restored = self.chain_store.load()?;
            if let Some(last) = restored.last() {
                let recomputed = hash_block(last);
                if recomputed != last.hash {
                    warn!(
                        index = last.index,
                        stored = %last.hash,
                        recomputed = %recomputed,
                        "last persisted block does not match its stored hash"
                    );
                }
                info!(
                    blocks = restored.len(),
                    last_block_hash = %recomputed,
                    "audit chain restored"
                );
                state.last_block_hash = recomputed;
                state.chain = restored;
            } else {
                let genesis = self.miner.mine(CandidateBlock::genesis(Utc::now()), self.config.difficulty)?;
                self.check_sealed(&genesis)?;
                self.chain_store.append(&genesis)?;

                info!(
                    hash = %genesis.hash,
                    nonce = genesis.nonce,
                    difficulty = self.config.difficulty,
                    "genesis block created"
                );

                state.last_block_hash = genesis.hash.clone();
                state.chain.push(genesis);
            }

            self.recover_unsealed(&mut state)?;
            state.pending.len()
        };

        if pending_len >= self.config.block_size {
            self.seal_batches(false)?;
        }
        Ok(())
    }

    /// Record one event and return its transaction hash.
    ///
    /// The row is persisted before the entry is buffered, so a failure to
    /// mine never loses the event. When the buffer reaches `block_size` the
    /// calling thread seals the batch before returning; a mining error is
    /// returned to the caller but leaves the buffer intact.
    pub fn record_event(&self, request: EventRequest) -> LedgerResult<String> {
        let event_type = request.validate()?;
        self.ensure_initialized()?;

        let entry = AuditEntry::from_request(request, event_type, Utc::now());
        let saved = self.store.save(AuditRow::from_entry(&entry))?;
        let row_id = saved.id.ok_or_else(|| LedgerError::Persistence {
            reason: "durable store returned a row without an id".to_string(),
        })?;
        let transaction_hash = hash_entry(&entry);

        let pending_len = {
            let mut state = self.lock_state()?;
            state.pending.push(PendingEntry {
                entry,
                row_id,
                transaction_hash: transaction_hash.clone(),
            });
            state.pending.len()
        };

        debug!(
            row_id,
            transaction_hash = %transaction_hash,
            pending = pending_len,
            block_size = self.config.block_size,
            "audit event buffered"
        );

        if pending_len >= self.config.block_size {
            self.seal_batches(false)?;
        }

        Ok(transaction_hash)
    }

    /// Seal every pending entry now, regardless of the batch threshold.
    ///
    /// Returns the last block sealed, or `None` when the buffer was empty or
    /// another caller is mining.
    pub fn mine_pending(&self) -> LedgerResult<Option<Block>> {
        self.ensure_initialized()?;
        self.seal_batches(true)
    }

    /// Find a committed entry by transaction hash. The pending buffer is not
    /// searched.
    pub fn find_entry(&self, transaction_hash: &str) -> LedgerResult<Option<AuditEntry>> {
        Ok(self.locate_entry(transaction_hash)?.map(|(_, entry)| entry))
    }

    /// Like `find_entry`, also returning the index of the holding block.
    pub fn locate_entry(&self, transaction_hash: &str) -> LedgerResult<Option<(u64, AuditEntry)>> {
        let state = self.lock_state()?;
        for block in &state.chain {
            if let Some(entry) = block.entries.iter().find(|e| hash_entry(e) == transaction_hash) {
                return Ok(Some((block.index, entry.clone())));
            }
        }
        Ok(None)
    }

    /// True when the entry is durable but still waiting to be sealed.
    pub fn is_pending(&self, transaction_hash: &str) -> LedgerResult<bool> {
        let state = self.lock_state()?;
        Ok(state.pending.iter().any(|p| p.transaction_hash == transaction_hash))
    }

    /// A stable copy of the committed chain. Never contains a half-appended
    /// block.
    pub fn snapshot(&self) -> LedgerResult<Vec<Block>> {
        Ok(self.lock_state()?.chain.clone())
    }

    pub fn block(&self, index: u64) -> LedgerResult<Option<Block>> {
        let state = self.lock_state()?;
        Ok(usize::try_from(index).ok().and_then(|i| state.chain.get(i)).cloned())
    }

    /// Number of committed blocks, genesis included.
    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.lock_state()?.chain.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.lock_state()?.chain.is_empty())
    }

    pub fn pending_len(&self) -> LedgerResult<usize> {
        Ok(self.lock_state()?.pending.len())
    }

    /// Entries waiting to be sealed, in submission order.
    pub fn pending_entries(&self) -> LedgerResult<Vec<AuditEntry>> {
        let state = self.lock_state()?;
        Ok(state.pending.iter().map(|p| p.entry.clone()).collect())
    }

    pub fn last_block_hash(&self) -> LedgerResult<String> {
        Ok(self.lock_state()?.last_block_hash.clone())
    }

    /// Number of sealed rows still waiting for their chain hash.
    pub fn unlinked_len(&self) -> LedgerResult<usize> {
        Ok(self.lock_state()?.unlinked.len())
    }

    /// Retry attaching chain hashes to sealed rows left unlinked by an
    /// earlier failure. Returns how many remain unlinked.
    pub fn relink(&self) -> LedgerResult<usize> {
        let links = std::mem::take(&mut self.lock_state()?.unlinked);
        let failed = self.link_rows(links);
        let mut state = self.lock_state()?;
        state.unlinked.extend(failed);
        Ok(state.unlinked.len())
    }

    // ── Sealing ───────────────────────────────────────────────────────────────

    /// Seal full batches until the buffer drops below `block_size`. With
    /// `force`, the first batch takes everything pending.
    fn seal_batches(&self, force: bool) -> LedgerResult<Option<Block>> {
        let mut force = force;
        let mut last_sealed = None;

        loop {
            let (candidate, count) = {
                let mut state = self.lock_state()?;
                if state.mining {
                    debug!(pending = state.pending.len(), "another caller is mining; leaving batch to it");
                    break;
                }
                let ready = state.pending.len() >= self.config.block_size
                    || (force && !state.pending.is_empty());
                if !ready {
                    break;
                }

                let count = if force {
                    state.pending.len()
                } else {
                    self.config.block_size
                };
                let candidate = CandidateBlock {
                    index: state.chain.len() as u64,
                    timestamp: Utc::now(),
                    previous_hash: state.last_block_hash.clone(),
                    entries: state.pending[..count].iter().map(|p| p.entry.clone()).collect(),
                };
                state.mining = true;
                (candidate, count)
            };

            let block = match self.mine_and_persist(candidate) {
                Ok(block) => block,
                Err(e) => {
                    warn!(error = %e, pending = count, "sealing failed; pending entries retained");
                    if let Ok(mut state) = self.state.lock() {
                        state.mining = false;
                    }
                    return Err(e);
                }
            };

            let links: Vec<RowLink> = {
                let mut state = self.lock_state()?;
                state.last_block_hash = block.hash.clone();
                state.chain.push(block.clone());
                state.mining = false;
                let mut links = std::mem::take(&mut state.unlinked);
                links.extend(state.pending.drain(..count).map(|p| RowLink {
                    row_id: p.row_id,
                    transaction_hash: p.transaction_hash,
                }));
                links
            };

            info!(
                index = block.index,
                entries = count,
                nonce = block.nonce,
                hash = %block.hash,
                "block sealed"
            );

            let failed = self.link_rows(links);
            if !failed.is_empty() {
                self.lock_state()?.unlinked.extend(failed);
            }
            last_sealed = Some(block);
            force = false;
        }

        Ok(last_sealed)
    }

    fn mine_and_persist(&self, candidate: CandidateBlock) -> LedgerResult<Block> {
        let block = self.miner.mine(candidate, self.config.difficulty)?;
        self.check_sealed(&block)?;
        self.chain_store.append(&block)?;
        Ok(block)
    }

    /// Reject a block whose hash the miner got wrong before it reaches the
    /// chain.
    fn check_sealed(&self, block: &Block) -> LedgerResult<()> {
        if hash_block(block) != block.hash || !meets_difficulty(&block.hash, self.config.difficulty) {
            return Err(LedgerError::Mining {
                reason: format!("miner returned an invalid seal for block {}", block.index),
            });
        }
        Ok(())
    }

    /// Link sealed entries back to their durable rows, returning the links
    /// that failed.
    ///
    /// The block is already committed at this point; a failed attach leaves
    /// the row durable but unlinked, which the caller queues for retry.
    fn link_rows(&self, links: Vec<RowLink>) -> Vec<RowLink> {
        let mut failed = Vec::new();
        for link in links {
            if let Err(e) = self.store.attach_chain_hash(link.row_id, &link.transaction_hash) {
                warn!(
                    row_id = link.row_id,
                    transaction_hash = %link.transaction_hash,
                    error = %e,
                    "failed to attach chain hash to audit row"
                );
                failed.push(link);
            }
        }
        failed
    }

    /// Bring durable rows with no chain hash back under the ledger.
    ///
    /// A row whose entry id appears in the chain was sealed before its
    /// attach went through, so it is relinked. Any other row was durable but
    /// never sealed, so its entry is rebuilt and re-buffered.
    fn recover_unsealed(&self, state: &mut LedgerState) -> LedgerResult<()> {
        let mut rows = self.store.find_unsealed()?;
        if rows.is_empty() {
            return Ok(());
        }
        rows.sort_by_key(|row| row.id);

        let sealed: HashMap<Uuid, String> = state
            .chain
            .iter()
            .flat_map(|block| block.entries.iter())
            .map(|entry| (entry.id, hash_entry(entry)))
            .collect();

        let mut relink = Vec::new();
        let mut requeued = 0usize;
        for row in rows {
            let Some(row_id) = row.id else {
                warn!(entry_id = %row.entry_id, "unsealed row has no id; skipping");
                continue;
            };
            if let Some(transaction_hash) = sealed.get(&row.entry_id) {
                relink.push(RowLink {
                    row_id,
                    transaction_hash: transaction_hash.clone(),
                });
                continue;
            }
            let entry = row.to_entry();
            let transaction_hash = hash_entry(&entry);
            state.pending.push(PendingEntry {
                entry,
                row_id,
                transaction_hash,
            });
            requeued += 1;
        }

        let relinked = relink.len();
        let failed = self.link_rows(relink);
        info!(
            requeued,
            relinked = relinked - failed.len(),
            still_unlinked = failed.len(),
            "recovered unsealed audit rows"
        );
        state.unlinked.extend(failed);
        Ok(())
    }

    fn ensure_initialized(&self) -> LedgerResult<()> {
        if self.lock_state()?.chain.is_empty() {
            return Err(LedgerError::NotInitialized);
        }
        Ok(())
    }

    fn lock_state(&self) -> LedgerResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|e| LedgerError::StateCorrupted {
            reason: format!("ledger state lock poisoned: {}", e),
        })
    }
}
