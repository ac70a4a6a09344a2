//! Append-only JSON-lines chain file.
//!
//! One sealed block per line, in append order. Each append is flushed and
//! synced before returning, so a block the ledger has committed survives a
//! crash. Blank lines are skipped on load.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use auditledger_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
};
use auditledger_core::traits::ChainStore;

/// A `ChainStore` backed by a `.jsonl` file.
pub struct JsonLinesChainStore {
    path: PathBuf,
    // Serializes appends from this process.
    write_lock: Mutex<()>,
}

impl JsonLinesChainStore {
    /// Use the file at `path`, creating parent directories as needed. The file
    /// itself is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::Persistence {
                    reason: format!("failed to create chain directory '{}': {}", parent.display(), e),
                })?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read every block from a chain file without building a store.
pub fn load_chain_file(path: &Path) -> LedgerResult<Vec<Block>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(LedgerError::Persistence {
                reason: format!("failed to open chain file '{}': {}", path.display(), e),
            })
        }
    };

    let mut blocks = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| LedgerError::Persistence {
            reason: format!("failed to read chain line {}: {}", line_num + 1, e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let block: Block = serde_json::from_str(&line).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to parse block at line {}: {}", line_num + 1, e),
        })?;
        blocks.push(block);
    }

    info!(path = %path.display(), blocks = blocks.len(), "chain file loaded");
    Ok(blocks)
}

fn write_synced(file: &mut File, line: &str) -> std::io::Result<()> {
    writeln!(file, "{}", line)?;
    file.flush()?;
    file.sync_all()
}

impl ChainStore for JsonLinesChainStore {
    fn load(&self) -> LedgerResult<Vec<Block>> {
        load_chain_file(&self.path)
    }

    fn append(&self, block: &Block) -> LedgerResult<()> {
        let json = serde_json::to_string(block).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to serialize block {}: {}", block.index, e),
        })?;

        let _guard = self.write_lock.lock().map_err(|e| LedgerError::Persistence {
            reason: format!("chain file lock poisoned: {}", e),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Persistence {
                reason: format!("failed to open chain file '{}': {}", self.path.display(), e),
            })?;
        write_synced(&mut file, &json).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to append block {}: {}", block.index, e),
        })?;

        debug!(index = block.index, path = %self.path.display(), "block appended to chain file");
        Ok(())
    }
}
