//! Audit Ledger demo CLI
//!
//! Drives the ledger end to end with in-memory collaborators (and an
//! optional JSON-lines chain file from the config).
//!
//! Usage:
//!   cargo run -p demo -- simulate --events 25
//!   cargo run -p demo -- tamper-row
//!   cargo run -p demo -- tamper-chain
//!   cargo run -p demo -- --config ledger.toml verify-file data/chain.jsonl

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use auditledger_contracts::{
    entry::{ClientContext, EventRequest, EventType},
    error::{LedgerError, LedgerResult},
};
use auditledger_core::{
    traits::{ChainStore, DurableAuditStore},
    Ledger, LedgerConfig,
};
use auditledger_report::ComplianceReporter;
use auditledger_store::{load_chain_file, InMemoryAuditStore, InMemoryChainStore, JsonLinesChainStore};
use auditledger_verify::{verify_blocks, IntegrityVerifier};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tamper-evident audit ledger demo.
#[derive(Parser)]
#[command(
    name = "auditledger-demo",
    about = "Tamper-evident audit ledger demo",
    long_about = "Records audit events into a proof-of-work sealed hash chain,\n\
                  verifies the chain and durable rows, and prints compliance reports."
)]
struct Cli {
    /// TOML ledger configuration. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `block_size` from the configuration.
    #[arg(long, global = true)]
    block_size: Option<usize>,

    /// Override `difficulty` from the configuration.
    #[arg(long, global = true)]
    difficulty: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record synthetic events, seal them, verify, and print a report.
    Simulate {
        /// Number of events to record.
        #[arg(long, default_value_t = 20)]
        events: usize,
    },
    /// Edit a durable row behind the ledger's back and catch it.
    TamperRow,
    /// Edit a sealed block in chain storage and catch it after a restart.
    TamperChain,
    /// Verify a persisted JSON-lines chain file.
    VerifyFile {
        path: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| match cli.command {
        Command::Simulate { events } => simulate(config, events),
        Command::TamperRow => tamper_row(config),
        Command::TamperChain => tamper_chain(config),
        Command::VerifyFile { path } => verify_file(&config, &path),
    });

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> LedgerResult<LedgerConfig> {
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig {
            block_size: 5,
            difficulty: 3,
            ..Default::default()
        },
    };
    if let Some(block_size) = cli.block_size {
        config.block_size = block_size;
    }
    if let Some(difficulty) = cli.difficulty {
        config.difficulty = difficulty;
    }
    config.validate()?;
    Ok(config)
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn build_ledger(
    config: LedgerConfig,
    store: InMemoryAuditStore,
    chain_store: Box<dyn ChainStore>,
) -> LedgerResult<Arc<Ledger>> {
    let ledger = Ledger::with_proof_of_work(config, Arc::new(store), chain_store)?;
    ledger.initialize()?;
    Ok(Arc::new(ledger))
}

fn default_chain_store(config: &LedgerConfig) -> LedgerResult<Box<dyn ChainStore>> {
    let store: Box<dyn ChainStore> = match &config.chain_path {
        Some(path) => Box::new(JsonLinesChainStore::new(path)?),
        None => Box::new(InMemoryChainStore::new()),
    };
    Ok(store)
}

/// A rotating mix of event types, users, and addresses.
fn synthetic_event(n: usize) -> EventRequest {
    const TYPES: [EventType; 6] = [
        EventType::Login,
        EventType::DataAccess,
        EventType::DataModification,
        EventType::LoginFailed,
        EventType::PaymentProcessed,
        EventType::Logout,
    ];
    let event_type = TYPES[n % TYPES.len()];
    let user = format!("user-{}", n % 4);
    EventRequest {
        event_type: event_type.as_str().to_string(),
        entity_type: "account".to_string(),
        entity_id: user.clone(),
        user_id: Some(user),
        action: event_type.as_str().to_ascii_lowercase(),
        details: format!("{{\"seq\":{}}}", n),
        client: ClientContext {
            ip_address: Some(format!("10.0.0.{}", n % 7 + 1)),
            user_agent: Some("auditledger-demo/0.1".to_string()),
            session_id: Some(format!("sess-{}", n % 3)),
            correlation_id: Some(format!("req-{:04}", n)),
        },
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> LedgerResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| LedgerError::Persistence {
        reason: format!("failed to render JSON: {}", e),
    })?;
    println!("{}", json);
    Ok(())
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

fn simulate(config: LedgerConfig, events: usize) -> LedgerResult<()> {
    let window_start = Utc::now() - Duration::seconds(1);
    let chain_store = default_chain_store(&config)?;
    let ledger = build_ledger(config, InMemoryAuditStore::new(), chain_store)?;

    for n in 0..events {
        let tx = ledger.record_event(synthetic_event(n))?;
        info!(n, transaction_hash = %tx, "event recorded");
    }
    println!(
        "Recorded {} events: {} blocks committed, {} entries pending.",
        events,
        ledger.len()?,
        ledger.pending_len()?
    );

    if let Some(block) = ledger.mine_pending()? {
        println!("Flushed pending entries into block {} ({}).", block.index, block.hash);
    }

    let chain = IntegrityVerifier::new(Arc::clone(&ledger)).verify_chain()?;
    println!("Chain valid: {} ({} blocks checked)", chain.valid, chain.blocks_checked);

    let report = ComplianceReporter::new(Arc::clone(&ledger)).generate(window_start, Utc::now() + Duration::seconds(1))?;
    print_json(&report)
}

fn tamper_row(config: LedgerConfig) -> LedgerResult<()> {
    let store = InMemoryAuditStore::new();
    let ledger = build_ledger(config, store.clone(), Box::new(InMemoryChainStore::new()))?;
    let block_size = ledger.config().block_size;

    for n in 0..block_size {
        ledger.record_event(synthetic_event(n))?;
    }

    let mut row = store.find_by_id(1)?.ok_or_else(|| LedgerError::NotFound {
        what: "audit row 1".to_string(),
    })?;
    println!("Original details of row 1: {}", row.details);
    row.details = "{\"seq\":\"rewritten\"}".to_string();
    store.overwrite(row)?;
    println!("Rewrote row 1 directly in the durable store.");

    let verifier = IntegrityVerifier::new(Arc::clone(&ledger));
    print_json(&verifier.verify_row(1)?)?;
    println!("Chain valid: {}", verifier.verify_chain()?.valid);
    Ok(())
}

fn tamper_chain(config: LedgerConfig) -> LedgerResult<()> {
    let store = InMemoryAuditStore::new();
    let chain_store = InMemoryChainStore::new();
    let ledger = build_ledger(config.clone(), store.clone(), Box::new(chain_store.clone()))?;
    let block_size = ledger.config().block_size;

    for n in 0..block_size * 2 {
        ledger.record_event(synthetic_event(n))?;
    }
    println!("Sealed {} blocks.", ledger.len()?);

    let mut block = ledger.block(1)?.ok_or_else(|| LedgerError::NotFound {
        what: "block 1".to_string(),
    })?;
    if let Some(entry) = block.entries.first_mut() {
        entry.user_id = Some("someone-else".to_string());
    }
    chain_store.overwrite(block)?;
    println!("Rewrote the first entry of block 1 in chain storage; restarting ledger.");

    let restarted = build_ledger(config, store, Box::new(chain_store))?;
    print_json(&IntegrityVerifier::new(restarted).verify_chain()?)
}

fn verify_file(config: &LedgerConfig, path: &Path) -> LedgerResult<()> {
    let blocks = load_chain_file(path)?;
    if blocks.is_empty() {
        return Err(LedgerError::NotFound {
            what: format!("blocks in chain file '{}'", path.display()),
        });
    }
    let result = verify_blocks(&blocks, config.difficulty);
    print_json(&result)?;
    if !result.valid {
        std::process::exit(2);
    }
    Ok(())
}
