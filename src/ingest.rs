use crate::chain::transaction::ScannedTransaction;
use crate::indexing::indexer_registry::IndexerRegistry;
use log::{error, info, warn};
use std::io::BufRead;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub read: usize,
    pub indexed: usize,
    pub failed: usize,
}

/// Feeds newline-delimited scanner records through the registry. Bad lines
/// and failing records are logged and counted, the rest keep going.
pub async fn ingest_transactions<R: BufRead>(
    registry: &IndexerRegistry,
    input: R,
) -> anyhow::Result<IngestStats> {
    let mut stats = IngestStats::default();
    for (line_number, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.read += 1;
        let tx: ScannedTransaction = match serde_json::from_str(&line) {
            Ok(tx) => tx,
            Err(e) => {
                warn!("line {}: not a transaction record: {}", line_number + 1, e);
                stats.failed += 1;
                continue;
            }
        };
        match registry.index_transaction(&tx).await {
            Ok(ran) if ran > 0 => stats.indexed += 1,
            Ok(_) => {}
            Err(e) => {
                error!("failed to index {}: {:?}", tx.transaction_id, e);
                stats.failed += 1;
            }
        }
    }
    info!(
        "ingested {} records, {} indexed, {} failed",
        stats.read, stats.indexed, stats.failed
    );
    Ok(stats)
}
