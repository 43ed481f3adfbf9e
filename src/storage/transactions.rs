use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{TransactionRecord, TransactionRecorder};

const TRANSACTIONS_TREE: &str = "transactions";

/// Stores transaction records in an embedded sled database, keyed by session then time.
#[derive(Clone)]
pub struct SledTransactionRecorder {
    tree: sled::Tree,
}

impl SledTransactionRecorder {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).context("Failed to create data directory")?;
        }
        let db = sled::open(path).context(format!("Failed to open transaction store at {:?}", path))?;
        info!("Transaction store opened at {:?}", path);
        Self::from_db(&db)
    }

    /// In-memory store that disappears on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("Failed to open temporary transaction store")?;
        Self::from_db(&db)
    }

    fn from_db(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(TRANSACTIONS_TREE)
            .context("Failed to open transactions tree")?;
        Ok(Self { tree })
    }

    fn key(record: &TransactionRecord) -> String {
        format!(
            "{}/{:020}/{}",
            record.session_id,
            record.recorded_at.timestamp_micros(),
            record.id
        )
    }

    /// All records, oldest first within each session.
    pub fn list(&self) -> Result<Vec<TransactionRecord>> {
        self.collect(self.tree.iter())
    }

    pub fn list_session(&self, session_id: Uuid) -> Result<Vec<TransactionRecord>> {
        self.collect(self.tree.scan_prefix(format!("{}/", session_id)))
    }

    fn collect(&self, iter: sled::Iter) -> Result<Vec<TransactionRecord>> {
        let mut records = Vec::new();
        for entry in iter {
            let (key, value) = entry.context("Failed to read transaction entry")?;
            match serde_json::from_slice::<TransactionRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unreadable transaction record {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl TransactionRecorder for SledTransactionRecorder {
    async fn record(&self, record: TransactionRecord) -> Result<()> {
        let key = Self::key(&record);
        let value = serde_json::to_vec(&record).context("Failed to serialize transaction record")?;
        self.tree
            .insert(key.as_bytes(), value)
            .context("Failed to insert transaction record")?;
        self.tree
            .flush_async()
            .await
            .context("Failed to flush transaction store")?;
        debug!(
            "Recorded {} {} {:.6} @ {:.8} (session {})",
            record.side, record.token_symbol, record.amount, record.price, record.session_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderOrigin, OrderStatus, TradeIntent};

    fn completed_order(session: Uuid, price: f64) -> Order {
        let mut order = Order::from_intent(
            &TradeIntent::buy("MintX", 1.0, price, OrderOrigin::Strategy),
            session,
        );
        order.status = OrderStatus::Completed;
        order
    }

    #[tokio::test]
    async fn test_records_are_listed_per_session() {
        let store = SledTransactionRecorder::temporary().unwrap();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        store
            .record(TransactionRecord::from_order(&completed_order(first, 1.0), "MX"))
            .await
            .unwrap();
        store
            .record(TransactionRecord::from_order(&completed_order(first, 2.0), "MX"))
            .await
            .unwrap();
        store
            .record(TransactionRecord::from_order(&completed_order(second, 3.0), "MX"))
            .await
            .unwrap();

        let first_records = store.list_session(first).unwrap();
        assert_eq!(first_records.len(), 2);
        assert!(first_records.iter().all(|r| r.session_id == first));
        let mut prices: Vec<f64> = first_records.iter().map(|r| r.price).collect();
        prices.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(prices, vec![1.0, 2.0]);

        assert_eq!(store.list_session(second).unwrap().len(), 1);
        assert_eq!(store.list().unwrap().len(), 3);
    }
}
