// Saved + monitored product collections on top of a key-value store
use crate::keys;
use crate::models::{
    MonitoredProduct, PriceSample, ProductDraft, ProductId, SavedProduct, SlotUsage,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use dealcheck_store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a write actually did
///
/// The plain (non-`try_`) operations never return errors, so this is how a
/// caller that cares finds out whether anything happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Collection was rewritten with the change
    Applied,
    /// Nothing to do (duplicate id, unknown id, stale sample)
    Unchanged,
    /// Rejected or store failed; the reason has already been logged
    Failed(String),
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// Typed CRUD over the two product collections
///
/// Every write re-reads the whole collection, changes it in memory and writes
/// it back in one go. Two writers racing on the same store means last write
/// wins - there's no merge. An unreadable blob is treated as empty on the way
/// in, so the next write replaces it.
///
/// The free limit is only reported through [`ProductStore::slot_usage`]; the
/// store itself never refuses a product. Gating is up to the host.
pub struct ProductStore {
    kv: Arc<dyn KeyValueStore>,
    free_limit: usize,
}

impl ProductStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, free_limit: 10 }
    }

    /// Override the limit reported by `slot_usage`
    pub fn with_free_limit(mut self, limit: usize) -> Self {
        self.free_limit = limit;
        self
    }

    pub fn free_limit(&self) -> usize {
        self.free_limit
    }

    // Saved products

    /// Bookmark a product, stamping `savedAt`. Duplicate ids are ignored.
    pub fn try_save_product(&self, draft: ProductDraft) -> Result<WriteOutcome> {
        ensure_storable(&draft)?;
        let mut saved: Vec<SavedProduct> = self.read_for_write(keys::SAVED_PRODUCTS)?;

        if saved.iter().any(|p| p.id() == draft.id) {
            debug!("Product {} already saved, skipping", draft.id);
            return Ok(WriteOutcome::Unchanged);
        }

        let id = draft.id;
        saved.push(SavedProduct {
            product: draft,
            saved_at: Utc::now(),
        });
        self.write_collection(keys::SAVED_PRODUCTS, &saved)?;
        debug!("Saved product {}", id);
        Ok(WriteOutcome::Applied)
    }

    pub fn save_product(&self, draft: ProductDraft) -> WriteOutcome {
        best_effort("saving product", self.try_save_product(draft))
    }

    pub fn try_saved_products(&self) -> Result<Vec<SavedProduct>> {
        self.read_collection(keys::SAVED_PRODUCTS)
    }

    /// All saved products; empty if there are none or the blob is unreadable
    pub fn saved_products(&self) -> Vec<SavedProduct> {
        self.try_saved_products().unwrap_or_else(|e| {
            warn!("Error getting saved products: {}", e);
            Vec::new()
        })
    }

    pub fn try_remove_saved_product(&self, id: ProductId) -> Result<WriteOutcome> {
        let saved: Vec<SavedProduct> = self.read_for_write(keys::SAVED_PRODUCTS)?;
        let before = saved.len();
        let kept: Vec<SavedProduct> = saved.into_iter().filter(|p| p.id() != id).collect();

        self.write_collection(keys::SAVED_PRODUCTS, &kept)?;
        Ok(if kept.len() < before {
            WriteOutcome::Applied
        } else {
            WriteOutcome::Unchanged
        })
    }

    pub fn remove_saved_product(&self, id: ProductId) -> WriteOutcome {
        best_effort("removing saved product", self.try_remove_saved_product(id))
    }

    pub fn is_product_saved(&self, id: ProductId) -> bool {
        self.saved_products().iter().any(|p| p.id() == id)
    }

    // Monitored products

    /// Start tracking a product
    ///
    /// Stamps `monitoredAt` and seeds the price history with the current price.
    /// Duplicate ids are ignored.
    pub fn try_monitor_product(
        &self,
        draft: ProductDraft,
        target_price: Option<f64>,
    ) -> Result<WriteOutcome> {
        ensure_storable(&draft)?;
        if let Some(target) = target_price {
            ensure_finite("targetPrice", target)?;
        }

        let mut monitored: Vec<MonitoredProduct> =
            self.read_for_write(keys::MONITORED_PRODUCTS)?;

        if monitored.iter().any(|p| p.id() == draft.id) {
            debug!("Product {} already monitored, skipping", draft.id);
            return Ok(WriteOutcome::Unchanged);
        }

        let id = draft.id;
        let now = Utc::now();
        monitored.push(MonitoredProduct {
            price_history: vec![PriceSample {
                price: draft.current_price,
                date: now,
            }],
            product: draft,
            saved_at: None,
            target_price,
            monitored_at: now,
        });
        self.write_collection(keys::MONITORED_PRODUCTS, &monitored)?;
        debug!("Monitoring product {} (target {:?})", id, target_price);
        Ok(WriteOutcome::Applied)
    }

    pub fn monitor_product(&self, draft: ProductDraft, target_price: Option<f64>) -> WriteOutcome {
        best_effort("monitoring product", self.try_monitor_product(draft, target_price))
    }

    pub fn try_monitored_products(&self) -> Result<Vec<MonitoredProduct>> {
        self.read_collection(keys::MONITORED_PRODUCTS)
    }

    /// All monitored products; empty if there are none or the blob is unreadable
    pub fn monitored_products(&self) -> Vec<MonitoredProduct> {
        self.try_monitored_products().unwrap_or_else(|e| {
            warn!("Error getting monitored products: {}", e);
            Vec::new()
        })
    }

    pub fn try_remove_monitored_product(&self, id: ProductId) -> Result<WriteOutcome> {
        let monitored: Vec<MonitoredProduct> = self.read_for_write(keys::MONITORED_PRODUCTS)?;
        let before = monitored.len();
        let kept: Vec<MonitoredProduct> =
            monitored.into_iter().filter(|p| p.id() != id).collect();

        self.write_collection(keys::MONITORED_PRODUCTS, &kept)?;
        Ok(if kept.len() < before {
            WriteOutcome::Applied
        } else {
            WriteOutcome::Unchanged
        })
    }

    pub fn remove_monitored_product(&self, id: ProductId) -> WriteOutcome {
        best_effort(
            "removing monitored product",
            self.try_remove_monitored_product(id),
        )
    }

    pub fn is_product_monitored(&self, id: ProductId) -> bool {
        self.monitored_products().iter().any(|p| p.id() == id)
    }

    /// Record a newly observed price for a monitored product
    ///
    /// Appends to the history and moves `currentPrice` to the new value.
    /// Unknown ids and samples older than the newest one are ignored so the
    /// history stays oldest-first.
    pub fn try_append_price_sample(
        &self,
        id: ProductId,
        price: f64,
        date: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        ensure_finite("price", price)?;
        let mut monitored: Vec<MonitoredProduct> =
            self.read_for_write(keys::MONITORED_PRODUCTS)?;

        let Some(product) = monitored.iter_mut().find(|p| p.id() == id) else {
            debug!("No monitored product {}, dropping price sample", id);
            return Ok(WriteOutcome::Unchanged);
        };

        if product.price_history.last().is_some_and(|last| date < last.date) {
            debug!("Price sample for {} is older than its history, dropping", id);
            return Ok(WriteOutcome::Unchanged);
        }

        product.price_history.push(PriceSample { price, date });
        product.product.current_price = price;
        if product.target_reached() {
            debug!("Product {} reached its target price", id);
        }

        self.write_collection(keys::MONITORED_PRODUCTS, &monitored)?;
        Ok(WriteOutcome::Applied)
    }

    pub fn append_price_sample(&self, id: ProductId, price: f64, date: DateTime<Utc>) -> WriteOutcome {
        best_effort(
            "appending price sample",
            self.try_append_price_sample(id, price, date),
        )
    }

    /// Monitored products currently at or under their target
    pub fn targets_reached(&self) -> Vec<MonitoredProduct> {
        self.monitored_products()
            .into_iter()
            .filter(MonitoredProduct::target_reached)
            .collect()
    }

    /// Saved + monitored counts against the configured free limit
    pub fn slot_usage(&self) -> SlotUsage {
        SlotUsage {
            saved: self.saved_products().len(),
            monitored: self.monitored_products().len(),
            limit: self.free_limit,
        }
    }

    fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.kv.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Current collection for a read-modify-write
    ///
    /// Store errors still propagate, but a blob that won't parse counts as
    /// empty so the write about to happen can replace it.
    fn read_for_write<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_collection(key) {
            Err(Error::SerializationError(e)) => {
                warn!("Discarding unreadable {}: {}", key, e);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// An empty collection drops the key, which reads back as empty anyway
    fn write_collection<T: Serialize>(&self, key: &str, records: &[T]) -> Result<()> {
        if records.is_empty() {
            self.kv.remove(key)?;
            return Ok(());
        }
        let raw = serde_json::to_string(records)?;
        self.kv.set(key, &raw)?;
        Ok(())
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidNumber(field))
    }
}

fn ensure_storable(draft: &ProductDraft) -> Result<()> {
    match draft.non_finite_field() {
        Some(field) => Err(Error::InvalidNumber(field)),
        None => Ok(()),
    }
}

/// Swallow a failed write into `WriteOutcome::Failed`, logging why
fn best_effort(action: &str, result: Result<WriteOutcome>) -> WriteOutcome {
    result.unwrap_or_else(|e| {
        warn!("Error {}: {}", action, e);
        WriteOutcome::Failed(e.to_string())
    })
}
