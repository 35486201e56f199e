use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product ids are plain integers, unique within one collection
pub type ProductId = i64;

/// The product fields every record carries - what the user hands us when they
/// save or monitor something
///
/// Serialized flat and camelCase so stored blobs look exactly like the ones the
/// web client writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub id: ProductId,
    pub title: String,
    pub current_price: f64,
    pub original_price: f64,
    /// Percentage off the original price
    pub discount: f64,
    /// URL or path
    pub image: String,
    pub category: String,
    /// 0-100
    pub ai_quality: f64,
}

impl ProductDraft {
    /// First numeric field that isn't a finite number, if any
    ///
    /// JSON has no NaN or infinity, so these can't be stored.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("currentPrice", self.current_price),
            ("originalPrice", self.original_price),
            ("discount", self.discount),
            ("aiQuality", self.ai_quality),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(field, _)| field)
    }
}

/// A bookmarked deal - no price tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProduct {
    #[serde(flatten)]
    pub product: ProductDraft,
    /// Set once when saved, never touched again
    pub saved_at: DateTime<Utc>,
}

impl SavedProduct {
    pub fn id(&self) -> ProductId {
        self.product.id
    }
}

/// One observed price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: f64,
    pub date: DateTime<Utc>,
}

/// A tracked deal with its price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredProduct {
    #[serde(flatten)]
    pub product: ProductDraft,
    /// Only present when the web client carried it over from a saved record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    pub monitored_at: DateTime<Utc>,
    /// Oldest first. Only ever appended to.
    pub price_history: Vec<PriceSample>,
}

impl MonitoredProduct {
    pub fn id(&self) -> ProductId {
        self.product.id
    }

    /// Current price is at or under the target (false when no target is set)
    pub fn target_reached(&self) -> bool {
        self.target_price
            .is_some_and(|target| self.product.current_price <= target)
    }

    /// Difference between the current price and the previous sample
    ///
    /// Negative means the price dropped. Zero until there are two samples.
    pub fn price_change(&self) -> f64 {
        let len = self.price_history.len();
        if len < 2 {
            return 0.0;
        }
        self.product.current_price - self.price_history[len - 2].price
    }

    /// Lowest price we've ever seen for this product
    pub fn lowest_price(&self) -> Option<f64> {
        self.price_history
            .iter()
            .map(|s| s.price)
            .reduce(f64::min)
    }
}

/// How many free slots are in use across both collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotUsage {
    pub saved: usize,
    pub monitored: usize,
    pub limit: usize,
}

impl SlotUsage {
    pub fn total(&self) -> usize {
        self.saved + self.monitored
    }

    /// The cart starts nagging two slots before the limit
    pub fn nearly_full(&self) -> bool {
        self.total() + 2 >= self.limit
    }

    /// No free slot left for another monitored product
    pub fn monitoring_full(&self) -> bool {
        self.monitored >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(id: ProductId, price: f64) -> ProductDraft {
        ProductDraft {
            id,
            title: "Widget".to_string(),
            current_price: price,
            original_price: price * 2.0,
            discount: 50.0,
            image: "/placeholder.svg".to_string(),
            category: "Tech".to_string(),
            ai_quality: 90.0,
        }
    }

    fn monitored(price: f64, target: Option<f64>, history: &[f64]) -> MonitoredProduct {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        MonitoredProduct {
            product: draft(1, price),
            saved_at: None,
            target_price: target,
            monitored_at: at,
            price_history: history
                .iter()
                .map(|&price| PriceSample { price, date: at })
                .collect(),
        }
    }

    #[test]
    fn test_saved_product_json_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let saved = SavedProduct {
            product: draft(7, 100.0),
            saved_at: at,
        };

        let value = serde_json::to_value(&saved).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["currentPrice"], 100.0);
        assert_eq!(value["aiQuality"], 90.0);
        assert_eq!(value["savedAt"], "2024-05-01T12:00:00Z");
        // Flat, no nested product object
        assert!(value.get("product").is_none());
    }

    #[test]
    fn test_reads_web_client_blob() {
        let raw = r#"[{"id":2,"title":"X","currentPrice":50,"originalPrice":80,"discount":37,
            "image":"/x.png","category":"Casa","aiQuality":88,
            "targetPrice":40,"monitoredAt":"2024-05-01T12:00:00.000Z",
            "priceHistory":[{"price":50,"date":"2024-05-01T12:00:00.000Z"}]}]"#;

        let parsed: Vec<MonitoredProduct> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id(), 2);
        assert_eq!(parsed[0].target_price, Some(40.0));
        assert_eq!(parsed[0].price_history.len(), 1);
        assert_eq!(parsed[0].saved_at, None);
    }

    #[test]
    fn test_monitored_keeps_saved_at() {
        let raw = r#"{"id":3,"title":"X","currentPrice":50,"originalPrice":80,"discount":37,
            "image":"/x.png","category":"Casa","aiQuality":88,
            "savedAt":"2024-04-30T09:00:00Z","monitoredAt":"2024-05-01T12:00:00Z",
            "priceHistory":[]}"#;

        let parsed: MonitoredProduct = serde_json::from_str(raw).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 4, 30, 9, 0, 0).unwrap();
        assert_eq!(parsed.saved_at, Some(expected));

        let value = serde_json::to_value(&parsed).unwrap();
        assert_eq!(value["savedAt"], "2024-04-30T09:00:00Z");
        let without = serde_json::to_value(monitored(50.0, None, &[50.0])).unwrap();
        assert!(without.get("savedAt").is_none());
    }

    #[test]
    fn test_non_finite_field() {
        assert_eq!(draft(1, 10.0).non_finite_field(), None);
        assert_eq!(draft(1, f64::NAN).non_finite_field(), Some("currentPrice"));

        let mut bad = draft(1, 10.0);
        bad.ai_quality = f64::INFINITY;
        assert_eq!(bad.non_finite_field(), Some("aiQuality"));
    }

    #[test]
    fn test_missing_target_is_omitted() {
        let value = serde_json::to_value(monitored(50.0, None, &[50.0])).unwrap();
        assert!(value.get("targetPrice").is_none());
    }

    #[test]
    fn test_target_reached() {
        assert!(monitored(40.0, Some(40.0), &[40.0]).target_reached());
        assert!(monitored(35.0, Some(40.0), &[35.0]).target_reached());
        assert!(!monitored(50.0, Some(40.0), &[50.0]).target_reached());
        assert!(!monitored(10.0, None, &[10.0]).target_reached());
    }

    #[test]
    fn test_price_change() {
        assert_eq!(monitored(50.0, None, &[50.0]).price_change(), 0.0);
        assert_eq!(monitored(45.0, None, &[50.0, 45.0]).price_change(), -5.0);
        assert_eq!(monitored(60.0, None, &[40.0, 50.0, 60.0]).price_change(), 10.0);
    }

    #[test]
    fn test_lowest_price() {
        assert_eq!(monitored(60.0, None, &[55.0, 42.0, 60.0]).lowest_price(), Some(42.0));
        assert_eq!(monitored(60.0, None, &[]).lowest_price(), None);
    }

    #[test]
    fn test_slot_usage() {
        let usage = SlotUsage {
            saved: 3,
            monitored: 4,
            limit: 10,
        };
        assert_eq!(usage.total(), 7);
        assert!(!usage.nearly_full());

        let usage = SlotUsage {
            saved: 4,
            monitored: 4,
            limit: 10,
        };
        assert!(usage.nearly_full());
        assert!(!usage.monitoring_full());

        let usage = SlotUsage {
            saved: 0,
            monitored: 10,
            limit: 10,
        };
        assert!(usage.monitoring_full());
    }
}
