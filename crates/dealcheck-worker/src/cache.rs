// Named cache partitions, keyed by URL
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::http::{cache_key, Response};

#[derive(Debug)]
struct Partition {
    name: String,
    entries: HashMap<String, Response>,
}

/// All cache partitions the worker owns
///
/// Cheap to clone - clones share the same partitions, so concurrent fetch
/// handlers all see each other's writes. Lookups that span partitions check
/// them in creation order. Writing an existing key replaces it.
#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
    partitions: Arc<RwLock<Vec<Partition>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a partition called `name` exists
    pub async fn open(&self, name: &str) {
        let mut partitions = self.partitions.write().await;
        if !partitions.iter().any(|p| p.name == name) {
            debug!("Creating cache partition {}", name);
            partitions.push(Partition {
                name: name.to_string(),
                entries: HashMap::new(),
            });
        }
    }

    /// Partition names in creation order
    pub async fn keys(&self) -> Vec<String> {
        self.partitions
            .read()
            .await
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.partitions.read().await.iter().any(|p| p.name == name)
    }

    /// Drop a whole partition. Returns whether it existed.
    pub async fn delete(&self, name: &str) -> bool {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        partitions.len() < before
    }

    /// Store one response, creating the partition if needed
    pub async fn put(&self, partition: &str, url: &Url, response: Response) {
        self.put_all(partition, vec![(url.clone(), response)]).await;
    }

    /// Store a batch under a single lock, so readers see all or none of it
    pub async fn put_all(&self, partition: &str, items: Vec<(Url, Response)>) {
        let mut partitions = self.partitions.write().await;
        let idx = match partitions.iter().position(|p| p.name == partition) {
            Some(idx) => idx,
            None => {
                partitions.push(Partition {
                    name: partition.to_string(),
                    entries: HashMap::new(),
                });
                partitions.len() - 1
            }
        };

        let entries = &mut partitions[idx].entries;
        for (url, response) in items {
            entries.insert(cache_key(&url), response);
        }
    }

    /// Look `url` up in one partition
    pub async fn match_in(&self, partition: &str, url: &Url) -> Option<Response> {
        self.partitions
            .read()
            .await
            .iter()
            .find(|p| p.name == partition)
            .and_then(|p| p.entries.get(&cache_key(url)).cloned())
    }

    /// Look `url` up across every partition
    pub async fn match_any(&self, url: &Url) -> Option<Response> {
        let key = cache_key(url);
        self.partitions
            .read()
            .await
            .iter()
            .find_map(|p| p.entries.get(&key).cloned())
    }

    /// Number of entries in a partition, 0 if it doesn't exist
    pub async fn len(&self, partition: &str) -> usize {
        self.partitions
            .read()
            .await
            .iter()
            .find(|p| p.name == partition)
            .map(|p| p.entries.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn resp(url: &Url, body: &str) -> Response {
        Response::basic(url.clone(), StatusCode::OK, body)
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let caches = CacheStorage::new();
        caches.open("a").await;
        caches.open("b").await;
        caches.open("a").await;
        assert_eq!(caches.keys().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fragment_is_ignored() {
        let caches = CacheStorage::new();
        let plain = Url::parse("http://localhost:3000/a").unwrap();
        let anchored = Url::parse("http://localhost:3000/a#x").unwrap();

        caches.put("static", &plain, resp(&plain, "a")).await;
        assert_eq!(caches.match_any(&anchored).await.unwrap().text(), "a");

        caches.put("static", &anchored, resp(&anchored, "a again")).await;
        assert_eq!(caches.len("static").await, 1);
        assert_eq!(caches.match_in("static", &plain).await.unwrap().text(), "a again");
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let caches = CacheStorage::new();
        let url = Url::parse("http://localhost:3000/deals").unwrap();

        caches.put("dynamic", &url, resp(&url, "deals")).await;

        assert_eq!(caches.match_in("dynamic", &url).await.unwrap().text(), "deals");
        assert!(caches.match_in("static", &url).await.is_none());
        assert_eq!(caches.match_any(&url).await.unwrap().text(), "deals");
        assert_eq!(caches.len("dynamic").await, 1);
    }

    #[tokio::test]
    async fn test_match_any_prefers_older_partition() {
        let caches = CacheStorage::new();
        let url = Url::parse("http://localhost:3000/").unwrap();

        caches.put("static", &url, resp(&url, "shell")).await;
        caches.put("dynamic", &url, resp(&url, "fresh")).await;

        assert_eq!(caches.match_any(&url).await.unwrap().text(), "shell");
    }

    #[tokio::test]
    async fn test_last_put_wins() {
        let caches = CacheStorage::new();
        let url = Url::parse("http://localhost:3000/a").unwrap();

        caches.put("dynamic", &url, resp(&url, "one")).await;
        caches.put("dynamic", &url, resp(&url, "two")).await;

        assert_eq!(caches.match_any(&url).await.unwrap().text(), "two");
        assert_eq!(caches.len("dynamic").await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let caches = CacheStorage::new();
        caches.open("old").await;

        assert!(caches.delete("old").await);
        assert!(!caches.delete("old").await);
        assert!(!caches.has("old").await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let caches = CacheStorage::new();
        let other = caches.clone();
        let url = Url::parse("http://localhost:3000/a").unwrap();

        other.put("dynamic", &url, resp(&url, "shared")).await;
        assert!(caches.match_any(&url).await.is_some());
    }
}
