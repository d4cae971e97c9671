//! In-memory implementation of the broker gateway
//!
//! Mirrors the Redis list and expiry semantics the protocol relies on: an
//! empty list does not exist, expired keys vanish on next access, and
//! blocking pops wake as soon as a value is pushed. Useful for embedding a
//! local agent and for driving the client in tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{BrokerError, BrokerGateway};

#[derive(Default)]
struct Store {
    lists: HashMap<String, VecDeque<String>>,
    expiry: HashMap<String, Instant>,
}

impl Store {
    /// Drops the key if its expiry has passed
    fn purge(&mut self, key: &str) {
        let expired = self
            .expiry
            .get(key)
            .is_some_and(|deadline| *deadline <= Instant::now());
        if expired {
            self.expiry.remove(key);
            self.lists.remove(key);
        }
    }

    fn list(&mut self, key: &str) -> Option<&mut VecDeque<String>> {
        self.purge(key);
        self.lists.get_mut(key)
    }

    /// Removes the key entirely once its list is drained
    fn drop_if_empty(&mut self, key: &str) {
        if self.lists.get(key).is_some_and(VecDeque::is_empty) {
            self.lists.remove(key);
            self.expiry.remove(key);
        }
    }

    fn push_back(&mut self, key: &str, value: String) {
        self.purge(key);
        self.lists.entry(key.to_string()).or_default().push_back(value);
    }

    fn pop_front(&mut self, key: &str) -> Option<String> {
        let value = self.list(key)?.pop_front();
        self.drop_if_empty(key);
        value
    }

    fn rotate(&mut self, key: &str) -> Option<String> {
        let list = self.list(key)?;
        let value = list.pop_back()?;
        list.push_front(value.clone());
        Some(value)
    }
}

/// Broker gateway backed by process memory
#[derive(Default)]
pub struct MemoryBroker {
    store: Mutex<Store>,
    notify: Notify,
    unavailable: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), BrokerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("memory broker is offline".into()));
        }
        Ok(())
    }

    /// Makes every following call fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Appends a value to a list and wakes blocked readers
    pub fn push(&self, key: &str, value: impl Into<String>) {
        self.lock().push_back(key, value.into());
        self.notify.notify_waiters();
    }

    /// Sets a time to live on an existing key; returns false if it is missing
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let mut store = self.lock();
        if store.list(key).is_none() {
            return false;
        }
        store.expiry.insert(key.to_string(), Instant::now() + ttl);
        true
    }

    /// Removes a key and its expiry
    pub fn delete(&self, key: &str) {
        let mut store = self.lock();
        store.lists.remove(key);
        store.expiry.remove(key);
    }

    /// Number of values held in a list
    pub fn len(&self, key: &str) -> usize {
        self.lock().list(key).map_or(0, |list| list.len())
    }

    /// Snapshot of a list, head first
    pub fn values(&self, key: &str) -> Vec<String> {
        self.lock()
            .list(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Retries `take` until it yields a value or `timeout` passes
    async fn wait_for<F>(&self, timeout: Duration, mut take: F) -> Result<Option<String>, BrokerError>
    where
        F: FnMut(&mut Store) -> Option<String> + Send,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.check_available()?;
            let found = {
                let mut store = self.lock();
                take(&mut store)
            };
            if found.is_some() {
                return Ok(found);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl BrokerGateway for MemoryBroker {
    async fn enqueue(&self, queue: &str, payload: String) -> Result<(), BrokerError> {
        self.check_available()?;
        self.push(queue, payload);
        Ok(())
    }

    async fn block_pop_rotate(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, BrokerError> {
        self.wait_for(timeout, |store| store.rotate(queue)).await
    }

    async fn exists_flag(&self, key: &str) -> Result<bool, BrokerError> {
        self.check_available()?;
        Ok(self.lock().list(key).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, BrokerError> {
        self.check_available()?;
        let mut store = self.lock();
        store.purge(key);
        Ok(store
            .expiry
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(Instant::now())))
    }

    async fn block_pop(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, BrokerError> {
        self.wait_for(timeout, |store| store.pop_front(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rotate_keeps_value() {
        let broker = MemoryBroker::new();
        broker.push("result:a", "r1");

        for _ in 0..3 {
            let value = broker
                .block_pop_rotate("result:a", Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(value.as_deref(), Some("r1"));
        }
        assert_eq!(broker.len("result:a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_pop_is_destructive_and_ordered() {
        let broker = MemoryBroker::new();
        broker.push("stream:a", "1");
        broker.push("stream:a", "2");

        let first = broker.block_pop("stream:a", Duration::from_secs(1)).await.unwrap();
        let second = broker.block_pop("stream:a", Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.as_deref(), Some("1"));
        assert_eq!(second.as_deref(), Some("2"));
        assert!(!broker.exists_flag("stream:a").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_pop_times_out() {
        let broker = MemoryBroker::new();
        let start = Instant::now();
        let value = broker.block_pop("empty", Duration::from_secs(10)).await.unwrap();
        assert!(value.is_none());
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_pop_wakes_on_push() {
        let broker = std::sync::Arc::new(MemoryBroker::new());
        let writer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            writer.push("stream:a", "late");
        });

        let start = Instant::now();
        let value = broker.block_pop("stream:a", Duration::from_secs(10)).await.unwrap();
        assert_eq!(value.as_deref(), Some("late"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_and_expiry() {
        let broker = MemoryBroker::new();
        broker.push("result:a:flag", "1");
        assert!(broker.exists_flag("result:a:flag").await.unwrap());
        assert_eq!(broker.ttl("result:a:flag").await.unwrap(), None);

        assert!(broker.expire("result:a:flag", Duration::from_secs(300)));
        let ttl = broker.ttl("result:a:flag").await.unwrap();
        assert_eq!(ttl, Some(Duration::from_secs(300)));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(!broker.exists_flag("result:a:flag").await.unwrap());
        assert_eq!(broker.ttl("result:a:flag").await.unwrap(), None);
    }

    #[test]
    fn test_expire_missing_key() {
        let broker = MemoryBroker::new();
        assert!(!broker.expire("nope", Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_unavailable_surfaces_error() {
        let broker = MemoryBroker::new();
        broker.set_unavailable(true);
        assert!(matches!(
            broker.exists_flag("x").await,
            Err(BrokerError::Unavailable(_))
        ));
        assert!(broker.enqueue("q", "v".into()).await.is_err());

        broker.set_unavailable(false);
        assert!(broker.enqueue("q", "v".into()).await.is_ok());
    }
}
