//! In-memory collaborators shared by the unit tests.

use crate::server::{broker::Publisher, lookup::Lookup};
use async_trait::async_trait;
use core::time::Duration;
use hashgate_core::{Error, LookupError, Result};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

/// Fixed id to name table. Ids listed in `unavailable` fail as if the store
/// were down.
#[derive(Default)]
pub struct MemoryLookup {
    names: HashMap<i64, String>,
    unavailable: Vec<i64>,
    delay: Duration,
    completed: AtomicU32,
}

impl MemoryLookup {
    pub fn with(mut self, id: i64, name: &str) -> Self {
        self.names.insert(id, name.to_string());
        self
    }

    pub fn unavailable(mut self, id: i64) -> Self {
        self.unavailable.push(id);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Lookups that ran to completion, successful or not.
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Lookup for MemoryLookup {
    async fn lookup(&self, id: i64) -> core::result::Result<String, LookupError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.contains(&id) {
            return Err(LookupError::Unavailable("connection refused".to_string()));
        }
        self.names
            .get(&id)
            .cloned()
            .ok_or(LookupError::NotFound { id })
    }
}

/// Records every published body. The first `failures` attempts fail.
#[derive(Default)]
pub struct MemoryPublisher {
    failures: AtomicU32,
    attempts: AtomicU32,
    bodies: Mutex<Vec<Vec<u8>>>,
}

impl MemoryPublisher {
    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, body: &[u8]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Publish("channel closed".to_string()));
        }
        self.bodies.lock().unwrap().push(body.to_vec());
        Ok(())
    }
}
