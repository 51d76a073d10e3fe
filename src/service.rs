//! Service Module
//!
//! The service boundary: every call is authorized for its subject before the
//! engine is touched.

use std::sync::Arc;

use crate::auth::{Authorizer, LIST_ACTION, OBJECT_WILDCARD, SET_GET_ACTION};
use crate::engine::Engine;
use crate::error::Result;
use crate::storage::Record;

/// Key-value operations exposed over RPC
pub struct KvService {
    engine: Arc<Engine>,
    authorizer: Arc<dyn Authorizer>,
}

impl KvService {
    pub fn new(engine: Arc<Engine>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { engine, authorizer }
    }

    /// SetKey
    pub fn set_key(&self, subject: &str, key: String, value: Vec<u8>) -> Result<()> {
        self.authorizer
            .authorize(subject, OBJECT_WILDCARD, SET_GET_ACTION)?;

        let size = value.len();
        self.engine.set(Record { key, value })?;

        tracing::trace!(subject, size, "SetKey stored");
        Ok(())
    }

    /// GetKey
    pub fn get_key(&self, subject: &str, key: &str) -> Result<Vec<u8>> {
        self.authorizer
            .authorize(subject, OBJECT_WILDCARD, SET_GET_ACTION)?;

        self.engine.get(key)
    }

    /// ListKeys
    pub fn list_keys(&self, subject: &str) -> Result<Vec<String>> {
        self.authorizer
            .authorize(subject, OBJECT_WILDCARD, LIST_ACTION)?;

        Ok(self.engine.list_keys())
    }

    /// The engine behind this service
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}
