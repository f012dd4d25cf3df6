//! In-memory document store for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Collection, DocumentStore, Filter, FindResult, StoreError};

/// Documents held as raw JSON, keyed by collection.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: Mutex<HashMap<Collection, Vec<Value>>>,
    next_id: AtomicU64,
    fail_creates: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with raw documents.
    #[must_use]
    pub fn with_documents(self, collection: Collection, docs: Vec<Value>) -> Self {
        self.documents
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .extend(docs);
        self
    }

    /// Make every `create` call fail with a 500 from the store.
    #[must_use]
    pub fn failing_creates(mut self) -> Self {
        self.fail_creates = true;
        self
    }

    /// Snapshot of a collection.
    pub fn documents(&self, collection: Collection) -> Vec<Value> {
        self.documents
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }
}

fn field_as_string(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn doc_matches(doc: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Equals { field, value } => field_as_string(doc, field).as_ref() == Some(value),
        Filter::In { field, values } => {
            field_as_string(doc, field).is_some_and(|v| values.contains(&v))
        }
    }
}

impl DocumentStore for InMemoryStore {
    async fn find<T>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<FindResult<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let matched: Vec<Value> = self
            .documents(collection)
            .into_iter()
            .filter(|doc| doc_matches(doc, filter))
            .take(filter.limit())
            .collect();
        let total = matched.len() as u64;

        let docs = matched
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|source| StoreError::Decode {
                collection: collection.slug(),
                source,
            })?;

        Ok(FindResult {
            docs,
            total_docs: Some(total),
        })
    }

    async fn create<D, T>(&self, collection: Collection, data: &D) -> Result<T, StoreError>
    where
        D: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        if self.fail_creates {
            return Err(StoreError::Api {
                status: 500,
                collection: collection.slug(),
                message: "Something went wrong.".to_string(),
            });
        }

        let mut doc = serde_json::to_value(data).map_err(|source| StoreError::Decode {
            collection: collection.slug(),
            source,
        })?;
        if let Value::Object(map) = &mut doc {
            if !map.contains_key("id") {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                map.insert("id".to_string(), Value::String(format!("{collection}-{id}")));
            }
        }

        self.documents
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(doc.clone());

        serde_json::from_value(doc).map_err(|source| StoreError::Decode {
            collection: collection.slug(),
            source,
        })
    }
}
