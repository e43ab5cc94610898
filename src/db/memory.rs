// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store with the same semantics as the Firestore backend.
//!
//! Documents are kept as JSON values so that field filters see exactly the
//! serialized (camelCase) shape that Firestore would store.

use crate::error::AppError;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    /// collection -> (document id -> document)
    collections: DashMap<String, BTreeMap<String, Value>>,
    /// Serializes read-modify-write transactions.
    txn: Mutex<()>,
}

/// Process-local document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, AppError> {
    serde_json::from_value(value.clone()).map_err(|e| AppError::Database(e.to_string()))
}

fn encode<T: Serialize>(doc: &T) -> Result<Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(e.to_string()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError> {
        self.inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
            .map(|v| decode(&v))
            .transpose()
    }

    pub fn put<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError> {
        let value = encode(doc)?;
        self.inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value);
        Ok(())
    }

    pub fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        if let Some(mut docs) = self.inner.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    pub fn find_by<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError> {
        let Some(docs) = self.inner.collections.get(collection) else {
            return Ok(Vec::new());
        };
        docs.values()
            .filter(|doc| doc.get(field).and_then(Value::as_str) == Some(value))
            .map(decode)
            .collect()
    }

    pub fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, AppError> {
        let Some(docs) = self.inner.collections.get(collection) else {
            return Ok(Vec::new());
        };
        docs.values().map(decode).collect()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Read-modify-write of one or two documents. The reads, `apply` and the
    /// writes all happen under one lock, so concurrent callers see each
    /// other's result.
    pub fn transact<A, B, R, F>(
        &self,
        first: (&str, &str),
        second: Option<(&str, &str)>,
        mut apply: F,
    ) -> Result<R, AppError>
    where
        A: Serialize + DeserializeOwned,
        B: Serialize + DeserializeOwned,
        F: FnMut(&mut Option<A>, &mut Option<B>) -> Result<R, AppError>,
    {
        let _lock = self
            .inner
            .txn
            .lock()
            .map_err(|_| AppError::Database("Transaction lock poisoned".to_string()))?;

        let (col_a, id_a) = first;
        let mut doc_a: Option<A> = self.get(col_a, id_a)?;
        let mut doc_b: Option<B> = match second {
            Some((col_b, id_b)) => self.get(col_b, id_b)?,
            None => None,
        };

        let result = apply(&mut doc_a, &mut doc_b)?;

        // Encode both before writing either.
        let value_a = doc_a.as_ref().map(encode).transpose()?;
        let value_b = doc_b.as_ref().map(encode).transpose()?;

        if let Some(v) = value_a {
            self.put(col_a, id_a, &v)?;
        }
        if let (Some((col_b, id_b)), Some(v)) = (second, value_b) {
            self.put(col_b, id_b, &v)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Doc {
        id: String,
        user_id: String,
    }

    fn doc(id: &str, user_id: &str) -> Doc {
        Doc {
            id: id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn test_find_by_uses_serialized_field_names() {
        let store = MemoryStore::new();
        store.put("patients", "a", &doc("a", "u1")).unwrap();
        store.put("patients", "b", &doc("b", "u2")).unwrap();

        let found: Vec<Doc> = store.find_by("patients", "userId", "u2").unwrap();
        assert_eq!(found, vec![doc("b", "u2")]);

        let none: Vec<Doc> = store.find_by("patients", "user_id", "u2").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_count_and_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.count("users"), 0);
        store.put("users", "a", &doc("a", "u")).unwrap();
        store.put("users", "a", &doc("a", "u")).unwrap();
        store.put("users", "b", &doc("b", "u")).unwrap();
        assert_eq!(store.count("users"), 2);

        store.delete("users", "a").unwrap();
        assert_eq!(store.count("users"), 1);
        assert!(store.get::<Doc>("users", "a").unwrap().is_none());
    }

    #[test]
    fn test_transact_failure_writes_nothing() {
        let store = MemoryStore::new();
        store.put("requests", "r1", &doc("r1", "u")).unwrap();
        store.put("patients", "p1", &doc("p1", "u")).unwrap();

        let result = store.transact::<Doc, Doc, (), _>(
            ("requests", "r1"),
            Some(("patients", "p1")),
            |request, patient| {
                request.as_mut().unwrap().user_id = "changed".to_string();
                patient.as_mut().unwrap().user_id = "changed".to_string();
                Err(AppError::Conflict("nope".to_string()))
            },
        );

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.get::<Doc>("requests", "r1").unwrap(), Some(doc("r1", "u")));
        assert_eq!(store.get::<Doc>("patients", "p1").unwrap(), Some(doc("p1", "u")));
    }

    #[test]
    fn test_transact_applies_to_current_documents() {
        let store = MemoryStore::new();
        store.put("patients", "p1", &doc("p1", "u1")).unwrap();

        // Two updates that each start from whatever is stored keep both effects.
        for suffix in ["-a", "-b"] {
            store
                .transact::<Doc, Doc, (), _>(("patients", "p1"), None, |patient, _| {
                    patient.as_mut().unwrap().user_id.push_str(suffix);
                    Ok(())
                })
                .unwrap();
        }

        assert_eq!(
            store.get::<Doc>("patients", "p1").unwrap(),
            Some(doc("p1", "u1-a-b"))
        );
    }

    #[test]
    fn test_transact_missing_document_is_not_written() {
        let store = MemoryStore::new();
        let seen = store
            .transact::<Doc, Doc, bool, _>(("patients", "nope"), None, |patient, _| {
                Ok(patient.is_some())
            })
            .unwrap();

        assert!(!seen);
        assert_eq!(store.count("patients"), 0);
    }
}
