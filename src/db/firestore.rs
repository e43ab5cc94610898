// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend: document-level operations on top of the fluent API.
//!
//! The typed repository in `db::repository` is the only caller; it picks the
//! collection and the model type, this module moves documents.

use crate::error::AppError;
use serde::{de::DeserializeOwned, Serialize};

/// Attempts for a transaction that keeps losing commit races.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn connect(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::connect_emulator(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn connect_emulator(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    pub async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(db_err)
    }

    pub async fn put<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// All documents whose string `field` equals `value`.
    pub async fn find_by<T>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let field = field.to_string();
        let value = value.to_string();
        self.client
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.for_all([q.field(field.as_str()).eq(value.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    pub async fn list<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.client
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Read-modify-write of one or two documents in a transaction.
    ///
    /// Both documents are read through the transaction so Firestore detects
    /// concurrent writes to them. `apply` sees the current documents; every
    /// document still present afterwards is written back. A commit that loses
    /// a race is retried from a fresh read, so `apply` may run more than once.
    /// An error from `apply` rolls back without writing.
    pub async fn transact<A, B, R, F>(
        &self,
        first: (&str, &str),
        second: Option<(&str, &str)>,
        mut apply: F,
    ) -> Result<R, AppError>
    where
        A: Serialize + DeserializeOwned + Sync + Send,
        B: Serialize + DeserializeOwned + Sync + Send,
        R: Send,
        F: FnMut(&mut Option<A>, &mut Option<B>) -> Result<R, AppError> + Send,
    {
        let (col_a, id_a) = first;
        let mut attempt = 1;

        loop {
            let mut transaction = self
                .client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            // Reads bound to the transaction register the documents for
            // conflict detection.
            let tx_db = self.client.clone_with_consistency_selector(
                firestore::FirestoreConsistencySelector::Transaction(
                    transaction.transaction_id().clone(),
                ),
            );

            let mut doc_a: Option<A> = tx_db
                .fluent()
                .select()
                .by_id_in(col_a)
                .obj()
                .one(id_a)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read {} in transaction: {}", col_a, e))
                })?;

            let mut doc_b: Option<B> = match second {
                Some((col_b, id_b)) => tx_db
                    .fluent()
                    .select()
                    .by_id_in(col_b)
                    .obj()
                    .one(id_b)
                    .await
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to read {} in transaction: {}",
                            col_b, e
                        ))
                    })?,
                None => None,
            };

            let result = match apply(&mut doc_a, &mut doc_b) {
                Ok(result) => result,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            if let Some(doc) = &doc_a {
                self.client
                    .fluent()
                    .update()
                    .in_col(col_a)
                    .document_id(id_a)
                    .object(doc)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add {} to transaction: {}", col_a, e))
                    })?;
            }

            if let (Some((col_b, id_b)), Some(doc)) = (second, &doc_b) {
                self.client
                    .fluent()
                    .update()
                    .in_col(col_b)
                    .document_id(id_b)
                    .object(doc)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add {} to transaction: {}", col_b, e))
                    })?;
            }

            match transaction.commit().await {
                Ok(_) => return Ok(result),
                Err(firestore::errors::FirestoreError::DatabaseError(ref e))
                    if e.retry_possible && attempt < MAX_TRANSACTION_ATTEMPTS =>
                {
                    tracing::warn!(
                        attempt,
                        collection = col_a,
                        document = id_a,
                        details = %e.details,
                        "Transaction contended, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!("Transaction commit failed: {}", e)))
                }
            }
        }
    }
}
