// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

/// Outcome of a failed use case. Each variant maps to a single message the
/// CLI prints before exiting non-zero.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("payment exceeds the remaining due by {surplus}")]
    Surplus { surplus: Decimal },

    #[error("transaction {0} is cancelled")]
    Cancelled(i64),

    #[error("transaction {0} is already settled")]
    AlreadySettled(i64),

    #[error("task {0} is already completed")]
    AlreadyCompleted(i64),

    #[error("task {0} is cancelled")]
    TaskCancelled(i64),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
