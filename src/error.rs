// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error types for the balance engine

use crate::models::BudgetId;
use crate::period::YearMonth;
use crate::transfer::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("No anchor month found for budget {budget_id} before {searched_from}")]
    MissingAnchor {
        budget_id: BudgetId,
        searched_from: YearMonth,
    },

    #[error("Budget {0} is not in the cache")]
    StaleCache(BudgetId),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(#[from] TransferError),

    #[error("Amount {value} for {field} is not a whole number of cents")]
    PrecisionDrift { field: String, value: String },

    #[error("Budget {0} has a failed recalculation; retry before editing")]
    EditsBlocked(BudgetId),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
