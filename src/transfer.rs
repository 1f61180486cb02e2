// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Four-endpoint validity rule for transfers.
//!
//! Both account endpoints must be real or both must be the "no account"
//! sentinel; the same holds for categories; and at least one pair must be
//! real. Rejections block submission and never coerce values.

use crate::models::{AccountId, CategoryId, Transfer};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("a transfer must move between real accounts or real categories")]
    NothingToMove,

    #[error("accounts must both be set or both be 'no account'")]
    AccountMismatch,

    #[error("categories must both be set or both be 'no category'")]
    CategoryMismatch,

    #[error("transfer amount must be greater than zero")]
    NonPositiveAmount,
}

/// The gating predicate, evaluated on the four endpoint fields.
pub fn check_endpoints(
    from_account: Option<AccountId>,
    to_account: Option<AccountId>,
    from_category: Option<CategoryId>,
    to_category: Option<CategoryId>,
) -> Result<(), TransferError> {
    let accounts_real = from_account.is_some() && to_account.is_some();
    let accounts_none = from_account.is_none() && to_account.is_none();
    let categories_real = from_category.is_some() && to_category.is_some();
    let categories_none = from_category.is_none() && to_category.is_none();

    if accounts_none && categories_none {
        return Err(TransferError::NothingToMove);
    }
    if !accounts_real && !accounts_none {
        return Err(TransferError::AccountMismatch);
    }
    if !categories_real && !categories_none {
        return Err(TransferError::CategoryMismatch);
    }
    Ok(())
}

pub fn validate(transfer: &Transfer) -> Result<(), TransferError> {
    if transfer.amount <= Decimal::ZERO {
        return Err(TransferError::NonPositiveAmount);
    }
    check_endpoints(
        transfer.from_account_id,
        transfer.to_account_id,
        transfer.from_category_id,
        transfer.to_category_id,
    )
}

/// A transfer being edited. Every endpoint edit re-runs the predicate so
/// the current rejection is always available to show next to the form.
#[derive(Debug, Clone)]
pub struct TransferDraft {
    from_account: Option<AccountId>,
    to_account: Option<AccountId>,
    from_category: Option<CategoryId>,
    to_category: Option<CategoryId>,
    status: Result<(), TransferError>,
}

impl Default for TransferDraft {
    fn default() -> Self {
        Self {
            from_account: None,
            to_account: None,
            from_category: None,
            to_category: None,
            status: Err(TransferError::NothingToMove),
        }
    }
}

impl TransferDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_from_account(&mut self, id: Option<AccountId>) -> &mut Self {
        self.from_account = id;
        self.revalidate()
    }

    pub fn set_to_account(&mut self, id: Option<AccountId>) -> &mut Self {
        self.to_account = id;
        self.revalidate()
    }

    pub fn set_from_category(&mut self, id: Option<CategoryId>) -> &mut Self {
        self.from_category = id;
        self.revalidate()
    }

    pub fn set_to_category(&mut self, id: Option<CategoryId>) -> &mut Self {
        self.to_category = id;
        self.revalidate()
    }

    fn revalidate(&mut self) -> &mut Self {
        self.status = check_endpoints(
            self.from_account,
            self.to_account,
            self.from_category,
            self.to_category,
        );
        self
    }

    pub fn is_valid(&self) -> bool {
        self.status.is_ok()
    }

    /// Current validation message, if any.
    pub fn error(&self) -> Option<String> {
        self.status.as_ref().err().map(|e| e.to_string())
    }

    pub fn submit(
        &self,
        id: i64,
        amount: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> Result<Transfer, TransferError> {
        self.status.clone()?;
        let transfer = Transfer {
            id,
            amount: crate::money::round(amount),
            from_account_id: self.from_account,
            to_account_id: self.to_account,
            from_category_id: self.from_category,
            to_category_id: self.to_category,
            date,
            description,
            cleared: false,
        };
        validate(&transfer)?;
        Ok(transfer)
    }
}
