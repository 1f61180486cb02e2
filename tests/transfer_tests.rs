// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use envelope_ledger::transfer::{TransferDraft, TransferError, check_endpoints, validate};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[test]
fn endpoint_rule() {
    assert_eq!(check_endpoints(Some(1), Some(2), None, None), Ok(()));
    assert_eq!(check_endpoints(None, None, Some(1), Some(2)), Ok(()));
    assert_eq!(check_endpoints(Some(1), Some(2), Some(3), Some(4)), Ok(()));
    assert_eq!(
        check_endpoints(None, None, None, None),
        Err(TransferError::NothingToMove)
    );
    assert_eq!(
        check_endpoints(Some(1), None, None, None),
        Err(TransferError::AccountMismatch)
    );
    assert_eq!(
        check_endpoints(None, None, None, Some(4)),
        Err(TransferError::CategoryMismatch)
    );
    assert_eq!(
        check_endpoints(Some(1), Some(2), Some(3), None),
        Err(TransferError::CategoryMismatch)
    );
}

#[test]
fn draft_revalidates_on_every_edit() {
    let mut draft = TransferDraft::new();
    assert!(!draft.is_valid());
    assert_eq!(
        draft.error().as_deref(),
        Some("a transfer must move between real accounts or real categories")
    );

    draft.set_from_account(Some(1));
    assert_eq!(
        draft.error().as_deref(),
        Some("accounts must both be set or both be 'no account'")
    );

    draft.set_to_account(Some(2));
    assert!(draft.is_valid());
    assert_eq!(draft.error(), None);

    draft.set_to_category(Some(5));
    assert!(!draft.is_valid());
    draft.set_from_category(Some(4));
    assert!(draft.is_valid());
}

#[test]
fn rejected_draft_cannot_be_submitted() {
    let mut draft = TransferDraft::new();
    draft.set_from_account(Some(1)).set_to_category(Some(3));
    let err = draft.submit(0, d("10"), today(), None).unwrap_err();
    assert_eq!(err, TransferError::AccountMismatch);
}

#[test]
fn submitted_transfer_is_rounded_and_checked() {
    let mut draft = TransferDraft::new();
    draft.set_from_category(Some(1)).set_to_category(Some(2));
    let t = draft
        .submit(7, d("12.345"), today(), Some("top up".into()))
        .unwrap();
    assert_eq!(t.amount, d("12.35"));
    assert_eq!(t.from_account_id, None);
    assert_eq!(t.to_category_id, Some(2));
    assert_eq!(validate(&t), Ok(()));

    let err = draft.submit(8, d("0"), today(), None).unwrap_err();
    assert_eq!(err, TransferError::NonPositiveAmount);
}
