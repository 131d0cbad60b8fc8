//! Custom Test Assertions
//!
//! Assertion helpers for money and invoice chains with messages that name
//! the figures involved.

use core_kernel::Money;
use rust_decimal::Decimal;

use domain_billing::Invoice;

/// Asserts that a Money value has the expected amount
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money mismatch: actual={} {}, expected={}",
        actual.currency().symbol(),
        actual.amount(),
        expected
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that a Money value is not negative
pub fn assert_money_non_negative(money: &Money) {
    assert!(
        !money.is_negative(),
        "Expected non-negative money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts `total_amount == due_amount + arrear_amount`
pub fn assert_invoice_total(invoice: &Invoice) {
    let expected = invoice.due_amount.amount() + invoice.arrear_amount.amount();
    assert_eq!(
        invoice.total_amount.amount(),
        expected,
        "Invoice {} total {} != due {} + arrear {}",
        invoice.invoice_number,
        invoice.total_amount.amount(),
        invoice.due_amount.amount(),
        invoice.arrear_amount.amount()
    );
}

/// Asserts that `invoices` form one chain in date order
///
/// Each invoice must point at its predecessor and be dated strictly after it.
pub fn assert_invoice_chain(invoices: &[Invoice]) {
    for pair in invoices.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert_eq!(
            next.previous_invoice_id,
            Some(prev.id),
            "Invoice {} does not chain to {}",
            next.invoice_number,
            prev.invoice_number
        );
        assert!(
            next.invoice_date > prev.invoice_date,
            "Invoice {} dated {} is not after {} dated {}",
            next.invoice_number,
            next.invoice_date,
            prev.invoice_number,
            prev.invoice_date
        );
    }
    if let Some(first) = invoices.first() {
        assert!(
            first.previous_invoice_id.is_none(),
            "First invoice {} has a predecessor",
            first.invoice_number
        );
    }
}
