use crate::model::{RoiData, TransactionKind};

/// Compute the ROI adjustment amount, its supporting breakdown, and the
/// transaction kind it should be recorded as.
///
/// Positive profit rounds the reward up (`ceil(0.5 * profit)`); a loss
/// rounds the penalty down (`floor(0.25 * profit)`, itself negative).
/// This matches the rounding direction called out explicitly in the
/// spec rather than plain truncation.
pub fn compute(revenue_cents: i64, cost_cents: i64) -> (i64, RoiData, TransactionKind) {
    let profit_cents = revenue_cents - cost_cents;
    let roi_percent = (profit_cents as f64 / cost_cents as f64) * 100.0;

    let (amount, kind) = if profit_cents >= 0 {
        let adjustment = (0.5 * profit_cents as f64).ceil() as i64;
        (adjustment, TransactionKind::RoiAdjustment)
    } else {
        let adjustment = (0.25 * profit_cents as f64).floor() as i64;
        (adjustment, TransactionKind::Penalty)
    };

    let roi_data = RoiData {
        revenue_cents,
        cost_cents,
        profit_cents,
        roi_percent,
    };

    (amount, roi_data, kind)
}
