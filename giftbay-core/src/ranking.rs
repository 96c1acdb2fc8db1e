use giftbay_shared::Voucher;
use std::cmp::Ordering;

/// Shared tie-break policy for ordering candidate vouchers: soonest expiry
/// first, then highest discount efficiency, then lowest sale price. Every
/// component that orders candidates (bucket recommendation, sibling
/// expansion, budget allocation) uses this comparator.
pub fn compare(a: &Voucher, b: &Voucher) -> Ordering {
    a.expiry_date
        .cmp(&b.expiry_date)
        .then_with(|| compare_efficiency(b, a)) // descending
        .then_with(|| a.sale_price.cmp(&b.sale_price))
}

/// Sort a candidate set by the shared policy (stable)
pub fn rank(vouchers: &mut [Voucher]) {
    vouchers.sort_by(compare);
}

// (original - sale) / sale compared by cross-multiplication; sale_price is
// always positive, so the inequality direction is preserved and the order
// is exact where float division would not be.
fn compare_efficiency(a: &Voucher, b: &Voucher) -> Ordering {
    let lhs = (a.original_price - a.sale_price) as i128 * b.sale_price as i128;
    let rhs = (b.original_price - b.sale_price) as i128 * a.sale_price as i128;
    lhs.cmp(&rhs)
}
