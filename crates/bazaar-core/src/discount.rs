//! # Discount Matching & Stacking
//!
//! Decides whether a discount applies to an item, and applies a stack of
//! discounts to a unit price.
//!
//! ## Matching Rules
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  A discount applies to an item iff NONE of these exclusions fire:  │
//! │                                                                    │
//! │  1. restricted to item ids    AND item.id not in the set           │
//! │  2. restricted to brands      AND item.brand not in the set        │
//! │  3. restricted to categories  AND item.category not a key          │
//! │  4. item.category IS a key    AND no subcategory of the item       │
//! │                                intersects the allowed set          │
//! │                                                                    │
//! │  An empty axis = no restriction on that axis.                      │
//! │  A discount with no restrictions applies to every item.            │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stacking
//! Discounts apply multiplicatively and cumulatively in input order:
//! two 10% discounts on 45.00 give `45 × 0.9 × 0.9 = 36.45`. The product
//! is order-independent, but the list of applied descriptors preserves
//! the caller's code order, which is observable in responses.

use crate::money::Money;
use crate::types::{AppliedDiscount, Discount, Item};

/// Returns whether `discount` applies to `item`.
///
/// The item-id restriction is a hard filter: when present, an item outside
/// the set is excluded regardless of the other axes.
pub fn applies(discount: &Discount, item: &Item) -> bool {
    // Rule 1: explicit item-id restriction.
    if !discount.item_ids.is_empty() && !discount.item_ids.contains(&item.id) {
        return false;
    }

    // Rule 2: brand restriction. An item with no brand cannot satisfy one.
    if !discount.brands.is_empty() {
        match &item.brand {
            Some(brand) if discount.brands.contains(brand) => {}
            _ => return false,
        }
    }

    // Rules 3 and 4: category restriction with per-category subcategories.
    if !discount.categories.is_empty() {
        match discount.categories.get(&item.category) {
            None => return false,
            Some(allowed_subcategories) => {
                if !item
                    .subcategories
                    .iter()
                    .any(|sub| allowed_subcategories.contains(sub))
                {
                    return false;
                }
            }
        }
    }

    true
}

/// Applies every matching discount to `unit_price`, in input order.
///
/// Returns the ceiling-quantized post-discount unit price and the list of
/// applied `{code, percentage}` descriptors, ordered like the input.
/// Non-matching discounts are skipped silently; they are not an error.
pub fn apply(item: &Item, unit_price: Money, discounts: &[Discount]) -> (Money, Vec<AppliedDiscount>) {
    let mut price = unit_price;
    let mut applied = Vec::new();

    for discount in discounts {
        if !applies(discount, item) {
            continue;
        }

        price = price.apply_percentage(discount.percentage);
        applied.push(AppliedDiscount {
            code: discount.code.clone(),
            percentage: discount.percentage,
        });
    }

    (price.quantize(), applied)
}

// =============================================================================
// Unit Tests
// =============================================================================
