//! # Domain Types
//!
//! Core domain types for the marketplace transaction core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                               │
//! │                                                                    │
//! │  ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐     │
//! │  │     Item     │   │    Discount    │   │  DeliveryOption  │     │
//! │  │ ───────────  │   │ ─────────────  │   │ ───────────────  │     │
//! │  │ id (UUID)    │   │ code (unique)  │   │ id (UUID)        │     │
//! │  │ price        │   │ percentage     │   │ name             │     │
//! │  │ stock        │   │ scope (3 axes) │   │ price            │     │
//! │  │ updated_at ──┼─┐ └────────────────┘   └──────────────────┘     │
//! │  └──────────────┘ │                                               │
//! │                   │ version key                                   │
//! │  ┌────────────────▼─┐   ┌──────────────┐   ┌─────────────────┐    │
//! │  │   ItemSnapshot   │   │ Transaction  │   │ TransactionItem │    │
//! │  │ ───────────────  │   │ ───────────  │   │ ─────────────── │    │
//! │  │ (item_id,        │◄──┼─ line items ─┼───│ item_updated_at │    │
//! │  │  updated_at) PK  │   │ status       │   │ unit_price      │    │
//! │  └──────────────────┘   └──────────────┘   └─────────────────┘    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Versioning
//! An item "version" is identified by the item's `updated_at` timestamp.
//! The first purchase of a given version freezes an [`ItemSnapshot`] keyed
//! by `(item_id, updated_at)`; transactions reference that key so they can
//! show historically-accurate item details after the live item changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Item
// =============================================================================

/// A sellable listing.
///
/// Mutated by stock reservations and catalog edits; never deleted while
/// referenced by a live transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Category name (e.g. "shoes").
    pub category: String,

    /// Subcategories within the category (e.g. ["boots"]). Empty when the
    /// item has none.
    pub subcategories: Vec<String>,

    /// Brand, if any.
    pub brand: Option<String>,

    /// Unit price. May carry more than two decimal places.
    pub price: Money,

    /// Optional long description.
    pub description: Option<String>,

    /// Free-form caller-defined attributes (JSON object).
    pub features: Option<serde_json::Value>,

    /// Units available for sale. Invariant: never negative.
    pub stock: i64,

    pub created_at: DateTime<Utc>,

    /// Last modification time; doubles as the snapshot version key.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Item Snapshot
// =============================================================================

/// An immutable copy of an item's purchase-relevant fields, keyed by
/// `(item_id, updated_at)` at capture time.
///
/// Created once per distinct item version, the first time that version is
/// purchased; never mutated or deleted. Stock is deliberately NOT part of
/// the snapshot: it is live inventory state, not a purchase attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item_id: String,
    /// The item's `updated_at` at capture time (version key).
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub category: String,
    pub subcategories: Vec<String>,
    pub brand: Option<String>,
    pub price: Money,
    pub description: Option<String>,
    pub features: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ItemSnapshot {
    /// Captures a snapshot of the item's current version.
    pub fn capture(item: &Item) -> Self {
        ItemSnapshot {
            item_id: item.id.clone(),
            updated_at: item.updated_at,
            name: item.name.clone(),
            category: item.category.clone(),
            subcategories: item.subcategories.clone(),
            brand: item.brand.clone(),
            price: item.price,
            description: item.description.clone(),
            features: item.features.clone(),
            created_at: item.created_at,
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// A named promotional rule: a percentage off, plus an applicability scope
/// over three independent axes.
///
/// An empty scope field on a given axis means "no restriction on that
/// axis"; a discount with no restrictions at all applies to every item.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Discount {
    /// Unique code the buyer supplies (e.g. "SALE10").
    pub code: String,

    /// Percentage off, 0–100.
    pub percentage: Decimal,

    /// Restricts the discount to these item ids. Empty = unrestricted.
    pub item_ids: Vec<String>,

    /// Restricts the discount to these brands. Empty = unrestricted.
    pub brands: Vec<String>,

    /// Restricts the discount to these categories, each with an allowed
    /// set of subcategories. Empty = unrestricted.
    pub categories: HashMap<String, Vec<String>>,

    /// Validity window, filtered at the fetch boundary.
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// A discount that was actually applied to a line item, as reported in
/// the checkout response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub code: String,
    pub percentage: Decimal,
}

// =============================================================================
// Delivery Option
// =============================================================================

/// A named shipping method with a fixed price. Contributes to the
/// transaction total but is never subject to discounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOption {
    pub id: String,
    pub name: String,
    pub price: Money,
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Lifecycle of a transaction after creation.
///
/// A transaction transitions from `Open` to `Finalized` exactly once;
/// there is no way back and no other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created and committed; awaiting fulfilment.
    #[default]
    Open,
    /// Fulfilled and closed.
    Finalized,
}

// =============================================================================
// Transaction
// =============================================================================

/// The record of a purchase. Created once, atomically, with its line
/// items and discount associations; immutable afterward except for the
/// open → finalized status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub buyer_id: String,
    pub status: TransactionStatus,
    pub delivery_option_id: String,
    /// Free-form delivery details (recipient, address, ...), caller-defined.
    pub delivery_details: serde_json::Value,
    /// Quantized total: delivery price plus all line totals.
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Transaction Item
// =============================================================================

/// One purchased line. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionItem {
    pub transaction_id: String,
    pub item_id: String,
    /// Version key of the snapshot this line was priced against.
    pub item_updated_at: DateTime<Utc>,
    pub quantity: i64,
    /// Unit price after discounts, quantized.
    pub unit_price: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
