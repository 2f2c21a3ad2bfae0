//! # Checkout Service
//!
//! Orchestrates the purchase flow: stock reservation, snapshot capture,
//! discount stacking, and total computation, all inside ONE database
//! transaction.
//!
//! ## Purchase Flow
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Unit of Work                          │
//! │                                                                    │
//! │  validate request                                                  │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  BEGIN ──► resolve discount codes (all-or-nothing)                 │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  fetch delivery option ──► total = delivery price                  │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  for each line:                                                    │
//! │    reserve stock (guarded decrement)                               │
//! │    ensure snapshot for (item_id, updated_at)                       │
//! │    unit price ──► stack matching discounts ──► quantize            │
//! │    total += unit × quantity                                        │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  quantize total ──► insert transaction + lines + discount links    │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  COMMIT   (any error above ──► ROLLBACK, stock untouched)          │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure path rolls the whole thing back. A buyer never sees a
//! transaction that reserved some lines but not others, and a failed
//! checkout leaves stock exactly where it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::pool::Database;
use crate::repository::transaction::TransactionLine;
use crate::repository::{delivery, discount, item, transaction};
use bazaar_core::validation::{validate_discount_code, validate_line_count, validate_quantity};
use bazaar_core::{
    AppliedDiscount, CoreError, DeliveryOption, Money, Transaction, TransactionItem,
    TransactionStatus, ValidationError,
};

// =============================================================================
// Request / Receipt Types
// =============================================================================

/// One requested line of a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub item_id: String,
    pub quantity: i64,
}

/// A buyer's checkout request. Line order and discount-code order are
/// both significant: lines appear in the receipt in request order, and
/// stacked discounts multiply in code order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub lines: Vec<CheckoutLine>,
    pub delivery_option_id: String,
    #[serde(default)]
    pub discount_codes: Vec<String>,
    /// Free-form delivery details (recipient, address, ...).
    #[serde(default)]
    pub delivery_details: serde_json::Value,
}

/// One priced line in the checkout response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineReceipt {
    pub item_id: String,
    pub name: String,
    /// Catalog unit price before discounts.
    pub unit_price: Money,
    /// Quantized unit price after every matching discount.
    pub unit_price_after_discounts: Money,
    pub quantity: i64,
    /// The discounts that actually applied to this line, in code order.
    pub applied_discounts: Vec<AppliedDiscount>,
}

/// The full checkout response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub transaction_id: String,
    pub buyer_id: String,
    pub created_at: DateTime<Utc>,
    pub delivery_option: DeliveryOption,
    pub total_price: Money,
    pub lines: Vec<LineReceipt>,
}

/// A stored transaction together with its snapshot-backed lines and
/// applied codes, as returned by the read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction: Transaction,
    /// Lines joined to the snapshot of the version that was purchased;
    /// unaffected by later catalog edits.
    pub lines: Vec<TransactionLine>,
    pub discount_codes: Vec<String>,
}

// =============================================================================
// Checkout Service
// =============================================================================

/// The purchase orchestrator. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
}

impl CheckoutService {
    /// Creates a new CheckoutService over a database handle.
    pub fn new(db: Database) -> Self {
        CheckoutService { db }
    }

    /// Creates a transaction: reserves stock, freezes snapshots, applies
    /// discounts, and persists the result atomically.
    pub async fn create_transaction(
        &self,
        buyer_id: &str,
        request: &CheckoutRequest,
    ) -> StoreResult<CheckoutReceipt> {
        validate_request(buyer_id, request)?;

        debug!(
            buyer_id = %buyer_id,
            lines = request.lines.len(),
            codes = request.discount_codes.len(),
            "Starting checkout"
        );

        let mut tx = self.db.pool().begin().await?;

        // Resolve every code up front; one bad code fails the checkout
        // before any stock moves.
        let discounts = discount::resolve_codes(&mut tx, &request.discount_codes).await?;
        let delivery_option = delivery::get(&mut tx, &request.delivery_option_id).await?;

        let transaction_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let mut total = delivery_option.price;
        let mut line_receipts = Vec::with_capacity(request.lines.len());
        let mut stored_lines = Vec::with_capacity(request.lines.len());

        for line in &request.lines {
            let reserved = item::reserve(&mut tx, &line.item_id, line.quantity).await?;
            item::ensure_snapshot(&mut tx, &reserved).await?;

            let (unit_after, applied) =
                bazaar_core::discount::apply(&reserved, reserved.price, &discounts);

            total += unit_after * line.quantity;

            stored_lines.push(TransactionItem {
                transaction_id: transaction_id.clone(),
                item_id: reserved.id.clone(),
                item_updated_at: reserved.updated_at,
                quantity: line.quantity,
                unit_price: unit_after,
            });
            line_receipts.push(LineReceipt {
                item_id: reserved.id,
                name: reserved.name,
                unit_price: reserved.price,
                unit_price_after_discounts: unit_after,
                quantity: line.quantity,
                applied_discounts: applied,
            });
        }

        let total = total.quantize();

        let record = Transaction {
            id: transaction_id.clone(),
            buyer_id: buyer_id.to_string(),
            status: TransactionStatus::Open,
            delivery_option_id: delivery_option.id.clone(),
            delivery_details: request.delivery_details.clone(),
            total_price: total,
            created_at,
            finalized_at: None,
        };

        transaction::insert_transaction(&mut tx, &record).await?;
        for line in &stored_lines {
            transaction::insert_item(&mut tx, line).await?;
        }
        for code in applied_codes(&line_receipts) {
            transaction::insert_discount_link(&mut tx, &transaction_id, &code).await?;
        }

        tx.commit().await?;

        info!(
            transaction_id = %transaction_id,
            buyer_id = %buyer_id,
            total = %total,
            lines = line_receipts.len(),
            "Checkout committed"
        );

        Ok(CheckoutReceipt {
            transaction_id,
            buyer_id: buyer_id.to_string(),
            created_at,
            delivery_option,
            total_price: total,
            lines: line_receipts,
        })
    }

    /// Reads one of the buyer's transactions with its snapshot-backed
    /// lines and applied codes.
    ///
    /// ## Errors
    /// * `TransactionNotFound` - no such transaction for this buyer
    pub async fn get_transaction(
        &self,
        buyer_id: &str,
        transaction_id: &str,
    ) -> StoreResult<TransactionRecord> {
        let transaction = self
            .db
            .transactions()
            .get_by_id(buyer_id, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound {
                transaction_id: transaction_id.to_string(),
                buyer_id: buyer_id.to_string(),
            })?;

        let lines = self.db.transactions().lines_for(transaction_id).await?;
        let discount_codes = self
            .db
            .transactions()
            .discount_codes_for(transaction_id)
            .await?;

        Ok(TransactionRecord {
            transaction,
            lines,
            discount_codes,
        })
    }

    /// Lists the buyer's transactions, most recent first.
    pub async fn list_transactions(&self, buyer_id: &str) -> StoreResult<Vec<Transaction>> {
        Ok(self.db.transactions().list_for_buyer(buyer_id).await?)
    }

    /// Finalizes one of the buyer's open transactions.
    pub async fn finalize_transaction(
        &self,
        buyer_id: &str,
        transaction_id: &str,
    ) -> StoreResult<Transaction> {
        self.db
            .transactions()
            .finalize(buyer_id, transaction_id)
            .await
    }
}

fn validate_request(buyer_id: &str, request: &CheckoutRequest) -> Result<(), ValidationError> {
    if buyer_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "buyer_id".to_string(),
        });
    }

    if request.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }
    validate_line_count(request.lines.len())?;

    for (i, line) in request.lines.iter().enumerate() {
        validate_quantity(line.quantity)?;
        // Duplicate item lines would collide on the line-item key; callers
        // merge quantities instead.
        if request.lines[..i].iter().any(|l| l.item_id == line.item_id) {
            return Err(ValidationError::InvalidFormat {
                field: "lines".to_string(),
                reason: format!("duplicate item {}", line.item_id),
            });
        }
    }

    for code in &request.discount_codes {
        validate_discount_code(code)?;
    }

    Ok(())
}

/// Collects the codes that applied to at least one line, deduplicated,
/// preserving first-applied order.
fn applied_codes(lines: &[LineReceipt]) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for line in lines {
        for applied in &line.applied_discounts {
            if !codes.contains(&applied.code) {
                codes.push(applied.code.clone());
            }
        }
    }
    codes
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::pool::DbConfig;
    use crate::repository::item::generate_item_id;
    use bazaar_core::{CoreError, Discount, Item};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_item(
        db: &Database,
        name: &str,
        brand: Option<&str>,
        price: Decimal,
        stock: i64,
    ) -> Item {
        let now = Utc::now();
        let item = Item {
            id: generate_item_id(),
            name: name.to_string(),
            category: "shoes".to_string(),
            subcategories: vec!["boots".to_string()],
            brand: brand.map(str::to_string),
            price: Money::new(price),
            description: None,
            features: None,
            stock,
            created_at: now,
            updated_at: now,
        };
        db.items().insert(&item).await.unwrap();
        item
    }

    async fn seed_delivery(db: &Database, price: Decimal) -> DeliveryOption {
        let option = DeliveryOption {
            id: Uuid::new_v4().to_string(),
            name: "Standard".to_string(),
            price: Money::new(price),
        };
        db.delivery_options().insert(&option).await.unwrap();
        option
    }

    async fn seed_brand_discount(db: &Database, code: &str, pct: Decimal, brand: &str) {
        let d = Discount {
            code: code.to_string(),
            percentage: pct,
            brands: vec![brand.to_string()],
            ..Discount::default()
        };
        db.discounts().insert(&d).await.unwrap();
    }

    fn request(lines: Vec<CheckoutLine>, delivery: &DeliveryOption, codes: &[&str]) -> CheckoutRequest {
        CheckoutRequest {
            lines,
            delivery_option_id: delivery.id.clone(),
            discount_codes: codes.iter().map(|c| c.to_string()).collect(),
            delivery_details: serde_json::json!({"city": "Lahore"}),
        }
    }

    #[tokio::test]
    async fn test_checkout_end_to_end() {
        let db = test_db().await;
        let acme = seed_item(&db, "Trail Boot", Some("Acme"), dec!(100), 5).await;
        let plain = seed_item(&db, "City Sneaker", None, dec!(25), 2).await;
        let delivery = seed_delivery(&db, dec!(10)).await;
        seed_brand_discount(&db, "SALE10", dec!(10), "Acme").await;

        let service = CheckoutService::new(db.clone());
        let receipt = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![
                        CheckoutLine { item_id: acme.id.clone(), quantity: 1 },
                        CheckoutLine { item_id: plain.id.clone(), quantity: 2 },
                    ],
                    &delivery,
                    &["SALE10"],
                ),
            )
            .await
            .unwrap();

        // 100 × 0.9 + 25 × 2 + 10 delivery = 150.00
        assert_eq!(receipt.total_price, Money::new(dec!(150.00)));
        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.lines[0].unit_price_after_discounts, Money::new(dec!(90.00)));
        assert_eq!(receipt.lines[0].applied_discounts.len(), 1);
        assert!(receipt.lines[1].applied_discounts.is_empty());

        // Stock decremented per line.
        assert_eq!(db.items().get_by_id(&acme.id).await.unwrap().unwrap().stock, 4);
        assert_eq!(db.items().get_by_id(&plain.id).await.unwrap().unwrap().stock, 1);

        // One snapshot per item version.
        assert_eq!(db.items().snapshot_count(&acme.id).await.unwrap(), 1);
        assert_eq!(db.items().snapshot_count(&plain.id).await.unwrap(), 1);

        // Stored record: lines point at the purchased version, and only
        // the applied code is linked.
        let record = service
            .get_transaction("buyer-1", &receipt.transaction_id)
            .await
            .unwrap();
        assert_eq!(record.transaction.total_price, Money::new(dec!(150.00)));
        assert_eq!(record.transaction.status, TransactionStatus::Open);
        assert_eq!(record.lines.len(), 2);
        assert_eq!(record.discount_codes, vec!["SALE10".to_string()]);
        let boot_line = record
            .lines
            .iter()
            .find(|l| l.item_id == acme.id)
            .unwrap();
        assert_eq!(boot_line.item_updated_at, acme.updated_at);
        assert_eq!(boot_line.name, "Trail Boot");
        assert_eq!(boot_line.brand.as_deref(), Some("Acme"));
        assert_eq!(boot_line.unit_price, Money::new(dec!(100)));
        assert_eq!(boot_line.unit_price_after_discounts, Money::new(dec!(90.00)));
    }

    #[tokio::test]
    async fn test_checkout_is_atomic_on_mid_request_failure() {
        let db = test_db().await;
        let first = seed_item(&db, "First", None, dec!(10), 5).await;
        let scarce = seed_item(&db, "Scarce", None, dec!(10), 1).await;
        let delivery = seed_delivery(&db, dec!(10)).await;

        let service = CheckoutService::new(db.clone());
        let err = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![
                        CheckoutLine { item_id: first.id.clone(), quantity: 2 },
                        CheckoutLine { item_id: scarce.id.clone(), quantity: 2 },
                    ],
                    &delivery,
                    &[],
                ),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Domain(CoreError::InsufficientStock { .. })
        ));

        // The first line's reservation rolled back with the rest.
        assert_eq!(db.items().get_by_id(&first.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(db.items().get_by_id(&scarce.id).await.unwrap().unwrap().stock, 1);
        assert_eq!(db.items().snapshot_count(&first.id).await.unwrap(), 0);
        assert!(service.list_transactions("buyer-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_discount_code_reserves_nothing() {
        let db = test_db().await;
        let item = seed_item(&db, "Boot", None, dec!(10), 5).await;
        let delivery = seed_delivery(&db, dec!(10)).await;

        let service = CheckoutService::new(db.clone());
        let err = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![CheckoutLine { item_id: item.id.clone(), quantity: 1 }],
                    &delivery,
                    &["NOPE"],
                ),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Domain(CoreError::DiscountNotFound(_))
        ));
        assert_eq!(db.items().get_by_id(&item.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_stacked_codes_link_once_each() {
        let db = test_db().await;
        let item = seed_item(&db, "Boot", Some("Acme"), dec!(45), 10).await;
        let delivery = seed_delivery(&db, dec!(0)).await;
        seed_brand_discount(&db, "TEN-A", dec!(10), "Acme").await;
        seed_brand_discount(&db, "TEN-B", dec!(10), "Acme").await;

        let service = CheckoutService::new(db.clone());
        let receipt = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![CheckoutLine { item_id: item.id.clone(), quantity: 1 }],
                    &delivery,
                    &["TEN-A", "TEN-B"],
                ),
            )
            .await
            .unwrap();

        // 45 × 0.9 × 0.9 = 36.45, quantized once at the end.
        assert_eq!(receipt.total_price, Money::new(dec!(36.45)));

        let record = service
            .get_transaction("buyer-1", &receipt.transaction_id)
            .await
            .unwrap();
        assert_eq!(record.discount_codes.len(), 2);
    }

    #[tokio::test]
    async fn test_non_matching_code_is_not_linked() {
        let db = test_db().await;
        let item = seed_item(&db, "Boot", None, dec!(45), 10).await;
        let delivery = seed_delivery(&db, dec!(0)).await;
        seed_brand_discount(&db, "ACME-ONLY", dec!(10), "Acme").await;

        let service = CheckoutService::new(db.clone());
        let receipt = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![CheckoutLine { item_id: item.id.clone(), quantity: 1 }],
                    &delivery,
                    &["ACME-ONLY"],
                ),
            )
            .await
            .unwrap();

        // The code resolved but matched nothing: full price, no link.
        assert_eq!(receipt.total_price, Money::new(dec!(45.00)));
        let record = service
            .get_transaction("buyer-1", &receipt.transaction_id)
            .await
            .unwrap();
        assert!(record.discount_codes.is_empty());
    }

    #[tokio::test]
    async fn test_read_reports_purchased_version_after_catalog_edit() {
        let db = test_db().await;
        let mut item = seed_item(&db, "Trail Boot", Some("Acme"), dec!(100), 5).await;
        let delivery = seed_delivery(&db, dec!(10)).await;

        let service = CheckoutService::new(db.clone());
        let receipt = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![CheckoutLine { item_id: item.id.clone(), quantity: 1 }],
                    &delivery,
                    &[],
                ),
            )
            .await
            .unwrap();

        // Catalog edit after the purchase: new name, new price, new version.
        item.name = "Trail Boot Mk II".to_string();
        item.price = Money::new(dec!(140));
        db.items().update(&item).await.unwrap();

        // The read still shows the version that was bought.
        let record = service
            .get_transaction("buyer-1", &receipt.transaction_id)
            .await
            .unwrap();
        assert_eq!(record.lines.len(), 1);
        assert_eq!(record.lines[0].name, "Trail Boot");
        assert_eq!(record.lines[0].unit_price, Money::new(dec!(100)));
        assert_eq!(record.lines[0].unit_price_after_discounts, Money::new(dec!(100.00)));
    }

    #[tokio::test]
    async fn test_get_missing_transaction_reports_not_found() {
        let db = test_db().await;
        let service = CheckoutService::new(db);

        let err = service
            .get_transaction("buyer-1", "no-such-transaction")
            .await
            .unwrap_err();
        match err {
            StoreError::Domain(CoreError::TransactionNotFound {
                transaction_id,
                buyer_id,
            }) => {
                assert_eq!(transaction_id, "no-such-transaction");
                assert_eq!(buyer_id, "buyer-1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ceiling_quantization_at_line_and_total() {
        let db = test_db().await;
        // Three-decimal catalog price.
        let item = seed_item(&db, "Odd Price", None, dec!(10.001), 10).await;
        let delivery = seed_delivery(&db, dec!(0)).await;

        let service = CheckoutService::new(db.clone());
        let receipt = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![CheckoutLine { item_id: item.id.clone(), quantity: 3 }],
                    &delivery,
                    &[],
                ),
            )
            .await
            .unwrap();

        // Unit quantizes up to 10.01; total 3 × 10.01 = 30.03.
        assert_eq!(receipt.lines[0].unit_price_after_discounts, Money::new(dec!(10.01)));
        assert_eq!(receipt.total_price, Money::new(dec!(30.03)));
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_requests() {
        let db = test_db().await;
        let item = seed_item(&db, "Boot", None, dec!(10), 5).await;
        let delivery = seed_delivery(&db, dec!(10)).await;
        let service = CheckoutService::new(db.clone());

        // Empty lines.
        let err = service
            .create_transaction("buyer-1", &request(vec![], &delivery, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));

        // Zero quantity.
        let err = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![CheckoutLine { item_id: item.id.clone(), quantity: 0 }],
                    &delivery,
                    &[],
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));

        // Duplicate item lines.
        let err = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![
                        CheckoutLine { item_id: item.id.clone(), quantity: 1 },
                        CheckoutLine { item_id: item.id.clone(), quantity: 1 },
                    ],
                    &delivery,
                    &[],
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));

        // Nothing reserved by any of the rejects.
        assert_eq!(db.items().get_by_id(&item.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() {
        let db = test_db().await;
        let item = seed_item(&db, "Hot Item", None, dec!(10), 5).await;
        let delivery = seed_delivery(&db, dec!(0)).await;

        let service = CheckoutService::new(db.clone());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let item_id = item.id.clone();
            let delivery = delivery.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_transaction(
                        "buyer-1",
                        &CheckoutRequest {
                            lines: vec![CheckoutLine { item_id, quantity: 1 }],
                            delivery_option_id: delivery.id,
                            discount_codes: vec![],
                            delivery_details: serde_json::json!({}),
                        },
                    )
                    .await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        // Exactly the available stock was sold, never more.
        assert_eq!(succeeded, 5);
        assert_eq!(db.items().get_by_id(&item.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_finalize_through_service() {
        let db = test_db().await;
        let item = seed_item(&db, "Boot", None, dec!(10), 5).await;
        let delivery = seed_delivery(&db, dec!(10)).await;

        let service = CheckoutService::new(db.clone());
        let receipt = service
            .create_transaction(
                "buyer-1",
                &request(
                    vec![CheckoutLine { item_id: item.id.clone(), quantity: 1 }],
                    &delivery,
                    &[],
                ),
            )
            .await
            .unwrap();

        let finalized = service
            .finalize_transaction("buyer-1", &receipt.transaction_id)
            .await
            .unwrap();
        assert_eq!(finalized.status, TransactionStatus::Finalized);

        let err = service
            .finalize_transaction("buyer-1", &receipt.transaction_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::TransactionAlreadyFinalized(_))
        ));
    }
}
