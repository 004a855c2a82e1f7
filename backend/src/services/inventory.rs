//! Inventory ledger service
//!
//! The transaction history table is the source of truth; the
//! current_inventory table is a materialized snapshot rebuilt by replaying
//! the ledger. Every mutating operation runs its ledger write and the
//! resulting replay-and-upsert inside one database transaction, serialized
//! per (tenant, item) with an advisory lock so concurrent writers to the
//! same item cannot interleave their recalculations. Different items and
//! different tenants proceed in parallel.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::{replay, LedgerEntry, StockSnapshot, TransactionKind, DEFAULT_UNIT};

use crate::error::{AppError, AppResult};
use crate::middleware::TenantContext;

/// Inventory service for managing the ledger and its snapshots
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Ledger row as persisted
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockTransaction {
    pub id: i64,
    pub tenant_id: Uuid,
    pub item_type: String,
    pub quantity: Decimal,
    pub transaction_type: String,
    pub price: Decimal,
    pub total_cost: Decimal,
    pub transaction_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a ledger transaction
///
/// Required fields are optional at the type level so that a missing field
/// surfaces as a field-level validation error rather than a decode failure.
#[derive(Debug, Deserialize)]
pub struct RecordTransactionInput {
    pub item_type: Option<String>,
    pub quantity: Option<Decimal>,
    pub transaction_type: Option<String>,
    pub price: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Overrides the snapshot's sticky unit of measure when present
    pub unit: Option<String>,
}

/// Input for updating a ledger transaction
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionInput {
    pub item_type: Option<String>,
    pub quantity: Option<Decimal>,
    pub transaction_type: Option<String>,
    pub price: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// One row of a bulk ledger import
#[derive(Debug, Deserialize)]
pub struct BulkTransactionRow {
    /// Rejected when present and different from the caller's tenant
    pub tenant_id: Option<Uuid>,
    pub item_type: Option<String>,
    pub quantity: Option<Decimal>,
    pub transaction_type: Option<String>,
    pub price: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Validated core fields of a transaction payload
#[derive(Debug)]
struct ValidatedMovement {
    item_type: String,
    quantity: Decimal,
    kind: TransactionKind,
    price: Decimal,
    total_cost: Decimal,
}

fn validate_movement(
    item_type: Option<&str>,
    quantity: Option<Decimal>,
    transaction_type: Option<&str>,
    price: Option<Decimal>,
) -> AppResult<ValidatedMovement> {
    let item_type = match item_type {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(AppError::validation("item_type", "item_type is required")),
    };

    let quantity =
        quantity.ok_or_else(|| AppError::validation("quantity", "quantity is required"))?;
    if quantity < Decimal::ZERO {
        return Err(AppError::validation(
            "quantity",
            "quantity must not be negative",
        ));
    }

    let raw_kind = transaction_type.ok_or_else(|| {
        AppError::validation("transaction_type", "transaction_type is required")
    })?;
    let kind = TransactionKind::parse(raw_kind).ok_or_else(|| {
        AppError::validation(
            "transaction_type",
            format!("unknown transaction_type '{}'", raw_kind),
        )
    })?;

    let price = price.unwrap_or(Decimal::ZERO);
    if price < Decimal::ZERO {
        return Err(AppError::validation("price", "price must not be negative"));
    }

    Ok(ValidatedMovement {
        item_type,
        quantity,
        kind,
        price,
        total_cost: quantity * price,
    })
}

/// Items whose snapshots a moving edit touches, in a stable order so
/// concurrent writers acquire their advisory locks consistently.
fn affected_items(old_item: &str, new_item: &str) -> Vec<String> {
    let mut items = vec![old_item.to_string(), new_item.to_string()];
    items.sort();
    items.dedup();
    items
}

/// Serialize writers of one (tenant, item) pair for the current transaction.
///
/// Advisory lock rather than a table lock: items and tenants stay fully
/// independent, and the lock releases with the enclosing transaction.
async fn lock_item(conn: &mut PgConnection, tenant_id: Uuid, item_type: &str) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("{}:{}", tenant_id, item_type))
        .execute(conn)
        .await?;
    Ok(())
}

/// Replay the full ledger for one (tenant, item) pair and upsert the
/// snapshot row, all on the caller's open transaction.
async fn recalculate_on(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    item_type: &str,
    unit_hint: Option<&str>,
) -> AppResult<StockSnapshot> {
    let rows = sqlx::query_as::<_, (i64, String, Decimal, Decimal, NaiveDate)>(
        r#"
        SELECT id, transaction_type, quantity, total_cost, transaction_date
        FROM transaction_history
        WHERE tenant_id = $1 AND item_type = $2
        ORDER BY transaction_date ASC, id ASC
        "#,
    )
    .bind(tenant_id)
    .bind(item_type)
    .fetch_all(&mut *conn)
    .await?;

    let entries = rows
        .into_iter()
        .map(|(id, kind, quantity, total_cost, transaction_date)| {
            let kind = TransactionKind::parse(&kind).ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "ledger row {} has unknown transaction_type '{}'",
                    id,
                    kind
                ))
            })?;
            Ok(LedgerEntry {
                id,
                kind,
                quantity,
                total_cost,
                transaction_date,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let totals = replay(&entries);

    if totals.overdrawn {
        tracing::warn!(
            %tenant_id,
            item_type,
            "ledger replay clamped an overdrawing depletion; possible data-entry error"
        );
    }

    // Unit of measure is sticky: the ledger does not carry it, so keep
    // whatever the item's snapshot already uses unless the caller says
    // otherwise.
    let unit = match unit_hint {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => sqlx::query_scalar::<_, String>(
            "SELECT unit FROM current_inventory WHERE tenant_id = $1 AND item_type = $2",
        )
        .bind(tenant_id)
        .bind(item_type)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
    };

    let updated_at = sqlx::query_scalar::<_, DateTime<Utc>>(
        r#"
        INSERT INTO current_inventory (tenant_id, item_type, quantity, total_cost, avg_price, unit, overdrawn, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        ON CONFLICT (tenant_id, item_type) DO UPDATE
        SET quantity = EXCLUDED.quantity,
            total_cost = EXCLUDED.total_cost,
            avg_price = EXCLUDED.avg_price,
            unit = EXCLUDED.unit,
            overdrawn = EXCLUDED.overdrawn,
            updated_at = now()
        RETURNING updated_at
        "#,
    )
    .bind(tenant_id)
    .bind(item_type)
    .bind(totals.quantity)
    .bind(totals.total_cost)
    .bind(totals.avg_price)
    .bind(&unit)
    .bind(totals.overdrawn)
    .fetch_one(&mut *conn)
    .await?;

    let mut snapshot = StockSnapshot::from_totals(tenant_id, item_type.to_string(), unit, totals);
    snapshot.updated_at = Some(updated_at);
    Ok(snapshot)
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a ledger transaction and refresh the item's snapshot
    pub async fn record_transaction(
        &self,
        ctx: &TenantContext,
        input: RecordTransactionInput,
    ) -> AppResult<StockTransaction> {
        let movement = validate_movement(
            input.item_type.as_deref(),
            input.quantity,
            input.transaction_type.as_deref(),
            input.price,
        )?;
        let transaction_date = input
            .transaction_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;
        lock_item(&mut *tx, ctx.tenant_id, &movement.item_type).await?;

        let transaction = sqlx::query_as::<_, StockTransaction>(
            r#"
            INSERT INTO transaction_history (
                tenant_id, item_type, quantity, transaction_type, price,
                total_cost, transaction_date, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, tenant_id, item_type, quantity, transaction_type, price,
                      total_cost, transaction_date, notes, created_by, created_at
            "#,
        )
        .bind(ctx.tenant_id)
        .bind(&movement.item_type)
        .bind(movement.quantity)
        .bind(movement.kind.as_str())
        .bind(movement.price)
        .bind(movement.total_cost)
        .bind(transaction_date)
        .bind(&input.notes)
        .bind(ctx.user_id)
        .fetch_one(&mut *tx)
        .await?;

        recalculate_on(
            &mut *tx,
            ctx.tenant_id,
            &movement.item_type,
            input.unit.as_deref(),
        )
        .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    /// Update a ledger transaction by id
    ///
    /// An edit may move the transaction to a different item, so both the
    /// old and the new item's snapshots are refreshed.
    pub async fn update_transaction(
        &self,
        ctx: &TenantContext,
        id: i64,
        input: UpdateTransactionInput,
    ) -> AppResult<StockTransaction> {
        let movement = validate_movement(
            input.item_type.as_deref(),
            input.quantity,
            input.transaction_type.as_deref(),
            input.price,
        )?;

        let mut tx = self.db.begin().await?;

        // Row-lock the target before deriving the recalc set: a concurrent
        // edit could otherwise move the row to another item between this
        // read and the item locks, and we would recalculate the wrong
        // items. Wrong tenant is indistinguishable from missing.
        let old_item_type = sqlx::query_scalar::<_, String>(
            "SELECT item_type FROM transaction_history WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        let affected = affected_items(&old_item_type, &movement.item_type);
        for item in &affected {
            lock_item(&mut *tx, ctx.tenant_id, item).await?;
        }

        let transaction = sqlx::query_as::<_, StockTransaction>(
            r#"
            UPDATE transaction_history
            SET item_type = $1, quantity = $2, transaction_type = $3, price = $4,
                total_cost = $5,
                transaction_date = COALESCE($6, transaction_date),
                notes = COALESCE($7, notes)
            WHERE id = $8 AND tenant_id = $9
            RETURNING id, tenant_id, item_type, quantity, transaction_type, price,
                      total_cost, transaction_date, notes, created_by, created_at
            "#,
        )
        .bind(&movement.item_type)
        .bind(movement.quantity)
        .bind(movement.kind.as_str())
        .bind(movement.price)
        .bind(movement.total_cost)
        .bind(input.transaction_date)
        .bind(&input.notes)
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        for item in &affected {
            recalculate_on(&mut *tx, ctx.tenant_id, item, None).await?;
        }

        tx.commit().await?;
        Ok(transaction)
    }

    /// Delete a ledger transaction by id and refresh the item's snapshot
    pub async fn delete_transaction(&self, ctx: &TenantContext, id: i64) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // Row lock, same reason as in update: the row's item must not move
        // under us between this read and the recalculation.
        let item_type = sqlx::query_scalar::<_, String>(
            "SELECT item_type FROM transaction_history WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        lock_item(&mut *tx, ctx.tenant_id, &item_type).await?;

        sqlx::query("DELETE FROM transaction_history WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .execute(&mut *tx)
            .await?;

        // Deleting the last transaction drives the snapshot to its zeroed
        // state; the row itself stays.
        recalculate_on(&mut *tx, ctx.tenant_id, &item_type, None).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace the tenant's entire ledger with the supplied rows
    ///
    /// Destructive bulk import, not a batch patch: prior rows and their ids
    /// are discarded, and every item present in the payload is
    /// recalculated. Manager role required.
    pub async fn replace_ledger(
        &self,
        ctx: &TenantContext,
        rows: Vec<BulkTransactionRow>,
    ) -> AppResult<Vec<StockTransaction>> {
        if !ctx.is_manager() {
            return Err(AppError::Forbidden(
                "Replacing the ledger requires the manager role".to_string(),
            ));
        }

        let mut validated = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(claimed) = row.tenant_id {
                if claimed != ctx.tenant_id {
                    return Err(AppError::Forbidden(
                        "Payload tenant_id does not match the authenticated tenant".to_string(),
                    ));
                }
            }
            let movement = validate_movement(
                row.item_type.as_deref(),
                row.quantity,
                row.transaction_type.as_deref(),
                row.price,
            )?;
            let transaction_date = row
                .transaction_date
                .unwrap_or_else(|| Utc::now().date_naive());
            validated.push((movement, transaction_date, row.notes.clone()));
        }

        let mut affected: Vec<String> = validated
            .iter()
            .map(|(m, _, _)| m.item_type.clone())
            .collect();
        affected.sort();
        affected.dedup();

        let mut tx = self.db.begin().await?;

        for item in &affected {
            lock_item(&mut *tx, ctx.tenant_id, item).await?;
        }

        // RETURNING gives the authoritative set of items whose rows were
        // actually removed; items vanishing from the ledger need their
        // snapshots zeroed, and a plan built from a separate read could
        // miss a row committed in between.
        let mut removed: Vec<String> = sqlx::query_scalar(
            "DELETE FROM transaction_history WHERE tenant_id = $1 RETURNING item_type",
        )
        .bind(ctx.tenant_id)
        .fetch_all(&mut *tx)
        .await?;
        removed.sort();
        removed.dedup();
        for item in removed {
            if !affected.contains(&item) {
                lock_item(&mut *tx, ctx.tenant_id, &item).await?;
                affected.push(item);
            }
        }
        affected.sort();

        let mut inserted = Vec::with_capacity(validated.len());
        for (movement, transaction_date, notes) in &validated {
            let transaction = sqlx::query_as::<_, StockTransaction>(
                r#"
                INSERT INTO transaction_history (
                    tenant_id, item_type, quantity, transaction_type, price,
                    total_cost, transaction_date, notes, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id, tenant_id, item_type, quantity, transaction_type, price,
                          total_cost, transaction_date, notes, created_by, created_at
                "#,
            )
            .bind(ctx.tenant_id)
            .bind(&movement.item_type)
            .bind(movement.quantity)
            .bind(movement.kind.as_str())
            .bind(movement.price)
            .bind(movement.total_cost)
            .bind(transaction_date)
            .bind(notes)
            .bind(ctx.user_id)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(transaction);
        }

        for item in &affected {
            recalculate_on(&mut *tx, ctx.tenant_id, item, None).await?;
        }

        tx.commit().await?;

        tracing::info!(
            tenant_id = %ctx.tenant_id,
            rows = inserted.len(),
            items = affected.len(),
            "ledger replaced by bulk import"
        );

        Ok(inserted)
    }

    /// Rebuild one item's snapshot from its ledger
    ///
    /// Idempotent; exposed for repair and backfill. Manager role required.
    pub async fn recalculate(
        &self,
        ctx: &TenantContext,
        item_type: &str,
    ) -> AppResult<StockSnapshot> {
        if !ctx.is_manager() {
            return Err(AppError::Forbidden(
                "Rebuilding inventory requires the manager role".to_string(),
            ));
        }
        if item_type.trim().is_empty() {
            return Err(AppError::validation("item_type", "item_type is required"));
        }

        let mut tx = self.db.begin().await?;
        lock_item(&mut *tx, ctx.tenant_id, item_type).await?;
        let snapshot = recalculate_on(&mut *tx, ctx.tenant_id, item_type, None).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    /// List the tenant's full transaction history, newest first
    pub async fn list_transactions(&self, ctx: &TenantContext) -> AppResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(
            r#"
            SELECT id, tenant_id, item_type, quantity, transaction_type, price,
                   total_cost, transaction_date, notes, created_by, created_at
            FROM transaction_history
            WHERE tenant_id = $1
            ORDER BY transaction_date DESC, id DESC
            "#,
        )
        .bind(ctx.tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }

    /// Get one item's transaction history, newest first
    pub async fn item_transactions(
        &self,
        ctx: &TenantContext,
        item_type: &str,
    ) -> AppResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(
            r#"
            SELECT id, tenant_id, item_type, quantity, transaction_type, price,
                   total_cost, transaction_date, notes, created_by, created_at
            FROM transaction_history
            WHERE tenant_id = $1 AND item_type = $2
            ORDER BY transaction_date DESC, id DESC
            "#,
        )
        .bind(ctx.tenant_id)
        .bind(item_type)
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }

    /// Get the current snapshot for one item
    pub async fn get_snapshot(
        &self,
        ctx: &TenantContext,
        item_type: &str,
    ) -> AppResult<StockSnapshot> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT tenant_id, item_type, quantity, total_cost, avg_price, unit, overdrawn, updated_at
            FROM current_inventory
            WHERE tenant_id = $1 AND item_type = $2
            "#,
        )
        .bind(ctx.tenant_id)
        .bind(item_type)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        Ok(row.into())
    }

    /// List the tenant's current inventory, ordered by item
    pub async fn list_snapshots(&self, ctx: &TenantContext) -> AppResult<Vec<StockSnapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT tenant_id, item_type, quantity, total_cost, avg_price, unit, overdrawn, updated_at
            FROM current_inventory
            WHERE tenant_id = $1
            ORDER BY item_type ASC
            "#,
        )
        .bind(ctx.tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Row for snapshot queries
#[derive(Debug, FromRow)]
struct SnapshotRow {
    tenant_id: Uuid,
    item_type: String,
    quantity: Decimal,
    total_cost: Decimal,
    avg_price: Decimal,
    unit: String,
    overdrawn: bool,
    updated_at: DateTime<Utc>,
}

impl From<SnapshotRow> for StockSnapshot {
    fn from(row: SnapshotRow) -> Self {
        StockSnapshot {
            tenant_id: row.tenant_id,
            item_type: row.item_type,
            quantity: row.quantity,
            total_cost: row.total_cost,
            avg_price: row.avg_price,
            unit: row.unit,
            overdrawn: row.overdrawn,
            updated_at: Some(row.updated_at),
        }
    }
}
