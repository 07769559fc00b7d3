//! Database service for billing-service.
//!
//! Owns every persistence path of the ledger: customer CRUD, entry CRUD,
//! range statements and the payment allocator. The allocator is the only
//! multi-statement writer and runs under a single transaction with the
//! candidate entry rows locked, so concurrent payments against one
//! customer serialize instead of double-allocating.

use crate::models::{
    CreateCustomer, Customer, Entry, EntryPatch, NewEntry, Payment, RangeStatement, RangeTotals,
    UpdateCustomer, compute_amount,
};
use crate::services::allocation::{apply_plan, plan_allocation, range_totals};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const ENTRY_COLUMNS: &str =
    "entry_id, customer_id, entry_date, item_name, bags, kgs, rate, commission, amount, paid_amount, posted_utc";

const PAYMENT_COLUMNS: &str =
    "payment_id, customer_id, amount, mode, from_date, to_date, payment_date";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    unique_entry_per_day: bool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self {
            pool,
            unique_entry_per_day: false,
        })
    }

    /// Deployment policy: reject a second entry on the same calendar date
    /// for the same customer.
    pub fn with_unique_entry_per_day(mut self, enabled: bool) -> Self {
        self.unique_entry_per_day = enabled;
        self
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Customer Operations
    // -------------------------------------------------------------------------

    /// Register a new customer. The serial is the business-facing unique
    /// identifier; reusing one fails with a conflict.
    #[instrument(skip(self, input), fields(serial = %input.serial))]
    pub async fn create_customer(&self, input: &CreateCustomer) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_customer"])
            .start_timer();

        let customer_id = Uuid::new_v4();
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (customer_id, serial, name, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING customer_id, serial, name, phone, created_utc
            "#,
        )
        .bind(customer_id)
        .bind(&input.serial)
        .bind(&input.name)
        .bind(&input.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Customer with serial '{}' already exists",
                    input.serial
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create customer: {}", e)),
        })?;

        timer.observe_duration();

        info!(customer_id = %customer.customer_id, "Customer created");

        Ok(customer)
    }

    /// Get a customer by ID.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, serial, name, phone, created_utc
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get customer: {}", e)))?;

        timer.observe_duration();

        Ok(customer)
    }

    /// List customers ordered by serial, optionally filtered by a
    /// case-insensitive match on serial or name.
    #[instrument(skip(self))]
    pub async fn list_customers(&self, search: Option<&str>) -> Result<Vec<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_customers"])
            .start_timer();

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, serial, name, phone, created_utc
            FROM customers
            WHERE ($1::text IS NULL OR serial ILIKE '%' || $1 || '%' OR name ILIKE '%' || $1 || '%')
            ORDER BY serial
            "#,
        )
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list customers: {}", e)))?;

        timer.observe_duration();

        Ok(customers)
    }

    /// Update customer identity fields; unset fields retain stored values.
    #[instrument(skip(self, patch), fields(customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        patch: &UpdateCustomer,
    ) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_customer"])
            .start_timer();

        let existing = self
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

        let serial = patch.serial.clone().unwrap_or(existing.serial);
        let name = patch.name.clone().unwrap_or(existing.name);
        let phone = patch.phone.clone().or(existing.phone);

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET serial = $1, name = $2, phone = $3
            WHERE customer_id = $4
            RETURNING customer_id, serial, name, phone, created_utc
            "#,
        )
        .bind(&serial)
        .bind(&name)
        .bind(&phone)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Customer with serial '{}' already exists",
                    serial
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update customer: {}", e)),
        })?;

        timer.observe_duration();

        Ok(customer)
    }

    /// Delete a customer; entries and payments cascade away with it.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_customer"])
            .start_timer();

        let result = sqlx::query("DELETE FROM customers WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete customer: {}", e))
            })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
        }

        info!(customer_id = %customer_id, "Customer deleted");

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Entry Operations
    // -------------------------------------------------------------------------

    /// Persist a new entry with a zero paid amount. The stored amount column
    /// is a cache of the computed amount at write time.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id, entry_date = %input.entry_date))]
    pub async fn create_entry(&self, input: &NewEntry) -> Result<Entry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_entry"])
            .start_timer();

        self.get_customer(input.customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

        if self.unique_entry_per_day {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM entries WHERE customer_id = $1 AND entry_date = $2)",
            )
            .bind(input.customer_id)
            .bind(input.entry_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to check entry date: {}", e))
            })?;

            if exists {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Entry for this date already exists"
                )));
            }
        }

        let entry_id = Uuid::new_v4();
        let amount = compute_amount(input.kgs, input.rate, input.commission);
        let entry = sqlx::query_as::<_, Entry>(&format!(
            r#"
            INSERT INTO entries (entry_id, customer_id, entry_date, item_name, bags, kgs, rate, commission, amount, paid_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0)
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(entry_id)
        .bind(input.customer_id)
        .bind(input.entry_date)
        .bind(&input.item_name)
        .bind(input.bags)
        .bind(input.kgs)
        .bind(input.rate)
        .bind(input.commission)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create entry: {}", e)))?;

        timer.observe_duration();

        info!(
            entry_id = %entry.entry_id,
            amount = %entry.amount,
            "Entry created"
        );

        Ok(entry)
    }

    /// List all entries for a customer, most recent date first.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn list_entries(&self, customer_id: Uuid) -> Result<Vec<Entry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_entries"])
            .start_timer();

        let entries = sqlx::query_as::<_, Entry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE customer_id = $1
            ORDER BY entry_date DESC, posted_utc DESC
            "#,
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list entries: {}", e)))?;

        timer.observe_duration();

        Ok(entries)
    }

    /// Merge a patch over the stored entry, recompute the amount cache, and
    /// persist. `paid_amount` is only overwritten when supplied. Runs under
    /// a row lock so it cannot interleave with an in-flight allocation.
    #[instrument(skip(self, patch), fields(entry_id = %entry_id))]
    pub async fn update_entry(&self, entry_id: Uuid, patch: &EntryPatch) -> Result<Entry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_entry"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = sqlx::query_as::<_, Entry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_id = $1 FOR UPDATE",
        ))
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load entry: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Entry not found")))?;

        let entry_date = patch.entry_date.unwrap_or(existing.entry_date);
        let item_name = patch.item_name.clone().or(existing.item_name);
        let bags = patch.bags.unwrap_or(existing.bags);
        let kgs = patch.kgs.unwrap_or(existing.kgs);
        let rate = patch.rate.unwrap_or(existing.rate);
        let commission = patch.commission.unwrap_or(existing.commission);
        let paid_amount = patch.paid_amount.unwrap_or(existing.paid_amount);
        let amount = compute_amount(kgs, rate, commission);

        let entry = sqlx::query_as::<_, Entry>(&format!(
            r#"
            UPDATE entries
            SET entry_date = $1, item_name = $2, bags = $3, kgs = $4, rate = $5,
                commission = $6, amount = $7, paid_amount = $8
            WHERE entry_id = $9
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(entry_date)
        .bind(&item_name)
        .bind(bags)
        .bind(kgs)
        .bind(rate)
        .bind(commission)
        .bind(amount)
        .bind(paid_amount)
        .bind(entry_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update entry: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit entry update: {}", e))
        })?;

        timer.observe_duration();

        Ok(entry)
    }

    /// Unconditional hard delete; entries with a nonzero paid amount go too.
    #[instrument(skip(self), fields(entry_id = %entry_id))]
    pub async fn delete_entry(&self, entry_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_entry"])
            .start_timer();

        let result = sqlx::query("DELETE FROM entries WHERE entry_id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete entry: {}", e))
            })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Entry not found")));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Range Statement
    // -------------------------------------------------------------------------

    /// Read-only statement for `[from, to]` (both boundary days inclusive):
    /// the entries in allocation order with recomputed amounts, in-range
    /// totals, and the unpaid balance sitting outside the window.
    #[instrument(skip(self), fields(customer_id = %customer_id, from = %from, to = %to))]
    pub async fn range_statement(
        &self,
        customer_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RangeStatement, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["range_statement"])
            .start_timer();

        self.get_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

        let entries = sqlx::query_as::<_, Entry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE customer_id = $1 AND entry_date >= $2 AND entry_date <= $3
            ORDER BY entry_date, posted_utc, entry_id
            "#,
        ))
        .bind(customer_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load range entries: {}", e))
        })?;

        let (total_amount, total_paid) = range_totals(&entries);

        // Entries outside the window are informational only; their unpaid
        // balance is clamped at zero per entry.
        let remaining_outside: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(GREATEST((kgs - commission) * rate - paid_amount, 0)), 0)
            FROM entries
            WHERE customer_id = $1 AND (entry_date < $2 OR entry_date > $3)
            "#,
        )
        .bind(customer_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to compute outside-range balance: {}",
                e
            ))
        })?;

        timer.observe_duration();

        Ok(RangeStatement {
            entries: entries.into_iter().map(Into::into).collect(),
            totals: RangeTotals {
                total_amount,
                total_paid,
                remaining_outside,
            },
        })
    }

    // -------------------------------------------------------------------------
    // Payment Allocation
    // -------------------------------------------------------------------------

    /// Apply a payment against a customer's entries in `[from, to]`,
    /// earliest entry first, and record the payment row — one transaction.
    ///
    /// The recorded amount is always the caller's original amount; leftover
    /// beyond the range's outstanding total is absorbed. Not idempotent:
    /// submitting the same payment twice allocates twice.
    ///
    /// Returns the payment, the customer snapshot and the allocated entries
    /// with their updated paid amounts (the receipt inputs).
    #[instrument(skip(self), fields(customer_id = %customer_id, amount = %amount))]
    pub async fn record_payment(
        &self,
        customer_id: Uuid,
        amount: Decimal,
        mode: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(Payment, Customer, Vec<Entry>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        if amount <= Decimal::ZERO {
            return Err(AppError::validation("amount", "must be a positive number"));
        }

        let customer = self
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Lock the candidate rows; concurrent payments against the same
        // customer serialize here instead of double-allocating.
        let mut entries = sqlx::query_as::<_, Entry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE customer_id = $1 AND entry_date >= $2 AND entry_date <= $3
            ORDER BY entry_date, posted_utc, entry_id
            FOR UPDATE
            "#,
        ))
        .bind(customer_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load entries for payment: {}", e))
        })?;

        if entries.is_empty() {
            return Err(AppError::NoEntries(anyhow::anyhow!(
                "No entries found for customer between {} and {}",
                from,
                to
            )));
        }

        let plan = plan_allocation(&entries, amount);

        for allocation in &plan.allocations {
            sqlx::query("UPDATE entries SET paid_amount = paid_amount + $1 WHERE entry_id = $2")
                .bind(allocation.amount)
                .bind(allocation.entry_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::AllocationFailed(anyhow::anyhow!(
                        "Failed to apply allocation to entry {}: {}",
                        allocation.entry_id,
                        e
                    ))
                })?;
        }

        let payment_id = Uuid::new_v4();
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (payment_id, customer_id, amount, mode, from_date, to_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(payment_id)
        .bind(customer_id)
        .bind(amount)
        .bind(mode)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::AllocationFailed(anyhow::anyhow!("Failed to insert payment row: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::AllocationFailed(anyhow::anyhow!(
                "Failed to commit payment transaction: {}",
                e
            ))
        })?;

        // Mirror the committed allocations for the receipt snapshot.
        apply_plan(&mut entries, &plan);

        timer.observe_duration();

        crate::services::metrics::record_payment(
            mode.unwrap_or("unspecified"),
            amount.to_f64().unwrap_or(0.0),
        );

        info!(
            payment_id = %payment.payment_id,
            allocated = %plan.allocated_total(),
            absorbed = %plan.leftover,
            entry_count = entries.len(),
            "Payment recorded"
        );

        Ok((payment, customer, entries))
    }

    /// Payment history for a customer, most recent first.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn list_payments(&self, customer_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE customer_id = $1
            ORDER BY payment_date DESC
            "#,
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    /// Delete a payment record. Entry paid amounts are NOT reversed; the
    /// allocation already happened and stays on the ledger.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn delete_payment(&self, payment_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_payment"])
            .start_timer();

        let result = sqlx::query("DELETE FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete payment: {}", e))
            })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Payment not found")));
        }

        Ok(())
    }
}
