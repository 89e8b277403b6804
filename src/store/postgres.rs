//! PostgreSQL store adapters.
//!
//! Row structs are private to this module; domain values are rebuilt through
//! `into_domain` conversions so enum and metadata parsing stays in one
//! place. Wallet mutations run inside a database transaction holding a
//! `FOR UPDATE` row lock — that lock is what serializes concurrent
//! mutations of the same wallet while leaving other wallets untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::ledger::{AccountType, LedgerEntry};
use crate::models::transaction::{Transaction, TransactionFilter};
use crate::models::wallet::Wallet;
use crate::store::{LedgerStore, TransactionStore, WalletMutation, WalletStore};

/// Map a row-decoding failure (unknown enum value, malformed metadata) to a
/// database error rather than a client-facing validation error.
fn decode_err(err: AppError) -> AppError {
    AppError::Database(sqlx::Error::Decode(err.to_string().into()))
}

/// Map an insert error, turning a unique-constraint violation into the
/// given validation message.
fn map_unique_violation(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

// ---------------------------------------------------------------------------
// Wallets
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    user_id: Uuid,
    balance: Decimal,
    escrow_balance: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WalletRow {
    fn into_domain(self) -> Result<Wallet, AppError> {
        Ok(Wallet {
            id: self.id,
            user_id: self.user_id,
            balance: self.balance,
            escrow_balance: self.escrow_balance,
            currency: self.currency.parse().map_err(decode_err)?,
            status: self.status.parse().map_err(decode_err)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Postgres-backed wallet store.
#[derive(Clone)]
pub struct PostgresWalletStore {
    pool: DbPool,
}

impl PostgresWalletStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PostgresWalletStore {
    async fn insert(&self, wallet: Wallet) -> Result<Wallet, AppError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, balance, escrow_balance, currency, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(wallet.id)
        .bind(wallet.user_id)
        .bind(wallet.balance)
        .bind(wallet.escrow_balance)
        .bind(wallet.currency.as_str())
        .bind(wallet.status.as_str())
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A wallet already exists for this user"))?;

        Ok(wallet)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, AppError> {
        let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(WalletRow::into_domain).transpose()
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Wallet>, AppError> {
        let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(WalletRow::into_domain).transpose()
    }

    async fn with_wallet(&self, id: Uuid, mutation: WalletMutation) -> Result<Wallet, AppError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE ensures no other transaction can modify this row
        // until we commit.
        let row =
            sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let mut wallet = match row {
            Some(row) => row.into_domain()?,
            None => {
                tx.rollback().await?;
                return Err(AppError::WalletNotFound);
            }
        };

        if let Err(err) = mutation(&mut wallet) {
            tx.rollback().await?;
            return Err(err);
        }
        wallet.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $1, escrow_balance = $2, status = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(wallet.balance)
        .bind(wallet.escrow_balance)
        .bind(wallet.status.as_str())
        .bind(wallet.updated_at)
        .bind(wallet.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(wallet)
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    wallet_id: Uuid,
    reference: String,
    kind: String,
    amount: Decimal,
    currency: String,
    status: String,
    gateway_reference: Option<String>,
    metadata: Value,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> Result<Transaction, AppError> {
        let metadata = match self.metadata {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Ok(Transaction {
            id: self.id,
            wallet_id: self.wallet_id,
            reference: self.reference,
            kind: self.kind.parse().map_err(decode_err)?,
            amount: self.amount,
            currency: self.currency.parse().map_err(decode_err)?,
            status: self.status.parse().map_err(decode_err)?,
            gateway_reference: self.gateway_reference,
            metadata,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: DbPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, AppError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, wallet_id, reference, kind, amount, currency, status,
                gateway_reference, metadata, description, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.wallet_id)
        .bind(&transaction.reference)
        .bind(transaction.kind.as_str())
        .bind(transaction.amount)
        .bind(transaction.currency.as_str())
        .bind(transaction.status.as_str())
        .bind(&transaction.gateway_reference)
        .bind(Value::Object(transaction.metadata.clone()))
        .bind(&transaction.description)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Transaction reference already exists"))?;

        Ok(transaction)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let row =
            sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE reference = $1")
                .bind(reference)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn update(&self, transaction: &Transaction) -> Result<Transaction, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, gateway_reference = $2, metadata = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(transaction.status.as_str())
        .bind(&transaction.gateway_reference)
        .bind(Value::Object(transaction.metadata.clone()))
        .bind(transaction.updated_at)
        .bind(transaction.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::TransactionNotFound);
        }

        Ok(transaction.clone())
    }

    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, i64), AppError> {
        let kind = filter.kind.map(|k| k.as_str());
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE ($1::uuid IS NULL OR wallet_id = $1)
              AND ($2::text IS NULL OR kind = $2)
              AND ($3::text IS NULL OR status = $3)
            "#,
        )
        .bind(filter.wallet_id)
        .bind(kind)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE ($1::uuid IS NULL OR wallet_id = $1)
              AND ($2::text IS NULL OR kind = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.wallet_id)
        .bind(kind)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let transactions = rows
            .into_iter()
            .map(TransactionRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((transactions, total))
    }

    async fn find_latest_for_task(
        &self,
        task_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE kind = 'payment' AND metadata->>'task_id' = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRow::into_domain).transpose()
    }
}

// ---------------------------------------------------------------------------
// Ledger entries
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct LedgerEntryRow {
    id: Uuid,
    transaction_id: Uuid,
    account_type: String,
    debit_amount: Decimal,
    credit_amount: Decimal,
    balance_after: Decimal,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl LedgerEntryRow {
    fn into_domain(self) -> Result<LedgerEntry, AppError> {
        Ok(LedgerEntry::from_stored(
            self.id,
            self.transaction_id,
            self.account_type.parse().map_err(decode_err)?,
            self.debit_amount,
            self.credit_amount,
            self.balance_after,
            self.description,
            self.created_at,
        ))
    }
}

/// Postgres-backed ledger store. Insert and read only.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: DbPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, AppError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, transaction_id, account_type, debit_amount, credit_amount,
                balance_after, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id())
        .bind(entry.transaction_id())
        .bind(entry.account_type().as_str())
        .bind(entry.debit_amount())
        .bind(entry.credit_amount())
        .bind(entry.balance_after())
        .bind(entry.description())
        .bind(entry.created_at())
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            "SELECT * FROM ledger_entries WHERE transaction_id = $1 ORDER BY created_at",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntryRow::into_domain).collect()
    }

    async fn sums_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<(Decimal, Decimal), AppError> {
        let sums: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(debit_amount), 0), COALESCE(SUM(credit_amount), 0)
            FROM ledger_entries
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sums)
    }

    async fn sums_for_account(
        &self,
        account_type: AccountType,
    ) -> Result<(Decimal, Decimal), AppError> {
        let sums: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(debit_amount), 0), COALESCE(SUM(credit_amount), 0)
            FROM ledger_entries
            WHERE account_type = $1
            "#,
        )
        .bind(account_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(sums)
    }
}
