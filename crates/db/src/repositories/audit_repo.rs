//! Repository for the append-only `audit_logs` table.
//!
//! Every insert extends a SHA-256 hash chain. Writers serialize on a
//! transaction-scoped advisory lock so two concurrent appends cannot both
//! chain from the same predecessor.

use chrono::SubsecRound;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use taskforge_core::audit::{
    self, actions, entities, DEFAULT_AUDIT_PAGE_SIZE, MAX_AUDIT_PAGE_SIZE,
};
use taskforge_core::pagination::{clamp_limit, clamp_page, page_to_offset};
use taskforge_core::types::{DbId, Timestamp};

use crate::models::audit::{AuditLog, AuditQuery, CreateAuditLog, IntegrityReport};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "\
    id, actor_id, action, entity_type, entity_id, changes, \
    ip_address, user_agent, integrity_hash, timestamp";

/// Column list for INSERT (excludes `id` and `created_at`).
const INSERT_COLUMNS: &str = "\
    actor_id, action, entity_type, entity_id, changes, \
    ip_address, user_agent, integrity_hash, timestamp";

/// Advisory lock key guarding the head of the hash chain.
const CHAIN_LOCK_KEY: i64 = 0x6175_6469_7463_6861;

// ---------------------------------------------------------------------------
// AuditLogRepo
// ---------------------------------------------------------------------------

/// Append, query, purge and verify operations for the audit trail.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append one entry at the head of the chain.
    ///
    /// `changes` is redacted before it is hashed and stored. `now` is
    /// truncated to microseconds, the precision Postgres keeps, so the
    /// stored timestamp reproduces the hashed one.
    pub async fn append(
        pool: &PgPool,
        entry: &CreateAuditLog,
        now: Timestamp,
    ) -> Result<AuditLog, sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_chain(&mut *tx).await?;
        let log = insert_chained(&mut *tx, entry, now).await?;
        tx.commit().await?;
        Ok(log)
    }

    /// Query entries newest first with filtering and pagination.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditLog>, sqlx::Error> {
        let (limit, offset) = page_bounds(params);
        let (where_clause, bind_values, bind_idx) = build_audit_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {where_clause} \
             ORDER BY timestamp DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let q = bind_audit_values(sqlx::query_as::<_, AuditLog>(&query), &bind_values);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count entries matching the filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_audit_filter(params);

        let query = format!("SELECT COUNT(*)::BIGINT AS count FROM audit_logs {where_clause}");

        let q = bind_audit_values_scalar(sqlx::query_scalar::<_, i64>(&query), &bind_values);
        q.fetch_one(pool).await
    }

    /// Delete entries older than `cutoff`, then record the purge itself as
    /// a `CLEANUP_AUDIT_LOGS` entry. Both happen under the chain lock.
    ///
    /// Returns the number of deleted rows and the cleanup entry.
    pub async fn purge_older_than(
        pool: &PgPool,
        cutoff: Timestamp,
        days: i64,
        actor_id: Option<DbId>,
        now: Timestamp,
    ) -> Result<(u64, AuditLog), sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_chain(&mut *tx).await?;

        let deleted = sqlx::query("DELETE FROM audit_logs WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let cleanup = CreateAuditLog {
            actor_id,
            action: actions::CLEANUP_AUDIT_LOGS.to_string(),
            entity_type: entities::AUDIT_LOG.to_string(),
            entity_id: None,
            changes: json!({ "days": days, "deletedCount": deleted }),
            ip_address: None,
            user_agent: None,
        };
        let log = insert_chained(&mut *tx, &cleanup, now).await?;

        tx.commit().await?;
        Ok((deleted, log))
    }

    /// Recompute the whole chain, oldest first.
    ///
    /// Once a purge has run, the oldest surviving entry chains from a
    /// deleted predecessor, so its stored hash is taken as the anchor.
    pub async fn verify_chain(pool: &PgPool) -> Result<IntegrityReport, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audit_logs ORDER BY id ASC");
        let entries = sqlx::query_as::<_, AuditLog>(&query).fetch_all(pool).await?;

        let purged: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM audit_logs WHERE action = $1)",
        )
        .bind(actions::CLEANUP_AUDIT_LOGS)
        .fetch_one(pool)
        .await?;

        let canonical: Vec<String> = entries
            .iter()
            .map(|e| {
                audit::canonical_entry_data(
                    e.actor_id,
                    &e.action,
                    &e.entity_type,
                    e.entity_id,
                    &e.changes,
                    e.timestamp,
                )
            })
            .collect();

        let first_broken_id = audit::find_chain_break(
            entries
                .iter()
                .zip(&canonical)
                .map(|(e, data)| (e.id, data.as_str(), e.integrity_hash.as_str())),
            purged,
        );

        Ok(IntegrityReport {
            entries_checked: entries.len(),
            valid: first_broken_id.is_none(),
            first_broken_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Chain helpers
// ---------------------------------------------------------------------------

async fn lock_chain(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CHAIN_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

/// Insert `entry` chained from the current head. The caller holds the
/// chain lock.
async fn insert_chained(
    conn: &mut PgConnection,
    entry: &CreateAuditLog,
    now: Timestamp,
) -> Result<AuditLog, sqlx::Error> {
    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT integrity_hash FROM audit_logs ORDER BY id DESC LIMIT 1")
            .fetch_optional(&mut *conn)
            .await?;

    let timestamp = now.trunc_subsecs(6);
    let changes = audit::redact_sensitive_fields(&entry.changes);
    let data = audit::canonical_entry_data(
        entry.actor_id,
        &entry.action,
        &entry.entity_type,
        entry.entity_id,
        &changes,
        timestamp,
    );
    let hash = audit::compute_integrity_hash(prev_hash.as_deref(), &data);

    let query = format!(
        "INSERT INTO audit_logs ({INSERT_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, AuditLog>(&query)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&changes)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&hash)
        .bind(timestamp)
        .fetch_one(&mut *conn)
        .await
}

fn page_bounds(params: &AuditQuery) -> (i64, i64) {
    let limit = clamp_limit(params.limit, DEFAULT_AUDIT_PAGE_SIZE, MAX_AUDIT_PAGE_SIZE);
    let page = clamp_page(params.page);
    (limit, page_to_offset(page, limit))
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built audit log queries.
enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values from `AuditQuery` filter parameters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
/// The `where_clause` is empty if no filters are active, or starts with `WHERE `.
fn build_audit_filter(params: &AuditQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(actor_id) = params.actor_id {
        conditions.push(format!("actor_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(actor_id));
    }

    if let Some(ref action) = params.action {
        conditions.push(format!("action = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(action.clone()));
    }

    if let Some(ref entity_type) = params.entity_type {
        conditions.push(format!("entity_type = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(entity_type.clone()));
    }

    if let Some(entity_id) = params.entity_id {
        conditions.push(format!("entity_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(entity_id));
    }

    if let Some(from) = params.from {
        conditions.push(format!("timestamp >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(from));
    }

    if let Some(to) = params.to {
        conditions.push(format!("timestamp <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_audit_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
fn bind_audit_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}
