//! Row-level SQL for verification requests.
//!
//! Expiry comparisons run in SQL against the database clock, and every
//! read-modify-write path goes through `lock_request` so callers hold the
//! row lock for the whole decision.

use anyhow::{Context, Result};
use sqlx::{Postgres, Row, Transaction};
use tracing::Instrument;
use uuid::Uuid;

use super::models::{Channel, Purpose, VerificationRow};

/// Atomically create or replace the request for `(purpose, contact)`.
///
/// A replaced row gets a fresh hash, salt, payload, and expiry, and its
/// attempt counter resets to zero. Returns the expiry as unix seconds.
pub(crate) async fn upsert_request(
    pool: &sqlx::PgPool,
    purpose: Purpose,
    contact: &str,
    channel: Channel,
    code_hash: &[u8],
    code_salt: &[u8],
    payload_json: Option<&str>,
    ttl_seconds: i64,
) -> Result<i64> {
    let query = r"
        INSERT INTO verification_requests
            (purpose, contact, channel, code_hash, code_salt, payload_json, attempts, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, 0, NOW() + ($7 * INTERVAL '1 second'))
        ON CONFLICT (purpose, contact) DO UPDATE SET
            channel = EXCLUDED.channel,
            code_hash = EXCLUDED.code_hash,
            code_salt = EXCLUDED.code_salt,
            payload_json = EXCLUDED.payload_json,
            attempts = 0,
            expires_at = EXCLUDED.expires_at
        RETURNING EXTRACT(EPOCH FROM expires_at)::BIGINT AS expires_at_unix
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(purpose.as_str())
        .bind(contact)
        .bind(channel.as_str())
        .bind(code_hash)
        .bind(code_salt)
        .bind(payload_json)
        .bind(ttl_seconds)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to upsert verification request")?;

    Ok(row.get("expires_at_unix"))
}

/// Fetch the request under `FOR UPDATE` so the caller's transaction
/// serializes all mutations for this `(purpose, contact)` pair.
pub(crate) async fn lock_request(
    tx: &mut Transaction<'_, Postgres>,
    purpose: Purpose,
    contact: &str,
) -> Result<Option<VerificationRow>> {
    let query = r"
        SELECT id, code_hash, code_salt, attempts, payload_json,
               (expires_at <= NOW()) AS expired
        FROM verification_requests
        WHERE purpose = $1 AND contact = $2
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(purpose.as_str())
        .bind(contact)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to lock verification request")?;

    Ok(row.map(|row| VerificationRow {
        id: row.get("id"),
        code_hash: row.get("code_hash"),
        code_salt: row.get("code_salt"),
        attempts: row.get("attempts"),
        payload_json: row.get("payload_json"),
        expired: row.get("expired"),
    }))
}

/// Persist a bumped attempt counter for a locked row.
pub(crate) async fn set_attempts(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    attempts: i32,
) -> Result<()> {
    let query = "UPDATE verification_requests SET attempts = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(attempts)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update verification attempts")?;
    Ok(())
}

/// Remove a consumed, expired, or exhausted row.
pub(crate) async fn delete_request(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
    let query = "DELETE FROM verification_requests WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to delete verification request")?;
    Ok(())
}
