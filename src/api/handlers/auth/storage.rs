//! Database helpers for customer accounts.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::Instrument;
use uuid::Uuid;

use crate::otp::Channel;

use super::utils::is_unique_violation;

/// A customer row as the handlers need it.
pub(crate) struct UserRecord {
    pub(crate) user_id: Uuid,
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    /// `None` for accounts created through Google sign-in only.
    pub(crate) password_hash: Option<String>,
}

/// Outcome when finalizing a registration.
#[derive(Debug)]
pub(super) enum CreateOutcome {
    Created(Uuid),
    Conflict,
}

/// Outcome when attaching a verified contact to an existing account.
#[derive(Debug)]
pub(super) enum AttachOutcome {
    Attached,
    Conflict,
    UserMissing,
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        user_id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
    }
}

/// Look up a customer by normalized contact.
pub(super) async fn lookup_user_by_contact(
    pool: &PgPool,
    channel: Channel,
    contact: &str,
) -> Result<Option<UserRecord>> {
    let query = match channel {
        Channel::Email => "SELECT id, name, email, phone, password_hash FROM users WHERE email = $1",
        Channel::Phone => "SELECT id, name, email, phone, password_hash FROM users WHERE phone = $1",
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by contact")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Look up a customer by id (session subject resolution).
pub(crate) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = "SELECT id, name, email, phone, password_hash FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Create the account a successful `register` verification finalizes.
///
/// Runs inside the caller's transaction so a conflict rolls the whole
/// verification back. A racing insert still surfaces as a unique violation;
/// the pre-check keeps the common case off the error path.
pub(super) async fn create_user_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    channel: Channel,
    contact: &str,
    name: &str,
    password_hash: &str,
) -> Result<CreateOutcome> {
    if lookup_contact_in_tx(tx, channel, contact).await?.is_some() {
        return Ok(CreateOutcome::Conflict);
    }

    let query = match channel {
        Channel::Email => {
            r"
            INSERT INTO users (name, email, email_verified, password_hash)
            VALUES ($1, $2, TRUE, $3)
            RETURNING id
            "
        }
        Channel::Phone => {
            r"
            INSERT INTO users (name, phone, phone_verified, password_hash)
            VALUES ($1, $2, TRUE, $3)
            RETURNING id
            "
        }
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(contact)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Attach a verified contact to an existing account.
pub(super) async fn attach_contact_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    channel: Channel,
    contact: &str,
) -> Result<AttachOutcome> {
    match lookup_contact_in_tx(tx, channel, contact).await? {
        Some(owner) if owner == user_id => return Ok(AttachOutcome::Attached),
        Some(_) => return Ok(AttachOutcome::Conflict),
        None => {}
    }

    let query = match channel {
        Channel::Email => {
            "UPDATE users SET email = $2, email_verified = TRUE WHERE id = $1"
        }
        Channel::Phone => {
            "UPDATE users SET phone = $2, phone_verified = TRUE WHERE id = $1"
        }
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(contact)
        .execute(&mut **tx)
        .instrument(span)
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Ok(AttachOutcome::UserMissing),
        Ok(_) => Ok(AttachOutcome::Attached),
        Err(err) if is_unique_violation(&err) => Ok(AttachOutcome::Conflict),
        Err(err) => Err(err).context("failed to attach contact"),
    }
}

/// Replace the password for the account owning the contact.
/// Returns the updated record, or `None` when no account owns it.
pub(super) async fn update_password_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    channel: Channel,
    contact: &str,
    password_hash: &str,
) -> Result<Option<UserRecord>> {
    let query = match channel {
        Channel::Email => {
            r"
            UPDATE users SET password_hash = $2 WHERE email = $1
            RETURNING id, name, email, phone, password_hash
            "
        }
        Channel::Phone => {
            r"
            UPDATE users SET password_hash = $2 WHERE phone = $1
            RETURNING id, name, email, phone, password_hash
            "
        }
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .bind(password_hash)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update password")?;

    Ok(row.as_ref().map(user_from_row))
}

async fn lookup_contact_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    channel: Channel,
    contact: &str,
) -> Result<Option<Uuid>> {
    let query = match channel {
        Channel::Email => "SELECT id FROM users WHERE email = $1",
        Channel::Phone => "SELECT id FROM users WHERE phone = $1",
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to check contact ownership")?;

    Ok(row.map(|row| row.get("id")))
}

/// Find or create the account for a verified Google identity.
///
/// Match order: by Google subject first, then by verified email (linking
/// the subject to an existing password account), then a fresh insert.
pub(super) async fn upsert_google_user(
    pool: &PgPool,
    google_sub: &str,
    email: &str,
    name: Option<&str>,
) -> Result<UserRecord> {
    let mut tx = pool.begin().await.context("begin google login transaction")?;

    let query = "SELECT id, name, email, phone, password_hash FROM users WHERE google_sub = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let existing = sqlx::query(query)
        .bind(google_sub)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup user by google subject")?;

    if let Some(row) = existing {
        let user = user_from_row(&row);
        tx.commit().await.context("commit google login transaction")?;
        return Ok(user);
    }

    let query = r"
        UPDATE users SET google_sub = $1, email_verified = TRUE
        WHERE email = $2
        RETURNING id, name, email, phone, password_hash
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let linked = sqlx::query(query)
        .bind(google_sub)
        .bind(email)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to link google subject")?;

    if let Some(row) = linked {
        let user = user_from_row(&row);
        tx.commit().await.context("commit google login transaction")?;
        return Ok(user);
    }

    let query = r"
        INSERT INTO users (name, email, email_verified, google_sub)
        VALUES ($1, $2, TRUE, $3)
        RETURNING id, name, email, phone, password_hash
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(email)
        .bind(google_sub)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert google user")?;

    let user = user_from_row(&row);
    tx.commit().await.context("commit google login transaction")?;
    Ok(user)
}
