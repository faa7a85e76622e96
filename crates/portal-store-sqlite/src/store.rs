//! [`SqliteUserDataStore`]: the SQLite implementation of [`UserDataStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use portal_core::{
  identity::Uid,
  source::{UserData, UserDataStore},
};

use crate::{
  Error, Result,
  encode::{RawUserData, encode_dt},
  schema::SCHEMA,
};

const SELECT_USER_DATA: &str =
  "SELECT uid, preferred_name, first_login_at FROM user_data WHERE uid = ?1";

// ─── Store ───────────────────────────────────────────────────────────────────

/// Per-identity user data backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteUserDataStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteUserDataStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `sql` as an upsert for `uid` and read the row back.
  async fn upsert(
    &self,
    uid: &Uid,
    sql: &'static str,
    value: Option<String>,
  ) -> Result<UserData> {
    let uid_str = uid.to_string();
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(sql, rusqlite::params![uid_str, value, now_str])?;
        let raw = tx.query_row(
          SELECT_USER_DATA,
          rusqlite::params![uid_str],
          RawUserData::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.decode()
  }
}

// ─── UserDataStore impl ──────────────────────────────────────────────────────

impl UserDataStore for SqliteUserDataStore {
  type Error = Error;

  async fn get_user_data(&self, uid: &Uid) -> Result<Option<UserData>> {
    let uid_str = uid.to_string();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              SELECT_USER_DATA,
              rusqlite::params![uid_str],
              RawUserData::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUserData::decode).transpose()
  }

  async fn set_preferred_name(
    &self,
    uid: &Uid,
    preferred_name: Option<String>,
  ) -> Result<UserData> {
    self
      .upsert(
        uid,
        "INSERT INTO user_data (uid, preferred_name, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (uid) DO UPDATE SET
           preferred_name = excluded.preferred_name,
           updated_at     = excluded.updated_at",
        preferred_name,
      )
      .await
  }

  async fn record_first_login(
    &self,
    uid: &Uid,
    at: DateTime<Utc>,
  ) -> Result<UserData> {
    // First write wins; later logins leave the stamp alone.
    self
      .upsert(
        uid,
        "INSERT INTO user_data (uid, first_login_at, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (uid) DO UPDATE SET
           first_login_at = COALESCE(user_data.first_login_at, excluded.first_login_at),
           updated_at     = excluded.updated_at",
        Some(encode_dt(at)),
      )
      .await
  }

  async fn delete_user_data(&self, uid: &Uid) -> Result<bool> {
    let uid_str = uid.to_string();

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM user_data WHERE uid = ?1",
          rusqlite::params![uid_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }
}
