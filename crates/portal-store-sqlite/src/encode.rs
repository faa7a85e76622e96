//! Conversions between stored column text and domain types.
//!
//! Timestamps are stored as RFC 3339 strings.

use chrono::{DateTime, Utc};
use portal_core::{identity::Uid, source::UserData};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// A `user_data` row as read from SQLite.
pub struct RawUserData {
  pub uid:            String,
  pub preferred_name: Option<String>,
  pub first_login_at: Option<String>,
}

impl RawUserData {
  pub const COLUMNS: &'static str = "uid, preferred_name, first_login_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:            row.get(0)?,
      preferred_name: row.get(1)?,
      first_login_at: row.get(2)?,
    })
  }

  pub fn decode(self) -> Result<UserData> {
    Ok(UserData {
      uid:            Uid::new(self.uid),
      preferred_name: self.preferred_name,
      first_login_at: self.first_login_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
