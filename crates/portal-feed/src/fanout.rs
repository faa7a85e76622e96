//! Bounded upstream calls.
//!
//! Every upstream call site goes through [`bounded`], which turns a timeout
//! into [`Lookup::Errored`] and logs each failure once.

use std::{future::Future, time::Duration};

use portal_core::{identity::Uid, source::Lookup};

pub async fn bounded<T>(
  source: &'static str,
  uid: &Uid,
  limit: Duration,
  call: impl Future<Output = Lookup<T>>,
) -> Lookup<T> {
  match tokio::time::timeout(limit, call).await {
    Ok(Lookup::Errored(details)) => {
      tracing::warn!(%uid, source, %details, "upstream errored");
      Lookup::Errored(details)
    }
    Ok(lookup) => lookup,
    Err(_) => {
      tracing::warn!(%uid, source, ?limit, "upstream timed out");
      Lookup::Errored(format!("{source} timed out after {limit:?}"))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn slow_call_becomes_errored() {
    let uid = Uid::from("61889");
    let slow = async {
      tokio::time::sleep(Duration::from_secs(5)).await;
      Lookup::Found(1)
    };
    let result = bounded("slow", &uid, Duration::from_millis(10), slow).await;
    assert!(result.is_errored());
  }

  #[tokio::test]
  async fn prompt_answers_pass_through() {
    let uid = Uid::from("61889");
    let found = bounded("fast", &uid, Duration::from_secs(1), async { Lookup::Found(1) }).await;
    assert_eq!(found, Lookup::Found(1));
    let missing: Lookup<u8> =
      bounded("fast", &uid, Duration::from_secs(1), async { Lookup::NotFound }).await;
    assert_eq!(missing, Lookup::NotFound);
  }
}
