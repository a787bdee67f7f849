use std::sync::Arc;

use marina_core::ChangeTable;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::notify::ChangeHub;

/// Channel the table triggers notify on.
pub const CHANGE_CHANNEL: &str = "marina_changes";

#[derive(Debug, Deserialize)]
struct ChangePayload {
    table: String,
    key: Option<String>,
}

/// Relay Postgres `NOTIFY` payloads into the hub until the process exits.
pub async fn start_change_listener(pool: PgPool, hub: Arc<ChangeHub>) {
    loop {
        let mut listener = match PgListener::connect_with(&pool).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Change listener failed to connect: {}", e);
                sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        if let Err(e) = listener.listen(CHANGE_CHANNEL).await {
            error!("Failed to LISTEN on {}: {}", CHANGE_CHANNEL, e);
            sleep(Duration::from_secs(5)).await;
            continue;
        }

        info!("Change listener started on channel {}", CHANGE_CHANNEL);

        loop {
            match listener.recv().await {
                Ok(notification) => relay(&hub, notification.payload()),
                Err(e) => {
                    error!("Change listener error: {}", e);
                    break;
                }
            }
        }

        sleep(Duration::from_secs(1)).await;
    }
}

fn relay(hub: &ChangeHub, payload: &str) {
    match parse_payload(payload) {
        Some((table, key)) => {
            hub.publish(table, key);
        }
        None => warn!("Ignoring malformed change payload: {}", payload),
    }
}

fn parse_payload(payload: &str) -> Option<(ChangeTable, Option<String>)> {
    let parsed: ChangePayload = serde_json::from_str(payload).ok()?;
    let table = ChangeTable::parse(&parsed.table)?;
    Some((table, parsed.key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trigger_payload() {
        let (table, key) =
            parse_payload(r#"{"table":"bookings","key":"0b6f7c1e-5a59-4f7e-9d8e-3f1c2b7a9e10"}"#).unwrap();
        assert_eq!(table, ChangeTable::Bookings);
        assert_eq!(key.as_deref(), Some("0b6f7c1e-5a59-4f7e-9d8e-3f1c2b7a9e10"));

        let (table, key) = parse_payload(r#"{"table":"availability","key":null}"#).unwrap();
        assert_eq!(table, ChangeTable::Availability);
        assert!(key.is_none());
    }

    #[test]
    fn test_rejects_unknown_tables_and_garbage() {
        assert!(parse_payload(r#"{"table":"user_roles","key":"x"}"#).is_none());
        assert!(parse_payload("not json").is_none());
    }

    #[tokio::test]
    async fn test_relay_publishes_to_hub() {
        let hub = ChangeHub::new(4);
        let mut rx = hub.subscribe();

        relay(&hub, r#"{"table":"site_content","key":"home"}"#);
        relay(&hub, "garbage");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, ChangeTable::SiteContent);
        assert_eq!(event.key.as_deref(), Some("home"));
        assert_eq!(hub.last_seq(), 1);
    }
}
