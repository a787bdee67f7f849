use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tables whose changes are pushed to subscribers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Bookings,
    Availability,
    SiteContent,
}

impl ChangeTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTable::Bookings => "bookings",
            ChangeTable::Availability => "availability",
            ChangeTable::SiteContent => "site_content",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bookings" => Some(ChangeTable::Bookings),
            "availability" => Some(ChangeTable::Availability),
            "site_content" => Some(ChangeTable::SiteContent),
            _ => None,
        }
    }
}

/// "Something in `table` changed; refetch." `key` names the row when known
/// (booking id, date, or section). `seq` grows with every event so clients can
/// drop responses to stale fetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub seq: u64,
    pub table: ChangeTable,
    pub key: Option<String>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn touches(&self, table: ChangeTable, key: Option<&str>) -> bool {
        self.table == table && key.map_or(true, |k| self.key.as_deref() == Some(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_filters_by_table_and_key() {
        let event = ChangeEvent {
            seq: 1,
            table: ChangeTable::SiteContent,
            key: Some("home".to_string()),
            at: Utc::now(),
        };

        assert!(event.touches(ChangeTable::SiteContent, None));
        assert!(event.touches(ChangeTable::SiteContent, Some("home")));
        assert!(!event.touches(ChangeTable::SiteContent, Some("gallery")));
        assert!(!event.touches(ChangeTable::Bookings, None));
    }

    #[test]
    fn test_table_names() {
        for table in [ChangeTable::Bookings, ChangeTable::Availability, ChangeTable::SiteContent] {
            assert_eq!(ChangeTable::parse(table.as_str()), Some(table));
        }
        assert_eq!(ChangeTable::parse("user_roles"), None);
    }
}
