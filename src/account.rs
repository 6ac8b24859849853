//! Account data as exported from the game's account API.
//!
//! The snapshot file stands in for a live API client: one entry per
//! character with its sheet, skill queue, market orders, industry jobs and the
//! raw asset tree. Asset trees are kept as raw JSON so one malformed tree only
//! fails its own character.

use chrono::{DateTime, Duration, Utc};
use eyre::{Result, WrapErr};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSnapshot {
    pub characters: Vec<CharacterRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterRecord {
    pub char_id: i64,
    pub name: String,
    #[serde(default)]
    pub sheet: Option<CharacterSheet>,
    #[serde(default)]
    pub skill_queue: Vec<SkillQueueEntry>,
    #[serde(default)]
    pub orders: Vec<MarketOrder>,
    #[serde(default)]
    pub industry_jobs: Vec<IndustryJob>,
    #[serde(default)]
    pub assets: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterSheet {
    pub corporation: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub ship: Option<Ship>,
    pub balance: Decimal,
    pub skillpoints: i64,
    pub clone_skillpoints: i64,
}

impl CharacterSheet {
    /// The medical clone no longer covers the character's skillpoints
    pub fn clone_upgrade_required(&self) -> bool {
        self.clone_skillpoints < self.skillpoints
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ship {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillQueueEntry {
    pub type_id: i64,
    pub level: u8,
    #[serde(default)]
    pub end_ts: Option<DateTime<Utc>>, // None while the queue is paused
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Closed,
    Expired,
    Cancelled,
    Pending,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketOrder {
    pub order_id: i64,
    pub type_id: i64,
    pub price: Decimal,
    pub amount_left: i64,
    pub status: OrderStatus,
    pub issued: DateTime<Utc>,
    pub duration_days: i64,
}

impl MarketOrder {
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued + Duration::days(self.duration_days)
    }

    pub fn remaining_value(&self) -> Decimal {
        self.price * Decimal::from(self.amount_left)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndustryJob {
    pub job_id: i64,
    pub container_id: i64, // station the job runs in
    pub activity_id: i64,
    pub output_type_id: i64,
    pub end_ts: DateTime<Utc>,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub status: String,
}

impl IndustryJob {
    pub fn is_active(&self) -> bool {
        !self.delivered && self.status != "failed"
    }
}

impl AccountSnapshot {
    #[instrument]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file_content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read account snapshot {}", path.display()))?;
        let snapshot = Self::from_json_str(&file_content)
            .wrap_err_with(|| format!("Failed to parse account snapshot {}", path.display()))?;
        info!(characters = snapshot.characters.len(), "Account snapshot loaded");
        Ok(snapshot)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::dec;
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "characters": [
            {
                "char_id": 90000001,
                "name": "Ayla Tessaris",
                "sheet": {
                    "corporation": "Mining Inc",
                    "created_at": "2010-05-01T12:00:00Z",
                    "location": "Jita",
                    "ship": { "type_name": "Retriever", "name": "Rock Eater" },
                    "balance": "1234567.89",
                    "skillpoints": 25000000,
                    "clone_skillpoints": 24000000
                },
                "skill_queue": [
                    { "type_id": 3386, "level": 4, "end_ts": "2026-10-17T12:00:00Z" },
                    { "type_id": 3402, "level": 5 }
                ],
                "orders": [
                    { "order_id": 1, "type_id": 34, "price": 5.5, "amount_left": 100,
                      "status": "active", "issued": "2026-10-10T00:00:00Z", "duration_days": 90 },
                    { "order_id": 2, "type_id": 35, "price": "1.25", "amount_left": 0,
                      "status": "character_deleted", "issued": "2026-10-10T00:00:00Z", "duration_days": 1 }
                ],
                "industry_jobs": [
                    { "job_id": 7, "container_id": 60003760, "activity_id": 1, "output_type_id": 587,
                      "end_ts": "2026-10-20T00:00:00Z", "delivered": false, "status": "in_progress" }
                ],
                "assets": { "1": { "location_id": 60003760, "contents": [] } }
            },
            { "char_id": 90000002, "name": "Alt" }
        ]
    }"#;

    #[test]
    fn test_parses_snapshot() {
        let snapshot = AccountSnapshot::from_json_str(SNAPSHOT).unwrap();
        assert_eq!(snapshot.characters.len(), 2);

        let main = &snapshot.characters[0];
        let sheet = main.sheet.as_ref().unwrap();
        assert_eq!(sheet.balance, dec!(1234567.89));
        assert!(sheet.clone_upgrade_required());
        assert_eq!(main.skill_queue[1].end_ts, None);
        assert!(main.orders[0].is_active());
        assert_eq!(main.orders[1].status, OrderStatus::Unknown);
        assert_eq!(main.orders[0].remaining_value(), dec!(550));
        assert_eq!(
            main.orders[0].expires_at(),
            Utc.with_ymd_and_hms(2027, 1, 8, 0, 0, 0).unwrap()
        );
        assert!(main.industry_jobs[0].is_active());
        assert!(main.assets.is_object());

        let alt = &snapshot.characters[1];
        assert!(alt.sheet.is_none());
        assert!(alt.orders.is_empty());
        assert!(alt.assets.is_null());
    }

    #[test]
    fn test_failed_or_delivered_jobs_are_inactive() {
        let job = |delivered: bool, status: &str| IndustryJob {
            job_id: 1,
            container_id: 1,
            activity_id: 1,
            output_type_id: 1,
            end_ts: Utc::now(),
            delivered,
            status: status.to_string(),
        };
        assert!(!job(true, "delivered").is_active());
        assert!(!job(false, "failed").is_active());
        assert!(job(false, "ready").is_active());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let snapshot = AccountSnapshot::load_from_file(file.path()).unwrap();
        assert_eq!(snapshot.characters[0].name, "Ayla Tessaris");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let error = AccountSnapshot::load_from_file(Path::new("/nonexistent/account.json")).unwrap_err();
        assert!(error.to_string().contains("account snapshot"));
    }
}
