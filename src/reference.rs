use eyre::Result;
use sqlx::SqlitePool;
use std::fmt;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::db::connection;

/// Which static lookup table an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    ItemType,
    Station,
    Activity,
}

impl ReferenceKind {
    fn lookup_sql(&self) -> &'static str {
        match self {
            ReferenceKind::ItemType => "SELECT typeName FROM invTypes WHERE typeID = ?1",
            ReferenceKind::Station => "SELECT stationName FROM staStations WHERE stationID = ?1",
            ReferenceKind::Activity => "SELECT activityName FROM ramActivities WHERE activityID = ?1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::ItemType => "item_type",
            ReferenceKind::Station => "station",
            ReferenceKind::Activity => "activity",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display name used for ids missing from the static dataset.
pub fn placeholder(id: i64) -> String {
    format!("Unknown({id})")
}

/// Read-only name lookups against the static reference dataset.
///
/// The dataset is a released snapshot, so ids introduced after it was built
/// resolve to a placeholder instead of an error.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    pool: SqlitePool,
}

impl ReferenceResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = connection::create_reference_pool(config).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn resolve(&self, kind: ReferenceKind, id: i64) -> Result<String, sqlx::Error> {
        let name: Option<(String,)> = sqlx::query_as(kind.lookup_sql())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match name {
            Some((name,)) => Ok(name),
            None => {
                debug!(%kind, id, "Unknown reference id");
                Ok(placeholder(id))
            }
        }
    }

    pub async fn type_name(&self, type_id: i64) -> Result<String, sqlx::Error> {
        self.resolve(ReferenceKind::ItemType, type_id).await
    }

    pub async fn station_name(&self, station_id: i64) -> Result<String, sqlx::Error> {
        self.resolve(ReferenceKind::Station, station_id).await
    }

    pub async fn activity_name(&self, activity_id: i64) -> Result<String, sqlx::Error> {
        self.resolve(ReferenceKind::Activity, activity_id).await
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal copy of the static dataset tables used by the resolver.
    pub async fn reference_pool(
        types: &[(i64, &str)],
        stations: &[(i64, &str)],
        activities: &[(i64, &str)],
    ) -> SqlitePool {
        let pool = connection::create_in_memory_pool().await.unwrap();
        for ddl in [
            "CREATE TABLE invTypes (typeID INTEGER PRIMARY KEY, typeName TEXT NOT NULL)",
            "CREATE TABLE staStations (stationID INTEGER PRIMARY KEY, stationName TEXT NOT NULL)",
            "CREATE TABLE ramActivities (activityID INTEGER PRIMARY KEY, activityName TEXT NOT NULL)",
        ] {
            sqlx::query(ddl).execute(&pool).await.unwrap();
        }

        let tables = [
            ("INSERT INTO invTypes (typeID, typeName) VALUES (?1, ?2)", types),
            ("INSERT INTO staStations (stationID, stationName) VALUES (?1, ?2)", stations),
            ("INSERT INTO ramActivities (activityID, activityName) VALUES (?1, ?2)", activities),
        ];
        for (sql, rows) in tables {
            for (id, name) in rows {
                sqlx::query(sql).bind(id).bind(*name).execute(&pool).await.unwrap();
            }
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn resolver() -> ReferenceResolver {
        let pool = fixtures::reference_pool(
            &[(34, "Tritanium")],
            &[(60003760, "Jita IV - Moon 4 - Caldari Navy Assembly Plant")],
            &[(1, "Manufacturing")],
        )
        .await;
        ReferenceResolver::new(pool)
    }

    #[tokio::test]
    async fn test_resolves_each_kind() {
        let resolver = resolver().await;
        assert_eq!(resolver.type_name(34).await.unwrap(), "Tritanium");
        assert_eq!(
            resolver.station_name(60003760).await.unwrap(),
            "Jita IV - Moon 4 - Caldari Navy Assembly Plant"
        );
        assert_eq!(resolver.activity_name(1).await.unwrap(), "Manufacturing");
    }

    #[tokio::test]
    async fn test_unknown_station_resolves_to_placeholder() {
        let resolver = resolver().await;
        let name = resolver.station_name(999999).await.unwrap();
        assert_eq!(name, "Unknown(999999)");
        assert!(name.contains("999999"));
    }

    #[tokio::test]
    async fn test_kinds_do_not_share_ids() {
        let resolver = resolver().await;
        assert_eq!(resolver.activity_name(34).await.unwrap(), placeholder(34));
    }
}
