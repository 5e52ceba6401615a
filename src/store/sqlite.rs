use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{GuardError, Result};
use crate::domain::settings::SETTINGS_KEY;
use crate::domain::{ExtensionSettings, ProductStats, StoredScanRecord};
use crate::store::Store;

pub const DEFAULT_MAX_SCAN_RECORDS: usize = 500;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    max_scan_records: usize,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_retention(path, DEFAULT_MAX_SCAN_RECORDS)
    }

    pub fn with_retention<P: AsRef<Path>>(path: P, max_scan_records: usize) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            max_scan_records,
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_retention(DEFAULT_MAX_SCAN_RECORDS)
    }

    pub fn in_memory_with_retention(max_scan_records: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            max_scan_records,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| GuardError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GuardError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn read_stats(conn: &Connection) -> Result<ProductStats> {
        let stats = conn.query_row(
            "SELECT total_scanned, safe_products, flagged_products, last_scan_time
             FROM product_stats WHERE id = 1",
            [],
            |row| {
                Ok(ProductStats {
                    total_scanned: row.get::<_, i64>(0)? as u64,
                    safe_products: row.get::<_, i64>(1)? as u64,
                    flagged_products: row.get::<_, i64>(2)? as u64,
                    last_scan_time: row
                        .get::<_, Option<String>>(3)?
                        .and_then(|s| Self::parse_datetime(&s)),
                })
            },
        )?;
        Ok(stats)
    }

    fn decode_record(
        url: String,
        timestamp: i64,
        product: &str,
        result: &str,
    ) -> Result<StoredScanRecord> {
        Ok(StoredScanRecord {
            product: serde_json::from_str(product)?,
            result: serde_json::from_str(result)?,
            timestamp,
            url,
        })
    }
}

impl Store for SqliteStore {
    fn save_scan(&self, record: &StoredScanRecord) -> Result<String> {
        let key = record.storage_key();
        let product = serde_json::to_string(&record.product)?;
        let result = serde_json::to_string(&record.result)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO scan_records (key, hostname, url, timestamp, product, result)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![key, record.hostname(), record.url, record.timestamp, product, result],
        )?;

        let evicted = tx.execute(
            "DELETE FROM scan_records WHERE key NOT IN (
                 SELECT key FROM scan_records ORDER BY timestamp DESC, rowid DESC LIMIT ?1
             )",
            params![self.max_scan_records as i64],
        )?;

        tx.commit()?;

        if evicted > 0 {
            tracing::debug!("Evicted {} old scan records", evicted);
        }
        Ok(key)
    }

    fn get_scan(&self, key: &str) -> Result<Option<StoredScanRecord>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT url, timestamp, product, result FROM scan_records WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(url, timestamp, product, result)| {
            Self::decode_record(url, timestamp, &product, &result)
        })
        .transpose()
    }

    fn recent_scans(&self, limit: usize) -> Result<Vec<(String, StoredScanRecord)>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT key, url, timestamp, product, result FROM scan_records
             ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, url, timestamp, product, result)| {
                Ok((key, Self::decode_record(url, timestamp, &product, &result)?))
            })
            .collect()
    }

    fn scan_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM scan_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn record_outcomes(&self, safe: u64, flagged: u64, at: DateTime<Utc>) -> Result<ProductStats> {
        let conn = self.conn()?;

        // One statement keeps total == safe + flagged
        conn.execute(
            "UPDATE product_stats SET
                 total_scanned = total_scanned + ?1 + ?2,
                 safe_products = safe_products + ?1,
                 flagged_products = flagged_products + ?2,
                 last_scan_time = ?3
             WHERE id = 1",
            params![safe as i64, flagged as i64, at.to_rfc3339()],
        )?;

        Self::read_stats(&conn)
    }

    fn get_stats(&self) -> Result<ProductStats> {
        let conn = self.conn()?;
        Self::read_stats(&conn)
    }

    fn reset_stats(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE product_stats SET total_scanned = 0, safe_products = 0,
                 flagged_products = 0, last_scan_time = NULL
             WHERE id = 1",
            [],
        )?;
        Ok(())
    }

    fn get_settings(&self) -> Result<ExtensionSettings> {
        let conn = self.conn()?;

        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(ExtensionSettings::default()),
        }
    }

    fn save_settings(&self, settings: &ExtensionSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SETTINGS_KEY, json],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use url::Url;

    use crate::domain::{ComplianceReport, ScrapedProduct};

    fn record(host: &str, timestamp: i64, score: f64) -> StoredScanRecord {
        let url = Url::parse(&format!("https://{}/dp/B0", host)).unwrap();
        let mut product = ScrapedProduct::new(url.as_str());
        product.title = format!("Product {}", timestamp);
        let mut record = StoredScanRecord::new(
            product,
            ComplianceReport {
                compliance_score: score,
                issues: vec![],
                recommendations: vec![],
                fallback: false,
                product_title: None,
                product_price: None,
            },
            &url,
        );
        record.timestamp = timestamp;
        record
    }

    #[test]
    fn test_save_and_get_scan() {
        let store = SqliteStore::in_memory().unwrap();
        let saved = record("www.amazon.in", 1_700_000_000_000, 85.0);

        let key = store.save_scan(&saved).unwrap();
        assert_eq!(key, "compliance_www.amazon.in_1700000000000");

        let loaded = store.get_scan(&key).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.get_scan("compliance_missing_1").unwrap().is_none());
    }

    #[test]
    fn test_recent_scans_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        for ts in [1, 3, 2] {
            store.save_scan(&record("www.amazon.in", ts, 50.0)).unwrap();
        }

        let recent = store.recent_scans(2).unwrap();
        let timestamps: Vec<i64> = recent.iter().map(|(_, r)| r.timestamp).collect();
        assert_eq!(timestamps, vec![3, 2]);
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let store = SqliteStore::in_memory_with_retention(3).unwrap();
        for ts in 1..=5 {
            store.save_scan(&record("www.amazon.in", ts, 50.0)).unwrap();
        }

        assert_eq!(store.scan_count().unwrap(), 3);
        let oldest = store.recent_scans(10).unwrap().last().unwrap().1.timestamp;
        assert_eq!(oldest, 3);
    }

    #[test]
    fn test_same_key_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_scan(&record("www.amazon.in", 7, 10.0)).unwrap();
        store.save_scan(&record("www.amazon.in", 7, 90.0)).unwrap();

        assert_eq!(store.scan_count().unwrap(), 1);
        let (_, latest) = &store.recent_scans(1).unwrap()[0];
        assert_eq!(latest.result.compliance_score, 90.0);
    }

    #[test]
    fn test_stats_accumulate() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get_stats().unwrap(), ProductStats::default());

        let now = Utc::now();
        store.record_outcomes(2, 1, now).unwrap();
        let stats = store.record_outcomes(0, 3, now).unwrap();

        assert_eq!(stats.total_scanned, 6);
        assert_eq!(stats.safe_products, 2);
        assert_eq!(stats.flagged_products, 4);
        assert!(stats.is_consistent());
        assert_eq!(
            stats.last_scan_time.map(|t| t.timestamp()),
            Some(now.timestamp())
        );

        store.reset_stats().unwrap();
        assert_eq!(store.get_stats().unwrap(), ProductStats::default());
    }

    #[test]
    fn test_concurrent_stats_updates_are_not_lost() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.record_outcomes(i % 2, 1 - i % 2, Utc::now()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_scanned, 200);
        assert_eq!(stats.safe_products, 100);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_settings_default_and_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get_settings().unwrap(), ExtensionSettings::default());

        let mut settings = ExtensionSettings::default();
        settings.auto_scan = true;
        settings.scan_interval = 60;
        store.save_settings(&settings).unwrap();
        store.save_settings(&settings).unwrap();

        assert_eq!(store.get_settings().unwrap(), settings);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecomguard.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.record_outcomes(1, 0, Utc::now()).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.get_stats().unwrap().total_scanned, 1);
    }
}
