//! SQLite-backed notification store.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use uuid::Uuid;

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};

use super::models::{
    NewNotification, Notification, NotificationAction, NotificationData, NotificationKind, Priority,
};
use super::store::NotificationStore;

/// Default per-user retention cap enforced at create time.
pub const DEFAULT_USER_CAP: usize = 100;

/// V 0
const NOTIFICATION_TABLE_V_0: Table = Table {
    name: "notification",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("link", &SqlType::Text),
        sqlite_column!("data", &SqlType::Text, non_null = true),
        sqlite_column!("actions", &SqlType::Text, non_null = true),
        sqlite_column!("priority", &SqlType::Text, non_null = true),
        sqlite_column!("read_at", &SqlType::Integer),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_notification_user_created", "user_id, created_at")],
};

const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[NOTIFICATION_TABLE_V_0],
    migration: None,
}];

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn kind_to_db(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Booking => "booking",
        NotificationKind::Payment => "payment",
        NotificationKind::System => "system",
        NotificationKind::Listing => "listing",
        NotificationKind::Message => "message",
        NotificationKind::Review => "review",
        NotificationKind::Reminder => "reminder",
        NotificationKind::Promotion => "promotion",
    }
}

fn kind_from_db(value: &str) -> Result<NotificationKind> {
    Ok(match value {
        "booking" => NotificationKind::Booking,
        "payment" => NotificationKind::Payment,
        "system" => NotificationKind::System,
        "listing" => NotificationKind::Listing,
        "message" => NotificationKind::Message,
        "review" => NotificationKind::Review,
        "reminder" => NotificationKind::Reminder,
        "promotion" => NotificationKind::Promotion,
        other => bail!("Unknown notification kind in database: {}", other),
    })
}

fn priority_to_db(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

fn priority_from_db(value: &str) -> Result<Priority> {
    Ok(match value {
        "low" => Priority::Low,
        "medium" => Priority::Medium,
        "high" => Priority::High,
        "urgent" => Priority::Urgent,
        other => bail!("Unknown notification priority in database: {}", other),
    })
}

fn row_to_notification(row: &Row) -> Result<Notification> {
    let kind: String = row.get("kind")?;
    let priority: String = row.get("priority")?;
    let data_json: String = row.get("data")?;
    let actions_json: String = row.get("actions")?;

    let data: NotificationData =
        serde_json::from_str(&data_json).context("Failed to parse notification data payload")?;
    let actions: Vec<NotificationAction> =
        serde_json::from_str(&actions_json).context("Failed to parse notification actions")?;

    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        kind: kind_from_db(&kind)?,
        title: row.get("title")?,
        body: row.get("body")?,
        link: row.get("link")?,
        data,
        actions,
        priority: priority_from_db(&priority)?,
        read_at: row.get("read_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

const SELECT_COLUMNS: &str =
    "id, user_id, kind, title, body, link, data, actions, priority, read_at, created_at, updated_at";

/// Notification store over a single SQLite connection.
#[derive(Clone)]
pub struct SqliteNotificationStore {
    conn: Arc<Mutex<Connection>>,
    user_cap: usize,
}

impl SqliteNotificationStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        Self::with_user_cap(db_path, DEFAULT_USER_CAP)
    }

    pub fn with_user_cap<T: AsRef<Path>>(db_path: T, user_cap: usize) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS
                .last()
                .context("No schema versions defined")?
                .create(&conn)?;
            conn
        };

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        if version >= VERSIONED_SCHEMAS.len() {
            bail!("Database version {} is too new", version);
        }
        VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get schema")?
            .validate(&conn)?;

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteNotificationStore {
            conn: Arc::new(Mutex::new(conn)),
            user_cap,
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating notification db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
        Ok(())
    }

    /// Deletes read rows beyond the per-user cap, oldest first. Unread rows
    /// are never evicted, so an all-unread inbox can exceed the cap until
    /// some of it gets read.
    fn evict_over_cap(&self, conn: &Connection, user_id: &str) -> Result<()> {
        let count: usize = conn.query_row(
            "SELECT COUNT(*) FROM notification WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        if count <= self.user_cap {
            return Ok(());
        }
        let excess = count - self.user_cap;
        conn.execute(
            "DELETE FROM notification WHERE id IN (
                SELECT id FROM notification
                WHERE user_id = ?1 AND read_at IS NOT NULL
                ORDER BY created_at ASC, rowid ASC
                LIMIT ?2
            )",
            params![user_id, excess],
        )?;
        Ok(())
    }
}

impl NotificationStore for SqliteNotificationStore {
    fn create_notification(&self, new: &NewNotification) -> Result<Notification> {
        let id = Uuid::new_v4().to_string();
        let now = now_ts();
        let data_json =
            serde_json::to_string(&new.data).context("Failed to serialize notification data")?;
        let actions_json = serde_json::to_string(&new.actions)
            .context("Failed to serialize notification actions")?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO notification
                (id, user_id, kind, title, body, link, data, actions, priority, read_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?10)",
            params![
                id,
                new.user_id,
                kind_to_db(new.kind),
                new.title,
                new.body,
                new.link,
                data_json,
                actions_json,
                priority_to_db(new.priority),
                now,
            ],
        )
        .with_context(|| format!("Failed to create notification for user {}", new.user_id))?;

        self.evict_over_cap(&conn, &new.user_id)?;

        Ok(Notification {
            id,
            user_id: new.user_id.clone(),
            kind: new.kind,
            title: new.title.clone(),
            body: new.body.clone(),
            link: new.link.clone(),
            data: new.data.clone(),
            actions: new.actions.clone(),
            priority: new.priority,
            read_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_user_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notification WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok(row_to_notification(row))
        })?;
        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row??);
        }
        Ok(notifications)
    }

    fn get_notification(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> Result<Option<Notification>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notification WHERE id = ?1 AND user_id = ?2",
            SELECT_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![notification_id, user_id], |row| {
            Ok(row_to_notification(row))
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row??)),
            None => Ok(None),
        }
    }

    fn mark_notification_read(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> Result<Option<Notification>> {
        let now = now_ts();
        {
            let conn = self.conn.lock().unwrap();
            // Only transitions unread rows; a second call leaves read_at and
            // updated_at untouched, keeping the operation idempotent.
            conn.execute(
                "UPDATE notification SET read_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND user_id = ?3 AND read_at IS NULL",
                params![now, notification_id, user_id],
            )?;
        }
        self.get_notification(notification_id, user_id)
    }

    fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        let now = now_ts();
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE notification SET read_at = ?1, updated_at = ?1
             WHERE user_id = ?2 AND read_at IS NULL",
            params![now, user_id],
        )?;
        Ok(changed)
    }

    fn delete_notification(&self, notification_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM notification WHERE id = ?1 AND user_id = ?2",
            params![notification_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn get_unread_count(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM notification WHERE user_id = ?1 AND read_at IS NULL",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
