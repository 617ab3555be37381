// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRUD over the `records` document table.

use chrono::Utc;
use mflow_core::{FlowError, StoredRecord, Table};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Every record of one logical table, ordered by id.
pub async fn get_all(db: &Database, table: Table) -> Result<Vec<StoredRecord>, FlowError> {
    let table_name = table.to_string();
    let rows: Vec<(String, String)> = db
        .connection()
        .call(move |conn| -> Result<Vec<(String, String)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, body FROM records WHERE table_name = ?1 ORDER BY id ASC",
            )?;
            let mut out = Vec::new();
            for row in stmt.query_map(params![table_name], |row| Ok((row.get(0)?, row.get(1)?)))? {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)?;

    rows.into_iter()
        .map(|(id, body)| {
            let body = serde_json::from_str(&body).map_err(FlowError::storage)?;
            Ok(StoredRecord { id, body })
        })
        .collect()
}

/// Insert or replace one record.
pub async fn upsert(db: &Database, table: Table, record: StoredRecord) -> Result<(), FlowError> {
    let table_name = table.to_string();
    let body = serde_json::to_string(&record.body).map_err(FlowError::storage)?;
    let updated_at = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO records (table_name, id, body, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (table_name, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![table_name, record.id, body, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete one record. Missing ids are ignored.
pub async fn delete(db: &Database, table: Table, id: &str) -> Result<(), FlowError> {
    let table_name = table.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM records WHERE table_name = ?1 AND id = ?2",
                params![table_name, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every record of one logical table. Returns the number removed.
pub async fn clear(db: &Database, table: Table) -> Result<usize, FlowError> {
    let table_name = table.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM records WHERE table_name = ?1", params![table_name])
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::IN_MEMORY_PATH;
    use serde_json::json;

    async fn db() -> Database {
        Database::open(IN_MEMORY_PATH, false).await.unwrap()
    }

    fn rec(id: &str, body: serde_json::Value) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            body,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_same_id() {
        let db = db().await;
        upsert(&db, Table::Pages, rec("p1", json!({"name": "old"}))).await.unwrap();
        upsert(&db, Table::Pages, rec("p1", json!({"name": "new"}))).await.unwrap();

        let all = get_all(&db, Table::Pages).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].body["name"], "new");
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let db = db().await;
        upsert(&db, Table::Links, rec("x", json!(1))).await.unwrap();
        upsert(&db, Table::Media, rec("x", json!(2))).await.unwrap();

        assert_eq!(clear(&db, Table::Links).await.unwrap(), 1);
        assert!(get_all(&db, Table::Links).await.unwrap().is_empty());
        assert_eq!(get_all(&db, Table::Media).await.unwrap()[0].body, json!(2));
    }

    #[tokio::test]
    async fn delete_missing_id_is_ok() {
        let db = db().await;
        delete(&db, Table::Messages, "nope").await.unwrap();
    }
}
