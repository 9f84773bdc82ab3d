// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folder row operations.

use lockbox_core::{FolderRecord, LockboxError};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<FolderRecord> {
    Ok(FolderRecord {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        deleted: row.get(5)?,
    })
}

/// Insert or replace a folder row.
pub async fn put_folder(db: &Database, folder: &FolderRecord) -> Result<(), LockboxError> {
    let folder = folder.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO folders (id, parent_id, name, created_at, updated_at, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    name = excluded.name,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    deleted = excluded.deleted",
                params![
                    folder.id,
                    folder.parent_id,
                    folder.name,
                    folder.created_at,
                    folder.updated_at,
                    folder.deleted,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a folder by id, soft-deleted or not.
pub async fn get_folder(db: &Database, id: &str) -> Result<Option<FolderRecord>, LockboxError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<FolderRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, parent_id, name, created_at, updated_at, deleted
                 FROM folders WHERE id = ?1",
            )?;
            match stmt.query_row(params![id], folder_from_row) {
                Ok(folder) => Ok(Some(folder)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List folders, optionally restricted to direct children of `parent_id`.
///
/// Ordered by name, then id.
pub async fn list_folders(
    db: &Database,
    parent_id: Option<&str>,
    include_deleted: bool,
) -> Result<Vec<FolderRecord>, LockboxError> {
    let parent_id = parent_id.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Vec<FolderRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, parent_id, name, created_at, updated_at, deleted
                 FROM folders
                 WHERE (?1 IS NULL OR parent_id = ?1) AND (?2 OR deleted = 0)
                 ORDER BY name ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![parent_id, include_deleted], folder_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a folder row and hand its direct children, folders and
/// credentials alike, to `new_parent` in one transaction.
///
/// Returns whether the folder existed. Nothing changes when it did not.
pub async fn delete_folder_reparenting(
    db: &Database,
    id: &str,
    new_parent: Option<&str>,
    updated_at: i64,
) -> Result<bool, LockboxError> {
    let id = id.to_string();
    let new_parent = new_parent.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE folders SET parent_id = ?2, updated_at = ?3 WHERE parent_id = ?1",
                params![id, new_parent, updated_at],
            )?;
            tx.execute(
                "UPDATE credentials SET folder_id = ?2, updated_at = ?3 WHERE folder_id = ?1",
                params![id, new_parent, updated_at],
            )?;
            if tx.execute("DELETE FROM folders WHERE id = ?1", params![id])? == 0 {
                // Dropping the transaction rolls the moves back.
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::credentials::{get_credential, put_credential};
    use lockbox_core::{CredentialRecord, EncryptedBlob};

    fn folder(id: &str, parent: Option<&str>, name: &str, deleted: bool) -> FolderRecord {
        FolderRecord {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            name: name.to_string(),
            created_at: 1,
            updated_at: 1,
            deleted,
        }
    }

    #[tokio::test]
    async fn folders_are_listed_by_name_under_exact_parent() {
        let db = Database::open_in_memory().await.unwrap();
        put_folder(&db, &folder("1", None, "Work", false)).await.unwrap();
        put_folder(&db, &folder("2", Some("1"), "Servers", false)).await.unwrap();
        put_folder(&db, &folder("3", Some("1"), "Email", false)).await.unwrap();
        put_folder(&db, &folder("4", Some("1"), "Old", true)).await.unwrap();

        let children: Vec<_> = list_folders(&db, Some("1"), false)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(children, ["Email", "Servers"]);

        assert_eq!(list_folders(&db, None, false).await.unwrap().len(), 3);
        assert_eq!(list_folders(&db, None, true).await.unwrap().len(), 4);
    }

    fn credential(id: &str, folder: Option<&str>) -> CredentialRecord {
        CredentialRecord {
            id: id.to_string(),
            folder_id: folder.map(str::to_string),
            encrypted_payload: EncryptedBlob {
                ciphertext: vec![1; 20],
                nonce: vec![2; 24],
                created_at_ms: 1,
                version: 1,
            },
            created_at: 1,
            updated_at: 1,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn rename_via_put() {
        let db = Database::open_in_memory().await.unwrap();
        put_folder(&db, &folder("1", None, "Work", false)).await.unwrap();
        put_folder(&db, &folder("1", None, "Office", false)).await.unwrap();
        assert_eq!(get_folder(&db, "1").await.unwrap().unwrap().name, "Office");
    }

    #[tokio::test]
    async fn delete_moves_children_up_one_level() {
        let db = Database::open_in_memory().await.unwrap();
        put_folder(&db, &folder("top", None, "Top", false)).await.unwrap();
        put_folder(&db, &folder("mid", Some("top"), "Mid", false)).await.unwrap();
        put_folder(&db, &folder("leaf", Some("mid"), "Leaf", true)).await.unwrap();
        put_credential(&db, &credential("c", Some("mid"))).await.unwrap();

        assert!(delete_folder_reparenting(&db, "mid", Some("top"), 50).await.unwrap());

        assert!(get_folder(&db, "mid").await.unwrap().is_none());
        let leaf = get_folder(&db, "leaf").await.unwrap().unwrap();
        assert_eq!(leaf.parent_id.as_deref(), Some("top"));
        assert_eq!(leaf.updated_at, 50);
        assert!(leaf.deleted);
        let c = get_credential(&db, "c").await.unwrap().unwrap();
        assert_eq!(c.folder_id.as_deref(), Some("top"));
        assert_eq!(c.updated_at, 50);
    }

    #[tokio::test]
    async fn delete_of_missing_folder_changes_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        put_folder(&db, &folder("child", Some("ghost"), "Child", false)).await.unwrap();
        put_credential(&db, &credential("c", Some("ghost"))).await.unwrap();

        assert!(!delete_folder_reparenting(&db, "ghost", None, 50).await.unwrap());

        let child = get_folder(&db, "child").await.unwrap().unwrap();
        assert_eq!(child.parent_id.as_deref(), Some("ghost"));
        assert_eq!(child.updated_at, 1);
        let c = get_credential(&db, "c").await.unwrap().unwrap();
        assert_eq!(c.folder_id.as_deref(), Some("ghost"));
    }

    #[tokio::test]
    async fn failed_delete_rolls_back_the_moves() {
        let db = Database::open_in_memory().await.unwrap();
        put_folder(&db, &folder("top", None, "Top", false)).await.unwrap();
        put_folder(&db, &folder("child", Some("top"), "Child", false)).await.unwrap();
        put_credential(&db, &credential("c", Some("top"))).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "CREATE TRIGGER refuse_folder_delete BEFORE DELETE ON folders
                     BEGIN SELECT RAISE(ABORT, 'refused'); END;",
                )
            })
            .await
            .unwrap();

        assert!(delete_folder_reparenting(&db, "top", None, 50).await.is_err());

        assert!(get_folder(&db, "top").await.unwrap().is_some());
        let child = get_folder(&db, "child").await.unwrap().unwrap();
        assert_eq!(child.parent_id.as_deref(), Some("top"));
        let c = get_credential(&db, "c").await.unwrap().unwrap();
        assert_eq!(c.folder_id.as_deref(), Some("top"));
    }
}
