//! SQLite-backed notes server
//!
//! A local stand-in for the remote service: the same validation and cascade
//! rules as [`MemoryApi`](super::MemoryApi), persisted in a single database
//! file. Used by the command-line tool.

use super::traits::NoteApi;
use super::types::{
    assemble_note_forest, assemble_tag_forest, ApiError, ApiResult, FlatNote, FlatTag, NoteRecord, NoteRef,
    NoteTreeRecord, NoteUpdate, TagRecord, TagRef, TagTreeRecord,
};
use crate::entity::{HierarchyType, NoteId, TagId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite implementation of [`NoteApi`]
///
/// Thread-safe via an internal mutex on the connection.
pub struct SqliteApi {
    conn: Mutex<Connection>,
}

impl SqliteApi {
    fn init_schema(conn: &Connection) -> ApiResult<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                parent_id INTEGER REFERENCES notes(id) ON DELETE CASCADE,
                hierarchy_type TEXT NOT NULL DEFAULT 'block',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_parent ON notes(parent_id);

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                parent_id INTEGER REFERENCES tags(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_tags_parent ON tags(parent_id);

            CREATE TABLE IF NOT EXISTS note_tags (
                note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (note_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);
            "#,
        )?;
        Ok(())
    }

    /// Open or create a database file
    pub fn open(path: impl AsRef<Path>) -> ApiResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened notes database");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory database, for tests
    pub fn open_in_memory() -> ApiResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}

fn note_parent(conn: &Connection, id: NoteId) -> ApiResult<Option<Option<NoteId>>> {
    let parent = conn
        .query_row("SELECT parent_id FROM notes WHERE id = ?1", params![id.get()], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .optional()?;
    Ok(parent.map(|p| p.map(NoteId::new)))
}

fn tag_parent(conn: &Connection, id: TagId) -> ApiResult<Option<Option<TagId>>> {
    let parent = conn
        .query_row("SELECT parent_id FROM tags WHERE id = ?1", params![id.get()], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .optional()?;
    Ok(parent.map(|p| p.map(TagId::new)))
}

fn require_note(conn: &Connection, id: NoteId) -> ApiResult<Option<NoteId>> {
    note_parent(conn, id)?.ok_or_else(|| ApiError::NotFound(format!("note {}", id)))
}

fn require_tag(conn: &Connection, id: TagId) -> ApiResult<Option<TagId>> {
    tag_parent(conn, id)?.ok_or_else(|| ApiError::NotFound(format!("tag {}", id)))
}

/// True if `candidate` is `ancestor` or one of its subpages
fn note_within(conn: &Connection, candidate: NoteId, ancestor: NoteId) -> ApiResult<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(candidate);
    while let Some(id) = current {
        if id == ancestor {
            return Ok(true);
        }
        if !seen.insert(id) {
            return Ok(false);
        }
        current = note_parent(conn, id)?.flatten();
    }
    Ok(false)
}

fn tag_within(conn: &Connection, candidate: TagId, ancestor: TagId) -> ApiResult<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(candidate);
    while let Some(id) = current {
        if id == ancestor {
            return Ok(true);
        }
        if !seen.insert(id) {
            return Ok(false);
        }
        current = tag_parent(conn, id)?.flatten();
    }
    Ok(false)
}

fn tag_refs(conn: &Connection, note: NoteId) -> ApiResult<Vec<TagRef>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name FROM note_tags nt JOIN tags t ON t.id = nt.tag_id
         WHERE nt.note_id = ?1 ORDER BY t.id",
    )?;
    let refs = stmt
        .query_map(params![note.get()], |row| {
            Ok(TagRef {
                id: TagId::new(row.get(0)?),
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(refs)
}

fn load_note(conn: &Connection, id: NoteId) -> ApiResult<NoteRecord> {
    let row = conn
        .query_row(
            "SELECT title, content, parent_id, hierarchy_type, created_at, updated_at
             FROM notes WHERE id = ?1",
            params![id.get()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;
    let (title, content, parent, hierarchy_type, created_at, updated_at) =
        row.ok_or_else(|| ApiError::NotFound(format!("note {}", id)))?;
    Ok(NoteRecord {
        id,
        title,
        content: Some(content),
        tags: tag_refs(conn, id)?,
        parent_id: parent.map(NoteId::new),
        hierarchy_type: HierarchyType::parse(&hierarchy_type).unwrap_or_default(),
        created_at: parse_time(&created_at),
        updated_at: parse_time(&updated_at),
    })
}

fn load_tag(conn: &Connection, id: TagId) -> ApiResult<TagRecord> {
    let row = conn
        .query_row("SELECT name, parent_id FROM tags WHERE id = ?1", params![id.get()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
        })
        .optional()?;
    let (name, parent) = row.ok_or_else(|| ApiError::NotFound(format!("tag {}", id)))?;
    Ok(TagRecord {
        id,
        name,
        parent_id: parent.map(TagId::new),
    })
}

impl NoteApi for SqliteApi {
    fn get_notes_tree(&self, exclude_content: bool) -> ApiResult<Vec<NoteTreeRecord>> {
        let conn = self.conn();

        let mut memberships: BTreeMap<NoteId, Vec<TagRef>> = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT nt.note_id, t.id, t.name FROM note_tags nt JOIN tags t ON t.id = nt.tag_id
                 ORDER BY nt.note_id, t.id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    NoteId::new(row.get(0)?),
                    TagRef {
                        id: TagId::new(row.get(1)?),
                        name: row.get(2)?,
                    },
                ))
            })?;
            for row in rows {
                let (note, tag) = row?;
                memberships.entry(note).or_default().push(tag);
            }
        }

        let mut stmt =
            conn.prepare("SELECT id, title, content, parent_id, hierarchy_type FROM notes ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    NoteId::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let flat = rows
            .into_iter()
            .map(|(id, title, content, parent, hierarchy_type)| FlatNote {
                id,
                title,
                content: Some(content),
                parent: parent.map(NoteId::new),
                hierarchy_type: HierarchyType::parse(&hierarchy_type).unwrap_or_default(),
                tags: memberships.remove(&id).unwrap_or_default(),
            })
            .collect();
        Ok(assemble_note_forest(flat, exclude_content))
    }

    fn get_tags_tree(&self) -> ApiResult<Vec<TagTreeRecord>> {
        let conn = self.conn();

        let mut tagged: BTreeMap<TagId, Vec<NoteRef>> = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT nt.tag_id, n.id, n.title FROM note_tags nt JOIN notes n ON n.id = nt.note_id
                 ORDER BY nt.tag_id, n.id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    TagId::new(row.get(0)?),
                    NoteRef {
                        id: NoteId::new(row.get(1)?),
                        title: row.get(2)?,
                    },
                ))
            })?;
            for row in rows {
                let (tag, note) = row?;
                tagged.entry(tag).or_default().push(note);
            }
        }

        let mut stmt = conn.prepare("SELECT id, name, parent_id FROM tags ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    TagId::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let flat = rows
            .into_iter()
            .map(|(id, name, parent)| FlatTag {
                id,
                name,
                parent: parent.map(TagId::new),
                notes: tagged.remove(&id).unwrap_or_default(),
            })
            .collect();
        Ok(assemble_tag_forest(flat))
    }

    fn note_create(&self, title: &str, content: &str) -> ApiResult<NoteRecord> {
        let conn = self.conn();
        let stamp = now();
        conn.execute(
            "INSERT INTO notes (title, content, hierarchy_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![title, content, HierarchyType::default().as_str(), stamp],
        )?;
        let id = NoteId::new(conn.last_insert_rowid());
        load_note(&conn, id)
    }

    fn update_note(&self, id: NoteId, update: &NoteUpdate) -> ApiResult<NoteRecord> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE notes SET title = COALESCE(?2, title), content = COALESCE(?3, content), updated_at = ?4
             WHERE id = ?1",
            params![id.get(), update.title, update.content, now()],
        )?;
        if changed == 0 {
            return Err(ApiError::NotFound(format!("note {}", id)));
        }
        load_note(&conn, id)
    }

    fn delete_note(&self, id: NoteId) -> ApiResult<()> {
        let conn = self.conn();
        // subpages and memberships go with it via ON DELETE CASCADE
        let changed = conn.execute("DELETE FROM notes WHERE id = ?1", params![id.get()])?;
        if changed == 0 {
            return Err(ApiError::NotFound(format!("note {}", id)));
        }
        Ok(())
    }

    fn attach_note_to_parent(
        &self,
        note_id: NoteId,
        parent_id: NoteId,
        hierarchy_type: HierarchyType,
    ) -> ApiResult<()> {
        let conn = self.conn();
        require_note(&conn, note_id)?;
        require_note(&conn, parent_id)?;
        if note_within(&conn, parent_id, note_id)? {
            return Err(ApiError::Rejected(format!(
                "note {} cannot become a subpage of its own subpage {}",
                note_id, parent_id
            )));
        }
        conn.execute(
            "UPDATE notes SET parent_id = ?2, hierarchy_type = ?3, updated_at = ?4 WHERE id = ?1",
            params![note_id.get(), parent_id.get(), hierarchy_type.as_str(), now()],
        )?;
        Ok(())
    }

    fn detach_note_from_parent(&self, note_id: NoteId) -> ApiResult<()> {
        let conn = self.conn();
        require_note(&conn, note_id)?;
        conn.execute(
            "UPDATE notes SET parent_id = NULL, updated_at = ?2 WHERE id = ?1",
            params![note_id.get(), now()],
        )?;
        Ok(())
    }

    fn create_tag(&self, name: &str) -> ApiResult<TagRecord> {
        let conn = self.conn();
        conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
        let id = TagId::new(conn.last_insert_rowid());
        load_tag(&conn, id)
    }

    fn update_tag(&self, id: TagId, name: &str) -> ApiResult<TagRecord> {
        let conn = self.conn();
        let changed = conn.execute("UPDATE tags SET name = ?2 WHERE id = ?1", params![id.get(), name])?;
        if changed == 0 {
            return Err(ApiError::NotFound(format!("tag {}", id)));
        }
        load_tag(&conn, id)
    }

    fn delete_tag(&self, id: TagId) -> ApiResult<()> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM tags WHERE id = ?1", params![id.get()])?;
        if changed == 0 {
            return Err(ApiError::NotFound(format!("tag {}", id)));
        }
        Ok(())
    }

    fn attach_tag_to_parent(&self, tag_id: TagId, parent_id: TagId) -> ApiResult<()> {
        let conn = self.conn();
        require_tag(&conn, tag_id)?;
        require_tag(&conn, parent_id)?;
        if tag_within(&conn, parent_id, tag_id)? {
            return Err(ApiError::Rejected(format!(
                "tag {} cannot be nested under its own descendant {}",
                tag_id, parent_id
            )));
        }
        conn.execute(
            "UPDATE tags SET parent_id = ?2 WHERE id = ?1",
            params![tag_id.get(), parent_id.get()],
        )?;
        Ok(())
    }

    fn detach_tag_from_parent(&self, tag_id: TagId) -> ApiResult<()> {
        let conn = self.conn();
        require_tag(&conn, tag_id)?;
        conn.execute("UPDATE tags SET parent_id = NULL WHERE id = ?1", params![tag_id.get()])?;
        Ok(())
    }

    fn attach_tag_to_note(&self, note_id: NoteId, tag_id: TagId) -> ApiResult<()> {
        let conn = self.conn();
        require_note(&conn, note_id)?;
        require_tag(&conn, tag_id)?;
        conn.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2)",
            params![note_id.get(), tag_id.get()],
        )?;
        Ok(())
    }

    fn detach_tag_from_note(&self, note_id: NoteId, tag_id: TagId) -> ApiResult<()> {
        let conn = self.conn();
        require_note(&conn, note_id)?;
        conn.execute(
            "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2",
            params![note_id.get(), tag_id.get()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_and_read_back() {
        let api = SqliteApi::open_in_memory().unwrap();
        let tag = api.create_tag("Work").unwrap();
        let note = api.note_create("Report", "body").unwrap();
        api.attach_tag_to_note(note.id, tag.id).unwrap();

        let notes = api.get_notes_tree(false).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content.as_deref(), Some("body"));
        assert_eq!(notes[0].tags[0].name, "Work");

        let tags = api.get_tags_tree().unwrap();
        assert_eq!(tags[0].notes[0].title, "Report");
    }

    #[test]
    fn exclude_content_drops_bodies() {
        let api = SqliteApi::open_in_memory().unwrap();
        api.note_create("Report", "body").unwrap();
        assert_eq!(api.get_notes_tree(true).unwrap()[0].content, None);
    }

    #[test]
    fn reparenting_nests_and_rejects_cycles() {
        let api = SqliteApi::open_in_memory().unwrap();
        let a = api.note_create("A", "").unwrap().id;
        let b = api.note_create("B", "").unwrap().id;
        api.attach_note_to_parent(b, a, HierarchyType::Page).unwrap();

        let tree = api.get_notes_tree(true).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].hierarchy_type, HierarchyType::Page);

        assert!(matches!(
            api.attach_note_to_parent(a, b, HierarchyType::Block),
            Err(ApiError::Rejected(_))
        ));
    }

    #[test]
    fn delete_cascades_through_foreign_keys() {
        let api = SqliteApi::open_in_memory().unwrap();
        let work = api.create_tag("Work").unwrap().id;
        let meetings = api.create_tag("Meetings").unwrap().id;
        api.attach_tag_to_parent(meetings, work).unwrap();
        let a = api.note_create("A", "").unwrap().id;
        let b = api.note_create("B", "").unwrap().id;
        api.attach_note_to_parent(b, a, HierarchyType::Block).unwrap();
        api.attach_tag_to_note(b, meetings).unwrap();

        api.delete_tag(work).unwrap();
        assert!(api.get_tags_tree().unwrap().is_empty());

        api.delete_note(a).unwrap();
        assert!(api.get_notes_tree(true).unwrap().is_empty());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let api = SqliteApi::open_in_memory().unwrap();
        assert!(matches!(
            api.update_note(NoteId::new(7), &NoteUpdate::title("x")),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(api.delete_tag(TagId::new(7)), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn data_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.db");
        {
            let api = SqliteApi::open(&path).unwrap();
            api.note_create("Kept", "").unwrap();
        }
        let api = SqliteApi::open(&path).unwrap();
        assert_eq!(api.get_notes_tree(true).unwrap()[0].title, "Kept");
    }
}
