use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;

/// One catalog row for an ingested card. The pipeline only ever creates
/// these; edits and deletes belong to the surrounding application.
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub id: i64,
    pub name: String,
    pub main_file: String,
    pub notes: String,
    pub created_date: String,
    pub last_modified_date: String,
}

/// SQLite-backed catalog store. The ingestion pipeline consumes the
/// insert/lookup surface only.
#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog {}", path.display()))?;
        let catalog = Self { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let catalog = Self {
            conn: Connection::open_in_memory()?,
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS characters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                main_file TEXT NOT NULL UNIQUE,
                notes TEXT NOT NULL DEFAULT '',
                misc_notes TEXT NOT NULL DEFAULT '',
                created_date TEXT NOT NULL,
                last_modified_date TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS lorebooks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT UNIQUE NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                misc_notes TEXT NOT NULL DEFAULT '',
                created_date TEXT NOT NULL,
                last_modified_date TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    pub fn lookup_by_source_path(&self, source_path: &str) -> Result<Option<CharacterRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, name, main_file, notes, created_date, last_modified_date
                 FROM characters WHERE main_file = ?1",
                params![source_path],
                |row| {
                    Ok(CharacterRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        main_file: row.get(2)?,
                        notes: row.get(3)?,
                        created_date: row.get(4)?,
                        last_modified_date: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn insert_character(
        &self,
        name: &str,
        source_path: &str,
        notes: &str,
        created_at: &str,
        modified_at: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO characters (name, main_file, notes, created_date, last_modified_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, source_path, notes, created_at, modified_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_characters(&self) -> Result<Vec<CharacterRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, main_file, notes, created_date, last_modified_date
             FROM characters ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CharacterRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                main_file: row.get(2)?,
                notes: row.get(3)?,
                created_date: row.get(4)?,
                last_modified_date: row.get(5)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn lorebook_exists(&self, filename: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lorebooks WHERE filename = ?1",
            params![filename],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_lorebook(&self, filename: &str, created_at: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO lorebooks (filename, created_date, last_modified_date)
             VALUES (?1, ?2, ?3)",
            params![filename, created_at, created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn character_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM characters", [], |row| row.get(0))?)
    }

    pub fn lorebook_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM lorebooks", [], |row| row.get(0))?)
    }
}
