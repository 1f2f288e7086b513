//! Catalog storage: the store boundary and its SQLite implementation

use super::model::{Category, Compatibility, CompatibilityMatrix, Difficulty, Tool, ToolDraft, ToolId};
use super::schema::init_schema;
use anyhow::{Context, Result, bail};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Operations the compatibility engine needs from a catalog backend
pub trait CatalogStore {
    fn list_tools(&self) -> Result<Vec<Tool>>;

    fn get_tool(&self, id: ToolId) -> Result<Option<Tool>>;

    fn find_tool_by_name(&self, name: &str) -> Result<Option<Tool>>;

    fn create_tool(&mut self, draft: &ToolDraft) -> Result<Tool>;

    /// Replace every field of an existing tool
    fn update_tool(&mut self, id: ToolId, draft: &ToolDraft) -> Result<Tool>;

    /// Delete a tool together with every compatibility row it takes part in
    fn delete_tool(&mut self, id: ToolId) -> Result<()>;

    fn list_categories(&self) -> Result<Vec<Category>>;

    fn upsert_category(&mut self, category: &Category) -> Result<()>;

    fn clear_all_compatibilities(&mut self) -> Result<()>;

    /// Persist one pair. Fails for self-pairs and for pairs that already exist
    /// in either orientation.
    fn create_compatibility(&mut self, record: &Compatibility) -> Result<Compatibility>;

    fn list_compatibilities(&self) -> Result<Vec<Compatibility>>;

    /// Compatibility rows joined with both of their tools
    fn list_compatibility_matrix(&self) -> Result<Vec<CompatibilityMatrix>> {
        let tools: HashMap<ToolId, Tool> = self
            .list_tools()?
            .into_iter()
            .map(|tool| (tool.id, tool))
            .collect();

        let rows = self
            .list_compatibilities()?
            .into_iter()
            .filter_map(|compat| {
                let one = tools.get(&compat.tool_one_id)?.clone();
                let two = tools.get(&compat.tool_two_id)?.clone();
                Some(CompatibilityMatrix {
                    tool_one: one,
                    tool_two: two,
                    compatibility: Some(compat),
                })
            })
            .collect();

        Ok(rows)
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }
}

const TOOL_COLUMNS: &str = "id, name, description, category_id, url, languages, frameworks, features,
     integrations, strengths, limitations, maturity_score, popularity_score, pricing,
     created_at, updated_at";

const COMPAT_COLUMNS: &str = "id, tool_one_id, tool_two_id, compatibility_score, notes,
     verified_integration, integration_difficulty, setup_steps, code_example, dependencies";

/// SQLite-backed catalog
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open or create a catalog database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open catalog database at {}", path.display()))?;

        init_schema(&conn)?;

        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    /// Get the default catalog database path
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;

        let catalog_dir = data_dir.join("toolmatrix");
        std::fs::create_dir_all(&catalog_dir).with_context(|| {
            format!(
                "Failed to create catalog directory at {}",
                catalog_dir.display()
            )
        })?;

        Ok(catalog_dir.join("catalog.db"))
    }

    fn query_tools(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Tool>> {
        let mut stmt = self.conn.prepare(sql)?;
        let tools = stmt
            .query_map(params, tool_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tools)
    }

    fn pair_exists(&self, a: ToolId, b: ToolId) -> Result<bool> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM compatibilities
                 WHERE (tool_one_id = ?1 AND tool_two_id = ?2)
                    OR (tool_one_id = ?2 AND tool_two_id = ?1)",
                (a, b),
                |row| row.get(0),
            )
            .optional()?;
        Ok(existing.is_some())
    }
}

impl CatalogStore for SqliteCatalog {
    fn list_tools(&self) -> Result<Vec<Tool>> {
        self.query_tools(
            &format!("SELECT {} FROM tools ORDER BY id", TOOL_COLUMNS),
            [],
        )
    }

    fn get_tool(&self, id: ToolId) -> Result<Option<Tool>> {
        let tool = self
            .conn
            .query_row(
                &format!("SELECT {} FROM tools WHERE id = ?1", TOOL_COLUMNS),
                [id],
                tool_from_row,
            )
            .optional()?;
        Ok(tool)
    }

    fn find_tool_by_name(&self, name: &str) -> Result<Option<Tool>> {
        let tool = self
            .conn
            .query_row(
                &format!("SELECT {} FROM tools WHERE name = ?1", TOOL_COLUMNS),
                [name],
                tool_from_row,
            )
            .optional()?;
        Ok(tool)
    }

    fn create_tool(&mut self, draft: &ToolDraft) -> Result<Tool> {
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO tools (name, description, category_id, url, languages, frameworks,
                    features, integrations, strengths, limitations, maturity_score,
                    popularity_score, pricing, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    &draft.name,
                    &draft.description,
                    &draft.category_id,
                    &draft.url,
                    serde_json::to_string(&draft.languages)?,
                    serde_json::to_string(&draft.frameworks)?,
                    serde_json::to_string(&draft.features)?,
                    serde_json::to_string(&draft.integrations)?,
                    serde_json::to_string(&draft.strengths)?,
                    serde_json::to_string(&draft.limitations)?,
                    draft.maturity_score,
                    draft.popularity_score,
                    &draft.pricing,
                    &now,
                    &now,
                ],
            )
            .with_context(|| format!("Failed to create tool '{}'", draft.name))?;

        let id = self.conn.last_insert_rowid();
        self.get_tool(id)?
            .with_context(|| format!("Tool {} vanished after insert", id))
    }

    fn update_tool(&mut self, id: ToolId, draft: &ToolDraft) -> Result<Tool> {
        let now = chrono::Utc::now().to_rfc3339();

        let changed = self
            .conn
            .execute(
                "UPDATE tools SET name = ?1, description = ?2, category_id = ?3, url = ?4,
                    languages = ?5, frameworks = ?6, features = ?7, integrations = ?8,
                    strengths = ?9, limitations = ?10, maturity_score = ?11,
                    popularity_score = ?12, pricing = ?13, updated_at = ?14
                 WHERE id = ?15",
                params![
                    &draft.name,
                    &draft.description,
                    &draft.category_id,
                    &draft.url,
                    serde_json::to_string(&draft.languages)?,
                    serde_json::to_string(&draft.frameworks)?,
                    serde_json::to_string(&draft.features)?,
                    serde_json::to_string(&draft.integrations)?,
                    serde_json::to_string(&draft.strengths)?,
                    serde_json::to_string(&draft.limitations)?,
                    draft.maturity_score,
                    draft.popularity_score,
                    &draft.pricing,
                    &now,
                    id,
                ],
            )
            .with_context(|| format!("Failed to update tool {}", id))?;

        if changed == 0 {
            bail!("tool {} not found", id);
        }

        self.get_tool(id)?
            .with_context(|| format!("Tool {} vanished after update", id))
    }

    fn delete_tool(&mut self, id: ToolId) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM tools WHERE id = ?1", [id])?;
        if changed == 0 {
            bail!("tool {} not found", id);
        }
        Ok(())
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    fn upsert_category(&mut self, category: &Category) -> Result<()> {
        self.conn.execute(
            "INSERT INTO categories (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            (&category.id, &category.name),
        )?;
        Ok(())
    }

    fn clear_all_compatibilities(&mut self) -> Result<()> {
        self.conn
            .execute("DELETE FROM compatibilities", [])
            .context("Failed to clear compatibility matrix")?;
        Ok(())
    }

    fn create_compatibility(&mut self, record: &Compatibility) -> Result<Compatibility> {
        if record.tool_one_id == record.tool_two_id {
            bail!("tool {} cannot be paired with itself", record.tool_one_id);
        }
        if self.pair_exists(record.tool_one_id, record.tool_two_id)? {
            bail!(
                "compatibility between {} and {} already exists",
                record.tool_one_id,
                record.tool_two_id
            );
        }

        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO compatibilities (tool_one_id, tool_two_id, compatibility_score, notes,
                verified_integration, integration_difficulty, setup_steps, code_example,
                dependencies, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.tool_one_id,
                record.tool_two_id,
                record.compatibility_score,
                &record.notes,
                record.verified_integration,
                record.integration_difficulty.as_str(),
                serde_json::to_string(&record.setup_steps)?,
                &record.code_example,
                serde_json::to_string(&record.dependencies)?,
                &now,
            ],
        )?;

        Ok(Compatibility {
            id: Some(self.conn.last_insert_rowid()),
            ..record.clone()
        })
    }

    fn list_compatibilities(&self) -> Result<Vec<Compatibility>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM compatibilities ORDER BY id",
            COMPAT_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], compatibility_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn begin(&mut self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN")
            .context("Failed to start transaction")
    }

    fn commit(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("Failed to commit transaction")
    }

    fn rollback(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn
            .execute_batch("ROLLBACK")
            .context("Failed to roll back transaction")
    }
}

fn json_list(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn tool_from_row(row: &Row) -> rusqlite::Result<Tool> {
    Ok(Tool {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category_id: row.get(3)?,
        url: row.get(4)?,
        languages: json_list(row, 5)?,
        frameworks: json_list(row, 6)?,
        features: json_list(row, 7)?,
        integrations: json_list(row, 8)?,
        strengths: json_list(row, 9)?,
        limitations: json_list(row, 10)?,
        maturity_score: row.get(11)?,
        popularity_score: row.get(12)?,
        pricing: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn compatibility_from_row(row: &Row) -> rusqlite::Result<Compatibility> {
    let difficulty: String = row.get(6)?;
    let integration_difficulty = difficulty
        .parse::<Difficulty>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, e.into()))?;

    Ok(Compatibility {
        id: Some(row.get(0)?),
        tool_one_id: row.get(1)?,
        tool_two_id: row.get(2)?,
        compatibility_score: row.get(3)?,
        notes: row.get(4)?,
        verified_integration: row.get(5)?,
        integration_difficulty,
        setup_steps: json_list(row, 7)?,
        code_example: row.get(8)?,
        dependencies: json_list(row, 9)?,
    })
}
