//! Database schema for the tool catalog

use anyhow::Result;
use rusqlite::Connection;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tools (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            category_id TEXT NOT NULL,
            url TEXT,
            languages TEXT NOT NULL DEFAULT '[]',
            frameworks TEXT NOT NULL DEFAULT '[]',
            features TEXT NOT NULL DEFAULT '[]',
            integrations TEXT NOT NULL DEFAULT '[]',
            strengths TEXT NOT NULL DEFAULT '[]',
            limitations TEXT NOT NULL DEFAULT '[]',
            maturity_score INTEGER,
            popularity_score INTEGER,
            pricing TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tools_category ON tools(category_id);

        CREATE TABLE IF NOT EXISTS compatibilities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tool_one_id INTEGER NOT NULL REFERENCES tools(id) ON DELETE CASCADE,
            tool_two_id INTEGER NOT NULL REFERENCES tools(id) ON DELETE CASCADE,
            compatibility_score INTEGER NOT NULL CHECK (compatibility_score BETWEEN 0 AND 100),
            notes TEXT NOT NULL DEFAULT '',
            verified_integration INTEGER NOT NULL DEFAULT 0,
            integration_difficulty TEXT NOT NULL,
            setup_steps TEXT NOT NULL DEFAULT '[]',
            code_example TEXT NOT NULL DEFAULT '',
            dependencies TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            CHECK (tool_one_id <> tool_two_id),
            UNIQUE(tool_one_id, tool_two_id)
        );

        CREATE INDEX IF NOT EXISTS idx_compat_one ON compatibilities(tool_one_id);
        CREATE INDEX IF NOT EXISTS idx_compat_two ON compatibilities(tool_two_id);
        "#,
    )?;

    Ok(())
}
