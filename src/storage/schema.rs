//! Database schema constants.
//!
//! All SQL schema definitions for the PostgreSQL task store.

/// SQL schema for creating the tasks table.
pub const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id UUID PRIMARY KEY,
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    input_ref TEXT NOT NULL,
    original_filename TEXT,
    result TEXT,
    error TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT tasks_status_check
        CHECK (status IN ('pending', 'processing', 'done', 'failed'))
)
"#;

/// SQL for creating the history index (newest-first listing).
pub const CREATE_TASKS_CREATED_AT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks (created_at DESC)
"#;

/// SQL for creating the status index (operator queries for stuck tasks).
pub const CREATE_TASKS_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status)
"#;

/// Returns all schema statements in application order.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_TASKS_TABLE,
        CREATE_TASKS_CREATED_AT_INDEX,
        CREATE_TASKS_STATUS_INDEX,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_are_idempotent() {
        for statement in all_schema_statements() {
            assert!(
                statement.contains("IF NOT EXISTS"),
                "schema statement must be idempotent: {}",
                statement
            );
        }
    }

    #[test]
    fn test_status_check_covers_all_states() {
        for status in ["pending", "processing", "done", "failed"] {
            assert!(CREATE_TASKS_TABLE.contains(status));
        }
    }
}
