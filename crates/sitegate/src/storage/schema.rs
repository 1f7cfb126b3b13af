//! `SQLite` schema definitions for sitegate.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema. Enumerations are stored as their lower-case names,
//! timestamps as RFC 3339 text and dates as `YYYY-MM-DD`.

/// User profiles.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    role TEXT NOT NULL,
    status TEXT NOT NULL,
    phone TEXT,
    trade TEXT,
    created_at TEXT NOT NULL
)
";

/// Projects.
pub const CREATE_PROJECTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    location TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// Plots within a project.
pub const CREATE_PLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS plots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    plot_number TEXT NOT NULL,
    house_type TEXT,
    UNIQUE (project_id, plot_number)
)
";

/// Operatives assigned work types on plots.
pub const CREATE_ASSIGNMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS unit_work_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plot_id INTEGER NOT NULL REFERENCES plots(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL,
    work_type TEXT NOT NULL,
    status TEXT NOT NULL,
    assigned_by INTEGER NOT NULL,
    due_date TEXT,
    assigned_at TEXT NOT NULL
)
";

/// Units logged against assignments.
pub const CREATE_WORK_LOGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS unit_work_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assignment_id INTEGER NOT NULL REFERENCES unit_work_assignments(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL,
    work_type TEXT NOT NULL,
    units_completed INTEGER NOT NULL,
    hours_worked REAL NOT NULL,
    notes TEXT,
    logged_at TEXT NOT NULL
)
";

/// RAMS documents, one row per issued version.
pub const CREATE_RAMS_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS rams_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference TEXT NOT NULL,
    title TEXT NOT NULL,
    version INTEGER NOT NULL,
    work_types TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    min_read_seconds INTEGER NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    fresh_signature_required INTEGER NOT NULL,
    issued_by INTEGER NOT NULL,
    issued_at TEXT NOT NULL,
    superseded_at TEXT,
    UNIQUE (reference, version)
)
";

/// Captured signatures. One per contractor and document version.
pub const CREATE_SIGNATURES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS contractor_rams_signatures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contractor_id INTEGER NOT NULL,
    document_id INTEGER NOT NULL REFERENCES rams_documents(id),
    document_version INTEGER NOT NULL,
    signature_data TEXT NOT NULL,
    signature_digest TEXT NOT NULL,
    reading_seconds INTEGER NOT NULL,
    reading_skipped INTEGER NOT NULL DEFAULT 0,
    signed_at TEXT NOT NULL,
    UNIQUE (contractor_id, document_id, document_version)
)
";

/// Per-contractor RAMS obligations.
pub const CREATE_REGISTER_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS task_plan_rams_register (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contractor_id INTEGER NOT NULL,
    document_id INTEGER NOT NULL REFERENCES rams_documents(id),
    document_version INTEGER NOT NULL,
    activity TEXT NOT NULL,
    status TEXT NOT NULL,
    signed_at TEXT,
    created_at TEXT NOT NULL
)
";

/// Index for compliance lookups by contractor.
pub const CREATE_REGISTER_CONTRACTOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_register_contractor ON task_plan_rams_register(contractor_id)
";

/// Index for register updates by document.
pub const CREATE_REGISTER_DOCUMENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_register_document ON task_plan_rams_register(document_id)
";

/// Site notices.
pub const CREATE_NOTICES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS site_notices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER,
    notice_type TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    priority TEXT NOT NULL,
    posted_by INTEGER NOT NULL,
    posted_at TEXT NOT NULL,
    expires_at TEXT
)
";

/// Per-user notifications.
pub const CREATE_NOTIFICATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS smart_notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    priority TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    link TEXT,
    read_at TEXT,
    created_at TEXT NOT NULL
)
";

/// Index for a user's notification feed.
pub const CREATE_NOTIFICATIONS_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_notifications_user ON smart_notifications(user_id, created_at DESC)
";

/// Qualifications held by users.
pub const CREATE_QUALIFICATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS qualifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    issuer TEXT,
    certificate_number TEXT,
    issued_on TEXT,
    expires_on TEXT,
    document_path TEXT,
    created_at TEXT NOT NULL
)
";

/// Delivery requests.
pub const CREATE_DELIVERIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS delivery_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL,
    requested_by INTEGER NOT NULL,
    supplier TEXT NOT NULL,
    items TEXT NOT NULL,
    delivery_date TEXT NOT NULL,
    time_slot TEXT,
    status TEXT NOT NULL,
    reviewed_by INTEGER,
    rejection_reason TEXT,
    pod_reference TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Index for the delivery calendar.
pub const CREATE_DELIVERIES_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_deliveries_date ON delivery_requests(delivery_date)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Every table, in creation order.
pub const TABLES: &[&str] = &[
    "users",
    "projects",
    "plots",
    "unit_work_assignments",
    "unit_work_logs",
    "rams_documents",
    "contractor_rams_signatures",
    "task_plan_rams_register",
    "site_notices",
    "smart_notifications",
    "qualifications",
    "delivery_requests",
    "metadata",
];

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_PROJECTS_TABLE,
    CREATE_PLOTS_TABLE,
    CREATE_ASSIGNMENTS_TABLE,
    CREATE_WORK_LOGS_TABLE,
    CREATE_RAMS_DOCUMENTS_TABLE,
    CREATE_SIGNATURES_TABLE,
    CREATE_REGISTER_TABLE,
    CREATE_REGISTER_CONTRACTOR_INDEX,
    CREATE_REGISTER_DOCUMENT_INDEX,
    CREATE_NOTICES_TABLE,
    CREATE_NOTIFICATIONS_TABLE,
    CREATE_NOTIFICATIONS_USER_INDEX,
    CREATE_QUALIFICATIONS_TABLE,
    CREATE_DELIVERIES_TABLE,
    CREATE_DELIVERIES_DATE_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_every_table_has_a_statement() {
        for table in TABLES {
            let needle = format!("CREATE TABLE IF NOT EXISTS {table} (");
            assert!(
                SCHEMA_STATEMENTS.iter().any(|s| s.contains(&needle)),
                "no statement for {table}"
            );
        }
    }

    #[test]
    fn test_signature_uniqueness_constraint() {
        assert!(CREATE_SIGNATURES_TABLE
            .contains("UNIQUE (contractor_id, document_id, document_version)"));
    }

    #[test]
    fn test_document_version_uniqueness_constraint() {
        assert!(CREATE_RAMS_DOCUMENTS_TABLE.contains("UNIQUE (reference, version)"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
