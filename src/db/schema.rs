// src/db/schema.rs
// SQLite schema (idempotent)

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS complaints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_name TEXT,
    customer_email TEXT,
    channel TEXT NOT NULL DEFAULT 'Web',
    subject TEXT,
    description TEXT NOT NULL,

    -- Derived by the pipeline (comma-separated lists for categories/keywords)
    categories TEXT,
    sentiment TEXT,
    severity TEXT,
    department TEXT,
    keywords TEXT,

    -- Raw model output or fallback marker, for audit
    llm_classification TEXT,
    llm_routing TEXT,

    status TEXT NOT NULL DEFAULT 'New',
    sla_violation INTEGER NOT NULL DEFAULT 0,
    received_at TEXT,
    acknowledged_at TEXT,
    resolved_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_complaints_status ON complaints(status);
CREATE INDEX IF NOT EXISTS idx_complaints_email ON complaints(customer_email);
"#;
