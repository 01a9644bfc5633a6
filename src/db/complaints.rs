// src/db/complaints.rs
// Complaint CRUD, the one-shot triage update, and SLA scan queries

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use super::Database;
use super::types::{Complaint, NewComplaint, Sentiment, Severity, Status};

/// Derived fields written together by one pipeline pass.
///
/// The whole struct goes into a single UPDATE so a concurrent reader never
/// observes a half-classified complaint.
#[derive(Debug, Clone)]
pub struct TriageUpdate {
    pub categories: Vec<String>,
    pub sentiment: Sentiment,
    pub severity: Severity,
    pub department: String,
    pub keywords: Vec<String>,
    pub llm_classification: String,
    pub llm_routing: String,
}

const COMPLAINT_COLUMNS: &str = "id, customer_name, customer_email, channel, subject, description, \
     categories, sentiment, severity, department, keywords, \
     llm_classification, llm_routing, status, sla_violation, \
     received_at, acknowledged_at, resolved_at, created_at, updated_at";

impl Database {
    /// Insert a new complaint with only raw fields populated
    pub fn insert_complaint(&self, new: &NewComplaint) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO complaints (customer_name, customer_email, channel, subject, description,
                                     status, received_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'New', ?6, ?6)",
            params![
                new.customer_name,
                new.customer_email,
                new.channel,
                new.subject,
                new.description,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch a complaint by id
    pub fn get_complaint(&self, id: i64) -> Result<Option<Complaint>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map([id], parse_complaint_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Most recently received complaints
    pub fn list_complaints(&self, limit: usize) -> Result<Vec<Complaint>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map([limit as i64], parse_complaint_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Write all pipeline-derived fields in one statement.
    /// Returns false when the complaint no longer exists.
    pub fn apply_triage(&self, id: i64, update: &TriageUpdate) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE complaints
             SET categories = ?1, sentiment = ?2, severity = ?3, department = ?4,
                 keywords = ?5, llm_classification = ?6, llm_routing = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                update.categories.join(","),
                update.sentiment.as_str(),
                update.severity.as_str(),
                update.department,
                update.keywords.join(","),
                update.llm_classification,
                update.llm_routing,
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Complaints still open, i.e. everything the SLA monitor must examine
    pub fn unresolved_complaints(&self) -> Result<Vec<Complaint>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE status != 'Resolved'"
        ))?;
        let rows = stmt.query_map([], parse_complaint_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Flip the violation flag, false -> true only.
    /// Returns true exactly once per complaint; the guard in the WHERE
    /// clause is what makes the alert fire at most once.
    pub fn mark_sla_violation(&self, id: i64) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE complaints SET sla_violation = 1, updated_at = ?1
             WHERE id = ?2 AND sla_violation = 0",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(changed > 0)
    }

    /// Externally-driven status transition; stamps the matching timestamp
    pub fn set_status(&self, id: i64, status: Status) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        let changed = match status {
            Status::Acknowledged => conn.execute(
                "UPDATE complaints SET status = ?1, acknowledged_at = ?2, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now, id],
            )?,
            Status::Resolved => conn.execute(
                "UPDATE complaints SET status = ?1, resolved_at = ?2, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now, id],
            )?,
            _ => conn.execute(
                "UPDATE complaints SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now, id],
            )?,
        };
        Ok(changed > 0)
    }

    /// Backdate a complaint's creation time (test fixtures for SLA scans)
    #[cfg(test)]
    pub fn set_created_at(&self, id: i64, created_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE complaints SET created_at = ?1 WHERE id = ?2",
            params![created_at.to_rfc3339(), id],
        )?;
        Ok(())
    }

    /// Directly set severity without a full triage pass (test fixtures)
    #[cfg(test)]
    pub fn set_severity(&self, id: i64, severity: Severity) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE complaints SET severity = ?1 WHERE id = ?2",
            params![severity.as_str(), id],
        )?;
        Ok(())
    }
}

/// Map a SELECTed row (COMPLAINT_COLUMNS order) to a Complaint
pub fn parse_complaint_row(row: &Row) -> rusqlite::Result<Complaint> {
    let categories: Option<String> = row.get(6)?;
    let sentiment: Option<String> = row.get(7)?;
    let severity: Option<String> = row.get(8)?;
    let keywords: Option<String> = row.get(10)?;
    let created_at: String = row.get(18)?;

    Ok(Complaint {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_email: row.get(2)?,
        channel: row.get(3)?,
        subject: row.get(4)?,
        description: row.get(5)?,
        categories: split_csv(categories),
        sentiment: sentiment.as_deref().and_then(Sentiment::parse),
        severity: severity.as_deref().and_then(Severity::parse),
        department: row.get(9)?,
        keywords: split_csv(keywords),
        llm_classification: row.get(11)?,
        llm_routing: row.get(12)?,
        status: row.get(13)?,
        sla_violation: row.get::<_, i64>(14)? != 0,
        received_at: parse_ts(row.get(15)?),
        acknowledged_at: parse_ts(row.get(16)?),
        resolved_at: parse_ts(row.get(17)?),
        created_at: parse_ts(Some(created_at)).unwrap_or_else(Utc::now),
        updated_at: parse_ts(row.get(19)?),
    })
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_ts(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
