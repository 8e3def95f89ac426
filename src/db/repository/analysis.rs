use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::FlagSeverity;
use crate::models::DisputeDocument;
use crate::validation::report::AnalysisReport;

/// A persisted analysis row with its deserialized report.
#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub total_flags: usize,
    pub potential_savings: f64,
    pub summary: String,
    pub severity: FlagSeverity,
    pub report: AnalysisReport,
    pub created_at: NaiveDateTime,
}

pub fn insert_analysis(
    conn: &Connection,
    bill_id: &Uuid,
    report: &AnalysisReport,
) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    let detailed = serde_json::to_string(report)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    let recommendations = serde_json::to_string(&report.recommendations)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    let now = chrono::Local::now().naive_local();

    conn.execute(
        "INSERT INTO bill_analyses (id, bill_id, total_flags, potential_savings,
         summary, severity, detailed_report, recommendations, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id.to_string(),
            bill_id.to_string(),
            report.total_flags as i64,
            report.potential_savings,
            report.summary,
            report.severity.as_str(),
            detailed,
            recommendations,
            now.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        ],
    )?;
    Ok(id)
}

/// Get the most recent analysis for a bill, if one exists.
pub fn get_latest_analysis(
    conn: &Connection,
    bill_id: &Uuid,
) -> Result<Option<StoredAnalysis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, total_flags, potential_savings, summary, severity,
         detailed_report, created_at
         FROM bill_analyses WHERE bill_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )?;

    let result = stmt.query_row(params![bill_id.to_string()], |row| {
        Ok(AnalysisRow {
            id: row.get::<_, String>(0)?,
            bill_id: row.get::<_, String>(1)?,
            total_flags: row.get::<_, i64>(2)?,
            potential_savings: row.get::<_, f64>(3)?,
            summary: row.get::<_, String>(4)?,
            severity: row.get::<_, String>(5)?,
            detailed_report: row.get::<_, String>(6)?,
            created_at: row.get::<_, String>(7)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(analysis_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_dispute_document(
    conn: &Connection,
    bill_id: &Uuid,
    content: &str,
) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    let now = chrono::Local::now().naive_local();
    conn.execute(
        "INSERT INTO dispute_documents (id, bill_id, document_type, content, created_at)
         VALUES (?1, ?2, 'dispute_letter', ?3, ?4)",
        params![
            id.to_string(),
            bill_id.to_string(),
            content,
            now.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        ],
    )?;
    Ok(id)
}

pub fn get_dispute_documents(
    conn: &Connection,
    bill_id: &Uuid,
) -> Result<Vec<DisputeDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, document_type, content, created_at
         FROM dispute_documents WHERE bill_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map(params![bill_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut documents = Vec::new();
    for row in rows {
        let (id, bill_id, document_type, content, created_at) = row?;
        documents.push(DisputeDocument {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            bill_id: Uuid::parse_str(&bill_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            document_type,
            content,
            created_at: parse_timestamp(&created_at),
        });
    }
    Ok(documents)
}

// Internal row type for analysis mapping
struct AnalysisRow {
    id: String,
    bill_id: String,
    total_flags: i64,
    potential_savings: f64,
    summary: String,
    severity: String,
    detailed_report: String,
    created_at: String,
}

fn analysis_from_row(row: AnalysisRow) -> Result<StoredAnalysis, DatabaseError> {
    let report: AnalysisReport = serde_json::from_str(&row.detailed_report)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    Ok(StoredAnalysis {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        bill_id: Uuid::parse_str(&row.bill_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        total_flags: row.total_flags as usize,
        potential_savings: row.potential_savings,
        summary: row.summary,
        severity: FlagSeverity::from_str(&row.severity)?,
        report,
        created_at: parse_timestamp(&row.created_at),
    })
}

fn parse_timestamp(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::bill::insert_bill;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Bill;
    use crate::validation::report::build_report;
    use crate::validation::types::ValidationResult;
    use crate::AnalysisConfig;

    fn empty_report() -> AnalysisReport {
        build_report(&ValidationResult::default(), &AnalysisConfig::default())
    }

    #[test]
    fn insert_and_get_latest_round_trip() {
        let conn = open_memory_database().unwrap();
        let bill = Bill::new("statement.pdf");
        insert_bill(&conn, &bill).unwrap();

        let report = empty_report();
        let id = insert_analysis(&conn, &bill.id, &report).unwrap();

        let stored = get_latest_analysis(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.bill_id, bill.id);
        assert_eq!(stored.total_flags, 0);
        assert_eq!(stored.severity, FlagSeverity::Low);
        assert_eq!(stored.report.summary, report.summary);
    }

    #[test]
    fn latest_analysis_wins() {
        let conn = open_memory_database().unwrap();
        let bill = Bill::new("statement.pdf");
        insert_bill(&conn, &bill).unwrap();

        insert_analysis(&conn, &bill.id, &empty_report()).unwrap();
        let second = insert_analysis(&conn, &bill.id, &empty_report()).unwrap();

        let stored = get_latest_analysis(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.id, second);
    }

    #[test]
    fn missing_analysis_returns_none() {
        let conn = open_memory_database().unwrap();
        let bill = Bill::new("statement.pdf");
        insert_bill(&conn, &bill).unwrap();
        assert!(get_latest_analysis(&conn, &bill.id).unwrap().is_none());
    }

    #[test]
    fn dispute_documents_round_trip() {
        let conn = open_memory_database().unwrap();
        let bill = Bill::new("statement.pdf");
        insert_bill(&conn, &bill).unwrap();

        let id = insert_dispute_document(&conn, &bill.id, "Dear Billing Department,").unwrap();
        let documents = get_dispute_documents(&conn, &bill.id).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, id);
        assert_eq!(documents[0].document_type, "dispute_letter");
        assert_eq!(documents[0].content, "Dear Billing Department,");
    }
}
