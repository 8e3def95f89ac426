use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::BillStatus;
use crate::models::Bill;

pub fn insert_bill(conn: &Connection, bill: &Bill) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_bills (id, source_file, status, patient_name, provider_name,
         service_date, account_number, total_charges, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            bill.id.to_string(),
            bill.source_file,
            bill.status.as_str(),
            bill.patient_name,
            bill.provider_name,
            bill.service_date.map(|d| d.to_string()),
            bill.account_number,
            bill.total_charges,
            bill.uploaded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_bill(conn: &Connection, id: &Uuid) -> Result<Option<Bill>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, source_file, status, patient_name, provider_name,
         service_date, account_number, total_charges, uploaded_at
         FROM medical_bills WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(BillRow {
            id: row.get::<_, String>(0)?,
            source_file: row.get::<_, String>(1)?,
            status: row.get::<_, String>(2)?,
            patient_name: row.get::<_, Option<String>>(3)?,
            provider_name: row.get::<_, Option<String>>(4)?,
            service_date: row.get::<_, Option<String>>(5)?,
            account_number: row.get::<_, Option<String>>(6)?,
            total_charges: row.get::<_, f64>(7)?,
            uploaded_at: row.get::<_, String>(8)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(bill_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Update the mutable bill fields: status plus the summary extracted
/// by the pipeline (patient, provider, dates, totals).
pub fn update_bill(conn: &Connection, bill: &Bill) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE medical_bills SET status = ?2, patient_name = ?3, provider_name = ?4,
         service_date = ?5, account_number = ?6, total_charges = ?7
         WHERE id = ?1",
        params![
            bill.id.to_string(),
            bill.status.as_str(),
            bill.patient_name,
            bill.provider_name,
            bill.service_date.map(|d| d.to_string()),
            bill.account_number,
            bill.total_charges,
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Bill".into(),
            id: bill.id.to_string(),
        });
    }
    Ok(())
}

/// Update only the status of a bill.
pub fn update_bill_status(
    conn: &Connection,
    bill_id: &Uuid,
    status: &BillStatus,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE medical_bills SET status = ?2 WHERE id = ?1",
        params![bill_id.to_string(), status.as_str()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Bill".into(),
            id: bill_id.to_string(),
        });
    }
    Ok(())
}

/// Get all bills matching a status, most recent upload first.
pub fn get_bills_by_status(
    conn: &Connection,
    status: &BillStatus,
) -> Result<Vec<Bill>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, source_file, status, patient_name, provider_name,
         service_date, account_number, total_charges, uploaded_at
         FROM medical_bills WHERE status = ?1 ORDER BY uploaded_at DESC",
    )?;

    let rows = stmt.query_map(params![status.as_str()], |row| {
        Ok(BillRow {
            id: row.get::<_, String>(0)?,
            source_file: row.get::<_, String>(1)?,
            status: row.get::<_, String>(2)?,
            patient_name: row.get::<_, Option<String>>(3)?,
            provider_name: row.get::<_, Option<String>>(4)?,
            service_date: row.get::<_, Option<String>>(5)?,
            account_number: row.get::<_, Option<String>>(6)?,
            total_charges: row.get::<_, f64>(7)?,
            uploaded_at: row.get::<_, String>(8)?,
        })
    })?;

    let mut bills = Vec::new();
    for row in rows {
        bills.push(bill_from_row(row?)?);
    }
    Ok(bills)
}

// Internal row type for Bill mapping
struct BillRow {
    id: String,
    source_file: String,
    status: String,
    patient_name: Option<String>,
    provider_name: Option<String>,
    service_date: Option<String>,
    account_number: Option<String>,
    total_charges: f64,
    uploaded_at: String,
}

fn bill_from_row(row: BillRow) -> Result<Bill, DatabaseError> {
    Ok(Bill {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        source_file: row.source_file,
        status: BillStatus::from_str(&row.status)?,
        patient_name: row.patient_name,
        provider_name: row.provider_name,
        service_date: row
            .service_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        account_number: row.account_number,
        total_charges: row.total_charges,
        uploaded_at: NaiveDateTime::parse_from_str(&row.uploaded_at, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&row.uploaded_at, "%Y-%m-%dT%H:%M:%S"))
            .unwrap_or_default(),
    })
}
