use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{CodeType, FlagSeverity, FlagType};
use crate::models::LineItem;

pub fn insert_line_items(conn: &Connection, items: &[LineItem]) -> Result<(), DatabaseError> {
    for item in items {
        conn.execute(
            "INSERT INTO bill_line_items (id, bill_id, description, code, code_type,
             quantity, charge_amount, flag_type, flag_severity, flag_explanation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.id.to_string(),
                item.bill_id.to_string(),
                item.description,
                item.code,
                item.code_type.as_ref().map(|t| t.as_str()),
                item.quantity as i64,
                item.charge_amount,
                item.flag_type.as_ref().map(|t| t.as_str()),
                item.flag_severity.as_ref().map(|s| s.as_str()),
                item.flag_explanation,
            ],
        )?;
    }
    Ok(())
}

/// Get a bill's line items in their original encounter order.
pub fn get_line_items(conn: &Connection, bill_id: &Uuid) -> Result<Vec<LineItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, description, code, code_type,
         quantity, charge_amount, flag_type, flag_severity, flag_explanation
         FROM bill_line_items WHERE bill_id = ?1 ORDER BY rowid",
    )?;

    let rows = stmt.query_map(params![bill_id.to_string()], map_line_item_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(line_item_from_row(row?)?);
    }
    Ok(items)
}

/// Get only the line items a validation pass has flagged.
pub fn get_flagged_line_items(
    conn: &Connection,
    bill_id: &Uuid,
) -> Result<Vec<LineItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, description, code, code_type,
         quantity, charge_amount, flag_type, flag_severity, flag_explanation
         FROM bill_line_items WHERE bill_id = ?1 AND flag_type IS NOT NULL ORDER BY rowid",
    )?;

    let rows = stmt.query_map(params![bill_id.to_string()], map_line_item_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(line_item_from_row(row?)?);
    }
    Ok(items)
}

/// Write a validation flag back onto every line item of a bill that
/// carries the given code. Returns the number of rows annotated.
pub fn annotate_flag(
    conn: &Connection,
    bill_id: &Uuid,
    code: &str,
    flag_type: &FlagType,
    severity: &FlagSeverity,
    explanation: &str,
) -> Result<usize, DatabaseError> {
    let rows = conn.execute(
        "UPDATE bill_line_items SET flag_type = ?3, flag_severity = ?4, flag_explanation = ?5
         WHERE bill_id = ?1 AND code = ?2",
        params![
            bill_id.to_string(),
            code,
            flag_type.as_str(),
            severity.as_str(),
            explanation,
        ],
    )?;
    Ok(rows)
}

// Internal row type for LineItem mapping
struct LineItemRow {
    id: String,
    bill_id: String,
    description: String,
    code: Option<String>,
    code_type: Option<String>,
    quantity: i64,
    charge_amount: f64,
    flag_type: Option<String>,
    flag_severity: Option<String>,
    flag_explanation: Option<String>,
}

fn map_line_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LineItemRow> {
    Ok(LineItemRow {
        id: row.get::<_, String>(0)?,
        bill_id: row.get::<_, String>(1)?,
        description: row.get::<_, String>(2)?,
        code: row.get::<_, Option<String>>(3)?,
        code_type: row.get::<_, Option<String>>(4)?,
        quantity: row.get::<_, i64>(5)?,
        charge_amount: row.get::<_, f64>(6)?,
        flag_type: row.get::<_, Option<String>>(7)?,
        flag_severity: row.get::<_, Option<String>>(8)?,
        flag_explanation: row.get::<_, Option<String>>(9)?,
    })
}

fn line_item_from_row(row: LineItemRow) -> Result<LineItem, DatabaseError> {
    Ok(LineItem {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        bill_id: Uuid::parse_str(&row.bill_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        description: row.description,
        code: row.code,
        code_type: row
            .code_type
            .map(|t| CodeType::from_str(&t))
            .transpose()?,
        quantity: row.quantity as u32,
        charge_amount: row.charge_amount,
        flag_type: row
            .flag_type
            .map(|t| FlagType::from_str(&t))
            .transpose()?,
        flag_severity: row
            .flag_severity
            .map(|s| FlagSeverity::from_str(&s))
            .transpose()?,
        flag_explanation: row.flag_explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::bill::insert_bill;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Bill;

    fn seeded_bill(conn: &Connection) -> Bill {
        let bill = Bill::new("statement.pdf");
        insert_bill(conn, &bill).unwrap();
        bill
    }

    #[test]
    fn insert_and_get_preserves_order() {
        let conn = open_memory_database().unwrap();
        let bill = seeded_bill(&conn);

        let mut first = LineItem::new(bill.id, "Office visit", Some("99213".into()));
        first.code_type = Some(CodeType::Cpt);
        first.charge_amount = 150.0;
        let mut second = LineItem::new(bill.id, "CT scan", Some("74177".into()));
        second.code_type = Some(CodeType::Cpt);
        second.charge_amount = 400.0;

        insert_line_items(&conn, &[first.clone(), second.clone()]).unwrap();

        let items = get_line_items(&conn, &bill.id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, first.id);
        assert_eq!(items[1].id, second.id);
        assert_eq!(items[0].code_type, Some(CodeType::Cpt));
        assert_eq!(items[1].charge_amount, 400.0);
    }

    #[test]
    fn annotate_flag_updates_matching_code() {
        let conn = open_memory_database().unwrap();
        let bill = seeded_bill(&conn);

        let item = LineItem::new(bill.id, "Office visit", Some("99213".into()));
        insert_line_items(&conn, &[item]).unwrap();

        let rows = annotate_flag(
            &conn,
            &bill.id,
            "99213",
            &FlagType::Overcharge,
            &FlagSeverity::High,
            "226% above benchmark",
        )
        .unwrap();
        assert_eq!(rows, 1);

        let items = get_line_items(&conn, &bill.id).unwrap();
        assert_eq!(items[0].flag_type, Some(FlagType::Overcharge));
        assert_eq!(items[0].flag_severity, Some(FlagSeverity::High));
        assert_eq!(
            items[0].flag_explanation.as_deref(),
            Some("226% above benchmark")
        );
    }

    #[test]
    fn annotate_flag_unmatched_code_touches_nothing() {
        let conn = open_memory_database().unwrap();
        let bill = seeded_bill(&conn);

        let item = LineItem::new(bill.id, "Office visit", Some("99213".into()));
        insert_line_items(&conn, &[item]).unwrap();

        let rows = annotate_flag(
            &conn,
            &bill.id,
            "99999",
            &FlagType::InvalidCode,
            &FlagSeverity::Medium,
            "not found",
        )
        .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn flagged_items_filter() {
        let conn = open_memory_database().unwrap();
        let bill = seeded_bill(&conn);

        let clean = LineItem::new(bill.id, "Lab panel", Some("80053".into()));
        let flagged = LineItem::new(bill.id, "Office visit", Some("99213".into()));
        insert_line_items(&conn, &[clean, flagged]).unwrap();
        annotate_flag(
            &conn,
            &bill.id,
            "99213",
            &FlagType::Duplicate,
            &FlagSeverity::High,
            "billed twice",
        )
        .unwrap();

        let items = get_flagged_line_items(&conn, &bill.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code.as_deref(), Some("99213"));
    }

    #[test]
    fn item_without_code_round_trips() {
        let conn = open_memory_database().unwrap();
        let bill = seeded_bill(&conn);

        let item = LineItem::new(bill.id, "Medical Services", None);
        insert_line_items(&conn, &[item]).unwrap();

        let items = get_line_items(&conn, &bill.id).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].code.is_none());
        assert!(items[0].code_type.is_none());
        assert_eq!(items[0].quantity, 1);
    }
}
