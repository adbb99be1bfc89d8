//! Listing of stored tenders

use crate::storage::TenderRecord;

/// Formats one stored tender as a single line
pub fn format_tender_line(record: &TenderRecord) -> String {
    let tender = &record.tender;
    format!(
        "#{} {} | {} | {} | {} | captured {}",
        record.id,
        tender.external_id,
        tender.header.status,
        tender.header.issuing_body,
        tender.total_estimated_value,
        tender.captured_at.format("%Y-%m-%d %H:%M")
    )
}

/// Prints stored tenders, newest capture first
pub fn print_tenders(records: &[TenderRecord]) {
    println!("=== Stored Tenders ({}) ===\n", records.len());
    for record in records {
        println!("{}", format_tender_line(record));
        println!("    {}", record.tender.url);
    }
}
