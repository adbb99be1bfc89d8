//! Statistics from the tender database

use crate::storage::{StorageResult, StoreStats, TenderStore};

/// Loads row counts from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStats)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the store
pub fn load_statistics(store: &dyn TenderStore) -> StorageResult<StoreStats> {
    store.stats()
}

/// Average number of child rows per tender, 0 for an empty store
fn per_tender(count: u64, tenders: u64) -> f64 {
    if tenders > 0 {
        count as f64 / tenders as f64
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStats) {
    println!("=== Tender Statistics ===\n");

    println!("Stored:");
    println!("  Tenders: {}", stats.tenders);
    println!(
        "  Items: {} ({:.1} per tender)",
        stats.items,
        per_tender(stats.items, stats.tenders)
    );
    println!(
        "  Notice documents: {} ({:.1} per tender)",
        stats.documents,
        per_tender(stats.documents, stats.tenders)
    );
}
