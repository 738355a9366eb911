use std::collections::HashMap;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Deserialize;

/**
 * Identity the database assigns to a diner.
 */
pub type DinerId = i64;

/**
 * Review scores in the order quality, price, service, location, ambience.
 * `None` means not rated.
 */
pub type ReviewVector = [Option<Decimal>; 5];

/**
 * Price as it appears in the source, either `"150.000đ"` or `150000`. Anything else lands in
 * `Other` and is rejected when normalized.
 */
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawPrice {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

/**
 * One scraped diner file.
 */
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DinerRecord {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    pub price_min: RawPrice,
    pub price_max: RawPrice,
    #[serde(default)]
    pub website: Option<String>,
    /**
     * Single key maps of review label to score.
     */
    #[serde(rename = "review_point")]
    pub review_point: Vec<HashMap<String, serde_json::Value>>,
    /**
     * Opening shifts as `HH:MM-HH:MM`. Entries are checked one by one when loaded.
     */
    #[serde(rename = "Time", default)]
    pub time: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub menu: Option<MenuRecord>,
}

impl DinerRecord {
    /**
     * Raw shift entries, empty when `Time` is missing or null.
     */
    pub fn shifts(&self) -> &[serde_json::Value] {
        self.time.as_deref().unwrap_or_default()
    }

    /**
     * Menu items of the record, or `None` when the menu, its data or its items are missing.
     */
    pub fn menu_items(&self) -> Option<&[MenuItemRecord]> {
        self.menu.as_ref().and_then(|menu| menu.data.as_deref()).filter(|items| !items.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuRecord {
    #[serde(default)]
    pub data: Option<Vec<MenuItemRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemRecord {
    pub name: String,
    /**
     * `None` when the price is missing or null.
     */
    #[serde(default)]
    pub price: Option<RawPrice>,
    #[serde(default)]
    pub details: Option<String>,
}

/**
 * Normalized diner ready for insert.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct DinerInputType {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub price_min: i64,
    pub price_max: i64,
    pub website: Option<String>,
    pub review: ReviewVector,
}

/**
 * Normalized menu item ready for insert.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemInputType {
    pub diner_id: DinerId,
    pub name: String,
    pub price: i64,
    pub details: Option<String>,
}

/**
 * Normalized opening shift ready for insert.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimetableInputType {
    pub diner_id: DinerId,
    pub time_start: NaiveTime,
    pub time_close: NaiveTime,
}

/**
 * What happened to a single source file.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /**
     * Diner inserted. Some shifts or menu items may have been skipped.
     */
    Done(FileReport),
    /**
     * Nothing inserted for this file.
     */
    Skipped,
}

/**
 * Counts for one ingested file.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileReport {
    pub diner_id: DinerId,
    pub shifts_inserted: usize,
    pub shifts_skipped: usize,
    pub menu_items_inserted: usize,
    pub menu_items_skipped: usize,
    pub missing_menu: bool,
}

/**
 * Counters over a run of files.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionStats {
    pub files: usize,
    pub diners: usize,
    pub files_skipped: usize,
    pub shifts_inserted: usize,
    pub shifts_skipped: usize,
    pub menu_items_inserted: usize,
    pub menu_items_skipped: usize,
    pub diners_without_menu: usize,
    pub batches_missing: usize,
}

impl IngestionStats {
    /**
     * Adds the outcome of one file.
     */
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files += 1;
        match outcome {
            FileOutcome::Done(report) => {
                self.diners += 1;
                self.shifts_inserted += report.shifts_inserted;
                self.shifts_skipped += report.shifts_skipped;
                self.menu_items_inserted += report.menu_items_inserted;
                self.menu_items_skipped += report.menu_items_skipped;
                if report.missing_menu {
                    self.diners_without_menu += 1;
                }
            }
            FileOutcome::Skipped => self.files_skipped += 1,
        }
    }

    /**
     * Adds the counters of another run.
     */
    pub fn merge(&mut self, other: &IngestionStats) {
        self.files += other.files;
        self.diners += other.diners;
        self.files_skipped += other.files_skipped;
        self.shifts_inserted += other.shifts_inserted;
        self.shifts_skipped += other.shifts_skipped;
        self.menu_items_inserted += other.menu_items_inserted;
        self.menu_items_skipped += other.menu_items_skipped;
        self.diners_without_menu += other.diners_without_menu;
        self.batches_missing += other.batches_missing;
    }
}
