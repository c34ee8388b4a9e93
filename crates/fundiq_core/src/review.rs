//! crates/fundiq_core/src/review.rs
//!
//! The data review surface for one document: rows are loaded once, then
//! searched, sorted and paginated in memory, or shown raw, or exported.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use tracing::error;

use crate::domain::{Document, ExtractedRow};
use crate::export::{self, Export, ExportFormat};
use crate::ports::DocumentStore;

pub const PAGE_SIZE: usize = 50;

//=========================================================================================
// Value Helpers
//=========================================================================================

/// The text a cell shows, searches on, and exports as. Missing and null are empty;
/// nested arrays and objects use their compact JSON text.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Union of all keys across the rows, in order of first appearance.
pub fn column_set(rows: &[ExtractedRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.raw_json.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Orders two cells. Nulls and missing values go last whichever the direction.
/// Numbers (and numeric strings) rank before text; numbers compare numerically
/// and text compares as text, so the order stays total on mixed columns.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(a), Some(b)) => (a, b),
    };

    let ordering = match (numeric_value(a), numeric_value(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => display_value(Some(a)).cmp(&display_value(Some(b))),
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

//=========================================================================================
// Review State
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Table,
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
enum LoadState {
    Loading,
    Failed(String),
    Loaded(Vec<ExtractedRow>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRow {
    pub row_index: i64,
    pub fields: Map<String, Value>,
}

/// One page of the filtered, sorted table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    /// Rows matching the search, across all pages.
    pub matching_rows: usize,
    pub loaded_rows: usize,
    pub columns: Vec<String>,
    pub search: String,
    pub sort: Option<SortSpec>,
    pub rows: Vec<PageRow>,
}

/// What the surface renders in place of its content area.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewContent {
    Loading,
    Error { message: String },
    NoData,
    Table(TablePage),
    Raw { columns: Vec<String>, json: String },
}

pub struct DataReview {
    document: Document,
    state: LoadState,
    columns: Vec<String>,
    search: String,
    sort: Option<SortSpec>,
    page: usize,
    mode: ViewMode,
}

impl DataReview {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            state: LoadState::Loading,
            columns: Vec::new(),
            search: String::new(),
            sort: None,
            page: 1,
            mode: ViewMode::Table,
        }
    }

    /// Creates the surface and loads the document's rows.
    pub async fn open(store: &dyn DocumentStore, document: Document) -> Self {
        let mut review = Self::new(document);
        review.load(store).await;
        review
    }

    pub async fn load(&mut self, store: &dyn DocumentStore) {
        self.state = LoadState::Loading;
        match store.list_extracted_rows(self.document.id).await {
            Ok(rows) => self.set_rows(rows),
            Err(e) => {
                error!(document_id = %self.document.id, "Failed to load rows: {}", e);
                self.columns.clear();
                self.state = LoadState::Failed(e.detail().to_string());
            }
        }
    }

    pub fn set_rows(&mut self, rows: Vec<ExtractedRow>) {
        self.columns = column_set(&rows);
        self.state = LoadState::Loaded(rows);
        self.page = 1;
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn rows(&self) -> &[ExtractedRow] {
        match &self.state {
            LoadState::Loaded(rows) => rows,
            _ => &[],
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    /// Changing the search always goes back to the first page.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.page = 1;
    }

    /// Header click: a new column sorts ascending, the same column flips direction.
    pub fn toggle_sort(&mut self, column: &str) {
        let direction = match &self.sort {
            Some(current) if current.column == column => current.direction.flipped(),
            _ => SortDirection::Asc,
        };
        self.sort_by(column, direction);
    }

    pub fn sort_by(&mut self, column: &str, direction: SortDirection) {
        self.sort = Some(SortSpec {
            column: column.to_string(),
            direction,
        });
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    fn matches(&self, row: &ExtractedRow, needle: &str) -> bool {
        row.raw_json
            .values()
            .any(|v| display_value(Some(v)).to_lowercase().contains(needle))
    }

    /// The searched and sorted rows, before pagination.
    pub fn filtered(&self) -> Vec<&ExtractedRow> {
        let needle = self.search.to_lowercase();
        let mut rows: Vec<&ExtractedRow> = self
            .rows()
            .iter()
            .filter(|row| needle.is_empty() || self.matches(row, &needle))
            .collect();

        if let Some(sort) = &self.sort {
            rows.sort_by(|a, b| {
                compare_values(
                    a.raw_json.get(&sort.column),
                    b.raw_json.get(&sort.column),
                    sort.direction,
                )
            });
        }
        rows
    }

    fn pages_for(count: usize) -> usize {
        count.div_ceil(PAGE_SIZE).max(1)
    }

    pub fn total_pages(&self) -> usize {
        Self::pages_for(self.filtered().len())
    }

    pub fn page(&self) -> usize {
        self.page.clamp(1, self.total_pages())
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    pub fn current_page(&self) -> TablePage {
        let filtered = self.filtered();
        let total_pages = Self::pages_for(filtered.len());
        let page = self.page.clamp(1, total_pages);
        let rows = filtered
            .iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|r| PageRow {
                row_index: r.row_index,
                fields: r.raw_json.clone(),
            })
            .collect();

        TablePage {
            page,
            total_pages,
            page_size: PAGE_SIZE,
            matching_rows: filtered.len(),
            loaded_rows: self.rows().len(),
            columns: self.columns.clone(),
            search: self.search.clone(),
            sort: self.sort.clone(),
            rows,
        }
    }

    /// The full row set, unfiltered and unsorted, pretty-printed.
    pub fn raw_view(&self) -> String {
        export::to_json(self.rows()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn content(&self) -> ReviewContent {
        match &self.state {
            LoadState::Loading => ReviewContent::Loading,
            LoadState::Failed(message) => ReviewContent::Error {
                message: message.clone(),
            },
            LoadState::Loaded(rows) if rows.is_empty() => ReviewContent::NoData,
            LoadState::Loaded(_) => match self.mode {
                ViewMode::Table => ReviewContent::Table(self.current_page()),
                ViewMode::Raw => ReviewContent::Raw {
                    columns: self.columns.clone(),
                    json: self.raw_view(),
                },
            },
        }
    }

    /// Exports every loaded row, ignoring search, sort and page.
    pub fn export(&self, format: ExportFormat) -> serde_json::Result<Export> {
        let body = match format {
            ExportFormat::Csv => export::to_csv(&self.columns, self.rows()),
            ExportFormat::Json => export::to_json(self.rows())?,
        };
        Ok(Export {
            file_name: export::export_file_name(&self.document.file_name, format),
            format,
            body,
        })
    }
}
