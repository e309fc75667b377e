use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::registrant::{Registrant, Status};

/// Page sizes the table offers.
pub const PAGE_SIZES: [usize; 5] = [10, 20, 30, 40, 50];

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// The composite name column; its match target is the space-joined
/// full name, so a search hits first, middle, last name and suffix.
pub const NAME_COLUMN: &str = "name";

/// Columns hidden until the admin toggles them on.
const DEFAULT_HIDDEN: [&str; 3] = ["scholarship_type", "course", "region"];

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// The single active sort column. Multi-column sort is not supported.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize)]
pub struct SortSpec {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Orderable projection of one column value. Variants never mix within
/// a sort because each column projects to exactly one of them.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug)]
enum SortKey {
    Flag(bool),
    Text(String),
    Time(DateTime<Utc>),
}

/// A table column described as data, so the engine can filter, sort and
/// hide generically without per-column branching.
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub searchable: bool,
    pub hidable: bool,
    accessor: fn(&Registrant) -> String,
    sort_key: fn(&Registrant) -> SortKey,
}

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        key: NAME_COLUMN,
        label: "Name",
        searchable: true,
        hidable: false,
        accessor: |r| r.full_name(),
        sort_key: |r| SortKey::Text(r.full_name()),
    },
    ColumnSpec {
        key: "email",
        label: "Email",
        searchable: true,
        hidable: true,
        accessor: |r| r.email.clone().unwrap_or_default(),
        sort_key: |r| SortKey::Text(r.email.clone().unwrap_or_default()),
    },
    ColumnSpec {
        key: "contact_number",
        label: "Contact",
        searchable: true,
        hidable: true,
        accessor: |r| r.contact_number.clone(),
        sort_key: |r| SortKey::Text(r.contact_number.clone()),
    },
    ColumnSpec {
        key: "region",
        label: "Region",
        searchable: true,
        hidable: true,
        accessor: |r| r.region.as_str().to_string(),
        sort_key: |r| SortKey::Text(r.region.as_str().to_string()),
    },
    ColumnSpec {
        key: "university",
        label: "University",
        searchable: true,
        hidable: true,
        accessor: |r| r.university.clone(),
        sort_key: |r| SortKey::Text(r.university.clone()),
    },
    ColumnSpec {
        key: "course",
        label: "Course",
        searchable: true,
        hidable: true,
        accessor: |r| r.course.clone(),
        sort_key: |r| SortKey::Text(r.course.clone()),
    },
    ColumnSpec {
        key: "scholarship_type",
        label: "Scholarship Type",
        searchable: true,
        hidable: true,
        accessor: |r| r.scholarship_type.clone().unwrap_or_default(),
        sort_key: |r| SortKey::Text(r.scholarship_type.clone().unwrap_or_default()),
    },
    ColumnSpec {
        key: "status",
        label: "Status",
        searchable: false,
        hidable: true,
        accessor: |r| r.status.display().to_string(),
        sort_key: |r| SortKey::Text(r.status.as_str().to_string()),
    },
    ColumnSpec {
        key: "is_checked_in",
        label: "Check-in",
        searchable: false,
        hidable: true,
        accessor: |r| if r.is_checked_in { "Yes" } else { "No" }.to_string(),
        sort_key: |r| SortKey::Flag(r.is_checked_in),
    },
    ColumnSpec {
        key: "remarks",
        label: "Remarks",
        searchable: false,
        hidable: true,
        accessor: |r| r.remarks.clone().unwrap_or_default(),
        sort_key: |r| SortKey::Text(r.remarks.clone().unwrap_or_default()),
    },
    ColumnSpec {
        key: "created_at",
        label: "Registered",
        searchable: false,
        hidable: true,
        accessor: |r| r.created_at.to_rfc3339(),
        sort_key: |r| SortKey::Time(r.created_at),
    },
];

pub fn column(key: &str) -> Option<&'static ColumnSpec> {
    COLUMNS.iter().find(|c| c.key == key)
}

/// Declarative state of the registrant table: search, filters, sort,
/// visibility, selection and pagination over one server snapshot.
///
/// The snapshot itself is never mutated here; every view is derived.
pub struct TableState {
    snapshot: Vec<Registrant>,
    sort: Option<SortSpec>,
    search_column: &'static str,
    search_value: String,
    status_filter: Option<Status>,
    check_in_filter: Option<bool>,
    hidden_columns: HashSet<&'static str>,
    selection: HashSet<i64>,
    page_index: usize,
    page_size: usize,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new()
    }
}

impl TableState {
    pub fn new() -> Self {
        TableState {
            snapshot: vec![],
            sort: None,
            search_column: NAME_COLUMN,
            search_value: String::new(),
            status_filter: None,
            check_in_filter: None,
            hidden_columns: DEFAULT_HIDDEN.iter().cloned().collect(),
            selection: HashSet::new(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn snapshot(&self) -> &[Registrant] {
        &self.snapshot
    }

    pub fn find(&self, id: i64) -> Option<&Registrant> {
        self.snapshot.iter().find(|r| r.id == id)
    }

    /// Swaps in a freshly fetched snapshot. The selection is cleared,
    /// and the page index is clamped back into the new filtered range.
    pub fn replace_snapshot(&mut self, snapshot: Vec<Registrant>) {
        self.snapshot = snapshot;
        self.selection.clear();
        self.clamp_page();
    }

    /// Switching the search target always starts a fresh search.
    pub fn set_search_column(&mut self, key: &str) -> Result<(), Error> {
        let column = column(key)
            .filter(|c| c.searchable)
            .ok_or_else(|| Error::UnknownColumn(key.to_string()))?;
        self.search_column = column.key;
        self.search_value.clear();
        self.clamp_page();
        Ok(())
    }

    pub fn search_column(&self) -> &'static str {
        self.search_column
    }

    pub fn search_value(&self) -> &str {
        &self.search_value
    }

    pub fn set_search(&mut self, value: &str) {
        self.search_value = value.to_string();
        self.clamp_page();
    }

    /// `None` is the "all" sentinel: the predicate is removed entirely.
    pub fn set_status_filter(&mut self, status: Option<Status>) {
        self.status_filter = status;
        self.clamp_page();
    }

    pub fn set_check_in_filter(&mut self, checked_in: Option<bool>) {
        self.check_in_filter = checked_in;
        self.clamp_page();
    }

    /// Repeated toggles on one column cycle ascending, descending, none.
    /// Toggling a different column starts over at ascending.
    pub fn toggle_sort(&mut self, key: &str) -> Result<(), Error> {
        let column = column(key).ok_or_else(|| Error::UnknownColumn(key.to_string()))?;
        self.sort = match self.sort {
            Some(spec) if spec.column == column.key => match spec.direction {
                SortDirection::Ascending => Some(SortSpec {
                    column: column.key,
                    direction: SortDirection::Descending,
                }),
                SortDirection::Descending => None,
            },
            _ => Some(SortSpec {
                column: column.key,
                direction: SortDirection::Ascending,
            }),
        };
        Ok(())
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// Column visibility is a rendering concern only; hidden columns
    /// still participate in search, sort and counting.
    pub fn toggle_column(&mut self, key: &str) -> Result<(), Error> {
        let column = column(key)
            .filter(|c| c.hidable)
            .ok_or_else(|| Error::UnknownColumn(key.to_string()))?;
        if !self.hidden_columns.remove(column.key) {
            self.hidden_columns.insert(column.key);
        }
        Ok(())
    }

    pub fn is_column_visible(&self, key: &str) -> bool {
        !self.hidden_columns.contains(key)
    }

    pub fn visible_columns(&self) -> Vec<&'static str> {
        COLUMNS
            .iter()
            .map(|c| c.key)
            .filter(|key| !self.hidden_columns.contains(key))
            .collect()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changing the page size always returns to the first page.
    pub fn set_page_size(&mut self, size: usize) -> Result<(), Error> {
        if !PAGE_SIZES.contains(&size) {
            return Err(Error::Validation(format!("unsupported page size {}", size)));
        }
        self.page_size = size;
        self.page_index = 0;
        Ok(())
    }

    pub fn set_page(&mut self, index: usize) {
        self.page_index = index;
        self.clamp_page();
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page_index + 1);
    }

    pub fn previous_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    pub fn page_count(&self) -> usize {
        self.filtered_rows().len().div_ceil(self.page_size)
    }

    pub fn toggle_select(&mut self, id: i64) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selection.contains(&id)
    }

    /// "Select all" means all rows matching the current filters, not
    /// every row ever fetched.
    pub fn select_all(&mut self) {
        self.selection = self.filtered_rows().iter().map(|r| r.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected ids restricted to the current filtered rows, in
    /// filtered order. This is what batch actions operate on.
    pub fn selected_ids(&self) -> Vec<i64> {
        self.filtered_rows()
            .iter()
            .map(|r| r.id)
            .filter(|id| self.selection.contains(id))
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected_ids().len()
    }

    fn matches(&self, registrant: &Registrant) -> bool {
        if let Some(status) = self.status_filter {
            if registrant.status != status {
                return false;
            }
        }
        if let Some(checked_in) = self.check_in_filter {
            if registrant.is_checked_in != checked_in {
                return false;
            }
        }
        if !self.search_value.is_empty() {
            // Case-insensitive substring match on the search column.
            let Some(column) = column(self.search_column) else {
                return false;
            };
            let haystack = (column.accessor)(registrant).to_lowercase();
            if !haystack.contains(&self.search_value.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Snapshot rows matching all active predicates, sorted per the
    /// current sort spec. Filters AND together.
    pub fn filtered_rows(&self) -> Vec<&Registrant> {
        let mut rows: Vec<&Registrant> =
            self.snapshot.iter().filter(|r| self.matches(r)).collect();

        if let Some(spec) = self.sort {
            if let Some(column) = column(spec.column) {
                rows.sort_by_key(|r| (column.sort_key)(r));
                if spec.direction == SortDirection::Descending {
                    rows.reverse();
                }
            }
        }

        rows
    }

    /// The single page-sized window of filtered rows currently shown.
    pub fn visible_rows(&self) -> Vec<&Registrant> {
        let rows = self.filtered_rows();
        rows.into_iter()
            .skip(self.page_index * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Keeps the page index inside the valid range of the filtered set.
    fn clamp_page(&mut self) {
        let last = self.page_count().saturating_sub(1);
        if self.page_index > last {
            self.page_index = last;
        }
    }
}
