use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rows per page when no snapshot exists.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Column every sewer-connection table sorts by on first mount.
pub const DEFAULT_SORT_FIELD: &str = "matriculaImovel";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Grid sort order: `1` is ascending, anything else descending.
    pub fn from_sort_order(order: i32) -> Self {
        if order == 1 {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }
}

/// Page-size option as persisted by the table-state store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSize {
    pub valor: u32,
}

/// Persisted table state, one per screen table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableStateSnapshot {
    pub has_data: bool,
    pub selected_page: Option<u32>,
    pub page_size: PageSize,
}

/// Pagination and sort state of one table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableQueryState {
    pub page: u32,
    pub page_size: u32,
    pub sort_field: String,
    pub sort_direction: SortDirection,
}

impl Default for TableQueryState {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_direction: SortDirection::Desc,
        }
    }
}

impl TableQueryState {
    /// Restore page and page size from a snapshot; sorting is not persisted.
    pub fn restore(&mut self, snapshot: &TableStateSnapshot) {
        if !snapshot.has_data {
            return;
        }
        self.page = snapshot.selected_page.unwrap_or(0);
        self.page_size = snapshot.page_size.valor.max(1);
    }

    /// Apply a user interaction. A page-size change returns to the first page.
    pub fn apply(&mut self, query: &TableQuery) {
        if let Some(ref field) = query.sort_field {
            self.sort_field = field.clone();
        }
        if let Some(order) = query.sort_order {
            self.sort_direction = SortDirection::from_sort_order(order);
        }
        match query.size {
            Some(size) if size != self.page_size => {
                self.page_size = size;
                self.page = 0;
            }
            _ => {}
        }
        if let Some(page) = query.page {
            self.page = page;
        }
    }

    pub fn snapshot(&self) -> TableStateSnapshot {
        TableStateSnapshot {
            has_data: true,
            selected_page: Some(self.page),
            page_size: PageSize {
                valor: self.page_size,
            },
        }
    }

    /// Offset of the first row on the current page.
    pub fn first_row(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }

    /// Backend paging parameters: `page`, `size`, `sort=<field>,<ASC|DESC>`.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("size", self.page_size.to_string()),
            ("sort", format!("{},{}", self.sort_field, self.sort_direction)),
        ]
    }
}

/// Query-string form of a table interaction.
///
/// Only page and page size are persisted between requests. Sorting is not:
/// a query without `sortField`/`sortOrder` sorts by `matriculaImovel` DESC,
/// so clients resend both on every page change of a sorted table.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    #[garde(range(max = 100_000))]
    pub page: Option<u32>,

    #[garde(range(min = 1, max = 500))]
    pub size: Option<u32>,

    #[garde(length(min = 1, max = 100), pattern(r"^[A-Za-z][A-Za-z0-9_]*$"))]
    pub sort_field: Option<String>,

    #[garde(skip)]
    pub sort_order: Option<i32>,
}
