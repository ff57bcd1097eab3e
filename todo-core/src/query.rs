use std::fmt;
use std::str::FromStr;

use crate::models::{TodoPriority, TodoStatus};

/// The fixed set of sortable fields. Client-facing names map to storage
/// columns here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueDate,
    Title,
    Status,
    Priority,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::DueDate,
        SortField::Title,
        SortField::Status,
        SortField::Priority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::DueDate => "dueDate",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::DueDate => "due_date",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
        }
    }

    /// Unrecognized names fall back to `createdAt`.
    pub fn from_name(name: &str) -> Self {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Parses `field:direction`. Never fails: unknown fields sort by
    /// `createdAt`, unknown or missing directions sort descending.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return SortSpec::default();
        }
        let (field, direction) = match raw.split_once(':') {
            Some((field, direction)) => (field.trim(), direction.trim()),
            None => (raw, ""),
        };
        SortSpec {
            field: SortField::from_name(field),
            direction: SortDirection::from_name(direction),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field.as_str(), self.direction.as_str())
    }
}

/// A membership filter over one enumerated field. `Any` places no
/// restriction; `OneOf` with an empty set matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter<T> {
    Any,
    OneOf(Vec<T>),
}

impl<T> Default for FieldFilter<T> {
    fn default() -> Self {
        FieldFilter::Any
    }
}

impl<T: FromStr + PartialEq> FieldFilter<T> {
    /// Parses a comma-separated list. Unknown values are dropped, so a list
    /// made only of unknown values still restricts (to nothing).
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return FieldFilter::Any;
        };
        let mut values = Vec::new();
        for value in raw.split(',').filter_map(|part| part.trim().parse::<T>().ok()) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        FieldFilter::OneOf(values)
    }

    pub fn matches(&self, value: &T) -> bool {
        match self {
            FieldFilter::Any => true,
            FieldFilter::OneOf(values) => values.contains(value),
        }
    }
}

/// Everything the list operation needs, already normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoQuery {
    pub status: FieldFilter<TodoStatus>,
    pub priority: FieldFilter<TodoPriority>,
    pub search: Option<String>,
    pub sort: SortSpec,
}

impl TodoQuery {
    pub fn from_params(
        status: Option<&str>,
        priority: Option<&str>,
        search: Option<&str>,
        sort: Option<&str>,
    ) -> Self {
        Self {
            status: FieldFilter::parse(status),
            priority: FieldFilter::parse(priority),
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sort: sort.map(SortSpec::parse).unwrap_or_default(),
        }
    }
}

/// Escapes `LIKE` metacharacters so the search text matches literally.
/// Pairs with `ESCAPE '\'`.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
