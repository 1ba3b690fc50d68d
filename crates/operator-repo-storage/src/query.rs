//! Query types shared by all storage backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Name of the identifier field inside the document store.
pub const ID_FIELD: &str = "_id";

/// Conjunction of optional predicates over stored operators.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorFilter {
    /// `_id` is one of these ids.
    pub ids: Option<Vec<String>>,
    /// `userId` equals this identity.
    pub owner: Option<String>,
    /// `pub == true` OR `userId` equals this identity.
    pub visible_to: Option<String>,
    /// Unanchored regular expression matched against `name`.
    pub name_pattern: Option<String>,
}

impl OperatorFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches a single id.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            ids: Some(vec![id.into()]),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn visible_to(mut self, caller: impl Into<String>) -> Self {
        self.visible_to = Some(caller.into());
        self
    }

    #[must_use]
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Signed form used by document stores (`1` / `-1`).
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Primary sort key of a listing, parsed from `field[:asc|desc]`.
///
/// Backends always append `_id` ascending as the tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Field name as stored; the public alias `id` maps to `_id`.
    #[must_use]
    pub fn store_field(&self) -> &str {
        if self.field == "id" {
            ID_FIELD
        } else {
            &self.field
        }
    }

    /// Returns `true` when the primary key already is the id tie-break.
    #[must_use]
    pub fn is_id(&self) -> bool {
        self.store_field() == ID_FIELD
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new("name", SortDirection::Asc)
    }
}

impl FromStr for SortSpec {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, dir)) => {
                let direction = match dir {
                    "asc" => SortDirection::Asc,
                    "desc" => SortDirection::Desc,
                    other => {
                        return Err(StorageError::invalid_query(format!(
                            "sort direction must be 'asc' or 'desc', got '{other}'"
                        )));
                    }
                };
                (field, direction)
            }
            None => (s, SortDirection::Asc),
        };

        if field.is_empty() {
            return Err(StorageError::invalid_query("sort field must not be empty"));
        }
        if field.starts_with('$') {
            return Err(StorageError::invalid_query(format!(
                "sort field '{field}' is not allowed"
            )));
        }

        Ok(Self::new(field, direction))
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction)
    }
}

/// Sort and pagination options for `find`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    pub sort: SortSpec,
    /// Number of matches to skip.
    pub skip: u64,
    /// Maximum number of matches to return; `0` means no limit.
    pub limit: u64,
}

impl FindOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// `limit` as an optional bound.
    #[must_use]
    pub fn effective_limit(&self) -> Option<u64> {
        (self.limit > 0).then_some(self.limit)
    }
}
