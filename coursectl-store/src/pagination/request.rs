//! Paged procedure requests
//!
//! A request names a server-side routine, the page wanted, an ordering hint
//! and an open-ended set of filters. Everything that would be spliced into
//! SQL text (procedure and parameter names) is validated here, before any
//! connection is leased.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::value::ScalarValue;
use crate::models::ValidationError;

pub const PAGE_NUMBER: &str = "pageNumber";
pub const PAGE_SIZE: &str = "pageSize";
pub const ORDERING_COLUMN: &str = "orderingColumn";
pub const TOTAL_RECORDS: &str = "totalRecords";
pub const TOTAL_PAGES: &str = "totalPages";
/// Cursor through which a procedure hands back its rows
pub const RESULT_SET: &str = "resultSet";

/// Parameter names a filter may not take (compared case-insensitively).
pub const RESERVED_PARAMETERS: [&str; 6] = [
    PAGE_NUMBER,
    PAGE_SIZE,
    ORDERING_COLUMN,
    TOTAL_RECORDS,
    TOTAL_PAGES,
    RESULT_SET,
];

/// Plain identifier: letter or underscore, then letters, digits, underscores.
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("invalid identifier regex"));

/// Routine name, optionally schema-qualified.
static PROCEDURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}(\.[A-Za-z_][A-Za-z0-9_]{0,62})?$")
        .expect("invalid procedure regex")
});

pub fn is_reserved(name: &str) -> bool {
    RESERVED_PARAMETERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Caller-supplied filters, bound as named parameters in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet(IndexMap<String, ScalarValue>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, rejecting bad, reserved or repeated names.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> Result<(), ValidationError> {
        let name = name.into();
        validate_filter_name(&name)?;
        if self.0.contains_key(&name) {
            return Err(ValidationError::DuplicateName { name });
        }
        self.0.insert(name, value.into());
        Ok(())
    }

    /// Builder form of [`FilterSet::insert`].
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> Result<Self, ValidationError> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Re-check every name. Covers sets built through `FromIterator`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.0.keys().try_for_each(|name| validate_filter_name(name))
    }
}

impl FromIterator<(String, ScalarValue)> for FilterSet {
    /// Later duplicates overwrite earlier ones; names are checked by
    /// `validate` when the request runs.
    fn from_iter<I: IntoIterator<Item = (String, ScalarValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn validate_filter_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Empty { field: "filter name" });
    }
    if !IDENTIFIER_RE.is_match(name) {
        return Err(ValidationError::InvalidFormat {
            field: "filter name",
            reason: "must be a plain identifier (letters, digits, underscores)",
        });
    }
    if is_reserved(name) {
        return Err(ValidationError::ReservedName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// One page of a named procedure's output
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationRequest {
    pub procedure: String,
    /// 1-based
    pub page_number: u32,
    pub page_size: u32,
    pub filters: FilterSet,
    /// Passed through to the procedure as-is
    pub ordering_column: Option<String>,
}

impl PaginationRequest {
    pub fn new(procedure: impl Into<String>, page_number: u32, page_size: u32) -> Self {
        Self {
            procedure: procedure.into(),
            page_number,
            page_size,
            filters: FilterSet::new(),
            ordering_column: None,
        }
    }

    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.ordering_column = Some(column.into());
        self
    }

    /// Everything checkable without the store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.procedure.is_empty() {
            return Err(ValidationError::Empty { field: "procedure name" });
        }
        if !PROCEDURE_RE.is_match(&self.procedure) {
            return Err(ValidationError::InvalidFormat {
                field: "procedure name",
                reason: "must be an identifier, optionally schema-qualified",
            });
        }
        check_page_bound("page number", self.page_number)?;
        check_page_bound("page size", self.page_size)?;
        self.filters.validate()
    }
}

/// Pages are bound as INTEGER, so they must also fit an i32.
fn check_page_bound(field: &'static str, value: u32) -> Result<(), ValidationError> {
    if value < 1 {
        return Err(ValidationError::OutOfRange {
            field,
            min: 1,
            value: value.into(),
        });
    }
    if i32::try_from(value).is_err() {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must fit a 32-bit signed integer",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_rejected_in_any_case() {
        for name in RESERVED_PARAMETERS {
            let err = FilterSet::new().with(name, 1_i64).unwrap_err();
            assert_eq!(err, ValidationError::ReservedName { name: name.to_string() });
        }

        let err = FilterSet::new().with("PAGESIZE", 1_i64).unwrap_err();
        assert!(matches!(err, ValidationError::ReservedName { .. }));
        let err = FilterSet::new().with("totalrecords", 1_i64).unwrap_err();
        assert!(matches!(err, ValidationError::ReservedName { .. }));
    }

    #[test]
    fn filter_names_must_be_identifiers() {
        assert!(FilterSet::new().with("title", "go").is_ok());
        assert!(FilterSet::new().with("instructor_id", "x").is_ok());

        for bad in ["", "1title", "title; DROP TABLE courses", "ti-tle", "\"title\""] {
            assert!(FilterSet::new().with(bad, "go").is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn duplicate_filter_is_rejected() {
        let err = FilterSet::new()
            .with("title", "go")
            .and_then(|f| f.with("title", "rust"))
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateName { name: "title".into() });
    }

    #[test]
    fn collected_filters_are_checked_at_validate() {
        let filters: FilterSet = vec![("pageNumber".to_string(), ScalarValue::Int(2))]
            .into_iter()
            .collect();
        let request = PaginationRequest::new("usp_ListCourses", 1, 10).filters(filters);
        assert!(matches!(
            request.validate(),
            Err(ValidationError::ReservedName { .. })
        ));
    }

    #[test]
    fn filters_keep_insertion_order() {
        let filters = FilterSet::new()
            .with("title", "go")
            .and_then(|f| f.with("instructorId", ScalarValue::Null))
            .and_then(|f| f.with("active", true))
            .unwrap();
        let names: Vec<&str> = filters.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["title", "instructorId", "active"]);
    }

    #[test]
    fn page_bounds() {
        let ok = PaginationRequest::new("usp_ListCourses", 1, 1);
        assert!(ok.validate().is_ok());

        let err = PaginationRequest::new("usp_ListCourses", 0, 10)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutOfRange { field: "page number", min: 1, value: 0 }
        );

        let err = PaginationRequest::new("usp_ListCourses", 1, 0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "page size", .. }));

        let err = PaginationRequest::new("usp_ListCourses", u32::MAX, 10)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { field: "page number", .. }));
    }

    #[test]
    fn procedure_names() {
        for good in ["usp_list_courses", "catalog.usp_ListCourses", "usp_ListCourses"] {
            assert!(PaginationRequest::new(good, 1, 10).validate().is_ok(), "{good}");
        }
        for bad in ["", "usp list", "usp_list();--", "a.b.c", ".usp"] {
            assert!(PaginationRequest::new(bad, 1, 10).validate().is_err(), "{bad}");
        }
    }
}
