//! Paged procedure calls
//!
//! Runs `CALL procedure(name => value, ...)` with the caller's filters and
//! the paging parameters, then drains the procedure's result cursor. Both
//! statements share one transaction on one leased connection, because a
//! PostgreSQL cursor only lives as long as its transaction.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, PgConnection, Postgres, Row};
use tracing::{debug, info, instrument, warn};

use super::request::{
    FilterSet, PaginationRequest, ORDERING_COLUMN, PAGE_NUMBER, PAGE_SIZE, RESULT_SET,
    TOTAL_PAGES, TOTAL_RECORDS,
};
use super::result::{page_count, PaginationResult};
use super::value::{decode_column, Record, ScalarValue};
use crate::db::ConnectionManager;
use crate::error::{QueryResultExt, Result};

/// Executes paged procedures through the connection manager it is given.
pub struct PaginationExecutor<'a> {
    connections: &'a ConnectionManager,
}

impl<'a> PaginationExecutor<'a> {
    pub fn new(connections: &'a ConnectionManager) -> Self {
        Self { connections }
    }

    /// Fetch one page.
    ///
    /// The request is validated before a connection is leased. The lease is
    /// released whether the call succeeds or fails, and a failed call never
    /// returns partial rows.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for bad names, reserved filter names or page bounds
    /// - `ConnectionUnavailable` when no connection can be leased
    /// - `QueryExecutionFailed` when the call, the cursor fetch or a column
    ///   decode fails
    #[instrument(
        skip_all,
        fields(
            procedure = %request.procedure,
            page = request.page_number,
            size = request.page_size
        )
    )]
    pub async fn paginate(&self, request: &PaginationRequest) -> Result<PaginationResult> {
        request.validate()?;
        let statement = call_statement(&request.procedure, &request.filters);
        debug!(%statement, filters = request.filters.len(), "calling paged procedure");

        let mut lease = self.connections.acquire().await?;
        let outcome = match lease.connection() {
            Ok(conn) => run(conn, request, &statement).await.during(&request.procedure),
            Err(e) => Err(e),
        };
        self.connections.release(&mut lease);

        match &outcome {
            Ok(result) => info!(
                rows = result.records.len(),
                total_records = result.total_records,
                total_pages = result.total_pages,
                "page fetched"
            ),
            Err(e) => warn!(error = %e, "paged procedure failed"),
        }
        outcome
    }
}

/// Free-function form taking the connection manager explicitly.
pub async fn paginate(
    connections: &ConnectionManager,
    procedure: &str,
    page_number: u32,
    page_size: u32,
    filters: FilterSet,
    ordering_column: Option<&str>,
) -> Result<PaginationResult> {
    let mut request = PaginationRequest::new(procedure, page_number, page_size).filters(filters);
    request.ordering_column = ordering_column.map(str::to_owned);
    PaginationExecutor::new(connections).paginate(&request).await
}

async fn run(
    conn: &mut PgConnection,
    request: &PaginationRequest,
    statement: &str,
) -> std::result::Result<PaginationResult, sqlx::Error> {
    let mut tx = conn.begin().await?;

    // Bounds were checked by validate(); both fit an i32.
    let mut query = sqlx::query(statement)
        .bind(request.page_number as i32)
        .bind(request.page_size as i32)
        .bind(request.ordering_column.as_deref());
    for (_, value) in request.filters.iter() {
        query = bind_scalar(query, value);
    }

    let outputs = query.fetch_one(&mut *tx).await?;
    let total_records = output_count(&outputs, TOTAL_RECORDS)?;
    let total_pages = output_count(&outputs, TOTAL_PAGES)?;

    // refcursor has text's wire format but not its type oid
    let cursor: Option<String> = outputs.try_get_unchecked(RESULT_SET)?;
    let cursor = cursor.ok_or_else(|| missing_output(RESULT_SET))?;

    let fetch = format!("FETCH ALL FROM {}", quote_identifier(&cursor));
    let rows = sqlx::query(&fetch).fetch_all(&mut *tx).await?;
    let records = rows
        .iter()
        .map(Record::from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    tx.commit().await?;

    let expected_pages = page_count(total_records, request.page_size);
    if total_pages != expected_pages {
        warn!(
            total_records,
            total_pages, expected_pages, "procedure page count disagrees with ceil(total / size)"
        );
    }

    Ok(PaginationResult {
        records,
        total_records,
        total_pages,
    })
}

/// Render the CALL statement.
///
/// Placeholders `$1..$3` are page number, page size and ordering column;
/// non-null filters follow in insertion order. Null filters are written as
/// a literal `NULL` so the procedure's declared parameter type applies.
pub(crate) fn call_statement(procedure: &str, filters: &FilterSet) -> String {
    let mut args = vec![
        format!("{} => $1", quote_identifier(PAGE_NUMBER)),
        format!("{} => $2", quote_identifier(PAGE_SIZE)),
        format!("{} => $3", quote_identifier(ORDERING_COLUMN)),
        format!("{} => NULL", quote_identifier(TOTAL_RECORDS)),
        format!("{} => NULL", quote_identifier(TOTAL_PAGES)),
        format!("{} => NULL", quote_identifier(RESULT_SET)),
    ];

    let mut placeholder = 4;
    for (name, value) in filters.iter() {
        if value.is_null() {
            args.push(format!("{} => NULL", quote_identifier(name)));
        } else {
            args.push(format!("{} => ${}", quote_identifier(name), placeholder));
            placeholder += 1;
        }
    }

    format!("CALL {}({})", procedure, args.join(", "))
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Integers go over as INTEGER when they fit, so they match both INTEGER
/// and BIGINT parameters.
fn bind_scalar<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q ScalarValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        ScalarValue::Null => query,
        ScalarValue::Bool(v) => query.bind(*v),
        ScalarValue::Int(v) => match i32::try_from(*v) {
            Ok(narrow) => query.bind(narrow),
            Err(_) => query.bind(*v),
        },
        ScalarValue::Float(v) => query.bind(*v),
        ScalarValue::Decimal(v) => query.bind(*v),
        ScalarValue::Text(v) => query.bind(v.as_str()),
        ScalarValue::Uuid(v) => query.bind(*v),
        ScalarValue::Date(v) => query.bind(*v),
        ScalarValue::Timestamp(v) => query.bind(*v),
        ScalarValue::TimestampTz(v) => query.bind(*v),
    }
}

fn output_count(outputs: &PgRow, name: &str) -> std::result::Result<i64, sqlx::Error> {
    let index = outputs.try_column(name)?.ordinal();
    let value = decode_column(outputs, index)?;
    if value.is_null() {
        return Err(missing_output(name));
    }
    value.as_i64().ok_or_else(|| sqlx::Error::ColumnDecode {
        index: name.to_owned(),
        source: format!("expected an integer output, got {}", value).into(),
    })
}

fn missing_output(name: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: name.to_owned(),
        source: "procedure left this output parameter NULL".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::unreachable_manager;
    use crate::error::CatalogError;
    use crate::models::ValidationError;

    #[test]
    fn call_statement_without_filters() {
        let sql = call_statement("usp_ListCourses", &FilterSet::new());
        assert_eq!(
            sql,
            "CALL usp_ListCourses(\"pageNumber\" => $1, \"pageSize\" => $2, \
             \"orderingColumn\" => $3, \"totalRecords\" => NULL, \"totalPages\" => NULL, \
             \"resultSet\" => NULL)"
        );
    }

    #[test]
    fn call_statement_numbers_only_bound_filters() {
        let filters = FilterSet::new()
            .with("title", "go")
            .and_then(|f| f.with("instructorId", ScalarValue::Null))
            .and_then(|f| f.with("minPrice", 10_i64))
            .unwrap();
        let sql = call_statement("catalog.usp_ListCourses", &filters);

        assert!(sql.starts_with("CALL catalog.usp_ListCourses("));
        assert!(sql.contains("\"title\" => $4"));
        assert!(sql.contains("\"instructorId\" => NULL"));
        assert!(sql.contains("\"minPrice\" => $5"));
        assert!(!sql.contains("$6"));
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_identifier("pageSize"), "\"pageSize\"");
        assert_eq!(
            quote_identifier("<unnamed portal 1>"),
            "\"<unnamed portal 1>\""
        );
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn reserved_filter_fails_before_touching_the_store() {
        // The store is unreachable: reaching it would surface as
        // ConnectionUnavailable instead of InvalidRequest.
        let manager = unreachable_manager();
        let filters: FilterSet = vec![("totalPages".to_string(), ScalarValue::Int(1))]
            .into_iter()
            .collect();

        let err = paginate(&manager, "usp_ListCourses", 1, 10, filters, Some("title"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::InvalidRequest(ValidationError::ReservedName { .. })
        ));
        assert_eq!(manager.outstanding(), 0);
    }

    #[tokio::test]
    async fn zero_page_size_fails_before_touching_the_store() {
        let manager = unreachable_manager();
        let request = PaginationRequest::new("usp_ListCourses", 1, 0);

        let err = PaginationExecutor::new(&manager)
            .paginate(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unreachable_store_surfaces_connection_unavailable() {
        let manager = unreachable_manager();
        let request = PaginationRequest::new("usp_ListCourses", 1, 10).order_by("title");

        let err = PaginationExecutor::new(&manager)
            .paginate(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ConnectionUnavailable { .. }));
        assert_eq!(manager.outstanding(), 0);
    }
}
