//! Diesel and pool error mapping shared by every repository.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// Map pool errors to repository connection errors.
pub(crate) fn map_pool_error(error: PoolError) -> RepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to repository errors.
///
/// Unique violations keep the constraint name so services can translate them
/// into the right conflict message. Everything else is redacted to a generic
/// message; the detail is only logged.
pub(crate) fn map_diesel_error(error: DieselError) -> RepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            RepositoryError::duplicate_key(info.constraint_name().unwrap_or("unknown"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::connection("database connection error")
        }
        DieselError::NotFound => RepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RepositoryError::query("database query error"),
        _ => RepositoryError::query("database error"),
    }
}

/// Row offset for a page, saturating at the column range.
pub(crate) fn offset(page: crate::domain::ports::PageRequest) -> i64 {
    i64::try_from(page.offset()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug)]
    struct Info(Option<&'static str>);

    impl diesel::result::DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.0
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[rstest]
    fn unique_violations_keep_the_constraint_name() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(Info(Some("tours_name_key"))),
        );
        assert_eq!(
            map_diesel_error(err),
            RepositoryError::duplicate_key("tours_name_key")
        );
    }

    #[rstest]
    fn closed_connections_map_to_connection_errors() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new(Info(None)),
        );
        assert!(matches!(
            map_diesel_error(err),
            RepositoryError::Connection { .. }
        ));
    }

    #[rstest]
    fn other_failures_are_redacted_query_errors() {
        assert_eq!(
            map_diesel_error(DieselError::NotFound),
            RepositoryError::query("record not found")
        );
        assert_eq!(
            map_diesel_error(DieselError::RollbackTransaction),
            RepositoryError::query("database error")
        );
    }

    #[rstest]
    fn pool_failures_are_connection_errors() {
        assert_eq!(
            map_pool_error(PoolError::checkout("timed out")),
            RepositoryError::connection("timed out")
        );
    }
}
