//! Conversions from external infrastructure errors into domain errors.

use liefclock_domain::LiefClockError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LiefClockError);

impl From<InfraError> for LiefClockError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LiefClockError> for InfraError {
    fn from(value: LiefClockError) -> Self {
        InfraError(value)
    }
}

trait IntoLiefClockError {
    fn into_liefclock(self) -> LiefClockError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → LiefClockError */
/* -------------------------------------------------------------------------- */

impl IntoLiefClockError for SqlError {
    fn into_liefclock(self) -> LiefClockError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => LiefClockError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        LiefClockError::Storage("database is locked".into())
                    }
                    ErrorCode::DiskFull => LiefClockError::Storage("storage quota exceeded".into()),
                    ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                        LiefClockError::Storage(format!("database is corrupted: {message}"))
                    }
                    ErrorCode::ReadOnly => LiefClockError::Storage("database is read-only".into()),
                    _ => LiefClockError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => LiefClockError::Storage("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                LiefClockError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                LiefClockError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => LiefClockError::Storage(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => LiefClockError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_liefclock())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → LiefClockError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(LiefClockError::Storage(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → LiefClockError */
/* -------------------------------------------------------------------------- */

impl IntoLiefClockError for HttpError {
    fn into_liefclock(self) -> LiefClockError {
        if self.is_timeout() {
            return LiefClockError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return LiefClockError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                408 | 429 => LiefClockError::Network(message),
                400..=499 => LiefClockError::ServerRejection(message),
                _ => LiefClockError::Network(message),
            };
        }

        if self.is_decode() {
            return LiefClockError::ServerRejection(format!("malformed response: {self}"));
        }

        LiefClockError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_liefclock())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
