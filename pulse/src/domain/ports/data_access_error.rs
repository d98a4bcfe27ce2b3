//! Error taxonomy shared by every data repository port.

use crate::domain::Error;

use super::define_port_error;

define_port_error! {
    /// Failures raised by backend data adapters.
    pub enum DataAccessError {
        /// The backend could not be reached or timed out.
        Connection { message: String } => "backend connection failed: {message}",
        /// The request reached the backend but failed or returned rows that
        /// could not be decoded.
        Query { message: String } => "backend query failed: {message}",
        /// The backend refused the write on permission or validation grounds.
        Rejected { message: String } => "backend rejected the request: {message}",
        /// A uniqueness constraint was violated.
        Conflict { message: String } => "uniqueness conflict: {message}",
    }
}

impl DataAccessError {
    /// Whether the failure is a uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<DataAccessError> for Error {
    fn from(value: DataAccessError) -> Self {
        match value {
            DataAccessError::Connection { message } => {
                Error::service_unavailable(format!("backend unavailable: {message}"))
            }
            DataAccessError::Query { message } => {
                Error::internal(format!("backend query failed: {message}"))
            }
            DataAccessError::Rejected { message } => {
                Error::forbidden(format!("backend rejected the request: {message}"))
            }
            DataAccessError::Conflict { message } => {
                Error::conflict(format!("uniqueness conflict: {message}"))
            }
        }
    }
}
