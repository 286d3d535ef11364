//! Wire envelope for host-facing operations.

use serde::Serialize;

/// `{ code, msg, data?, err? }`. `code` is `1` on success, `0` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResponse<T> {
    pub code: u8,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl<T> ServiceResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 1,
            msg: "success".to_string(),
            data: Some(data),
            err: None,
        }
    }

    pub fn failure(err: impl ToString) -> Self {
        Self {
            code: 0,
            msg: "failed".to_string(),
            data: None,
            err: Some(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 1
    }
}

impl<T, E: ToString> From<Result<T, E>> for ServiceResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(e),
        }
    }
}

/// Payload of a listing response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryListingData<L> {
    pub lists: L,
}
