//! Response envelope builders.

use serde_json::{json, Value};

use crate::error::Error;

/// `{"data": data}`
pub fn data_response(data: Value) -> Value {
    json!({ "data": data })
}

/// A response carrying one GraphQL error and no data.
pub fn error_response(message: &str) -> Value {
    json!({ "data": null, "errors": [{ "message": message }] })
}

/// One page of a paginated root field, with paginator info.
pub fn page_response(root: &str, items: Vec<Value>, current_page: u32, last_page: u32) -> Value {
    json!({
        "data": {
            root: {
                "data": items,
                "paginatorInfo": {
                    "currentPage": current_page,
                    "lastPage": last_page,
                }
            }
        }
    })
}

/// A connection-level failure.
pub fn transport_failure() -> Error {
    Error::Transport {
        message: "connection reset by peer".into(),
        timed_out: false,
    }
}

/// A non-2xx response.
pub fn protocol_failure(status: u16) -> Error {
    Error::Protocol {
        status: Some(status),
        message: format!("HTTP status {status}"),
    }
}
