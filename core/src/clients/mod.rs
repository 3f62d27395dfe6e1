//! Partner client adapters.
//!
//! Each adapter owns one partner's authentication and transport quirks and
//! writes exactly one audit row per attempt, success or failure, before it
//! returns.

pub mod bss;
pub mod dbs;
pub mod sftp;
pub mod smf;
pub mod transport;

pub use bss::{BssClient, BssConfig, BssMockConfig, BssResponseStatus};
pub use dbs::{DbsClient, DbsConfig};
pub use sftp::{RemoteFiles, SftpAuth, SftpClient, SftpConfig};
pub use smf::{sign_request, SignedHeaders, SigningInput, SmfClient, SmfConfig};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, RequestBody};

use serde_json::{json, Value};

/// Result of a call on adapters that report failure in-band.
#[derive(Debug, Clone, PartialEq)]
pub enum PartnerOutcome {
    Body(Value),
    Failed { error: String },
}

impl PartnerOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Body(v) => Some(v),
            Self::Failed { .. } => None,
        }
    }

    /// Shape expected by older call sites: the body, or `{"error": "..."}`.
    pub fn into_legacy_json(self) -> Value {
        match self {
            Self::Body(v) => v,
            Self::Failed { error } => json!({ "error": error }),
        }
    }
}

/// Parse a response body; anything that is not JSON is kept as a string.
pub(crate) fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
