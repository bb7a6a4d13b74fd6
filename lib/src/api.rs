/// JSON bodies returned by the relay server.
use serde::{Deserialize, Serialize};

/// `{ok: true, id}` on success, `{ok: false, error}` on failure and a bare
/// `{ok: true}` for health checks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerResult {
    pub fn healthy() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn sent(id: String) -> Self {
        Self {
            ok: true,
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}
