use crate::error::QueryError;
use serde::Deserialize;
use serde_json::Value;

/// One decoded response page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page {
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
    #[serde(rename = "value")]
    pub records: Vec<Value>,
    #[serde(rename = "@odata.count", default)]
    pub total_count: Option<u64>,
}

impl Page {
    /// Malformed bodies fail as a whole; no partial page is salvaged.
    pub fn decode(body: &[u8]) -> Result<Self, QueryError> {
        serde_json::from_slice(body).map_err(|e| QueryError::Decode(e.to_string()))
    }

    /// Continuation token for the next request, if any.
    pub fn continuation(&self) -> Option<&str> {
        self.next_link.as_deref().filter(|link| !link.is_empty())
    }

    pub fn is_last(&self) -> bool {
        self.continuation().is_none()
    }
}
