use thiserror::Error as ThisError;

///
/// QueryError
///
/// Every failure the engine can surface. Transport and decoding failures carry
/// the remote status and body verbatim so callers can tell an authorization
/// failure apart from a malformed query.
///

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum QueryError {
    #[error("cannot compile {node_kind} node into a filter clause")]
    CompileUnsupported { node_kind: &'static str },

    #[error("cannot evaluate {node_kind} node against a record")]
    EvaluationUnsupported { node_kind: &'static str },

    #[error("transport failure (status {status}): {body}")]
    TransportFailure { status: u16, body: String },

    #[error("malformed page body: {0}")]
    Decode(String),

    #[error("entity '{entity}' has no identity key")]
    MissingKey { entity: String },

    #[error("query cancelled")]
    Cancelled,
}
