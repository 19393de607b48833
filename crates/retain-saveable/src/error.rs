use thiserror::Error;

/// Failure produced by a [`Saver`](crate::saver::Saver) before any key
/// context is attached.
#[derive(Debug, Error)]
pub enum SaverError {
    #[error("serialization failed for {type_name}: {source}")]
    Serialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Custom(String),
}

/// Failure while collecting or persisting saveable state.
///
/// Saving is all-or-nothing: when any variant below is returned, nothing
/// was written to the store.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The produced representation is not storable by the active backend.
    #[error(
        "cannot save `{key}`: the active store cannot hold this {kind} value; \
         provide a custom Saver that maps it to a storable shape"
    )]
    Unstorable { key: String, kind: &'static str },

    /// The saver itself failed to produce a representation.
    #[error("cannot save `{key}`: {source}; provide a custom Saver for this type")]
    Saver {
        key: String,
        #[source]
        source: SaverError,
    },
}

pub(crate) fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
