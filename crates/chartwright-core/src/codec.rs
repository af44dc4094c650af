//! Format codec seam.
//!
//! The engine only needs round-trip fidelity of the data model; the grammar of the persisted
//! format belongs to the codec. [`JsonCodec`] stores the model as-is.

use crate::error::{Error, Result};
use crate::model::Document;

pub trait DocumentCodec {
    fn encode(&self, doc: &Document) -> Result<String>;

    /// Parses persisted text. Structural invariants are checked by the caller.
    fn decode(&self, text: &str) -> Result<Document>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pub pretty: bool,
}

impl JsonCodec {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl DocumentCodec for JsonCodec {
    fn encode(&self, doc: &Document) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(doc)?
        } else {
            serde_json::to_string(doc)?
        };
        Ok(text)
    }

    fn decode(&self, text: &str) -> Result<Document> {
        serde_json::from_str(text).map_err(|e| Error::MalformedDocument {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_shapes() {
        let err = JsonCodec::default()
            .decode(r#"{"machines": {"m": {"nodes": {"a": {"position": "nope"}}}}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }), "{err}");
    }

    #[test]
    fn empty_object_is_an_empty_document() {
        let doc = JsonCodec::default().decode("{}").unwrap();
        assert!(doc.machines.is_empty());
    }
}
