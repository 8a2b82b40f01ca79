//! Inputs and outputs of the document rendering pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engineer::EngineerId;

/// Everything collected during an interview, ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedProposal {
    /// Flat field id -> content mapping: proposal and info fields, plus one
    /// entry per linked engineer keyed by engineer id holding their rate.
    pub fields: BTreeMap<String, String>,
    /// Linked engineers in link order.
    pub engineers: Vec<ProposalEngineer>,
}

/// A linked engineer as seen by the document template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalEngineer {
    pub id: EngineerId,
    pub name: String,
    /// Registry fields (position, experience, photo path...).
    pub details: BTreeMap<String, String>,
    pub rate: Option<String>,
}

/// A rendered proposal document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub filename: String,
    pub mime_type: String,
    /// Document bytes; base64 when serialized.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_document_bytes_are_base64_in_json() {
        let doc = RenderedDocument {
            filename: "proposal.html".to_string(),
            mime_type: "text/html".to_string(),
            bytes: b"<html></html>".to_vec(),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("PGh0bWw+PC9odG1sPg=="));

        let parsed: RenderedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.bytes, b"<html></html>");
    }
}
