//! Signature embedding seam.
//!
//! Rendering a signature into a PDF is outside the ledger. The lifecycle
//! only needs the signed bytes back, or a coded failure it can record.

use serde::{Deserialize, Serialize};

use signflow_contracts::error::{SignflowError, SignflowResult};

/// Who signed, as submitted with the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub name: String,
    pub email: String,
    pub consent: bool,
    /// Client-side time the consent box was ticked, passed through as-is.
    pub consent_timestamp: Option<String>,
}

impl Signer {
    /// A signer who gave consent, without a consent timestamp.
    pub fn consenting(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            consent: true,
            consent_timestamp: None,
        }
    }
}

/// Produces the signed document from the unsigned one.
///
/// Failures should be `SignflowError::SignatureRejected` so the code can be
/// recorded in the ledger; other errors are recorded as `embed_failed`.
pub trait SignatureEmbedder: Send + Sync {
    fn embed(&self, unsigned: &[u8], signature: &str, signer: &Signer) -> SignflowResult<Vec<u8>>;
}

/// Appends a plain-text signature block to the document.
///
/// `signature` is expected to be a `data:image/png;base64,...` URL as sent by
/// the signing page; only its length is stamped.
#[derive(Debug, Default, Clone, Copy)]
pub struct StampEmbedder;

impl SignatureEmbedder for StampEmbedder {
    fn embed(&self, unsigned: &[u8], signature: &str, signer: &Signer) -> SignflowResult<Vec<u8>> {
        let Some(encoded) = signature.strip_prefix("data:image/png;base64,") else {
            return Err(SignflowError::SignatureRejected {
                code: "invalid_signature_format".to_string(),
                reason: "signature must be a base64 PNG data URL".to_string(),
            });
        };
        if encoded.is_empty() {
            return Err(SignflowError::SignatureRejected {
                code: "invalid_signature_format".to_string(),
                reason: "signature image is empty".to_string(),
            });
        }

        let mut signed = unsigned.to_vec();
        signed.extend_from_slice(
            format!(
                "\n%% signature block\n%% signed-by: {} <{}>\n%% image-bytes: {}\n",
                signer.name,
                signer.email,
                encoded.len()
            )
            .as_bytes(),
        );
        Ok(signed)
    }
}
