//! Fictional templates and signer data for the reference lifecycle.
//!
//! Nothing here is a real document renderer. `render_document` produces a
//! stable byte string so hashing and tampering behave as they would on a PDF.

use std::collections::BTreeMap;

use crate::embedder::Signer;

// ── Templates (mock) ─────────────────────────────────────────────────────────

pub const SERVICE_AGREEMENT_TEMPLATE_ID: u64 = 12;

pub const SERVICE_AGREEMENT_TEMPLATE: &str = "\
SERVICE AGREEMENT

Between {{provider_name}} (the Provider) and {{client_name}} (the Client).

1. Scope. The Provider delivers {{service_description}}.
2. Fee. The Client pays {{fee}} per month.
3. Term. This agreement starts on {{start_date}} and runs for twelve months.
";

/// Replace every `{{key}}` with its HTML-escaped value.
///
/// Placeholders without a value are left in place.
pub fn replace_variables(content: &str, variables: &BTreeMap<String, String>) -> String {
    variables.iter().fold(content.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{}}}}}", key), &escape_html(value))
    })
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Wrap rendered text in a minimal PDF-like envelope.
pub fn render_document(content: &str) -> Vec<u8> {
    format!("%PDF-1.7\n%% signflow reference render\n{}\n%%EOF\n", content).into_bytes()
}

// ── Signers and variables (mock) ─────────────────────────────────────────────

pub fn sample_variables() -> BTreeMap<String, String> {
    [
        ("provider_name", "Northwind Consulting Ltd"),
        ("client_name", "Ada Lovelace"),
        ("service_description", "quarterly infrastructure reviews"),
        ("fee", "EUR 1,200"),
        ("start_date", "2025-04-01"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn sample_signer() -> Signer {
    Signer {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        consent: true,
        consent_timestamp: Some("2025-04-01T10:15:00Z".to_string()),
    }
}

/// A tiny base64 PNG data URL, as posted by the signature pad.
pub const SAMPLE_SIGNATURE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
