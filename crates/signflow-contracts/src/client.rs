//! Request-side client context captured with every audit entry.

use serde::{Deserialize, Serialize};

/// Proxy headers consulted for the client IP, highest priority first.
///
/// The direct remote address is used only when none of these carry a
/// non-empty value.
pub const DEFAULT_IP_HEADERS: &[&str] = &[
    "client-ip",
    "x-forwarded-for",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// Default bound on the stored user agent, in characters.
pub const DEFAULT_USER_AGENT_MAX_CHARS: usize = 500;

/// Best-effort identity of whoever triggered an event.
///
/// Both fields are optional; events raised by background jobs carry neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    /// A context with no client information (cron jobs, CLI tools).
    pub fn system() -> Self {
        Self::default()
    }

    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: non_empty(ip.into()),
            user_agent: non_empty(user_agent.into()),
        }
    }

    /// Build a context from request headers and the socket peer address.
    ///
    /// Header names are matched case-insensitively. The IP is the first
    /// non-empty value among `ip_headers` (in order), then `remote_addr`.
    /// The user agent is taken from `User-Agent` as-is; truncation happens
    /// when the ledger records it.
    pub fn from_request<'a, I>(headers: I, remote_addr: Option<&str>, ip_headers: &[String]) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let headers: Vec<(String, &str)> = headers
            .into_iter()
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim()))
            .collect();

        let lookup = |wanted: &str| -> Option<String> {
            let wanted = wanted.to_ascii_lowercase();
            headers
                .iter()
                .find(|(name, value)| *name == wanted && !value.is_empty())
                .map(|(_, value)| value.to_string())
        };

        let ip = ip_headers
            .iter()
            .find_map(|header| lookup(header.as_str()))
            .or_else(|| remote_addr.map(str::trim).and_then(|a| non_empty(a.to_string())));

        Self {
            ip,
            user_agent: lookup("user-agent"),
        }
    }

    /// The user agent cut to at most `max_chars` characters.
    pub fn truncated_user_agent(&self, max_chars: usize) -> Option<String> {
        self.user_agent
            .as_deref()
            .map(|ua| ua.chars().take(max_chars).collect())
    }
}

/// The default header priority list as owned strings.
pub fn default_ip_headers() -> Vec<String> {
    DEFAULT_IP_HEADERS.iter().map(|h| h.to_string()).collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
