//! Compile-time configuration constants.
//!
//! Central place for external endpoints, paging sizes, and the fallback
//! values the source adapters substitute for missing fields.

use std::time::Duration;

/// External endpoints.
pub mod api {
    use std::time::Duration;

    /// NASA OSDR REST API base URL (upstream of the proxy relay).
    pub const OSDR_API_BASE_URL: &str = "https://visualization.osdr.nasa.gov/biodata/api/v2";

    /// Canonical study landing page, used when a summary carries no REST URL.
    pub const OSDR_STUDY_REPO_URL: &str = "https://osdr.nasa.gov/bio/repo/data/studies";

    /// Default address of the local proxy relay.
    pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:5000";

    /// Default port the relay binds to.
    pub const DEFAULT_RELAY_PORT: u16 = 5000;

    /// Timeout for a single upstream/relay request.
    pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Origins allowed to call the relay from a browser. Requests without an
/// Origin header (curl, server-to-server) are not subject to CORS at all.
pub const ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "https://jxcorp.github.io",
];

/// Records revealed per page, and the "Load more" increment.
pub const PAGE_SIZE: usize = 10;

/// Quiet period after the last query/source change before refiltering.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// Substitute title when a journal row has none.
pub const FALLBACK_TITLE: &str = "N/A Title";

/// Substitute document link when a source has none.
pub const FALLBACK_LINK: &str = "#";

/// Publication date assigned to OSDR studies with no start date.
pub const FALLBACK_OSDR_DATE: &str = "2010-01-01";

/// Abstract placeholder for journal rows (the CSV carries no abstracts).
pub const JOURNAL_ABSTRACT_PLACEHOLDER: &str =
    "Journal article abstract not provided in CSV data.";
