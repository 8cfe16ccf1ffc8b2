//! Upstream data access.

pub mod fetch;

pub use fetch::{Deadline, HtmlSource, HttpFetcher};

/// Borsa Italiana MOT listing of BTPs.
pub const DEFAULT_BTP_URL: &str = "https://www.borsaitaliana.it/borsa/obbligazioni/mot/btp/lista.html?lang=en";

/// Rendimenti.it BOT table.
pub const DEFAULT_BOT_URL: &str = "https://www.rendimenti.it/bot";
