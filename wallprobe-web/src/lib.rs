//! Page acquisition for wallprobe.
//!
//! - Direct fetcher producing classified [`FetchResult`]s (`direct`)
//! - External browser probe bridge (`probe`)
//! - Keyword search collaborator that turns a phrase into target URLs (`search`)
//! - Lightweight HTML extraction (`extract`)
//!
//! Note: extraction is regex based and intentionally minimal; it yields
//! nothing on markup it does not recognise instead of failing.

pub mod direct;
pub mod extract;
pub mod probe;
pub mod search;
pub mod types;

pub use direct::{DirectFetcher, PageFetcher};
pub use probe::{BrowserProbe, ProbeCommand, ProbeError, ScriptProbe};
pub use search::{SearchProvider, SiteSearch};
pub use types::{ContentQuality, ExternalProbeResult, FetchResult};
