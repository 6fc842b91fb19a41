pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod kind;
pub mod path_map;
pub mod result;
pub mod rewrite;
pub mod store;
pub mod stylesheet;

pub use config::MirrorConfig;
pub use crawler::{CrawlSession, Mirror, ProgressCallback, ResultCallback};
pub use error::{MirrorError, Result};
pub use fetch::{Fetch, Fetched, HttpFetcher};
pub use kind::ResourceKind;
pub use path_map::MirrorLayout;
pub use result::{MirrorResult, Outcome};
pub use rewrite::ContentRewriter;
pub use store::{ResourceStore, SaveOutcome};
