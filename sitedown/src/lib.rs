pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    bootstrap_root, load_urls_from_file, load_urls_from_source, parse_mirror_args, parse_url_line,
};

// Re-export mirror functionality from sitedown-core
pub use sitedown_core::mirror::{
    MirrorOptions, MirrorProgressCallback, execute_mirror, extract_url_path,
};
