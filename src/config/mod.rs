//! Configuration loading, parsing and validation
//!
//! # Example
//!
//! ```no_run
//! use regcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("regcrawl.toml")).unwrap();
//! for source in config.active_sources() {
//!     println!("{} -> {}", source.id, source.url);
//! }
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, ExtractorConfig, OutputConfig, Source, UserAgentConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate_seed_url, validate_selectors, MAX_CONCURRENCY};
