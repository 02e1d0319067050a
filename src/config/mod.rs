//! Configuration module for the comics crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use comics_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("comics.toml")).unwrap();
//! println!("Starting from: {:?}", config.spider.start_urls);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ContractConfig, CrawlerConfig, SpiderConfig, StoreConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
