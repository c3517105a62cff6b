//! Configuration module for Site-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Recrawl every {} days", config.schedule.interval_days);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlConfig, ExtractionConfig, OutputConfig, ScheduleConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

use crate::url::Boundary;

impl Config {
    /// The crawl boundary described by this configuration
    pub fn boundary(&self) -> Boundary {
        Boundary::new(&self.crawl.boundary_host)
            .with_allowed_paths(self.crawl.allowed_paths.iter().cloned())
    }
}
