/*!
This module defines the `Config` struct, which controls how the array engine runs its element-wise loops and formats text output. The active configuration is process-wide. Read it with [`config`](fn.config.html) and replace it with [`set_config`](fn.set_config.html).
*/

use anyhow::{format_err, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
	/// Allow conversions to split their work across the rayon thread pool. Defaults to true.
	pub parallel: Option<bool>,
	/// Regions with fewer elements than this are always converted on the calling thread. Defaults to 65536.
	pub parallel_min_size: Option<usize>,
	/// The number of workers a parallel conversion uses. Defaults to the size of the rayon thread pool.
	pub max_threads: Option<usize>,
	/// Written after every element by the text writer. Defaults to a tab.
	pub text_separator: Option<String>,
}

static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

/// Returns a copy of the active configuration.
pub fn config() -> Config {
	CONFIG.read().clone()
}

/// Replaces the active configuration.
pub fn set_config(config: Config) {
	*CONFIG.write() = config;
}

impl Config {
	pub fn from_json(json: &str) -> Result<Config> {
		let config = serde_json::from_str(json)?;
		Ok(config)
	}

	/// Read a `Config` from the JSON file at `path`.
	pub fn from_path(path: &Path) -> Result<Config> {
		let file = std::fs::File::open(path)
			.map_err(|error| format_err!("failed to open {}: {}", path.display(), error))?;
		let reader = std::io::BufReader::new(file);
		let config = serde_json::from_reader(reader)?;
		Ok(config)
	}

	pub fn parallel(&self) -> bool {
		self.parallel.unwrap_or(true)
	}

	pub fn parallel_min_size(&self) -> usize {
		self.parallel_min_size.unwrap_or(1 << 16)
	}

	pub fn max_threads(&self) -> usize {
		self.max_threads
			.unwrap_or_else(rayon::current_num_threads)
			.max(1)
	}

	pub fn text_separator(&self) -> &str {
		self.text_separator.as_deref().unwrap_or("\t")
	}

	/// The number of workers to convert a region of `size` elements with.
	pub fn workers_for(&self, size: isize) -> usize {
		if !self.parallel() || size < 0 || (size as usize) < self.parallel_min_size() {
			1
		} else {
			self.max_threads()
		}
	}
}

pub(crate) fn workers_for(size: isize) -> usize {
	CONFIG.read().workers_for(size)
}

pub(crate) fn text_separator() -> String {
	CONFIG.read().text_separator().to_owned()
}

#[test]
fn test_config_defaults() {
	let config = Config::default();
	assert!(config.parallel());
	assert_eq!(config.parallel_min_size(), 65536);
	assert_eq!(config.text_separator(), "\t");
	assert_eq!(config.workers_for(10), 1);
	assert!(config.max_threads() >= 1);
}

#[test]
fn test_config_from_json() {
	let config =
		Config::from_json(r#"{ "parallel": false, "text_separator": ",", "max_threads": 3 }"#)
			.unwrap();
	assert!(!config.parallel());
	assert_eq!(config.text_separator(), ",");
	assert_eq!(config.workers_for(1 << 20), 1);
	let config = Config::from_json(r#"{ "parallel_min_size": 4, "max_threads": 3 }"#).unwrap();
	assert_eq!(config.workers_for(3), 1);
	assert_eq!(config.workers_for(4), 3);
	assert!(Config::from_json(r#"{ "parallel": "yes" }"#).is_err());
}
