//! Configuration and path resolution for the CLI.
//!
//! Handles the data directory, the database file inside it, the optional
//! JSON retrieval config, and reading documents into pages.

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use lodestone_core::chunking::Page;
use lodestone_core::config::RetrievalConfig;
use std::path::{Path, PathBuf};

/// Database file name
const DATABASE_FILENAME: &str = "chunks.redb";

/// Separates pages in plain-text input.
const PAGE_SEPARATOR: char = '\x0c';

/// Returns the data directory.
///
/// - macOS: `~/Library/Application Support/dev.lodestone.Lodestone/`
/// - Linux: `~/.local/share/lodestone/`
/// - Windows: `%APPDATA%\lodestone\Lodestone\data\`
pub fn get_data_dir(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.clone());
    }

    ProjectDirs::from("dev", "lodestone", "Lodestone")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Returns the path to the database file, creating its directory.
pub fn database_path(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let data_dir = get_data_dir(custom_dir)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join(DATABASE_FILENAME))
}

/// Loads the retrieval config from a JSON file, or the defaults.
pub fn load_retrieval_config(path: Option<&Path>) -> Result<RetrievalConfig> {
    let Some(path) = path else {
        return Ok(RetrievalConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    RetrievalConfig::from_json_str(&json)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Splits text into pages on form feeds, numbering from 1.
pub fn split_pages(text: &str) -> Vec<Page> {
    text.split(PAGE_SEPARATOR)
        .enumerate()
        .map(|(i, page)| Page::new(i as u32 + 1, page))
        .collect()
}

/// Reads a plain-text document into pages.
pub fn read_pages(path: &Path) -> Result<Vec<Page>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    Ok(split_pages(&text))
}
