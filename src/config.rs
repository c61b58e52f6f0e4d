use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ReleaseNotifierError, Result};
use crate::format::is_valid_identifier;
use crate::types::{normalize_identifier, ConfigRules};

/// On-disk shape of the formatting config.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFile {
    #[serde(default, alias = "specialItems")]
    special_items: Vec<String>,
    #[serde(default, alias = "showGlyphs")]
    show_glyphs: bool,
}

/// Loads formatting rules from a TOML file, or JSON when the extension is `.json`.
pub fn load_rules(path: &Path) -> Result<ConfigRules> {
    let content = fs::read_to_string(path)?;
    let invalid = |message: String| ReleaseNotifierError::Config {
        path: path.to_path_buf(),
        message,
    };

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let file: RulesFile = if is_json {
        serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?
    } else {
        toml::from_str(&content).map_err(|e| invalid(e.to_string()))?
    };

    let mut rules = ConfigRules::with_special_items(&file.special_items);
    rules.show_glyphs = file.show_glyphs;
    debug!(special = rules.special_items.len(), "loaded formatting rules");
    Ok(rules)
}

/// Parses a repository list: one `owner/name` per line, `#` starts a comment.
///
/// Duplicates are dropped, keeping the first occurrence.
pub fn parse_repo_list(path: &Path, content: &str) -> Result<Vec<String>> {
    let mut repos: Vec<String> = Vec::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let repo = normalize_identifier(line);
        if !is_valid_identifier(&repo) {
            return Err(ReleaseNotifierError::Config {
                path: path.to_path_buf(),
                message: format!("line {}: invalid repository '{}'", number + 1, line),
            });
        }
        if !repos.contains(&repo) {
            repos.push(repo);
        }
    }

    Ok(repos)
}

/// Reads and parses a repository list file.
pub fn load_repo_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    parse_repo_list(path, &content)
}

/// Writes a repository list in the format [`load_repo_list`] reads back.
pub fn write_repo_list(path: &Path, repos: &[String]) -> Result<()> {
    let mut content = repos.join("\n");
    content.push('\n');
    fs::write(path, content)?;
    debug!(count = repos.len(), path = %path.display(), "wrote repository list");
    Ok(())
}
