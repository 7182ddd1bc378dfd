// Utility functions
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Shortens a title to `max` characters, marking the cut with "...".
pub fn truncate_title(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

/// Saves the fetched HTML of a site whose extraction failed, for selector debugging.
pub fn save_debug_html(log_dir: &Path, site: &str, html: &str) -> Option<PathBuf> {
    let folder = log_dir.join("html");
    if let Err(e) = fs::create_dir_all(&folder) {
        warn!("Failed to create debug folder: {}", e);
        return None;
    }
    let slug: String = site
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let filename = folder.join(format!("debug-{}.html", slug));
    if let Err(e) = fs::write(&filename, html) {
        warn!("Failed to write debug HTML: {}", e);
        return None;
    }
    info!("Saved debug HTML: {}", filename.display());
    Some(filename)
}
