use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use itertools::Itertools;
use tracing::{debug, info};

use crate::chart::escape_xml;

pub const INDEX_FILE: &str = "index.html";
const TITLE_FORMAT: &str = " %Y %b %d %H:%M:%S";

fn is_svg(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "svg")
}

fn svg_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Could not list {}", dir.display()))?;
    let mut paths = vec![];
    for entry in entries {
        let path = entry?.path();
        if is_svg(&path) {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// Removes every `*.svg` file in `dir`, returning how many were deleted.
pub fn clean_charts(dir: &Path) -> Result<usize> {
    let paths = svg_paths(dir)?;
    for path in &paths {
        std::fs::remove_file(path)
            .with_context(|| format!("Could not remove {}", path.display()))?;
        debug!("Removed {}", path.display());
    }
    Ok(paths.len())
}

/// File names of the charts in `dir`, sorted.
pub fn list_charts(dir: &Path) -> Result<Vec<String>> {
    Ok(svg_paths(dir)?
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .sorted()
        .collect())
}

pub fn render_index(title: &str, charts: &[String]) -> String {
    let mut html = String::new();
    html.push_str(r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#);
    html.push_str(r#"<html xmlns="http://www.w3.org/1999/xhtml"><head>"#);
    html.push_str(r#"<meta http-equiv="Content-Type" content="text/html; charset=utf-8" />"#);
    html.push_str(&format!("<title>{}</title>", escape_xml(title)));
    html.push_str("</head><body>");
    for chart in charts {
        let src = escape_xml(&format!("./{}", chart));
        html.push_str(&format!(
            r#"<object type="image/svg+xml" data="{src}"><param name="src" value="{src}" /></object>"#
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Writes `index.html` embedding every chart currently in `dir`.
pub fn write_index(dir: &Path) -> Result<PathBuf> {
    let charts = list_charts(dir)?;
    let title = Local::now().format(TITLE_FORMAT).to_string();
    let path = dir.join(INDEX_FILE);
    std::fs::write(&path, render_index(&title, &charts))
        .with_context(|| format!("Could not write {}", path.display()))?;
    info!("Index with {} charts written to {}", charts.len(), path.display());
    Ok(path)
}
