//! Tesseract binary discovery
//!
//! Order: configured path, `PATH`, platform fallback list, then a bounded walk
//! of the configured search roots. First hit wins.

use crate::config::Settings;
use crate::error::{GraderError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[cfg(windows)]
pub const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
pub const TESSERACT_EXE: &str = "tesseract";

const SCAN_MAX_DEPTH: usize = 5;

/// Well-known install locations for the current platform.
pub fn fallback_candidates() -> Vec<PathBuf> {
    let list: &[&str] = if cfg!(windows) {
        &[
            r"C:\Program Files\Tesseract-OCR\tesseract.exe",
            r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/opt/homebrew/bin/tesseract",
            "/usr/local/bin/tesseract",
            "/opt/local/bin/tesseract",
        ]
    } else {
        &[
            "/usr/bin/tesseract",
            "/usr/local/bin/tesseract",
            "/snap/bin/tesseract",
        ]
    };
    list.iter().map(PathBuf::from).collect()
}

/// Resolve the binary for `settings`, persisting a newly found path.
///
/// Returns [`GraderError::OcrBinaryNotFound`] when every source misses.
pub fn locate_tesseract(settings: &mut Settings, settings_path: &Path) -> Result<PathBuf> {
    let configured = settings.ocr.binary_path.clone();
    let found = locate_tesseract_in(
        configured.as_deref(),
        std::env::var_os("PATH"),
        &fallback_candidates(),
        &settings.ocr.search_roots,
    )
    .ok_or_else(|| GraderError::OcrBinaryNotFound(settings_path.display().to_string()))?;

    if configured.as_deref() != Some(found.as_path()) {
        info!("Tesseract found at {}", found.display());
        settings.ocr.binary_path = Some(found.clone());
        if let Err(err) = settings.save(settings_path) {
            warn!("Could not persist Tesseract path: {err}");
        }
    }
    Ok(found)
}

pub fn locate_tesseract_in(
    configured: Option<&Path>,
    path_var: Option<OsString>,
    fallbacks: &[PathBuf],
    search_roots: &[PathBuf],
) -> Option<PathBuf> {
    if let Some(path) = configured.filter(|p| p.is_file()) {
        return Some(path.to_path_buf());
    }

    if let Some(path_var) = path_var {
        let hit = std::env::split_paths(&path_var)
            .map(|dir| dir.join(TESSERACT_EXE))
            .find(|p| p.is_file());
        if hit.is_some() {
            return hit;
        }
    }

    if let Some(hit) = fallbacks.iter().find(|p| p.is_file()) {
        return Some(hit.clone());
    }

    search_roots
        .iter()
        .filter(|root| root.is_dir())
        .find_map(|root| scan_root(root))
}

fn scan_root(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .max_depth(SCAN_MAX_DEPTH)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == TESSERACT_EXE)
        .map(|e| e.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn test_configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let configured = dir.path().join("custom").join(TESSERACT_EXE);
        let on_path = dir.path().join("bin").join(TESSERACT_EXE);
        touch(&configured);
        touch(&on_path);

        let path_var = std::env::join_paths([dir.path().join("bin")]).unwrap();
        let found = locate_tesseract_in(Some(&configured), Some(path_var), &[], &[]);
        assert_eq!(found, Some(configured));
    }

    #[test]
    fn test_stale_configured_path_falls_through_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let on_path = dir.path().join("bin").join(TESSERACT_EXE);
        touch(&on_path);

        let path_var = std::env::join_paths([dir.path().join("bin")]).unwrap();
        let stale = dir.path().join("gone").join(TESSERACT_EXE);
        let found = locate_tesseract_in(Some(&stale), Some(path_var), &[], &[]);
        assert_eq!(found, Some(on_path));
    }

    #[test]
    fn test_fallback_list_then_scan() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("fallback").join(TESSERACT_EXE);
        let deep = dir.path().join("root").join("Tesseract-OCR").join(TESSERACT_EXE);
        touch(&deep);

        let roots = vec![dir.path().join("root")];
        let found = locate_tesseract_in(None, None, &[fallback.clone()], &roots);
        assert_eq!(found, Some(deep));

        touch(&fallback);
        let found = locate_tesseract_in(None, None, &[fallback.clone()], &roots);
        assert_eq!(found, Some(fallback));
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let found = locate_tesseract_in(None, None, &[], &[dir.path().to_path_buf()]);
        assert_eq!(found, None);
    }

    #[test]
    fn test_locate_persists_found_path() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.toml");
        let exe = dir.path().join("scan").join("Tesseract-OCR").join(TESSERACT_EXE);
        touch(&exe);

        let mut settings = Settings::default();
        settings.ocr.binary_path = Some(exe.clone());
        let found = locate_tesseract(&mut settings, &settings_path).unwrap();
        assert_eq!(found, exe);
        // already configured: nothing new to persist
        assert!(!settings_path.exists());
    }
}
