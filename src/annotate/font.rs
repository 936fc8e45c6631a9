//! Font resolution for the score stamp
//!
//! Override, then platform CJK fonts, then the font bundled with egui.

use crate::error::{GraderError, Result};
use ab_glyph::FontVec;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BUILTIN_FONT_KEY: &str = "Ubuntu-Light";

pub struct LoadedFont {
    pub font: FontVec,
    /// File path, or `"builtin"`.
    pub origin: String,
}

pub fn font_candidates() -> Vec<PathBuf> {
    let list: &[&str] = if cfg!(windows) {
        &[
            "C:/Windows/Fonts/msyh.ttc",
            "C:/Windows/Fonts/simhei.ttf",
            "C:/Windows/Fonts/simsun.ttc",
            "C:/Windows/Fonts/NotoSansSC-Regular.otf",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/System/Library/Fonts/PingFang.ttc",
            "/System/Library/Fonts/STHeiti Medium.ttc",
            "/Library/Fonts/Songti.ttc",
            "/Library/Fonts/SimHei.ttf",
            "/Library/Fonts/NotoSansSC-Regular.otf",
        ]
    } else {
        &[
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
            "/usr/share/fonts/truetype/arphic/ukai.ttc",
            "/usr/share/fonts/truetype/arphic/uming.ttc",
        ]
    };
    list.iter().map(PathBuf::from).collect()
}

pub fn load_font(override_path: Option<&Path>) -> Result<LoadedFont> {
    let candidates = override_path
        .map(Path::to_path_buf)
        .into_iter()
        .chain(font_candidates());

    for path in candidates {
        if !path.is_file() {
            continue;
        }
        match load_font_file(&path) {
            Ok(font) => {
                debug!("Score font: {}", path.display());
                return Ok(LoadedFont {
                    font,
                    origin: path.display().to_string(),
                });
            }
            Err(err) => warn!("Skipping font {}: {err}", path.display()),
        }
    }

    Ok(LoadedFont {
        font: builtin_font()?,
        origin: "builtin".to_string(),
    })
}

fn load_font_file(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path)?;
    FontVec::try_from_vec_and_index(data, 0).map_err(|e| GraderError::Font(e.to_string()))
}

fn builtin_font() -> Result<FontVec> {
    let defs = epaint::text::FontDefinitions::default();
    let data = defs
        .font_data
        .get(BUILTIN_FONT_KEY)
        .ok_or_else(|| GraderError::Font(format!("builtin font {BUILTIN_FONT_KEY} missing")))?;
    FontVec::try_from_vec_and_index(data.font.to_vec(), data.index)
        .map_err(|e| GraderError::Font(e.to_string()))
}
