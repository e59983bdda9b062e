use std::{
    path::Path,
    sync::{Arc, LazyLock},
};

use crate::config::options::FontOptions;

static DEFAULT_FONTDB: LazyLock<Arc<usvg::fontdb::Database>> =
    LazyLock::new(|| build_fontdb(&FontOptions::default()));

/// Font database for `font`.
///
/// The default configuration (system fonts, default families) is loaded once per process;
/// anything else is built fresh.
pub(crate) fn fontdb_for(font: &FontOptions) -> Arc<usvg::fontdb::Database> {
    if *font == FontOptions::default() {
        return DEFAULT_FONTDB.clone();
    }
    build_fontdb(font)
}

fn build_fontdb(font: &FontOptions) -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    if font.load_system_fonts {
        db.load_system_fonts();
    }

    for file in &font.font_files {
        if let Err(err) = db.load_font_file(file) {
            tracing::warn!(path = %file.display(), error = %err, "failed to load font file");
        }
    }
    for dir in &font.font_dirs {
        load_fonts_from_dir(&mut db, dir);
    }

    db.set_serif_family(font.serif_family.clone());
    db.set_sans_serif_family(font.sans_serif_family.clone());
    db.set_cursive_family(font.cursive_family.clone());
    db.set_fantasy_family(font.fantasy_family.clone());
    db.set_monospace_family(font.monospace_family.clone());

    tracing::debug!(faces = db.len(), "font database ready");
    Arc::new(db)
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory is not readable");
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(err) = db.load_font_file(&path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to load font file");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/fonts.rs"]
mod tests;
