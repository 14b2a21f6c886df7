//! Playlist manifest codec
//!
//! A manifest is an M3U file: one track path per line, `#` lines are
//! comments or extended-M3U directives. Files are read as UTF-8 and fall back
//! to Windows-1252 when that fails, since older playlists were written by
//! Windows players in the ANSI code page.

use std::path::Path;

use crate::{LibraryRoot, NormalizedPath, Result, io};

const EXTENDED_HEADER: &str = "#EXTM3U";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How entries are spelled when a manifest is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestStyle {
    /// Absolute local paths under the library root
    Local,
    /// Library-relative keys, as the remote side stores them
    Remote,
}

/// The ordered list of track entries in a playlist file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Raw entries in file order
    pub entries: Vec<String>,
    /// Whether the file carried an `#EXTM3U` header
    pub extended: bool,
}

impl Manifest {
    pub fn new(entries: Vec<String>) -> Self {
        Self {
            entries,
            extended: false,
        }
    }

    /// Read and parse a manifest file.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = io::read_bytes(path)?;
        Ok(Self::parse(&decode(&bytes)))
    }

    /// Parse manifest text, skipping blank lines and `#` lines.
    pub fn parse(text: &str) -> Self {
        let mut manifest = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if line.eq_ignore_ascii_case(EXTENDED_HEADER) {
                    manifest.extended = true;
                }
                continue;
            }
            manifest.entries.push(line.to_string());
        }
        manifest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized keys in file order.
    pub fn keys(&self, root: &LibraryRoot) -> Vec<NormalizedPath> {
        self.entries.iter().map(|e| root.normalize(e)).collect()
    }

    /// Render the manifest in the given style.
    pub fn render(&self, style: ManifestStyle, root: &LibraryRoot) -> String {
        let mut out = String::new();
        if self.extended {
            out.push_str(EXTENDED_HEADER);
            out.push('\n');
        }
        for entry in &self.entries {
            let key = root.normalize(entry);
            match style {
                ManifestStyle::Local => {
                    out.push_str(&root.denormalize(&key).to_string_lossy());
                }
                ManifestStyle::Remote => out.push_str(key.as_str()),
            }
            out.push('\n');
        }
        out
    }

    /// Render and atomically write the manifest to `path`.
    pub fn write(&self, path: &Path, style: ManifestStyle, root: &LibraryRoot) -> Result<()> {
        io::write_atomic(path, self.render(style, root).as_bytes())
    }
}

/// Decode manifest bytes: UTF-8 (BOM tolerated), else Windows-1252.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!("Manifest is not valid UTF-8, decoding as Windows-1252");
            bytes.iter().map(|&b| windows_1252_char(b)).collect()
        }
    }
}

/// Windows-1252 differs from Latin-1 only in 0x80..=0x9F. The five unassigned
/// bytes map to the C1 control with the same value.
fn windows_1252_char(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}',
        '\u{017D}', '\u{008F}', '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
        '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}
