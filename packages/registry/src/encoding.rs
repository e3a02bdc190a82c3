//! Text decoding for INEGI attribute tables.
//!
//! Recent DENUE extracts are UTF-8, older ones and most dBASE tables are
//! Windows-1252. Bytes that are not valid UTF-8 are read as Windows-1252,
//! which is a superset of Latin-1 for printable characters.

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{Encoding, WINDOWS_1252};
use shapefile::dbase::CodePageMark;

/// Decodes UTF-8 when valid, Windows-1252 otherwise.
#[must_use]
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

/// Encoding of a dBASE table: the `.cpg` sidecar if present, then the
/// header's code page mark. Returns `None` when the dBASE reader's own
/// choice for the mark should stand.
#[must_use]
pub fn dbf_encoding(layer_path: &Path, mark: CodePageMark) -> Option<&'static Encoding> {
    let cpg = layer_path.with_extension("cpg");
    if let Ok(label) = std::fs::read_to_string(&cpg) {
        match encoding_for_label(&label) {
            Some(encoding) => return Some(encoding),
            None => log::warn!(
                "Unknown encoding '{}' in {}",
                label.trim(),
                cpg.display()
            ),
        }
    }

    match mark {
        CodePageMark::Undefined | CodePageMark::Invalid => Some(WINDOWS_1252),
        _ => None,
    }
}

/// Resolves a `.cpg` label such as `UTF-8`, `1252` or `ANSI 1252`.
fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    if label.contains("1252") || label.eq_ignore_ascii_case("ansi") {
        return Some(WINDOWS_1252);
    }
    Encoding::for_label(label.as_bytes())
}
