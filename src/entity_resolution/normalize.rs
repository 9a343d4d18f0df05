//! Name normalization for legislator matching.
//!
//! The output is an equality-join key, never displayed. The steps are fixed:
//! - fold the accented letters used in Portuguese and Spanish names to their
//!   base letter, keeping case
//! - drop periods, turn hyphens into spaces
//! - one pass of "double space to single space" (not a loop: `"A   B"`
//!   comes out as `"A  B"`)
//! - trim, uppercase
//!
//! Input is composed (NFC) first so decomposed accents fold the same way as
//! precomposed ones.

use unicode_normalization::UnicodeNormalization;

fn fold_accent(c: char) -> char {
    match c {
        'ã' | 'â' | 'á' | 'à' => 'a',
        'Ã' | 'Â' | 'Á' | 'À' => 'A',
        'é' | 'ê' | 'è' => 'e',
        'É' | 'Ê' | 'È' => 'E',
        'í' | 'î' => 'i',
        'Í' | 'Î' => 'I',
        'ó' | 'ô' | 'õ' => 'o',
        'Ó' | 'Ô' | 'Õ' => 'O',
        'ú' | 'û' => 'u',
        'Ú' | 'Û' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        other => other,
    }
}

/// Canonical comparison key for a person's name. `None` maps to `""`.
///
/// ```
/// use congresso_warehouse::entity_resolution::normalize_name;
///
/// assert_eq!(normalize_name(Some("João")), "JOAO");
/// assert_eq!(normalize_name(Some("Ana-Maria")), "ANA MARIA");
/// assert_eq!(normalize_name(None), "");
/// ```
pub fn normalize_name(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };
    let folded: String = name
        .nfc()
        .filter(|c| *c != '.')
        .map(|c| if c == '-' { ' ' } else { fold_accent(c) })
        .collect();
    folded.replace("  ", " ").trim().to_uppercase()
}
