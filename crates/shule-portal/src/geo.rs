//! Administrative-region code resolution
//!
//! The portal wants numeric codes for counties and sub-counties; local
//! records hold free text typed by school clerks. Resolution is ordered
//! pattern rules over a normalized form of the text, with explicit
//! fallbacks: a wrong-but-valid location is recoverable later, a rejected
//! form is not.
//!
//! County codes follow the portal's numbering (the official 1–47 order).
//! Sub-county codes are never guessed locally: the capture flow reads the
//! server-rendered option list after the county postback and picks the best
//! textual match from it.

/// Portal code for Nairobi, the fallback when nothing matches.
pub const DEFAULT_COUNTY_CODE: u8 = 47;

/// (code, canonical name, extra patterns beyond the normalized name).
///
/// Patterns are matched against uppercase text with everything but letters
/// removed, in table order; first hit wins.
const COUNTIES: &[(u8, &str, &[&str])] = &[
    (1, "MOMBASA", &[]),
    (2, "KWALE", &[]),
    (3, "KILIFI", &[]),
    (4, "TANA RIVER", &["TANARIVER"]),
    (5, "LAMU", &[]),
    (6, "TAITA TAVETA", &["TAITATAVETA", "TAITA", "TAVETA"]),
    (7, "GARISSA", &[]),
    (8, "WAJIR", &[]),
    (9, "MANDERA", &[]),
    (10, "MARSABIT", &[]),
    (11, "ISIOLO", &[]),
    (12, "MERU", &[]),
    (13, "THARAKA NITHI", &["THARAKANITHI", "THARAKA"]),
    (14, "EMBU", &[]),
    (15, "KITUI", &[]),
    (16, "MACHAKOS", &[]),
    (17, "MAKUENI", &[]),
    (18, "NYANDARUA", &[]),
    (19, "NYERI", &[]),
    (20, "KIRINYAGA", &[]),
    (21, "MURANG'A", &["MURANGA"]),
    (22, "KIAMBU", &[]),
    (23, "TURKANA", &[]),
    (24, "WEST POKOT", &["WESTPOKOT", "POKOT"]),
    (25, "SAMBURU", &[]),
    (26, "TRANS NZOIA", &["TRANSNZOIA"]),
    (27, "UASIN GISHU", &["UASINGISHU", "ELDORET"]),
    (28, "ELGEYO MARAKWET", &["ELGEYOMARAKWET", "ELGEYO", "MARAKWET", "KEIYO"]),
    (29, "NANDI", &[]),
    (30, "BARINGO", &[]),
    (31, "LAIKIPIA", &[]),
    (32, "NAKURU", &[]),
    (33, "NAROK", &[]),
    (34, "KAJIADO", &[]),
    (35, "KERICHO", &[]),
    (36, "BOMET", &[]),
    (37, "KAKAMEGA", &[]),
    (38, "VIHIGA", &[]),
    (39, "BUNGOMA", &[]),
    (40, "BUSIA", &[]),
    (41, "SIAYA", &[]),
    (42, "KISUMU", &[]),
    (43, "HOMA BAY", &["HOMABAY"]),
    (44, "MIGORI", &[]),
    (45, "KISII", &[]),
    (46, "NYAMIRA", &[]),
    (47, "NAIROBI", &["NAIROBICITY"]),
];

/// Uppercase and drop everything that is not a letter.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Resolve free-text county to the portal's numeric code.
///
/// Falls back to Nairobi ([`DEFAULT_COUNTY_CODE`]) when the text is absent
/// or matches no rule.
pub fn county_code(text: Option<&str>) -> u8 {
    let Some(text) = text else {
        return DEFAULT_COUNTY_CODE;
    };
    let normalized = normalize(text);
    if normalized.is_empty() {
        return DEFAULT_COUNTY_CODE;
    }
    for (code, name, patterns) in COUNTIES {
        if normalized == normalize(name) {
            return *code;
        }
        if patterns.iter().any(|p| normalized == *p) {
            return *code;
        }
    }
    // Second pass: containment, for entries like "NAIROBI WEST".
    for (code, name, patterns) in COUNTIES {
        let canonical = normalize(name);
        if normalized.contains(&canonical)
            || patterns.iter().any(|p| normalized.contains(p))
        {
            return *code;
        }
    }
    DEFAULT_COUNTY_CODE
}

/// Canonical county name for a code, when known.
pub fn county_name(code: u8) -> Option<&'static str> {
    COUNTIES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, _)| *name)
}

/// Pick the sub-county option best matching the local free text.
///
/// `options` are `(value, label)` pairs in the order the server rendered
/// them after the county postback. Falls back to the first option when the
/// text is absent or matches nothing, matching the server's own default.
pub fn select_sub_county<'a>(
    options: &'a [(String, String)],
    text: Option<&str>,
) -> Option<&'a (String, String)> {
    let first = options.first()?;
    let Some(text) = text else {
        return Some(first);
    };
    let wanted = normalize(text);
    if wanted.is_empty() {
        return Some(first);
    }
    // Exact normalized label match first, then containment either way.
    if let Some(exact) = options.iter().find(|(_, label)| normalize(label) == wanted) {
        return Some(exact);
    }
    options
        .iter()
        .find(|(_, label)| {
            let label = normalize(label);
            !label.is_empty() && (label.contains(&wanted) || wanted.contains(&label))
        })
        .or(Some(first))
}
