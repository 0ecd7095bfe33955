//! Record extraction from rendered pages
//!
//! Turns one response body into loosely-typed [`FieldMap`]s. The helpers are
//! deliberately naive string slicing tailored to the portal's fixed markup
//! shapes; anything smarter would imply a robustness promise the rest of the
//! system does not rely on. All values come back as raw text; coercion is
//! the caller's job.

use std::sync::OnceLock;

use regex::Regex;

use shule_core::record::FieldMap;

// ---------------------------------------------------------------------------
// Low-level markup helpers
// ---------------------------------------------------------------------------

fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let lower = haystack.get(from..)?.to_ascii_lowercase();
    lower
        .find(&needle.to_ascii_lowercase())
        .map(|idx| idx + from)
}

/// Next complete `<tag ...>...</tag>` block from `from` onwards,
/// case-insensitive. Returns (block_start, block_end) byte offsets.
fn next_tag_block(body: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let start = find_ci(body, &open, from)?;
    // Reject prefix collisions like <td> matching <t.
    let after = body.as_bytes().get(start + open.len())?;
    if !matches!(after, b' ' | b'>' | b'\t' | b'\r' | b'\n') {
        return next_tag_block(body, tag, start + open.len());
    }
    let open_end = body[start..].find('>')? + start + 1;
    let close_start = find_ci(body, &close, open_end)?;
    Some((open_end, close_start))
}

/// Remove all tags, decode the entities the portal actually emits, collapse
/// whitespace.
fn text_of(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_header(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            key.push(ch.to_ascii_lowercase());
        } else if !key.ends_with('_') && !key.is_empty() {
            key.push('_');
        }
    }
    key.trim_matches('_').to_string()
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Extract a listing table into one [`FieldMap`] per data row, in on-page
/// order. Field names come from the header row, normalized
/// (`"Birth Cert No."` becomes `birth_cert_no`).
///
/// An absent anchor yields zero rows: an empty listing is a valid outcome,
/// not an error.
pub fn extract_table(body: &str, anchor: &str) -> Vec<FieldMap> {
    let Some(anchor_at) = find_ci(body, anchor, 0) else {
        return Vec::new();
    };
    // The anchor sits inside the opening <table ...> tag.
    let Some(table_open) = body[..anchor_at].to_ascii_lowercase().rfind("<table") else {
        return Vec::new();
    };
    let Some((inner_start, inner_end)) = next_tag_block(body, "table", table_open) else {
        return Vec::new();
    };
    let table = &body[inner_start..inner_end];

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    let mut cursor = 0usize;

    while let Some((row_start, row_end)) = next_tag_block(table, "tr", cursor) {
        cursor = row_end;
        let row = &table[row_start..row_end];

        if headers.is_empty() {
            let mut th_cursor = 0usize;
            while let Some((cell_start, cell_end)) = next_tag_block(row, "th", th_cursor) {
                th_cursor = cell_end;
                headers.push(normalize_header(&text_of(&row[cell_start..cell_end])));
            }
            if !headers.is_empty() {
                continue;
            }
        }

        let mut cells = Vec::new();
        let mut td_cursor = 0usize;
        while let Some((cell_start, cell_end)) = next_tag_block(row, "td", td_cursor) {
            td_cursor = cell_end;
            cells.push(text_of(&row[cell_start..cell_end]));
        }
        if cells.is_empty() {
            continue;
        }

        let mut record = FieldMap::new();
        for (idx, value) in cells.into_iter().enumerate() {
            match headers.get(idx) {
                Some(name) if !name.is_empty() => record.insert(name.clone(), value),
                _ => record.insert(format!("col{idx}"), value),
            }
        }
        rows.push(record);
    }

    rows
}

// ---------------------------------------------------------------------------
// Single elements and detail pages
// ---------------------------------------------------------------------------

/// Raw text of the element with the given id: the `value` attribute for
/// inputs, inner text for spans/labels. `None` when the element is absent.
pub fn element_value(body: &str, id: &str) -> Option<String> {
    static INPUT_RE: OnceLock<Regex> = OnceLock::new();
    let input_re = INPUT_RE.get_or_init(|| {
        Regex::new(r#"(?is)<input[^>]*\bid="([^"]+)"[^>]*\bvalue="([^"]*)""#)
            .expect("input pattern")
    });
    for caps in input_re.captures_iter(body) {
        if &caps[1] == id {
            return Some(caps[2].to_string());
        }
    }

    // <span id="..."> / <select id> etc: take the inner text of the element.
    let open = find_ci(body, &format!("id=\"{id}\""), 0)?;
    let tag_start = body[..open].rfind('<')?;
    let tag_name: String = body[tag_start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    let (inner_start, inner_end) = next_tag_block(body, &tag_name, tag_start)?;
    Some(text_of(&body[inner_start..inner_end]))
}

/// Extract a detail/confirmation page into one [`FieldMap`] using
/// `(field_name, element_id)` selector pairs. Absent elements are simply
/// omitted.
pub fn extract_single_record(body: &str, field_selectors: &[(&str, &str)]) -> FieldMap {
    let mut record = FieldMap::new();
    for (name, id) in field_selectors {
        if let Some(value) = element_value(body, id) {
            record.insert(*name, value);
        }
    }
    record
}

/// The `value` of the currently selected `<option>` of a named select
/// control. Used to decide whether a page-size/category change submission
/// is actually necessary.
pub fn selected_option(body: &str, control_name: &str) -> Option<String> {
    // The name attribute sits inside the opening <select ...> tag, so the
    // block is anchored backwards from it.
    let name_at = find_ci(body, &format!("name=\"{control_name}\""), 0)?;
    let select_open = body[..name_at].to_ascii_lowercase().rfind("<select")?;
    let (inner_start, inner_end) = next_tag_block(body, "select", select_open)?;
    let inner = &body[inner_start..inner_end];

    static SELECTED_RE: OnceLock<Regex> = OnceLock::new();
    let re = SELECTED_RE.get_or_init(|| {
        Regex::new(r#"(?is)<option[^>]*\bselected(?:="selected")?[^>]*\bvalue="([^"]*)"|<option[^>]*\bvalue="([^"]*)"[^>]*\bselected"#)
            .expect("selected option pattern")
    });
    re.captures(inner)
        .map(|c| c.get(1).or(c.get(2)).map_or(String::new(), |m| m.as_str().to_string()))
}

/// All `(value, label)` options of a named select control, in render order.
///
/// The biodata flow reads the sub-county options the server rendered after
/// the county postback from here; they are never guessed locally.
pub fn select_options(body: &str, control_name: &str) -> Vec<(String, String)> {
    let Some(name_at) = find_ci(body, &format!("name=\"{control_name}\""), 0) else {
        return Vec::new();
    };
    let Some(select_open) = body[..name_at].to_ascii_lowercase().rfind("<select") else {
        return Vec::new();
    };
    let Some((inner_start, inner_end)) = next_tag_block(body, "select", select_open) else {
        return Vec::new();
    };
    let inner = &body[inner_start..inner_end];

    static OPTION_RE: OnceLock<Regex> = OnceLock::new();
    let re = OPTION_RE.get_or_init(|| {
        Regex::new(r#"(?is)<option[^>]*\bvalue="([^"]*)"[^>]*>(.*?)</option>"#)
            .expect("option pattern")
    });
    re.captures_iter(inner)
        .map(|c| (c[1].to_string(), text_of(&c[2])))
        .collect()
}

// ---------------------------------------------------------------------------
// Row controls
// ---------------------------------------------------------------------------

/// The per-row action controls of one listing rendering.
///
/// The portal numbers row controls `ctl02`, `ctl03`, … but the first data
/// row's number shifts with the page's header arrangement, so a row's
/// control id is **not** its display position. The correct id is always the
/// first observed suffix plus a running offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowControls {
    prefix: String,
    first_suffix: u32,
    width: usize,
    count: usize,
}

impl RowControls {
    /// Number of row controls observed on the page.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Control name for the row at `row_index` (0-based display position).
    pub fn name_for(&self, row_index: usize) -> Option<String> {
        if row_index >= self.count {
            return None;
        }
        let suffix = self.first_suffix + row_index as u32;
        Some(format!(
            "{}{:0width$}",
            self.prefix,
            suffix,
            width = self.width
        ))
    }
}

/// Enumerate the row controls matching `prefix` in on-page order.
pub fn extract_row_controls(body: &str, prefix: &str) -> Option<RowControls> {
    let re = Regex::new(&format!(r"{}(\d+)", regex::escape(prefix))).expect("row control pattern");
    let mut suffixes: Vec<(u32, usize)> = Vec::new();
    for caps in re.captures_iter(body) {
        let digits = &caps[1];
        let value: u32 = digits.parse().ok()?;
        if suffixes.last().map(|&(v, _)| v) != Some(value) {
            suffixes.push((value, digits.len()));
        }
    }
    let (first_suffix, width) = *suffixes.first()?;
    Some(RowControls {
        prefix: prefix.to_string(),
        first_suffix,
        width,
        count: suffixes.len(),
    })
}
