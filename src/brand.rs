//! Brand partition keys.
//!
//! Upstream spells the same platform several ways (`BongaCams`, `bonga`,
//! `royal-cams`, ...). Every brand that enters the sync, whether from the CLI,
//! the config file, a persisted catalog or a performer record, goes through
//! [`normalize_brand`] so that quota and reseed decisions compare like with like.

use std::collections::BTreeSet;

/// Normalize a raw brand string to its partition key.
///
/// Returns `None` for blank input.
pub fn normalize_brand(raw: &str) -> Option<String> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    if key.starts_with("bonga") {
        return Some("bongacams".to_string());
    }
    if key.starts_with("royal") {
        return Some("royalcams".to_string());
    }
    Some(key)
}

/// Normalize a list of brands, dropping blanks and later duplicates.
pub fn normalize_brands<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for brand in raw.into_iter().filter_map(|b| normalize_brand(b.as_ref())) {
        if !out.contains(&brand) {
            out.push(brand);
        }
    }
    out
}

/// Parse a comma-separated brand list as given on the command line.
pub fn parse_brand_list(csv: &str) -> Vec<String> {
    normalize_brands(csv.split(','))
}

/// Whether two brand lists name the same set of partitions, ignoring order.
pub fn same_brand_set(a: &[String], b: &[String]) -> bool {
    let left: BTreeSet<String> = normalize_brands(a).into_iter().collect();
    let right: BTreeSet<String> = normalize_brands(b).into_iter().collect();
    left == right
}
