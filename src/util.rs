// Small pure helpers shared by the aggregator and the report formatter.
//
// Everything in here is side-effect free so it can be tested on its own.
use num_format::{Locale, ToFormattedString};

/// Default word that a missing value stringifies to in the source data.
pub const DEFAULT_NULL_SENTINEL: &str = "none";

/// Returned by [`percent`] when there is no denominator.
pub const PERCENT_UNDEFINED: f64 = -9999.0;

/// Decide whether a raw field value counts as null/empty.
///
/// The source marks absent values inconsistently:
/// - a real missing marker surfaced by the data layer, which stringifies to
///   the sentinel word (`None`, `NONE`, ...),
/// - a literal empty string,
/// - whitespace-only content.
///
/// One normalized comparison handles all three: trim, lower-case, then
/// compare against the sentinel or check for emptiness.
pub fn is_null_or_empty(raw: &str, null_sentinel: &str) -> bool {
    let v = raw.trim().to_lowercase();
    v.is_empty() || v == null_sentinel.trim().to_lowercase()
}

/// Like [`is_null_or_empty`], but an absent value (e.g. a short CSV row)
/// is always null.
pub fn is_missing(raw: Option<&str>, null_sentinel: &str) -> bool {
    match raw {
        Some(v) => is_null_or_empty(v, null_sentinel),
        None => true,
    }
}

/// Percentage of `count` over `total`, or [`PERCENT_UNDEFINED`] when
/// `total` is zero. Does not check `count <= total`.
pub fn percent(total: u64, count: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        PERCENT_UNDEFINED
    }
}

pub fn is_undefined_percent(p: f64) -> bool {
    p == PERCENT_UNDEFINED
}

/// Render a percentage into a cell of `width` characters followed by `%`.
///
/// The zero-denominator sentinel renders as `N/A` in the same footprint so
/// columns stay aligned.
pub fn format_percent(p: f64, width: usize) -> String {
    if is_undefined_percent(p) {
        format!("{:>width$} ", "N/A", width = width)
    } else {
        format!("{:>width$.2}%", p, width = width)
    }
}

/// Strip a trailing qualifier word from a region key for display
/// (`"ANNE ARUNDEL COUNTY"` -> `"ANNE ARUNDEL"`).
pub fn region_display_label(key: &str, suffix: Option<&str>) -> String {
    let Some(suffix) = suffix.map(str::trim).filter(|s| !s.is_empty()) else {
        return key.to_string();
    };
    match key.strip_suffix(suffix) {
        Some(rest) if rest.ends_with(' ') => rest.trim_end().to_string(),
        _ => key.to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format`, used for the `TOTAL = 9,855` line.
    n.to_formatted_string(&Locale::en)
}
