//! Family name normalization.

/// Canonical family the `serif` generic keyword resolves to.
pub const SERIF: &str = "Serif";
/// Canonical family the `sans-serif` generic keyword resolves to.
pub const SANS_SERIF: &str = "SansSerif";
/// Canonical family the `monospace` generic keyword resolves to.
pub const MONOSPACE: &str = "Monospaced";

/// Normalizes a family name token as written in a style rule or passed to a
/// registration call.
///
/// One layer of quoting is removed (each side independently; a lone opening
/// or closing quote is stripped too). Generic family keywords are matched
/// case-insensitively and resolve to the fixed canonical families
/// ([`SERIF`], [`SANS_SERIF`], [`MONOSPACE`]); any other name is returned
/// quote-stripped with its casing preserved.
///
/// Every input produces a result; the empty string normalizes to itself.
pub fn normalize_family(raw: &str) -> String {
    let stripped = strip_quotes(raw);
    if stripped.eq_ignore_ascii_case("serif") {
        SERIF.to_owned()
    } else if stripped.eq_ignore_ascii_case("sans-serif") {
        SANS_SERIF.to_owned()
    } else if stripped.eq_ignore_ascii_case("monospace") {
        MONOSPACE.to_owned()
    } else {
        stripped.to_owned()
    }
}

fn strip_quotes(raw: &str) -> &str {
    let raw = raw.strip_prefix(['"', '\'']).unwrap_or(raw);
    raw.strip_suffix(['"', '\'']).unwrap_or(raw)
}
