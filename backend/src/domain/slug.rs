//! Slug derivation and validation for catalogue entities.
//!
//! Slugs are trimmed, non-empty identifiers composed of lowercase ASCII
//! letters, digits, and single hyphens.

/// Derive a URL slug from a display name.
///
/// Runs of characters outside `[a-z0-9]` collapse to one hyphen; leading and
/// trailing hyphens are dropped.
///
/// # Examples
/// ```
/// use tourbook::domain::slugify;
///
/// assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
/// assert_eq!(slugify("  Sea & Sky!  "), "sea-sky");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Return `true` when `value` is a valid slug.
pub(crate) fn is_valid_slug(value: &str) -> bool {
    is_trimmed_non_empty(value)
        && has_allowed_slug_chars(value)
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
}

fn is_trimmed_non_empty(value: &str) -> bool {
    !value.is_empty() && value.trim() == value
}

fn has_allowed_slug_chars(value: &str) -> bool {
    value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("The Sea Explorer", "the-sea-explorer")]
    #[case("The  Park -- Camper", "the-park-camper")]
    #[case("Über Alpine Trek 2", "ber-alpine-trek-2")]
    #[case("---", "")]
    fn slugify_collapses_separators(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(slugify(name), expected);
    }

    #[rstest]
    #[case("the-city-wanderer", true)]
    #[case("", false)]
    #[case("-leading", false)]
    #[case("double--hyphen", false)]
    #[case("Upper", false)]
    fn validates_slugs(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_valid_slug(value), valid);
    }

    #[rstest]
    fn derived_slugs_are_valid() {
        for name in ["The Snow Adventurer", "The Northern Lights", "x1 y2"] {
            assert!(is_valid_slug(&slugify(name)), "{name}");
        }
    }
}
