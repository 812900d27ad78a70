/// URL-safe slug: lowercase letters and digits joined by single dashes.
///
/// Whitespace, `-` and `_` become separators, `@` becomes `at`, every other
/// symbol is dropped. Input without letters or digits yields an empty slug.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            push_segment(&mut slug, &mut pending_dash);
            slug.extend(ch.to_lowercase());
        } else if ch == '@' {
            pending_dash = true;
            push_segment(&mut slug, &mut pending_dash);
            slug.push_str("at");
            pending_dash = true;
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }

    slug
}

fn push_segment(slug: &mut String, pending_dash: &mut bool) {
    if *pending_dash && !slug.is_empty() {
        slug.push('-');
    }
    *pending_dash = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_title() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn test_collapses_and_trims_separators() {
        assert_eq!(slugify("  Rust -- _ and   Tokio!  "), "rust-and-tokio");
    }

    #[test]
    fn test_drops_punctuation() {
        assert_eq!(slugify("What's new in v2.0?"), "whats-new-in-v20");
    }

    #[test]
    fn test_at_sign() {
        assert_eq!(slugify("me@home"), "me-at-home");
    }

    #[test]
    fn test_keeps_unicode_letters() {
        assert_eq!(slugify("Café Crème"), "café-crème");
    }

    #[test]
    fn test_symbol_only_title() {
        assert_eq!(slugify("!!!"), "");
    }
}
