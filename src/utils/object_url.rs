use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// RFC 3986 unreserved characters stay readable in object paths
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Cached URL stored on staged rows: `<base>/<encoded key>`, or the encoded key
/// alone when no public base is configured.
pub fn public_object_url(base: Option<&str>, key: &str) -> String {
    let encoded = key
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");

    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), encoded),
        None => encoded,
    }
}

/// Lowercase ASCII slug for production URLs ("Jane Doe_2" -> "jane-doe-2").
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "model".to_string()
    } else {
        slug
    }
}
