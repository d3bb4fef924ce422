use std::fmt;

/// Slug used when a ref has no characters usable in a name
pub const FALLBACK_REF_SLUG: &str = "pr";

/// Stable identity of one pull request's preview environment.
///
/// The derived [`name`](EnvironmentIdentity::name) is the only key shared by the
/// database, app and page backends, so it must not change for the lifetime of
/// the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentIdentity {
    pub ref_slug: String,
    pub pull_request_number: u64,
    pub suffix: Option<String>,
    name: String,
}

impl EnvironmentIdentity {
    pub fn new(ref_slug: impl Into<String>, pull_request_number: u64, suffix: Option<&str>) -> Self {
        let ref_slug = ref_slug.into();
        let ref_slug = if ref_slug.trim().is_empty() {
            FALLBACK_REF_SLUG.to_string()
        } else {
            ref_slug
        };
        let suffix = suffix
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let name = derive_name(&ref_slug, pull_request_number, suffix.as_deref());

        Self {
            ref_slug,
            pull_request_number,
            suffix,
            name,
        }
    }

    /// Build an identity from a raw git ref such as `feature/Login_Page`
    pub fn from_ref(ref_name: &str, pull_request_number: u64, suffix: Option<&str>) -> Self {
        Self::new(slugify(ref_name), pull_request_number, suffix.map(slugify).as_deref())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for EnvironmentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// `ref_slug-pr` with `-suffix` appended when present
pub fn derive_name(ref_slug: &str, pull_request_number: u64, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => {
            format!("{}-{}-{}", ref_slug, pull_request_number, suffix)
        }
        _ => format!("{}-{}", ref_slug, pull_request_number),
    }
}

/// Lowercase and collapse every run of characters outside `[a-z0-9]` into `-`
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.chars() {
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

    slug
}
