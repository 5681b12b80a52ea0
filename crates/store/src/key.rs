//! Collision-resistant storage key derivation.

use chrono::Utc;
use uuid::Uuid;

/// Derive a storage key for one changed file of a pull request.
///
/// Keys embed the repository, PR number, a UTC timestamp, a random suffix
/// and the sanitized original path, so concurrent events on the same file
/// never collide and a key alone identifies its origin.
#[must_use]
pub fn derive_key(owner: &str, repo: &str, pr_number: u64, path: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix = short_suffix();
    format!(
        "{owner}/{repo}/pr-{pr_number}/{timestamp}-{suffix}-{}",
        sanitize_path(path)
    )
}

/// Flatten a repository path into a single key segment.
///
/// Separators become `_`; anything outside `[A-Za-z0-9._-]` becomes `-`.
#[must_use]
pub fn sanitize_path(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => c,
            _ => '-',
        })
        .collect()
}

fn short_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_separators_and_specials() {
        assert_eq!(sanitize_path("src/engine/mod.rs"), "src_engine_mod.rs");
        assert_eq!(sanitize_path("docs/été notes.md"), "docs_-t--notes.md");
    }

    #[test]
    fn keys_embed_repository_and_pr() {
        let key = derive_key("acme", "widgets", 42, "src/lib.rs");
        assert!(key.starts_with("acme/widgets/pr-42/"));
        assert!(key.ends_with("-src_lib.rs"));
    }

    #[test]
    fn repeated_derivation_never_collides() {
        let a = derive_key("acme", "widgets", 42, "src/lib.rs");
        let b = derive_key("acme", "widgets", 42, "src/lib.rs");
        assert_ne!(a, b);
    }
}
