use sha2::{Digest, Sha256};

/// Normalize a user question before embedding and keying it in the cache.
///
/// Lowercases, trims and collapses internal whitespace. Punctuation and
/// accents are kept.
pub fn normalize_query(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable cache key for a question.
///
/// SHA256 of the normalized text, hex encoded, so two phrasings that only
/// differ in case or spacing overwrite the same entry.
pub fn generate_query_hash(text: &str) -> String {
    let normalized = normalize_query(text);

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_spacing_ignored() {
        let a = "Como abro uma   empresa?";
        let b = "  como ABRO uma empresa?  ";

        assert_eq!(generate_query_hash(a), generate_query_hash(b));
    }

    #[test]
    fn test_punctuation_matters() {
        // "Lei 8.245" and "Lei 8245" are kept apart on purpose
        assert_ne!(
            generate_query_hash("Lei 8.245/91"),
            generate_query_hash("Lei 824591")
        );
    }

    #[test]
    fn test_accents_kept() {
        assert_ne!(generate_query_hash("é devido"), generate_query_hash("e devido"));
    }

    #[test]
    fn test_hash_format() {
        let hash = generate_query_hash("Qual o teto do MEI?");

        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("\tO que é\n Fator R? "), "o que é fator r?");
        assert_eq!(normalize_query(""), "");
    }
}
