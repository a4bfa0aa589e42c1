use listing_harvest::*;

#[cfg(test)]
mod url_normalizer_tests {
    use super::*;

    #[test]
    fn test_normalize_removes_fragment() {
        let normalized = UrlNormalizer::normalize("https://example.com/ad/1#fotos");
        assert_eq!(normalized, "https://example.com/ad/1");
    }

    #[test]
    fn test_normalize_removes_trailing_slash_from_path() {
        let normalized = UrlNormalizer::normalize("https://example.com/ad/1/");
        assert_eq!(normalized, "https://example.com/ad/1");
    }

    #[test]
    fn test_normalize_keeps_trailing_slash_for_root() {
        let normalized = UrlNormalizer::normalize("https://example.com/");
        assert_eq!(normalized, "https://example.com/");
    }

    #[test]
    fn test_normalize_handles_query_parameters() {
        let normalized = UrlNormalizer::normalize("https://example.com/ad/1/?ref=home#top");
        assert_eq!(normalized, "https://example.com/ad/1?ref=home");
    }

    #[test]
    fn test_normalize_leaves_page_numbers_alone() {
        let normalized = UrlNormalizer::normalize("https://example.com/propiedades/venta/casa/rm/0");
        assert_eq!(normalized, "https://example.com/propiedades/venta/casa/rm/0");
    }
}
