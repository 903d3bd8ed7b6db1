use regex::Regex;
use lazy_static::lazy_static;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE_NON_ALPHANUMERIC_SPACE: Regex = Regex::new(r"[^a-zA-Z0-9 ]").unwrap();
    static ref RE_SPACES: Regex = Regex::new(r"\s+").unwrap();
    static ref RE_LEADING_ARTICLE: Regex = Regex::new(r"(?i)^(the|and|a|an)\s+").unwrap();
}

/// Strip combining marks after canonical decomposition, and transliterate the
/// handful of Latin letters that don't decompose (ø, æ, ß, ...).
pub fn remove_diacritics(text: &str) -> String {
    let mut s = String::with_capacity(text.len());

    for c in text.nfd().filter(|c| !unicode_normalization::char::is_combining_mark(*c)) {
        match c {
            'æ' => s.push_str("ae"),
            'Æ' => s.push_str("AE"),
            'œ' => s.push_str("oe"),
            'Œ' => s.push_str("OE"),
            'ß' => s.push_str("ss"),
            'ø' => s.push('o'),
            'Ø' => s.push('O'),
            'ł' => s.push('l'),
            'Ł' => s.push('L'),
            'đ' | 'ð' => s.push('d'),
            'Đ' | 'Ð' => s.push('D'),
            'þ' => s.push_str("th"),
            'Þ' => s.push_str("Th"),
            'ı' => s.push('i'),
            _ => s.push(c),
        }
    }

    s
}

/// The normalization shared by the indexed text and by search queries:
/// no diacritics, only `[A-Za-z0-9 ]`, single spaces, trimmed.
pub fn normalize_indexable_text(text: &str) -> String {
    let s = remove_diacritics(text);
    let s = RE_NON_ALPHANUMERIC_SPACE.replace_all(&s, " ");
    let s = RE_SPACES.replace_all(&s, " ");
    s.trim().to_string()
}

/// "Jules Verne" -> "jules-verne", "Ælfric’s Homilies" -> "aelfrics-homilies"
pub fn make_url_safe(text: &str) -> String {
    let s = text.replace(['\'', '’'], "");
    let s = remove_diacritics(&s).trim().to_lowercase();
    let s = RE_NON_ALPHANUMERIC_SPACE.replace_all(&s, " ");
    let s = RE_SPACES.replace_all(s.trim(), "-");
    s.trim_matches('-').to_string()
}

/// Sort key for names: leading articles dropped, diacritics removed, lowercase.
pub fn sorted_name(name: &str) -> String {
    let s = RE_LEADING_ARTICLE.replace(name.trim(), "");
    remove_diacritics(&s).to_lowercase()
}

/// Trimmed value, or None if nothing is left.
pub fn null_if_empty(text: Option<&str>) -> Option<String> {
    match text.map(|s| s.trim()) {
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    }
}

pub fn format_file_size(byte_count: u64) -> String {
    const SIZES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut bytes = byte_count as f64;
    let mut index = 0;
    while bytes >= 1024.0 && index < SIZES.len() - 1 {
        bytes /= 1024.0;
        index += 1;
    }

    if index == 0 {
        format!("{} {}", byte_count, SIZES[index])
    } else {
        format!("{:.1} {}", bytes, SIZES[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_diacritics() {
        assert_eq!(remove_diacritics("Émile Zola"), "Emile Zola");
        assert_eq!(remove_diacritics("Søren Kierkegaard"), "Soren Kierkegaard");
        assert_eq!(remove_diacritics("Ælfric"), "AElfric");
        assert_eq!(remove_diacritics("plain"), "plain");
    }

    #[test]
    fn test_normalize_indexable_text() {
        assert_eq!(normalize_indexable_text("  Les Misérables: Fantine!  "), "Les Miserables Fantine");
        assert_eq!(normalize_indexable_text("Twenty-Thousand  Leagues"), "Twenty Thousand Leagues");
        assert_eq!(normalize_indexable_text("—"), "");
    }

    #[test]
    fn test_make_url_safe() {
        assert_eq!(make_url_safe("Jules Verne"), "jules-verne");
        assert_eq!(make_url_safe("Ælfric’s Homilies"), "aelfrics-homilies");
        assert_eq!(make_url_safe("  The Three Musketeers (D’Artagnan Romances)  "), "the-three-musketeers-dartagnan-romances");
        assert_eq!(make_url_safe("Science Fiction"), "science-fiction");
    }

    #[test]
    fn test_sorted_name() {
        assert_eq!(sorted_name("The Complete Sherlock Holmes"), "complete sherlock holmes");
        assert_eq!(sorted_name("An Émile Anthology"), "emile anthology");
        assert_eq!(sorted_name("Anthem"), "anthem");
    }

    #[test]
    fn test_null_if_empty() {
        assert_eq!(null_if_empty(Some("  ")), None);
        assert_eq!(null_if_empty(None), None);
        assert_eq!(null_if_empty(Some(" x ")), Some("x".to_string()));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.0 MB");
    }
}
