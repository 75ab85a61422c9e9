use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;
const FALLBACK_SLUG: &str = "business";

/// Lowercase, hyphen-separated slug. Apostrophes vanish (`Joe's` -> `joes`),
/// `&` reads as `and`, common Latin accents fold to ASCII.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if matches!(ch, '\'' | '\u{2019}' | '"') {
            continue;
        }

        if ch == '&' {
            push_separator(&mut slug, &mut pending_separator);
            slug.push_str("and");
            pending_separator = true;
            continue;
        }

        match fold_ascii(ch) {
            Some(c) => {
                push_separator(&mut slug, &mut pending_separator);
                slug.push(c);
            }
            None => pending_separator = true,
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// `base` followed by a short random suffix, used when `base` is taken.
pub fn with_random_suffix<R: Rng + ?Sized>(base: &str, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{base}-{suffix}")
}

fn push_separator(slug: &mut String, pending: &mut bool) {
    if *pending && !slug.is_empty() {
        slug.push('-');
    }
    *pending = false;
}

fn fold_ascii(ch: char) -> Option<char> {
    if ch.is_ascii_alphanumeric() {
        return Some(ch.to_ascii_lowercase());
    }
    let folded = match ch.to_lowercase().next().unwrap_or(ch) {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(folded)
}
