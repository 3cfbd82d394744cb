//! Hyphenation: where a word may be broken across two lines.

use std::collections::HashMap;

/// Locale-specific source of hyphenation points. Implementations are stateless given
/// the word, so results can be cached for the duration of a render.
pub trait Hyphenator {
    /// Character offsets (ascending) at which `word` may be broken, leaving at least
    /// `min_chars` characters on either side
    fn break_points(&self, word: &str, min_chars: usize) -> Vec<usize>;
}

/// Liang-pattern hyphenation backed by [hypher]
pub struct PatternHyphenator {
    lang: hypher::Lang,
}

impl PatternHyphenator {
    /// Build a hyphenator for a two-letter ISO 639-1 language code
    pub fn for_language(code: &str) -> Option<PatternHyphenator> {
        let bytes: [u8; 2] = code.to_ascii_lowercase().as_bytes().try_into().ok()?;
        hypher::Lang::from_iso(bytes).map(|lang| PatternHyphenator { lang })
    }
}

impl Hyphenator for PatternHyphenator {
    fn break_points(&self, word: &str, min_chars: usize) -> Vec<usize> {
        // only the alphabetic core is hyphenated: "(extensive)," keeps its punctuation
        let chars: Vec<char> = word.chars().collect();
        let Some(start) = chars.iter().position(|c| c.is_alphabetic()) else {
            return Vec::new();
        };
        let end = chars.len() - chars.iter().rev().take_while(|c| !c.is_alphabetic()).count();
        let core: String = chars[start..end].iter().collect();
        if core.chars().any(|c| !c.is_alphabetic()) {
            return Vec::new();
        }

        let min_chars = min_chars.max(1);
        let mut offset = start;
        let mut points = Vec::new();
        for syllable in hypher::hyphenate_bounded(&core, self.lang, min_chars, min_chars) {
            offset += syllable.chars().count();
            points.push(offset);
        }
        // the final "break" is the end of the core
        points.pop();
        points
    }
}

/// The order in which break points are offered to the line breaker
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum HyphenationOrder {
    /// Try the longest first part first, filling the line as much as possible
    #[default]
    LongestFirst,
    ShortestFirst,
}

/// Hyphenators registered for a document, keyed by language code. Languages without
/// a registered hyphenator use [PatternHyphenator] when [hypher] knows them.
#[derive(Default)]
pub struct Hyphenators {
    custom: HashMap<String, Box<dyn Hyphenator>>,
}

impl Hyphenators {
    pub fn register<H: Hyphenator + 'static>(&mut self, lang: &str, hyphenator: H) {
        self.custom.insert(lang.to_string(), Box::new(hyphenator));
    }
}

/// Break points computed during one render, keyed by (language, minimum, word)
#[derive(Default)]
pub(crate) struct HyphenationCache {
    patterns: HashMap<String, Option<PatternHyphenator>>,
    words: HashMap<(String, usize, String), Vec<usize>>,
}

impl HyphenationCache {
    /// Every way to split `word` in two, ordered according to `order`
    pub(crate) fn candidates(
        &mut self,
        registry: &Hyphenators,
        lang: &str,
        min_chars: usize,
        word: &str,
        order: HyphenationOrder,
    ) -> Vec<(String, String)> {
        let key = (lang.to_string(), min_chars, word.to_string());
        if !self.words.contains_key(&key) {
            let points = match registry.custom.get(lang) {
                Some(custom) => custom.break_points(word, min_chars),
                None => self
                    .patterns
                    .entry(lang.to_string())
                    .or_insert_with(|| PatternHyphenator::for_language(lang))
                    .as_ref()
                    .map(|pattern| pattern.break_points(word, min_chars))
                    .unwrap_or_default(),
            };
            self.words.insert(key.clone(), points);
        }
        let points = self.words.get(&key).map(Vec::as_slice).unwrap_or_default();
        split_candidates(word, points, order)
    }
}

/// Split `word` at each of `points` (character offsets)
pub(crate) fn split_candidates(
    word: &str,
    points: &[usize],
    order: HyphenationOrder,
) -> Vec<(String, String)> {
    let mut splits: Vec<(String, String)> = points
        .iter()
        .filter_map(|&point| {
            let (byte, _) = word.char_indices().nth(point)?;
            (byte > 0).then(|| (word[..byte].to_string(), word[byte..].to_string()))
        })
        .collect();
    if order == HyphenationOrder::LongestFirst {
        splits.reverse();
    }
    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_break_points() {
        let english = PatternHyphenator::for_language("en").unwrap();
        assert_eq!(english.break_points("extensive", 2), vec![2, 5]);
        assert_eq!(english.break_points("(extensive),", 2), vec![3, 6]);
        assert!(english.break_points("a", 2).is_empty());
        assert!(PatternHyphenator::for_language("xx").is_none());
    }

    #[test]
    fn candidates_longest_first() {
        let splits = split_candidates("extensive", &[2, 5], HyphenationOrder::LongestFirst);
        assert_eq!(
            splits,
            vec![
                ("exten".to_string(), "sive".to_string()),
                ("ex".to_string(), "tensive".to_string()),
            ]
        );
        for (first, second) in splits {
            assert_eq!(format!("{first}{second}"), "extensive");
        }
    }

    #[test]
    fn custom_hyphenators_take_precedence() {
        struct Everywhere;
        impl Hyphenator for Everywhere {
            fn break_points(&self, word: &str, _min_chars: usize) -> Vec<usize> {
                (1..word.chars().count()).collect()
            }
        }

        let mut registry = Hyphenators::default();
        registry.register("en", Everywhere);
        let mut cache = HyphenationCache::default();
        let splits =
            cache.candidates(&registry, "en", 2, "abc", HyphenationOrder::ShortestFirst);
        assert_eq!(splits[0], ("a".to_string(), "bc".to_string()));
        assert_eq!(splits.len(), 2);
    }
}
