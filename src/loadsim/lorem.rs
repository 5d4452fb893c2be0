//! Filler text for load simulation

use rand::seq::SliceRandom;
use rand::Rng;

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
    "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia", "deserunt",
    "mollit", "anim", "id", "est", "laborum", "finibus", "bonorum", "malorum", "extremes",
    "cicero", "treatise", "ethics", "renaissance", "printer", "galley", "type", "specimen",
];

/// A sentence of `words` random words, capitalized and terminated with a period.
///
/// Zero words yields an empty string.
pub fn sentence<R: Rng + ?Sized>(rng: &mut R, words: usize) -> String {
    if words == 0 {
        return String::new();
    }

    let mut out = String::with_capacity(words * 8);
    for i in 0..words {
        let word = WORDS.choose(rng).copied().unwrap_or("lorem");
        if i == 0 {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push(' ');
            out.push_str(word);
        }
    }
    out.push('.');
    out
}
