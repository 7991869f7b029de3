/*!
Splits text into syllable-like fragments for mouth animation.

This is a heuristic, not a linguistic syllable splitter. Each fragment closes
on a vowel and may pull in the consonants right after it, punctuation becomes
an explicit silence token.
*/

/// Token emitted for punctuation.
pub const SILENCE: &str = "sil";

const PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];
const CLUSTERS: [&str; 5] = ["ck", "dh", "gh", "sh", "th"];

/// A head gesture implied by the words being spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// "yes"
    Affirmative,
    /// "no", "not"
    Negative,
}

impl Gesture {
    fn from_word(word: &str) -> Option<Self> {
        let word = word.trim_matches(is_punctuation).to_lowercase();

        match word.as_str() {
            "yes" => Some(Self::Affirmative),
            "no" | "not" => Some(Self::Negative),
            _ => None,
        }
    }
}

pub fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

fn is_consonant(c: char) -> bool {
    c.is_alphabetic() && !is_vowel(c)
}

/// Split `text` into syllable tokens.
pub fn text_to_syllables(text: &str) -> Vec<String> {
    text_to_syllables_with(text, |_| {})
}

/// Split `text` into syllable tokens, reporting every gesture word to `on_gesture`.
pub fn text_to_syllables_with<F>(text: &str, mut on_gesture: F) -> Vec<String>
where
    F: FnMut(Gesture),
{
    let mut syllables = vec![];

    for word in text.split_whitespace() {
        if let Some(gesture) = Gesture::from_word(word) {
            on_gesture(gesture);
        }

        split_word(word, &mut syllables);
    }

    syllables
}

fn split_word(word: &str, out: &mut Vec<String>) {
    let chars = word.chars().collect::<Vec<char>>();
    let mut current = String::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;

        if is_punctuation(c) {
            flush(&mut current, out);
            out.push(SILENCE.to_string());
            continue;
        }

        current.push(c);
        if !is_vowel(c) {
            continue;
        }

        i += absorb_after_vowel(&chars[i..], &mut current);
        flush(&mut current, out);
    }

    flush(&mut current, out);
}

/// Pull the consonants that belong to the syllable ending at a vowel into
/// `current`. Returns how many characters were consumed.
fn absorb_after_vowel(rest: &[char], current: &mut String) -> usize {
    if rest.len() >= 2 {
        let pair = rest[..2].iter().collect::<String>().to_lowercase();
        if CLUSTERS.contains(&pair.as_str()) {
            current.extend(&rest[..2]);
            return 2;
        }
    }

    match rest {
        [c, next, ..] if is_consonant(*c) && !is_vowel(*next) => {
            current.push(*c);
            1
        }
        [c] if is_consonant(*c) => {
            current.push(*c);
            1
        }
        _ => 0,
    }
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    if !current.is_empty() {
        out.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<String> {
        text_to_syllables(text)
    }

    fn gestures(text: &str) -> Vec<Gesture> {
        let mut r = vec![];
        text_to_syllables_with(text, |g| r.push(g));
        r
    }

    #[test]
    fn empty() {
        assert!(split("").is_empty());
        assert!(split("   \t\n").is_empty());
    }

    #[test]
    fn sentence() {
        assert_eq!(
            split("Do you think this is ok?"),
            vec!["Do", "yo", "u", "thin", "k", "this", "is", "ok", "sil"]
        );
    }

    #[test]
    fn clusters_are_absorbed() {
        assert_eq!(split("back"), vec!["back"]);
        assert_eq!(split("other"), vec!["oth", "er"]);
        assert_eq!(split("ASHORE"), vec!["ASH", "O", "RE"]);
    }

    #[test]
    fn consonant_before_vowel_starts_next_syllable() {
        assert_eq!(split("banana"), vec!["ba", "na", "na"]);
    }

    #[test]
    fn no_vowels() {
        assert_eq!(split("hmm psst"), vec!["hmm", "psst"]);
    }

    #[test]
    fn punctuation_is_silence() {
        assert_eq!(split("Hi! No."), vec!["Hi", "sil", "No", "sil"]);
    }

    #[test]
    fn consecutive_punctuation() {
        assert_eq!(split("what?!"), vec!["what", "sil", "sil"]);
        assert_eq!(split("..."), vec!["sil", "sil", "sil"]);
    }

    #[test]
    fn punctuation_inside_word_flushes() {
        assert_eq!(split("a,b"), vec!["a", "sil", "b"]);
    }

    #[test]
    fn keeps_alphabetic_content() {
        for text in [
            "Do you think this is ok?",
            "The quick brown fox; jumps over the lazy dog!",
            "Strengths, rhythms: and crwth.",
            "AEIOU aeiou",
        ] {
            let joined = split(text)
                .into_iter()
                .filter(|v| v != SILENCE)
                .collect::<String>();
            let expected = text
                .chars()
                .filter(|c| !c.is_whitespace() && !is_punctuation(*c))
                .collect::<String>();

            assert_eq!(joined, expected, "{text}");
        }
    }

    #[test]
    fn restartable() {
        let text = "Yes, this is not a test.";

        assert_eq!(split(text), split(text));
    }

    mod gesture {
        use super::*;

        #[test]
        fn negative_once() {
            assert_eq!(gestures("Hi! No."), vec![Gesture::Negative]);
        }

        #[test]
        fn affirmative() {
            assert_eq!(gestures("yes"), vec![Gesture::Affirmative]);
            assert_eq!(gestures("YES!"), vec![Gesture::Affirmative]);
        }

        #[test]
        fn in_order() {
            assert_eq!(
                gestures("Yes, but not now. No!"),
                vec![Gesture::Affirmative, Gesture::Negative, Gesture::Negative]
            );
        }

        #[test]
        fn only_whole_words() {
            assert!(gestures("yesterday nothing know note").is_empty());
        }

        #[test]
        fn does_not_change_tokens() {
            let mut count = 0;
            let with = text_to_syllables_with("no yes", |_| count += 1);

            assert_eq!(with, split("no yes"));
            assert_eq!(count, 2);
        }
    }
}
