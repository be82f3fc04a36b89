//! Renders the publicly visible form of a solution.

use super::guesses::ClassifiedGuesses;

/// Stands in for every letter that has not been guessed yet.
pub const REDACTED: char = '_';

/// Reveal the guessed letters of `solution`.
///
/// Whitespace is always shown. A full-phrase attempt equal to the solution
/// reveals it entirely. The output has as many characters as the input.
pub fn mask(solution: &str, guesses: &ClassifiedGuesses) -> String {
    if guesses.contains_phrase(solution) {
        return solution.to_owned();
    }

    solution
        .chars()
        .map(|c| {
            if c.is_whitespace() || guesses.has_letter(c) {
                c
            } else {
                REDACTED
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guesses(texts: &[&str]) -> ClassifiedGuesses {
        ClassifiedGuesses::classify(texts.iter().copied())
    }

    #[test]
    fn reveals_guessed_letters_only() {
        assert_eq!(mask("go fish", &guesses(&["g", "o"])), "go ____");
    }

    #[test]
    fn nothing_guessed_keeps_whitespace() {
        assert_eq!(mask("a b\tc", &guesses(&[])), "_ _\t_");
    }

    #[test]
    fn matching_phrase_wins() {
        assert_eq!(mask("go fish", &guesses(&["x", "go fish"])), "go fish");
    }

    #[test]
    fn near_miss_phrase_reveals_nothing_extra() {
        assert_eq!(mask("go fish", &guesses(&["go fist"])), "__ ____");
    }

    #[test]
    fn letters_are_case_sensitive() {
        assert_eq!(mask("Go go", &guesses(&["g"])), "__ g_");
    }

    #[test]
    fn output_length_and_idempotence() {
        let set = guesses(&["e", "l"]);
        for solution in ["hello world", "", "  ", "élan vital"] {
            let once = mask(solution, &set);
            assert_eq!(once.chars().count(), solution.chars().count());
            assert_eq!(mask(solution, &set), once);
        }
    }
}
