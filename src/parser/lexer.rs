use itertools::Itertools;

// An occurrence of `name[index]` inside an attribute equation
#[derive(PartialEq, Debug, Clone)]
pub struct AttributeToken {
    pub name: String,
    // None when the written index does not fit into a usize
    pub index: Option<usize>,
}

impl AttributeToken {
    // Whether the token addresses a symbol of a rule with `max_index` + 1 symbols
    pub fn index_within(&self, max_index: usize) -> Option<usize> {
        self.index.filter(|&index| index <= max_index)
    }
}

pub fn text_is_empty(text: &str) -> bool {
    text.trim().is_empty()
}

// Splits grammar text into rows, with runs of spaces and tabs squashed into one space
pub fn split_into_rows(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|row| {
            row.chars()
                .map(|c| if c == '\t' { ' ' } else { c })
                .coalesce(|a, b| if a == ' ' && b == ' ' { Ok(a) } else { Err((a, b)) })
                .collect()
        })
        .collect()
}

pub fn split_into_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn contains_any(text: &str, characters: &[char]) -> bool {
    text.contains(characters)
}

fn is_word_character(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Finds every `name[index]` in `text`, left to right and without overlap.
///
/// `name` is the longest run of word characters (ASCII letters, digits,
/// underscore) directly in front of the bracket and after the previous match.
/// Anything around the matches is ignored, so `max(z[1], z[2])` yields two
/// tokens and `0` yields none.
pub fn scan_attributes(text: &str) -> Vec<AttributeToken> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut word_start: Option<usize> = None;

    while let Some((position, c)) = chars.next() {
        if c == '[' {
            let Some(start) = word_start.take() else {
                continue;
            };

            let digits: String = chars
                .peeking_take_while(|&(_, c)| c.is_ascii_digit())
                .map(|(_, c)| c)
                .collect();

            if digits.is_empty() {
                continue;
            }

            if chars.peek().map(|&(_, c)| c) != Some(']') {
                // The digits begin a new word that may still precede a bracket
                word_start = Some(position + 1);
                continue;
            }
            chars.next(); // Consume the closing bracket

            tokens.push(AttributeToken {
                name: text[start..position].to_string(),
                index: digits.parse().ok(),
            });
        } else if is_word_character(c) {
            word_start.get_or_insert(position);
        } else {
            word_start = None;
        }
    }

    return tokens;
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use super::*;

    fn token(name: &str, index: usize) -> AttributeToken {
        AttributeToken {
            name: name.to_string(),
            index: Some(index),
        }
    }

    #[test]
    fn split_rows() {
        let text = "S  ->\tL : h[0] =  h[1]\n\nL -> a";
        assert_eq!(split_into_rows(text), vec!["S -> L : h[0] = h[1]", "", "L -> a"]);
    }

    #[test]
    fn split_words() {
        assert_eq!(split_into_words(" L  a b "), vec!["L", "a", "b"]);
        assert!(split_into_words("  ").is_empty());
    }

    #[test]
    fn empty_texts() {
        assert!(text_is_empty(""));
        assert!(text_is_empty(" \t "));
        assert!(!text_is_empty(" a "));
    }

    #[test]
    fn forbidden_characters() {
        assert!(contains_any("A = b", &['[', ']', ';', '=']));
        assert!(!contains_any("A b", &['[', ']', ';', '=']));
    }

    #[test]
    fn scan_single_attributes() {
        let texts = vec!["z[0]", " h[1] ", "value_2[12]", "abc[3]"];
        let answers = vec![token("z", 0), token("h", 1), token("value_2", 12), token("abc", 3)];

        for (text, answer) in zip(texts, answers) {
            assert_eq!(scan_attributes(text), vec![answer]);
        }
    }

    #[test]
    fn scan_expressions() {
        let texts = vec![
            "max(z[1], z[2])",
            "x[0]+y[1]",
            "z[1]2[3]",
            "a[12[3]",
            "a[12b[3]",
        ];
        let answers = vec![
            vec![token("z", 1), token("z", 2)],
            vec![token("x", 0), token("y", 1)],
            vec![token("z", 1), token("2", 3)],
            vec![token("12", 3)],
            vec![token("12b", 3)],
        ];

        for (text, answer) in zip(texts, answers) {
            assert_eq!(scan_attributes(text), answer);
        }
    }

    #[test]
    fn scan_without_attributes() {
        let texts = vec!["0", "", "z[ 1]", "[1]", "z[]", "z [1]", "z[x]"];

        for text in texts {
            assert_eq!(scan_attributes(text), vec![], "{}", text);
        }
    }

    #[test]
    fn scan_huge_index() {
        let tokens = scan_attributes("z[99999999999999999999999]");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].index, None);
        assert_eq!(tokens[0].index_within(5), None);
        assert_eq!(token("z", 2).index_within(2), Some(2));
        assert_eq!(token("z", 3).index_within(2), None);
    }
}
