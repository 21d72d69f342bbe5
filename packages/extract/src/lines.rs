//! Token → line reconstruction.
//!
//! Groups tokens by `(page, line_id)`, orders each group by left edge, and
//! joins the texts with single spaces. The `BTreeMap` key order *is* the
//! document order every downstream pass walks: page ascending, then line id
//! ascending.

use std::collections::BTreeMap;

use rebate_docs_extract_models::{Token, TokenKind};

use crate::patterns::{self, PatternSet};

/// Key identifying one reconstructed line: `(page, line_id)`.
pub type LineKey = (u32, u32);

/// Rebuilds full text lines from positioned tokens.
///
/// Every token lands in exactly one line; nothing is dropped. Within a
/// line, tokens are sorted by their left edge regardless of input order.
#[must_use]
pub fn rebuild_lines(tokens: &[Token]) -> BTreeMap<LineKey, String> {
    let mut buckets: BTreeMap<LineKey, Vec<&Token>> = BTreeMap::new();
    for token in tokens {
        buckets.entry((token.page, token.line_id)).or_default().push(token);
    }

    buckets
        .into_iter()
        .map(|(key, mut group)| {
            group.sort_by(|a, b| a.bbox.0.total_cmp(&b.bbox.0));
            let text = group
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_owned();
            (key, text)
        })
        .collect()
}

/// Tags each token as money or label where it matches; all other tokens
/// keep no tag. Returns `(money, label)` counts for the log summary.
pub fn classify_tokens(tokens: &mut [Token], patterns: &PatternSet) -> (usize, usize) {
    let mut money = 0;
    let mut labels = 0;
    for token in tokens {
        let text = token.text.trim();
        if patterns.money_token.is_match(text) {
            token.kind = Some(TokenKind::Money);
            money += 1;
        } else if patterns::label_key(text).is_some() {
            token.kind = Some(TokenKind::Label);
            labels += 1;
        } else {
            token.kind = None;
        }
    }
    (money, labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, left: f64, page: u32, line_id: u32) -> Token {
        Token {
            text: text.to_string(),
            bbox: (left, 0.0, left + 40.0, 10.0),
            page,
            line_id,
            block_id: None,
            kind: None,
        }
    }

    #[test]
    fn groups_tokens_by_page_and_line() {
        let tokens = vec![
            token("Hello", 0.0, 1, 1),
            token("World", 60.0, 1, 1),
            token("Second", 0.0, 1, 2),
            token("Line", 60.0, 1, 2),
        ];
        let lines = rebuild_lines(&tokens);
        assert_eq!(lines[&(1, 1)], "Hello World");
        assert_eq!(lines[&(1, 2)], "Second Line");
    }

    #[test]
    fn sorts_tokens_left_to_right_regardless_of_input_order() {
        let tokens = vec![token("World", 60.0, 1, 1), token("Hello", 0.0, 1, 1)];
        let lines = rebuild_lines(&tokens);
        assert_eq!(lines[&(1, 1)], "Hello World");
    }

    #[test]
    fn iterates_in_page_then_line_order() {
        let tokens = vec![
            token("b", 0.0, 2, 1),
            token("c", 0.0, 2, 5),
            token("a", 0.0, 1, 9),
        ];
        let lines = rebuild_lines(&tokens);
        let keys: Vec<LineKey> = lines.keys().copied().collect();
        assert_eq!(keys, vec![(1, 9), (2, 1), (2, 5)]);
    }

    #[test]
    fn classification_tags_money_and_labels() {
        let patterns = PatternSet::new();
        let mut tokens = vec![
            token("$1,500", 0.0, 1, 1),
            token("Bonus", 50.0, 1, 1),
            token("widget", 90.0, 1, 1),
        ];
        let (money, labels) = classify_tokens(&mut tokens, &patterns);
        assert_eq!((money, labels), (1, 1));
        assert_eq!(tokens[0].kind, Some(TokenKind::Money));
        assert_eq!(tokens[1].kind, Some(TokenKind::Label));
        assert_eq!(tokens[2].kind, None);
    }
}
