use crate::ast::{CommonToken, StlcToken};

/// What the structural scans need from a token alphabet.
pub trait Scannable {
    fn is_lparen(&self) -> bool;
    fn is_rparen(&self) -> bool;
    /// Kind equality for occurrence counting.
    fn same_kind(&self, other: &Self) -> bool;
}

impl Scannable for CommonToken {
    fn is_lparen(&self) -> bool {
        matches!(self, CommonToken::LParen)
    }
    fn is_rparen(&self) -> bool {
        matches!(self, CommonToken::RParen)
    }
    // an annotation's base type is part of its kind
    fn same_kind(&self, other: &Self) -> bool {
        self == other
    }
}

impl Scannable for StlcToken {
    fn is_lparen(&self) -> bool {
        matches!(self, StlcToken::LParen)
    }
    fn is_rparen(&self) -> bool {
        matches!(self, StlcToken::RParen)
    }
    // every variable is one kind, whatever its name or binding state
    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Running paren count over one scan: +1 per `(`, -1 per `)`. Zero means
/// equal counts; it does not prove well-nesting.
pub fn bracket_balance<T: Scannable>(tokens: &[T]) -> i32 {
    let mut count = 0;
    for token in tokens {
        if token.is_lparen() {
            count += 1;
        } else if token.is_rparen() {
            count -= 1;
        }
    }
    count
}

/// Index of the `n`-th token (counting from 1) whose kind matches `target`.
/// Purely lexical counting: nesting is invisible to it, so the clause
/// boundaries the engines locate with `n = 2` stop being meaningful once
/// conditionals nest deep enough to reuse a keyword more than twice.
pub fn index_of_nth<T: Scannable>(tokens: &[T], target: &T, n: usize) -> Option<usize> {
    let mut seen = 0;
    for (index, token) in tokens.iter().enumerate() {
        if token.same_kind(target) {
            seen += 1;
            if seen == n {
                return Some(index);
            }
        }
    }
    None
}

/// Slice under the clause splitter's index conventions: negative positions
/// count from the end, out-of-range positions clamp, and an inverted range
/// is empty. `end = None` runs to the end. The splitter feeds boundary
/// positions straight in here, not-found encoded as -1, so these rules are
/// part of its preserved behavior.
pub fn clamped_slice<T: Clone>(tokens: &[T], start: isize, end: Option<isize>) -> Vec<T> {
    let len = tokens.len() as isize;
    let clamp = |position: isize| -> usize {
        if position < 0 {
            (len + position).max(0) as usize
        } else {
            position.min(len) as usize
        }
    };
    let from = clamp(start);
    let to = clamp(end.unwrap_or(len));
    if from >= to {
        return vec![];
    }
    tokens[from..to].to_vec()
}

/// The run with its first `(` and last `)` removed. Callers have already
/// established that both exist.
pub fn strip_outer_parens<T: Scannable + Clone>(tokens: &[T]) -> Vec<T> {
    let first_open = tokens.iter().position(|token| token.is_lparen());
    let last_close = tokens.iter().rposition(|token| token.is_rparen());
    tokens
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != first_open && Some(*index) != last_close)
        .map(|(_, token)| token.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BaseType;

    #[test]
    fn test_balance() {
        let balanced = vec![
            CommonToken::LParen,
            CommonToken::Zero,
            CommonToken::RParen,
        ];
        assert_eq!(bracket_balance(&balanced), 0);
        // equal counts pass even when the nesting order is wrong
        let crossed = vec![CommonToken::RParen, CommonToken::LParen];
        assert_eq!(bracket_balance(&crossed), 0);
        assert_eq!(bracket_balance(&[CommonToken::LParen]), 1);
        assert_eq!(bracket_balance(&[CommonToken::RParen]), -1);
        assert_eq!(bracket_balance::<CommonToken>(&[]), 0);
    }

    #[test]
    fn test_nth_occurrence() {
        let tokens = vec![
            CommonToken::If,
            CommonToken::True,
            CommonToken::Then,
            CommonToken::Zero,
            CommonToken::Then,
            CommonToken::Else,
        ];
        assert_eq!(index_of_nth(&tokens, &CommonToken::Then, 1), Some(2));
        assert_eq!(index_of_nth(&tokens, &CommonToken::Then, 2), Some(4));
        assert_eq!(index_of_nth(&tokens, &CommonToken::Then, 3), None);
        assert_eq!(index_of_nth(&tokens, &CommonToken::Else, 2), None);
        assert_eq!(index_of_nth(&tokens, &CommonToken::Pred, 2), None);
    }

    #[test]
    fn test_clamped_slice() {
        let tokens = vec![
            CommonToken::If,
            CommonToken::True,
            CommonToken::Then,
            CommonToken::Zero,
        ];
        assert_eq!(clamped_slice(&tokens, 0, Some(2)).len(), 2);
        // -1 + 1 == 0 when a boundary was never found
        assert_eq!(clamped_slice(&tokens, -1 + 1, None).len(), 4);
        assert_eq!(clamped_slice(&tokens, 0, Some(-1)).len(), 3);
        assert_eq!(clamped_slice(&tokens, -1, Some(2)).len(), 0);
        assert_eq!(
            clamped_slice(&tokens, -1, None),
            vec![CommonToken::Zero]
        );
        assert_eq!(clamped_slice(&tokens, 9, None).len(), 0);
    }

    #[test]
    fn test_strip_outer_parens() {
        let tokens = vec![
            CommonToken::LParen,
            CommonToken::Succ,
            CommonToken::LParen,
            CommonToken::Zero,
            CommonToken::RParen,
            CommonToken::RParen,
        ];
        let interior = strip_outer_parens(&tokens);
        assert_eq!(
            interior,
            vec![
                CommonToken::Succ,
                CommonToken::LParen,
                CommonToken::Zero,
                CommonToken::RParen,
            ]
        );
    }

    #[test]
    fn test_kind_equality() {
        // common annotations split by their base type
        assert!(
            !CommonToken::TypeAnnotation(BaseType::Nat)
                .same_kind(&CommonToken::TypeAnnotation(BaseType::Bool))
        );
        // variables are one kind regardless of name
        let x = StlcToken::var("x", BaseType::Nat);
        let y = StlcToken::var("y", BaseType::Bool);
        assert!(x.same_kind(&y));
        assert!(!x.same_kind(&StlcToken::OpaqueFn));
    }
}
