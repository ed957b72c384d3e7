//! Derivation engine for the arith/bool calculus. One pass over the token
//! run builds the whole tree: the head token picks the rule, the rule
//! recurses on the rest. Conditionals are the exception; their clause
//! splitter works on keyword positions, not nesting, and its exact slicing
//! behaviour is part of the engine's contract.

use either::Either;

use crate::ast::{BaseType, CommonToken, TypeSignature};
use crate::derivation::{
    Derivation, DerivationResult, DeriveError, MatchStatus, RuleName, Sequent, Turnstile,
};
use crate::render;
use crate::scan;

/// How conclusions of this calculus are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presentation {
    /// Sequent style: every judgement opens with a turnstile.
    #[default]
    Sequent,
    /// T-NBL, the bracket-free style: judgements carry no turnstile.
    Tnbl,
}

impl Presentation {
    fn turnstile(self) -> Turnstile {
        match self {
            Presentation::Sequent => Turnstile::Plain,
            Presentation::Tnbl => Turnstile::Bare,
        }
    }
}

/// Builds the typing tree for `tokens` against `expected`, where `None`
/// leaves the type to be inferred. Structural faults come back as `Err`;
/// plain type clashes stay inside the tree as mismatch markers.
pub fn analyze(
    tokens: &[CommonToken],
    expected: Option<&TypeSignature>,
    mode: Presentation,
) -> Result<Derivation, DeriveError> {
    let expected = match expected {
        Some(signature) => signature.clone(),
        None => TypeSignature::unconstrained(),
    };
    analyze_with(tokens, &expected, false, mode)
}

/// Callback-surface variant of [`analyze`]: a structural fault is handed to
/// `on_error` exactly once and the sentinel result comes back in its place.
pub fn derive(
    tokens: &[CommonToken],
    expected: Option<&TypeSignature>,
    mode: Presentation,
    mut on_error: impl FnMut(&str),
) -> DerivationResult {
    match analyze(tokens, expected, mode) {
        Ok(derivation) => DerivationResult {
            proof: render::proof_string(&derivation),
            ty: derivation.ty,
        },
        Err(error) => {
            on_error(&error.to_string());
            DerivationResult::sentinel()
        }
    }
}

fn analyze_with(
    tokens: &[CommonToken],
    expected: &TypeSignature,
    inner: bool,
    mode: Presentation,
) -> Result<Derivation, DeriveError> {
    if tokens.is_empty() {
        return Err(DeriveError::EmptyExpression);
    }
    if scan::bracket_balance(tokens) != 0 {
        return Err(DeriveError::BracketsMismatch);
    }

    match &tokens[0] {
        CommonToken::True => Ok(boolean_literal(tokens, expected, RuleName::TTrue, mode)),
        CommonToken::False => Ok(boolean_literal(tokens, expected, RuleName::TFalse, mode)),
        CommonToken::Pred => unary_nat(tokens, expected, RuleName::TPred, mode),
        CommonToken::Succ => unary_nat(tokens, expected, RuleName::TSucc, mode),
        CommonToken::IsZero => is_zero(tokens, expected, mode),
        CommonToken::Zero => Ok(zero_literal(tokens, expected, mode)),
        CommonToken::If => conditional(tokens, expected, inner, mode),
        CommonToken::LParen => bracket(tokens, expected, mode),
        _ => Err(DeriveError::UndefinedConstruct),
    }
}

fn sequent(tokens: &[CommonToken], shown: TypeSignature, mode: Presentation) -> Sequent {
    Sequent {
        turnstile: mode.turnstile(),
        binders: vec![],
        words: tokens.iter().map(|token| token.to_string()).collect(),
        shown,
    }
}

// T-true / T-false. The judged type is Bool no matter what was expected.
fn boolean_literal(
    tokens: &[CommonToken],
    expected: &TypeSignature,
    rule: RuleName,
    mode: Presentation,
) -> Derivation {
    let (status, shown) = if expected.is_base(BaseType::Bool) {
        (MatchStatus::Exact, expected.clone())
    } else if expected.is_unconstrained() {
        (MatchStatus::Exact, TypeSignature::base(BaseType::Bool))
    } else {
        (MatchStatus::Mismatched, expected.clone())
    };
    Derivation {
        conclusion: sequent(tokens, shown, mode),
        rule,
        premises: vec![],
        status,
        ty: TypeSignature::base(BaseType::Bool),
    }
}

// T-zero. The conclusion always writes Nat; only the marker tracks the
// expectation.
fn zero_literal(
    tokens: &[CommonToken],
    expected: &TypeSignature,
    mode: Presentation,
) -> Derivation {
    let exact = expected.is_base(BaseType::Nat) || expected.is_unconstrained();
    Derivation {
        conclusion: sequent(tokens, TypeSignature::base(BaseType::Nat), mode),
        rule: RuleName::TZero,
        premises: vec![],
        status: MatchStatus::of(exact),
        ty: TypeSignature::base(BaseType::Nat),
    }
}

// T-succ / T-pred. The operand is judged against the same expectation.
// Either a Nat expectation or a Nat operand counts as a fit, so `succ`
// over a mismatched operand can still conclude exactly.
fn unary_nat(
    tokens: &[CommonToken],
    expected: &TypeSignature,
    rule: RuleName,
    mode: Presentation,
) -> Result<Derivation, DeriveError> {
    if tokens.len() < 2 {
        return Err(match rule {
            RuleName::TPred => DeriveError::PredWithoutArgument,
            _ => DeriveError::SuccWithoutArgument,
        });
    }

    let operand = analyze_with(&tokens[1..], expected, false, mode)?;
    let operand_nat = operand.ty.is_base(BaseType::Nat);

    let (status, shown, ty) = if expected.len() == 1 {
        let fits = expected.is_base(BaseType::Nat) || operand_nat;
        let ty = if fits {
            expected.clone()
        } else {
            operand.ty.clone()
        };
        (MatchStatus::of(fits), expected.clone(), ty)
    } else if expected.is_unconstrained() && operand.ty.len() == 1 {
        (
            MatchStatus::of(operand_nat),
            operand.ty.clone(),
            operand.ty.clone(),
        )
    } else {
        (MatchStatus::Mismatched, expected.clone(), expected.clone())
    };

    Ok(Derivation {
        conclusion: sequent(tokens, shown, mode),
        rule,
        premises: vec![Either::Left(operand)],
        status,
        ty,
    })
}

// T-iszero. The operand is always judged as a natural.
fn is_zero(
    tokens: &[CommonToken],
    expected: &TypeSignature,
    mode: Presentation,
) -> Result<Derivation, DeriveError> {
    if tokens.len() < 2 {
        return Err(DeriveError::IsZeroWithoutArgument);
    }

    let operand = analyze_with(
        &tokens[1..],
        &TypeSignature::base(BaseType::Nat),
        false,
        mode,
    )?;

    let (status, shown) = if expected.len() == 1 {
        (
            MatchStatus::of(expected.is_base(BaseType::Bool)),
            expected.clone(),
        )
    } else if expected.is_unconstrained() && operand.ty.len() == 1 {
        (
            MatchStatus::of(operand.ty.is_base(BaseType::Nat)),
            TypeSignature::base(BaseType::Bool),
        )
    } else {
        (MatchStatus::Mismatched, expected.clone())
    };

    let ty = shown.clone();
    Ok(Derivation {
        conclusion: sequent(tokens, shown, mode),
        rule: RuleName::TIsZero,
        premises: vec![Either::Left(operand)],
        status,
        ty,
    })
}

// T-bra. Strips one layer of brackets and re-derives the interior. The
// conclusion itself never carries a marker.
fn bracket(
    tokens: &[CommonToken],
    expected: &TypeSignature,
    mode: Presentation,
) -> Result<Derivation, DeriveError> {
    if tokens.len() < 3 {
        return Err(DeriveError::BraTooShort);
    }
    if scan::bracket_balance(tokens) != 0 {
        return Err(DeriveError::BraUnbalanced);
    }

    let interior = scan::strip_outer_parens(tokens);
    let inner = analyze_with(&interior, expected, false, mode)?;

    let (shown, ty) = if expected.is_unconstrained() {
        (inner.ty.clone(), inner.ty.clone())
    } else {
        (expected.clone(), expected.clone())
    };
    Ok(Derivation {
        conclusion: sequent(tokens, shown, mode),
        rule: RuleName::TBra,
        premises: vec![Either::Left(inner)],
        status: MatchStatus::Exact,
        ty,
    })
}

// IF-THEN-ELSE. Three scans partition the run into condition, then and
// else clauses. The scans count keywords without regard to nesting: a
// nested `if` in the condition is bounded by the second `then`, one in the
// then clause by the second `else`, and one in the else clause swallows
// the remainder. Keyword bookkeeping (the `remove(0)` after a boundary,
// indices carried from one scan into the next, slice starts one before
// the nested `if`) is deliberate and load-bearing; clause recovery past
// one nesting level degrades in exactly the way these rules dictate.
fn conditional(
    tokens: &[CommonToken],
    expected: &TypeSignature,
    inner: bool,
    mode: Presentation,
) -> Result<Derivation, DeriveError> {
    if tokens.is_empty() {
        return Err(DeriveError::EmptyConditional);
    }

    // nested conditionals are not accepted at Nat positions
    let correct =
        !(matches!(tokens[0], CommonToken::If) && inner && expected.is_base(BaseType::Nat));

    let mut expression: Vec<CommonToken> = if matches!(tokens[0], CommonToken::If) {
        tokens[1..].to_vec()
    } else {
        tokens.to_vec()
    };

    let mut if_clause: Vec<CommonToken> = Vec::new();
    let mut then_clause: Vec<CommonToken> = Vec::new();
    let mut else_clause: Vec<CommonToken> = Vec::new();

    let mut nested_if: Option<Derivation> = None;
    let mut nested_then: Option<Derivation> = None;
    let mut nested_else: Option<Derivation> = None;

    // condition clause, up to the first `then`
    let mut i_if = 0;
    while i_if < expression.len() {
        let current = expression[i_if].clone();
        match current {
            CommonToken::Then => {
                if i_if == expression.len() - 1 {
                    return Err(DeriveError::DanglingThen);
                }
                expression.remove(0);
                break;
            }
            CommonToken::If => {
                let rest = expression[i_if..].to_vec();
                let split = scan::index_of_nth(&rest, &CommonToken::Then, 2)
                    .map(|index| index as isize)
                    .unwrap_or(-1);
                let clause =
                    [if_clause.clone(), scan::clamped_slice(&rest, 0, Some(split))].concat();
                expression = scan::clamped_slice(&rest, split + 1, None);
                nested_if = Some(analyze_with(
                    &clause,
                    &TypeSignature::base(BaseType::Bool),
                    true,
                    mode,
                )?);
                i_if = 0;
                break;
            }
            _ => {
                if_clause.push(current);
                if i_if == expression.len() - 1 {
                    return Err(DeriveError::ThenClauseMissing);
                }
                i_if += 1;
            }
        }
    }

    // then clause, up to the first `else`; the scan resumes where the
    // previous one stopped
    let mut i_then = i_if;
    while i_then < expression.len() {
        let current = expression[i_then].clone();
        match current {
            CommonToken::Else => {
                if i_then == expression.len() - 1 {
                    return Err(DeriveError::DanglingElse);
                }
                expression.remove(0);
                break;
            }
            CommonToken::If => {
                let rest = expression[i_then..].to_vec();
                let split = scan::index_of_nth(&rest, &CommonToken::Else, 2)
                    .map(|index| index as isize)
                    .unwrap_or(-1);
                let clause = [
                    then_clause.clone(),
                    scan::clamped_slice(&rest, i_then as isize - 1, Some(split)),
                ]
                .concat();
                expression = scan::clamped_slice(&rest, split + 1, None);
                nested_then = Some(analyze_with(&clause, expected, true, mode)?);
                i_then = 0;
                break;
            }
            _ => {
                then_clause.push(current);
                if i_then == expression.len() - 1 {
                    return Err(DeriveError::ElseClauseMissing);
                }
                i_then += 1;
            }
        }
    }

    // else clause: everything that remains, a nested `if` taking the
    // whole remainder from one before its own position
    let mut i_else = i_then;
    while i_else < expression.len() {
        let current = expression[i_else].clone();
        match current {
            CommonToken::If => {
                let rest = expression[i_else..].to_vec();
                let clause = [
                    else_clause.clone(),
                    scan::clamped_slice(&rest, i_else as isize - 1, None),
                ]
                .concat();
                nested_else = Some(analyze_with(&clause, expected, true, mode)?);
                break;
            }
            _ => {
                else_clause.push(current);
                i_else += 1;
            }
        }
    }

    let if_value = match nested_if {
        Some(derivation) => derivation,
        None => analyze_with(&if_clause, &TypeSignature::base(BaseType::Bool), false, mode)?,
    };
    let then_value = match nested_then {
        Some(derivation) => derivation,
        None => analyze_with(&then_clause, expected, false, mode)?,
    };
    let else_value = match nested_else {
        Some(derivation) => derivation,
        None => analyze_with(&else_clause, expected, false, mode)?,
    };

    if then_value.ty.leading() != else_value.ty.leading() {
        return Err(DeriveError::BranchTypeMismatch);
    }

    let ty = then_value.ty.clone();
    let shown = if inner || expected.is_unconstrained() {
        ty.clone()
    } else {
        expected.clone()
    };
    Ok(Derivation {
        conclusion: sequent(tokens, shown, mode),
        rule: RuleName::TIf,
        premises: vec![
            Either::Left(if_value),
            Either::Left(then_value),
            Either::Left(else_value),
        ],
        status: MatchStatus::of(!inner || correct),
        ty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig;

    fn premise(derivation: &Derivation, index: usize) -> &Derivation {
        derivation.premises[index]
            .as_ref()
            .left()
            .unwrap_or_else(|| panic!("premise {index} is a side condition"))
    }

    fn words(derivation: &Derivation) -> Vec<&str> {
        derivation
            .conclusion
            .words
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_zero_against_nat() {
        let expected = sig![Nat];
        let derivation = analyze(
            &[CommonToken::Zero],
            Some(&expected),
            Presentation::Sequent,
        )
        .unwrap();
        assert_eq!(derivation.rule, RuleName::TZero);
        assert!(derivation.status.is_exact());
        assert_eq!(derivation.ty, sig![Nat]);
        assert!(derivation.premises.is_empty());
    }

    #[test]
    fn test_true_against_nat_is_marked() {
        let expected = sig![Nat];
        let derivation = analyze(
            &[CommonToken::True],
            Some(&expected),
            Presentation::Sequent,
        )
        .unwrap();
        assert_eq!(derivation.status, MatchStatus::Mismatched);
        // the judged type stays Bool even under a Nat expectation
        assert_eq!(derivation.ty, sig![Bool]);
        assert_eq!(derivation.conclusion.shown, sig![Nat]);
    }

    #[test]
    fn test_succ_fits_through_operand() {
        // succ 0 against Bool: operand derives Nat, so the conclusion is
        // exact and shows Bool
        let expected = sig![Bool];
        let derivation = analyze(
            &[CommonToken::Succ, CommonToken::Zero],
            Some(&expected),
            Presentation::Sequent,
        )
        .unwrap();
        assert!(derivation.status.is_exact());
        assert_eq!(derivation.conclusion.shown, sig![Bool]);
        assert_eq!(derivation.ty, sig![Bool]);
        assert_eq!(premise(&derivation, 0).status, MatchStatus::Mismatched);
    }

    #[test]
    fn test_succ_without_expectation_infers_nat() {
        let derivation = analyze(
            &[CommonToken::Succ, CommonToken::Zero],
            None,
            Presentation::Sequent,
        )
        .unwrap();
        assert!(derivation.status.is_exact());
        assert_eq!(derivation.ty, sig![Nat]);
    }

    #[test]
    fn test_iszero_forces_nat_on_operand() {
        let expected = sig![Bool];
        let derivation = analyze(
            &[CommonToken::IsZero, CommonToken::True],
            Some(&expected),
            Presentation::Sequent,
        )
        .unwrap();
        assert!(derivation.status.is_exact());
        assert_eq!(derivation.ty, sig![Bool]);
        let operand = premise(&derivation, 0);
        assert_eq!(operand.rule, RuleName::TTrue);
        assert_eq!(operand.status, MatchStatus::Mismatched);
        assert_eq!(operand.conclusion.shown, sig![Nat]);
    }

    #[test]
    fn test_bracket_rederives_interior() {
        let expected = sig![Nat];
        let tokens = [
            CommonToken::LParen,
            CommonToken::Succ,
            CommonToken::Zero,
            CommonToken::RParen,
        ];
        let derivation = analyze(&tokens, Some(&expected), Presentation::Sequent).unwrap();
        assert_eq!(derivation.rule, RuleName::TBra);
        assert!(derivation.status.is_exact());
        assert_eq!(words(&derivation), ["(", "succ", "0", ")"]);
        assert_eq!(words(premise(&derivation, 0)), ["succ", "0"]);
    }

    #[test]
    fn test_conditional_clause_partition() {
        let expected = sig![Nat];
        let tokens = [
            CommonToken::If,
            CommonToken::IsZero,
            CommonToken::Zero,
            CommonToken::Then,
            CommonToken::Zero,
            CommonToken::Else,
            CommonToken::Succ,
            CommonToken::Zero,
        ];
        let derivation = analyze(&tokens, Some(&expected), Presentation::Sequent).unwrap();
        assert_eq!(derivation.rule, RuleName::TIf);
        assert_eq!(derivation.premises.len(), 3);
        assert_eq!(words(premise(&derivation, 0)), ["iszero", "0"]);
        assert_eq!(words(premise(&derivation, 1)), ["0"]);
        assert_eq!(words(premise(&derivation, 2)), ["succ", "0"]);
        assert_eq!(derivation.ty, sig![Nat]);
    }

    #[test]
    fn test_conditional_nested_in_condition() {
        let expected = sig![Nat];
        let tokens = [
            CommonToken::If,
            CommonToken::If,
            CommonToken::True,
            CommonToken::Then,
            CommonToken::False,
            CommonToken::Else,
            CommonToken::False,
            CommonToken::Then,
            CommonToken::Zero,
            CommonToken::Else,
            CommonToken::Succ,
            CommonToken::Zero,
        ];
        let derivation = analyze(&tokens, Some(&expected), Presentation::Sequent).unwrap();
        let condition = premise(&derivation, 0);
        // the nested conditional was judged as a Bool condition
        assert_eq!(condition.rule, RuleName::TIf);
        assert!(condition.status.is_exact());
        assert_eq!(words(premise(&derivation, 1)), ["0"]);
        assert_eq!(words(premise(&derivation, 2)), ["succ", "0"]);
    }

    #[test]
    fn test_nested_conditional_at_nat_position_is_marked() {
        let expected = sig![Nat];
        let tokens = [
            CommonToken::If,
            CommonToken::True,
            CommonToken::Then,
            CommonToken::If,
            CommonToken::True,
            CommonToken::Then,
            CommonToken::Zero,
            CommonToken::Else,
            CommonToken::Zero,
            CommonToken::Else,
            CommonToken::Zero,
        ];
        let derivation = analyze(&tokens, Some(&expected), Presentation::Sequent).unwrap();
        let then_branch = premise(&derivation, 1);
        assert_eq!(then_branch.rule, RuleName::TIf);
        assert_eq!(then_branch.status, MatchStatus::Mismatched);
        // the outer conclusion stays exact regardless
        assert!(derivation.status.is_exact());
    }

    #[test]
    fn test_branch_type_clash_is_hard() {
        let expected = sig![Nat];
        let tokens = [
            CommonToken::If,
            CommonToken::True,
            CommonToken::Then,
            CommonToken::Zero,
            CommonToken::Else,
            CommonToken::True,
        ];
        let result = analyze(&tokens, Some(&expected), Presentation::Sequent);
        assert_eq!(result.unwrap_err(), DeriveError::BranchTypeMismatch);
    }

    #[test]
    fn test_missing_clauses() {
        let expected = sig![Nat];
        assert_eq!(
            analyze(
                &[CommonToken::If, CommonToken::True],
                Some(&expected),
                Presentation::Sequent
            )
            .unwrap_err(),
            DeriveError::ThenClauseMissing
        );
        assert_eq!(
            analyze(
                &[CommonToken::If, CommonToken::True, CommonToken::Then],
                Some(&expected),
                Presentation::Sequent
            )
            .unwrap_err(),
            DeriveError::DanglingThen
        );
        assert_eq!(
            analyze(
                &[
                    CommonToken::If,
                    CommonToken::True,
                    CommonToken::Then,
                    CommonToken::Zero
                ],
                Some(&expected),
                Presentation::Sequent
            )
            .unwrap_err(),
            DeriveError::ElseClauseMissing
        );
        assert_eq!(
            analyze(
                &[
                    CommonToken::If,
                    CommonToken::True,
                    CommonToken::Then,
                    CommonToken::Zero,
                    CommonToken::Else
                ],
                Some(&expected),
                Presentation::Sequent
            )
            .unwrap_err(),
            DeriveError::DanglingElse
        );
    }

    #[test]
    fn test_entry_faults() {
        let expected = sig![Nat];
        assert_eq!(
            analyze(&[], Some(&expected), Presentation::Sequent).unwrap_err(),
            DeriveError::EmptyExpression
        );
        assert_eq!(
            analyze(
                &[CommonToken::LParen, CommonToken::Zero],
                Some(&expected),
                Presentation::Sequent
            )
            .unwrap_err(),
            DeriveError::BracketsMismatch
        );
        assert_eq!(
            analyze(
                &[CommonToken::LParen, CommonToken::RParen],
                Some(&expected),
                Presentation::Sequent
            )
            .unwrap_err(),
            DeriveError::BraTooShort
        );
        assert_eq!(
            analyze(
                &[CommonToken::Then],
                Some(&expected),
                Presentation::Sequent
            )
            .unwrap_err(),
            DeriveError::UndefinedConstruct
        );
    }

    #[test]
    fn test_derive_reports_once_and_returns_sentinel() {
        let expected = sig![Nat];
        let mut messages: Vec<String> = Vec::new();
        let result = derive(
            &[CommonToken::If],
            Some(&expected),
            Presentation::Sequent,
            |message| messages.push(message.to_string()),
        );
        assert!(result.is_sentinel());
        assert_eq!(messages, ["Expression error (#001.1)"]);
    }

    #[test]
    fn test_tnbl_conclusion_has_no_turnstile() {
        let expected = sig![Nat];
        let derivation = analyze(&[CommonToken::Zero], Some(&expected), Presentation::Tnbl)
            .unwrap();
        assert_eq!(derivation.conclusion.turnstile, Turnstile::Bare);
        assert_eq!(
            render::proof_string(&derivation),
            "\\dfrac{}{ 0 : Nat} (T-zero)"
        );
    }
}
