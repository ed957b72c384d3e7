//! Derivation engine for the STLC extension. The shape of a judgement is
//! richer than in the common calculus: expressions arrive as one or two
//! term runs, variables carry declared and context types, the opaque
//! symbol `f` takes its signature from the caller, and conclusions open
//! with the ambient context and a λ-binder prefix for the variables still
//! free at that point. Rule selection goes abstraction, then application,
//! then the head token.

use either::Either;

use crate::ast::{BaseType, StlcToken, TypeSignature};
use crate::binding::{self, Bindings};
use crate::derivation::{
    Condition, Derivation, DerivationResult, DeriveError, MatchStatus, RuleName, Sequent,
    Turnstile,
};
use crate::render;
use crate::scan;

/// Builds the typing tree for `t1` (and `t2` when the expression is an
/// application) against `expected`, `None` leaving the type to be
/// inferred. `f_type` is the declared signature of the opaque symbol `f`;
/// without it `f` is just an undefined name. Structural faults come back
/// as `Err`, plain type clashes stay inside the tree as mismatch markers.
pub fn analyze(
    t1: &[StlcToken],
    t2: Option<&[StlcToken]>,
    f_type: Option<&TypeSignature>,
    expected: Option<&TypeSignature>,
) -> Result<Derivation, DeriveError> {
    let expected = match expected {
        Some(signature) => signature.clone(),
        None => TypeSignature::unconstrained(),
    };
    analyze_with(t1, t2, f_type, &expected, false)
}

/// Callback-surface variant of [`analyze`]: a structural fault is handed to
/// `on_error` exactly once and the sentinel result comes back in its place.
pub fn derive(
    t1: &[StlcToken],
    t2: Option<&[StlcToken]>,
    f_type: Option<&TypeSignature>,
    expected: Option<&TypeSignature>,
    mut on_error: impl FnMut(&str),
) -> DerivationResult {
    match analyze(t1, t2, f_type, expected) {
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
    t1: &[StlcToken],
    t2: Option<&[StlcToken]>,
    f_type: Option<&TypeSignature>,
    expected: &TypeSignature,
    inner: bool,
) -> Result<Derivation, DeriveError> {
    // an empty second term does not take part in rule selection
    let second = t2.filter(|tokens| !tokens.is_empty());

    if binding::abstraction_pending(t1)
        || second.is_some_and(binding::abstraction_pending)
    {
        return abstraction(t1, second, f_type, expected);
    }
    if let Some(second) = second {
        if t1.is_empty() {
            return Err(DeriveError::EmptyAppOperand);
        }
        return application(t1, second, f_type, expected);
    }

    let head = match t1.first() {
        Some(token) => token,
        None => return Err(DeriveError::EmptyExpression),
    };
    match head {
        StlcToken::True => Ok(boolean_literal(t1, expected, RuleName::TTrue)),
        StlcToken::False => Ok(boolean_literal(t1, expected, RuleName::TFalse)),
        StlcToken::Variable { .. } => variable(t1, expected),
        StlcToken::LParen => paren(t1, f_type, expected),
        StlcToken::IsZero => is_zero(t1, f_type, expected),
        StlcToken::Zero => Ok(zero_literal(t1, expected)),
        StlcToken::Succ => unary_nat(t1, f_type, expected, RuleName::TSucc),
        StlcToken::Pred => unary_nat(t1, f_type, expected, RuleName::TPred),
        StlcToken::If => conditional(t1, f_type, expected, inner),
        StlcToken::OpaqueFn => match f_type {
            Some(signature) => opaque_fn(t1, expected, signature),
            None => Err(DeriveError::StlcUndefinedConstruct),
        },
        _ => Err(DeriveError::StlcUndefinedConstruct),
    }
}

/// Conclusion line of a judgement: the ambient context, a λ-binder for
/// every variable still free in the terms, then the terms themselves.
fn sequent(t1: &[StlcToken], t2: Option<&[StlcToken]>, shown: TypeSignature) -> Sequent {
    let mut words: Vec<String> = t1.iter().map(|token| token.to_string()).collect();
    if let Some(second) = t2 {
        words.extend(second.iter().map(|token| token.to_string()));
    }
    Sequent {
        turnstile: Turnstile::Gamma,
        binders: binding::free_binders(t1, t2),
        words,
        shown,
    }
}

// T-abs. Peels one domain off the expected signature and binds the first
// free variable of each term run to it, then re-derives the bound terms
// against the remainder. The conclusion keeps the pre-binding view, which
// is what puts the λ for the variable being bound on the line.
fn abstraction(
    t1: &[StlcToken],
    t2: Option<&[StlcToken]>,
    f_type: Option<&TypeSignature>,
    expected: &TypeSignature,
) -> Result<Derivation, DeriveError> {
    let head = match expected.leading() {
        Some(base) if expected.len() >= 2 => base,
        _ => return Err(DeriveError::AbsExpectedTooShort),
    };

    let conclusion = sequent(t1, t2, expected.clone());

    let (bound_t1, bound_t2) = match t2 {
        Some(second) => {
            let first_var = binding::first_unabstracted(t1);
            let second_var = binding::first_unabstracted(second);
            if first_var.is_none() && second_var.is_none() {
                return Err(DeriveError::AbsWithoutVar);
            }
            let bound_t1 = match first_var {
                Some(name) => {
                    let mut bindings = Bindings::new();
                    bindings.bind(name, head);
                    bindings.apply(t1)
                }
                None => t1.to_vec(),
            };
            let bound_t2 = match second_var {
                Some(name) => {
                    let mut bindings = Bindings::new();
                    bindings.bind(name, head);
                    bindings.apply(second)
                }
                None => second.to_vec(),
            };
            (bound_t1, Some(bound_t2))
        }
        None => match binding::first_unabstracted(t1) {
            Some(name) => {
                let mut bindings = Bindings::new();
                bindings.bind(name, head);
                (bindings.apply(t1), None)
            }
            None => return Err(DeriveError::AbsWithoutVarSingle),
        },
    };

    let remainder = expected.rest();
    let premise = analyze_with(&bound_t1, bound_t2.as_deref(), f_type, &remainder, false)?;

    let ty = premise.ty.clone();
    Ok(Derivation {
        conclusion,
        rule: RuleName::TAbs,
        premises: vec![Either::Left(premise)],
        status: MatchStatus::Exact,
        ty,
    })
}

// T-app. The argument is judged first against the expected type itself,
// then the function against that type with the argument's type prepended.
// The application as a whole leaves its own type open.
fn application(
    t1: &[StlcToken],
    t2: &[StlcToken],
    f_type: Option<&TypeSignature>,
    expected: &TypeSignature,
) -> Result<Derivation, DeriveError> {
    let argument = analyze_with(t2, None, f_type, expected, false)?;
    let function_expected = match argument.ty.leading() {
        Some(base) => expected.prepend(base),
        None => expected.clone(),
    };
    let function = analyze_with(t1, None, f_type, &function_expected, false)?;

    Ok(Derivation {
        conclusion: sequent(t1, Some(t2), expected.clone()),
        rule: RuleName::TApp,
        premises: vec![Either::Left(function), Either::Left(argument)],
        status: MatchStatus::Exact,
        ty: TypeSignature::unconstrained(),
    })
}

// T-var. Only the head token takes part. The side condition carries the
// context type and is the marked fragment when context and declaration
// disagree; an expectation clash marks the whole step instead.
fn variable(t1: &[StlcToken], expected: &TypeSignature) -> Result<Derivation, DeriveError> {
    let (name, declared, _, context) = match t1[0].as_variable() {
        Some(parts) => parts,
        None => return Err(DeriveError::StlcUndefinedConstruct),
    };
    let declared = match declared {
        Some(base) => base,
        None => return Err(DeriveError::UndeclaredVar),
    };

    let fits = expected.is_base(declared);
    let condition_status = if fits {
        MatchStatus::of(context == Some(declared))
    } else {
        MatchStatus::Exact
    };
    let condition = Condition::InContext {
        name: name.to_string(),
        ty: match context {
            Some(base) => TypeSignature::base(base),
            None => TypeSignature::unconstrained(),
        },
        status: condition_status,
    };

    let conclusion = Sequent {
        turnstile: Turnstile::Gamma,
        binders: vec![],
        words: vec![name.to_string()],
        shown: TypeSignature::base(declared),
    };
    Ok(Derivation {
        conclusion,
        rule: RuleName::TVar,
        premises: vec![Either::Right(condition)],
        status: MatchStatus::of(fits),
        ty: TypeSignature::base(declared),
    })
}

// The opaque symbol `f`. Writes out as a T-var step over the expected
// signature; only the first two positions of the declared signature are
// consulted, and the step never constrains the type it hands back.
fn opaque_fn(
    t1: &[StlcToken],
    expected: &TypeSignature,
    f_type: &TypeSignature,
) -> Result<Derivation, DeriveError> {
    if t1.len() > 1 {
        return Err(DeriveError::MisplacedOpaqueFn);
    }

    let fits = expected.len() == 2
        && expected.leading() == f_type.leading()
        && expected.iter().nth(1) == f_type.iter().nth(1);

    let condition = Condition::InContext {
        name: "f".to_string(),
        ty: expected.clone(),
        status: MatchStatus::Exact,
    };
    let conclusion = Sequent {
        turnstile: Turnstile::Gamma,
        binders: vec![],
        words: vec!["f".to_string()],
        shown: expected.clone(),
    };
    Ok(Derivation {
        conclusion,
        rule: RuleName::TVar,
        premises: vec![Either::Right(condition)],
        status: MatchStatus::of(fits),
        ty: TypeSignature::unconstrained(),
    })
}

// T-true / T-false.
fn boolean_literal(t1: &[StlcToken], expected: &TypeSignature, rule: RuleName) -> Derivation {
    let (status, shown) = if expected.is_base(BaseType::Bool) {
        (MatchStatus::Exact, expected.clone())
    } else if expected.is_unconstrained() {
        (MatchStatus::Exact, TypeSignature::base(BaseType::Bool))
    } else {
        (MatchStatus::Mismatched, expected.clone())
    };
    Derivation {
        conclusion: sequent(t1, None, shown),
        rule,
        premises: vec![],
        status,
        ty: TypeSignature::base(BaseType::Bool),
    }
}

// T-zero. The conclusion always writes Nat.
fn zero_literal(t1: &[StlcToken], expected: &TypeSignature) -> Derivation {
    let exact = expected.is_base(BaseType::Nat) || expected.is_unconstrained();
    Derivation {
        conclusion: sequent(t1, None, TypeSignature::base(BaseType::Nat)),
        rule: RuleName::TZero,
        premises: vec![],
        status: MatchStatus::of(exact),
        ty: TypeSignature::base(BaseType::Nat),
    }
}

// T-succ / T-pred. The operand keeps the same expectation and counts as an
// inner position, so a conditional under `succ` is subject to the nested
// Nat restriction.
fn unary_nat(
    t1: &[StlcToken],
    f_type: Option<&TypeSignature>,
    expected: &TypeSignature,
    rule: RuleName,
) -> Result<Derivation, DeriveError> {
    if t1.len() < 2 {
        return Err(match rule {
            RuleName::TPred => DeriveError::PredWithoutArgument,
            _ => DeriveError::SuccWithoutArgument,
        });
    }

    let operand = analyze_with(&t1[1..], None, f_type, expected, true)?;

    let (status, shown) = if expected.len() == 1 {
        (
            MatchStatus::of(expected.is_base(BaseType::Nat)),
            expected.clone(),
        )
    } else if expected.is_unconstrained() && operand.ty.len() == 1 {
        (
            MatchStatus::of(operand.ty.is_base(BaseType::Nat)),
            operand.ty.clone(),
        )
    } else {
        (MatchStatus::Mismatched, expected.clone())
    };

    let ty = shown.clone();
    Ok(Derivation {
        conclusion: sequent(t1, None, shown),
        rule,
        premises: vec![Either::Left(operand)],
        status,
        ty,
    })
}

// T-iszero. The operand is always judged as a natural.
fn is_zero(
    t1: &[StlcToken],
    f_type: Option<&TypeSignature>,
    expected: &TypeSignature,
) -> Result<Derivation, DeriveError> {
    if t1.len() < 2 {
        return Err(DeriveError::IsZeroWithoutArgument);
    }

    let operand = analyze_with(
        &t1[1..],
        None,
        f_type,
        &TypeSignature::base(BaseType::Nat),
        false,
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
        conclusion: sequent(t1, None, shown),
        rule: RuleName::TIsZero,
        premises: vec![Either::Left(operand)],
        status,
        ty,
    })
}

// T-(). Strips one layer of brackets and re-derives the interior. The
// conclusion never carries a marker.
fn paren(
    t1: &[StlcToken],
    f_type: Option<&TypeSignature>,
    expected: &TypeSignature,
) -> Result<Derivation, DeriveError> {
    if t1.len() < 3 {
        return Err(DeriveError::ParenTooShort);
    }
    if scan::bracket_balance(t1) != 0 {
        return Err(DeriveError::ParenUnbalanced);
    }

    let interior = scan::strip_outer_parens(t1);
    let inner = analyze_with(&interior, None, f_type, expected, false)?;

    let (shown, ty) = if expected.is_unconstrained() {
        (inner.ty.clone(), inner.ty.clone())
    } else {
        (expected.clone(), expected.clone())
    };
    Ok(Derivation {
        conclusion: sequent(t1, None, shown),
        rule: RuleName::TParen,
        premises: vec![Either::Left(inner)],
        status: MatchStatus::Exact,
        ty,
    })
}

// IF-THEN-ELSE. Same clause splitter as the common engine: three keyword
// scans that ignore nesting, with the `remove(0)` and carried indices that
// make the arithmetic come out. A nested conditional in the else clause
// swallows the whole remainder.
fn conditional(
    t1: &[StlcToken],
    f_type: Option<&TypeSignature>,
    expected: &TypeSignature,
    inner: bool,
) -> Result<Derivation, DeriveError> {
    if t1.is_empty() {
        return Err(DeriveError::EmptyConditional);
    }

    // nested conditionals are not accepted at Nat positions
    let correct = !(matches!(t1[0], StlcToken::If) && inner && expected.is_base(BaseType::Nat));

    let mut expression: Vec<StlcToken> = if matches!(t1[0], StlcToken::If) {
        t1[1..].to_vec()
    } else {
        t1.to_vec()
    };

    let mut if_clause: Vec<StlcToken> = Vec::new();
    let mut then_clause: Vec<StlcToken> = Vec::new();
    let mut else_clause: Vec<StlcToken> = Vec::new();

    let mut nested_if: Option<Derivation> = None;
    let mut nested_then: Option<Derivation> = None;
    let mut nested_else: Option<Derivation> = None;

    let mut i_if = 0;
    while i_if < expression.len() {
        let current = expression[i_if].clone();
        match current {
            StlcToken::Then => {
                if i_if == expression.len() - 1 {
                    return Err(DeriveError::DanglingThen);
                }
                expression.remove(0);
                break;
            }
            StlcToken::If => {
                let rest = expression[i_if..].to_vec();
                let split = scan::index_of_nth(&rest, &StlcToken::Then, 2)
                    .map(|index| index as isize)
                    .unwrap_or(-1);
                let clause =
                    [if_clause.clone(), scan::clamped_slice(&rest, 0, Some(split))].concat();
                expression = scan::clamped_slice(&rest, split + 1, None);
                nested_if = Some(analyze_with(
                    &clause,
                    None,
                    f_type,
                    &TypeSignature::base(BaseType::Bool),
                    true,
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

    let mut i_then = i_if;
    while i_then < expression.len() {
        let current = expression[i_then].clone();
        match current {
            StlcToken::Else => {
                if i_then == expression.len() - 1 {
                    return Err(DeriveError::DanglingElse);
                }
                expression.remove(0);
                break;
            }
            StlcToken::If => {
                let rest = expression[i_then..].to_vec();
                let split = scan::index_of_nth(&rest, &StlcToken::Else, 2)
                    .map(|index| index as isize)
                    .unwrap_or(-1);
                let clause = [
                    then_clause.clone(),
                    scan::clamped_slice(&rest, i_then as isize - 1, Some(split)),
                ]
                .concat();
                expression = scan::clamped_slice(&rest, split + 1, None);
                nested_then = Some(analyze_with(&clause, None, f_type, expected, true)?);
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

    let mut i_else = i_then;
    while i_else < expression.len() {
        let current = expression[i_else].clone();
        match current {
            StlcToken::If => {
                let rest = expression[i_else..].to_vec();
                let clause = [
                    else_clause.clone(),
                    scan::clamped_slice(&rest, i_else as isize - 1, None),
                ]
                .concat();
                nested_else = Some(analyze_with(&clause, None, f_type, expected, true)?);
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
        None => analyze_with(
            &if_clause,
            None,
            f_type,
            &TypeSignature::base(BaseType::Bool),
            false,
        )?,
    };
    let then_value = match nested_then {
        Some(derivation) => derivation,
        None => analyze_with(&then_clause, None, f_type, expected, false)?,
    };
    let else_value = match nested_else {
        Some(derivation) => derivation,
        None => analyze_with(&else_clause, None, f_type, expected, false)?,
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
        conclusion: sequent(t1, None, shown),
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
