use either::Either;
use std::fmt::Display;

use crate::ast::{BaseType, TypeSignature};

/// Outcome of checking one step against its expected type. `Mismatched` is
/// the structured form of a soft mismatch: the derivation is still complete
/// and only the rendering layer turns the flag into color markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Exact,
    Mismatched,
}

impl MatchStatus {
    pub fn of(exact: bool) -> Self {
        if exact {
            MatchStatus::Exact
        } else {
            MatchStatus::Mismatched
        }
    }
    pub fn is_exact(self) -> bool {
        self == MatchStatus::Exact
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleName {
    TTrue,
    TFalse,
    TZero,
    TSucc,
    TPred,
    TIsZero,
    TIf,
    TBra,
    TParen,
    TVar,
    TAbs,
    TApp,
}

impl RuleName {
    pub const fn name(self) -> &'static str {
        match self {
            RuleName::TTrue => "T-true",
            RuleName::TFalse => "T-false",
            RuleName::TZero => "T-zero",
            RuleName::TSucc => "T-succ",
            RuleName::TPred => "T-pred",
            RuleName::TIsZero => "T-iszero",
            RuleName::TIf => "T-if",
            RuleName::TBra => "T-bra",
            RuleName::TParen => "T-()",
            RuleName::TVar => "T-var",
            RuleName::TAbs => "T-abs",
            RuleName::TApp => "T-app",
        }
    }
}

impl Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a conclusion line opens: nothing (T-NBL), a bare turnstile (common
/// sequent mode), or a turnstile under the ambient context (STLC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turnstile {
    Bare,
    Plain,
    Gamma,
}

/// The judgment a rule concludes: prefix, λ-binder entries for still-free
/// variables, the token words in order, and the type the line displays.
/// A few rules deliberately show the expected rather than the derived type;
/// the engines decide that per rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequent {
    pub turnstile: Turnstile,
    pub binders: Vec<(String, BaseType)>,
    pub words: Vec<String>,
    pub shown: TypeSignature,
}

impl Display for Sequent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut line = String::new();
        match self.turnstile {
            Turnstile::Bare => {}
            Turnstile::Plain => line.push_str("|- "),
            Turnstile::Gamma => line.push_str("Γ |- "),
        }
        for (name, ty) in &self.binders {
            line.push_str(&format!("λ{name}:{ty}. "));
        }
        line.push_str(&self.words.join(" "));
        write!(f, "{} : {}", line, self.shown)
    }
}

/// Leaf side condition of a rule, as opposed to a sub-derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Context membership, `name : ty ∈ Γ`. Carries its own status: a
    /// variable bound at one type but used at another flags only this line.
    InContext {
        name: String,
        ty: TypeSignature,
        status: MatchStatus,
    },
}

impl Condition {
    pub fn status(&self) -> MatchStatus {
        match self {
            Condition::InContext { status, .. } => *status,
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::InContext { name, ty, .. } => write!(f, "{} : {} ∈ Γ", name, ty),
        }
    }
}

/// A premise is either a full sub-derivation or a leaf side condition.
pub type Premise = Either<Derivation, Condition>;

/// One node of a proof tree: premises over a conclusion, named rule, the
/// step's match status, and the type this judgment reports to its parent
/// (which is not always the type the conclusion line displays).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub conclusion: Sequent,
    pub rule: RuleName,
    pub premises: Vec<Premise>,
    pub status: MatchStatus,
    pub ty: TypeSignature,
}

impl Derivation {
    pub fn subderivations(&self) -> impl Iterator<Item = &Derivation> {
        self.premises
            .iter()
            .filter_map(|premise| premise.as_ref().left())
    }

    /// Whether this tree applies `rule` anywhere.
    pub fn uses_rule(&self, rule: RuleName) -> bool {
        self.rule == rule || self.subderivations().any(|sub| sub.uses_rule(rule))
    }
}

/// What a collaborator receives: the rendered proof and the judged type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationResult {
    pub proof: String,
    pub ty: TypeSignature,
}

impl DerivationResult {
    /// The canonical failure value returned alongside a hard error report.
    pub fn sentinel() -> Self {
        DerivationResult {
            proof: " ".to_string(),
            ty: TypeSignature::unconstrained(),
        }
    }
    pub fn is_sentinel(&self) -> bool {
        self.proof == " " && self.ty.is_unconstrained()
    }
}

/// Hard structural failures. Soft type mismatches never appear here; they
/// stay inside the tree as `MatchStatus::Mismatched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveError {
    EmptyExpression,
    BracketsMismatch,
    UndefinedConstruct,
    StlcUndefinedConstruct,
    EmptyAppOperand,
    AbsExpectedTooShort,
    AbsWithoutVar,
    AbsWithoutVarSingle,
    UndeclaredVar,
    IsZeroWithoutArgument,
    SuccWithoutArgument,
    PredWithoutArgument,
    EmptyConditional,
    ThenClauseMissing,
    DanglingThen,
    ElseClauseMissing,
    DanglingElse,
    BranchTypeMismatch,
    MisplacedOpaqueFn,
    BraTooShort,
    BraUnbalanced,
    ParenTooShort,
    ParenUnbalanced,
}

impl DeriveError {
    /// The stable code consumers key on.
    pub const fn code(self) -> &'static str {
        match self {
            DeriveError::EmptyExpression => "#001.1",
            DeriveError::BracketsMismatch => "#001.2",
            DeriveError::UndefinedConstruct => "#001.3",
            DeriveError::StlcUndefinedConstruct => "#001.2",
            DeriveError::EmptyAppOperand => "#002",
            DeriveError::AbsExpectedTooShort => "#003.1",
            DeriveError::AbsWithoutVar => "#003.2",
            DeriveError::AbsWithoutVarSingle => "#003.3",
            DeriveError::UndeclaredVar => "#004",
            DeriveError::IsZeroWithoutArgument => "#005",
            DeriveError::SuccWithoutArgument => "#006",
            DeriveError::PredWithoutArgument => "#007",
            DeriveError::EmptyConditional => "#008.1",
            DeriveError::ThenClauseMissing => "#008.2",
            DeriveError::DanglingThen => "#008.3",
            DeriveError::ElseClauseMissing => "#008.4",
            DeriveError::DanglingElse => "#008.5",
            DeriveError::BranchTypeMismatch => "#008.6",
            DeriveError::MisplacedOpaqueFn => "#009",
            DeriveError::BraTooShort => "#010.1",
            DeriveError::BraUnbalanced => "#010.2",
            DeriveError::ParenTooShort => "#010.1",
            DeriveError::ParenUnbalanced => "#010.2",
        }
    }
}

impl Display for DeriveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeriveError::EmptyExpression => "Expression error (#001.1)",
            DeriveError::BracketsMismatch => "Brackets mismatch (#001.2)",
            DeriveError::UndefinedConstruct => "Undefined error (#001.3)",
            DeriveError::StlcUndefinedConstruct => "Undefined error (#001.2)",
            DeriveError::EmptyAppOperand => "T-app error (#002)",
            DeriveError::AbsExpectedTooShort => "Expression type error (#003.1)",
            DeriveError::AbsWithoutVar => "T-abs type error (#003.2)",
            DeriveError::AbsWithoutVarSingle => "T-abs type error (#003.3)",
            DeriveError::UndeclaredVar => "T-VAR error (#004)",
            DeriveError::IsZeroWithoutArgument => "IS-ZERO argument error (#005)",
            DeriveError::SuccWithoutArgument => "SUCC argument error (#006)",
            DeriveError::PredWithoutArgument => "PRED argument error (#007)",
            DeriveError::EmptyConditional => "IF-THEN-ELSE syntax error (#008.1)",
            DeriveError::ThenClauseMissing => {
                "IF-THEN-ELSE syntax error. Expression has one or more errors. One of them - THEN clause is missing (#008.2)"
            }
            DeriveError::DanglingThen => {
                "IF-THEN-ELSE syntax error. Expression has one or more errors. One of them - THEN clause is missing (#008.3)"
            }
            DeriveError::ElseClauseMissing => {
                "IF-THEN-ELSE syntax error. Expression has one or more errors. One of them - ELSE clause is missing (#008.4)"
            }
            DeriveError::DanglingElse => {
                "IF-THEN-ELSE syntax error. Expression has one or more errors. One of them - ELSE clause is missing (#008.5)"
            }
            DeriveError::BranchTypeMismatch => {
                "IF-THEN-ELSE syntax error. Expression has one or more errors. One of them - THEN and ELSE branches don't have the same type (#008.6)"
            }
            DeriveError::MisplacedOpaqueFn => {
                "Syntax error. Expression has one or more errors. (#009)"
            }
            DeriveError::BraTooShort => "T-BRA syntax error (#010.1)",
            DeriveError::BraUnbalanced => "T-BRA syntax error (#010.2)",
            DeriveError::ParenTooShort => "T-() syntax error (#010.1)",
            DeriveError::ParenUnbalanced => "T-() syntax error (#010.2)",
        };
        write!(f, "{}", s)
    }
}
