use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Nat,
    Bool,
}

impl Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BaseType::Nat => "Nat",
            BaseType::Bool => "Bool",
        };
        write!(f, "{}", s)
    }
}

/// An ordered chain of base types: length 1 is a plain type, longer chains
/// are curried function types (`[Nat, Bool]` is `Nat -> Bool`). The empty
/// chain is the unconstrained sentinel, never a concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSignature(Vec<BaseType>);

impl TypeSignature {
    pub fn base(ty: BaseType) -> Self {
        TypeSignature(vec![ty])
    }
    pub fn unconstrained() -> Self {
        TypeSignature(vec![])
    }
    pub fn is_unconstrained(&self) -> bool {
        self.0.is_empty()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Leading base type: the whole type when plain, the first domain when
    /// curried.
    pub fn leading(&self) -> Option<BaseType> {
        self.0.first().copied()
    }
    /// True when this is exactly the plain base type `ty`.
    pub fn is_base(&self, ty: BaseType) -> bool {
        self.0.len() == 1 && self.0[0] == ty
    }
    /// The signature with its leading type dropped.
    pub fn rest(&self) -> TypeSignature {
        TypeSignature(self.0.iter().skip(1).copied().collect())
    }
    /// The signature extended with a new leading domain.
    pub fn prepend(&self, ty: BaseType) -> TypeSignature {
        let mut chain = Vec::with_capacity(self.0.len() + 1);
        chain.push(ty);
        chain.extend_from_slice(&self.0);
        TypeSignature(chain)
    }
    pub fn iter(&self) -> impl Iterator<Item = &BaseType> {
        self.0.iter()
    }
}

impl From<Vec<BaseType>> for TypeSignature {
    fn from(chain: Vec<BaseType>) -> Self {
        TypeSignature(chain)
    }
}

impl From<BaseType> for TypeSignature {
    fn from(ty: BaseType) -> Self {
        TypeSignature::base(ty)
    }
}

impl Display for TypeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "?");
        }
        let s = self
            .0
            .iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        write!(f, "{}", s)
    }
}

/// Alphabet of the common calculus. Annotation tokens come from the input
/// surface like any other; the engine has no rule for them, so one at head
/// position is an undefined construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonToken {
    True,
    False,
    Pred,
    Succ,
    IsZero,
    Zero,
    If,
    Then,
    Else,
    LParen,
    RParen,
    TypeAnnotation(BaseType),
}

impl Display for CommonToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommonToken::True => "true".to_string(),
            CommonToken::False => "false".to_string(),
            CommonToken::Pred => "pred".to_string(),
            CommonToken::Succ => "succ".to_string(),
            CommonToken::IsZero => "iszero".to_string(),
            CommonToken::Zero => "0".to_string(),
            CommonToken::If => "if".to_string(),
            CommonToken::Then => "then".to_string(),
            CommonToken::Else => "else".to_string(),
            CommonToken::LParen => "(".to_string(),
            CommonToken::RParen => ")".to_string(),
            CommonToken::TypeAnnotation(ty) => format!("{ty}"),
        };
        write!(f, "{}", s)
    }
}

/// Alphabet of the STLC extension. Only `Variable` carries binding state:
/// `context` is set once an enclosing abstraction binds the name, and
/// `abstracted = false` marks a free occurrence awaiting binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StlcToken {
    True,
    False,
    Pred,
    Succ,
    IsZero,
    Zero,
    If,
    Then,
    Else,
    LParen,
    RParen,
    Variable {
        name: String,
        declared: Option<BaseType>,
        abstracted: bool,
        context: Option<BaseType>,
    },
    OpaqueFn,
}

impl StlcToken {
    /// A fresh, free variable occurrence, the form the input surface
    /// produces.
    pub fn var<S: AsRef<str>>(name: S, declared: BaseType) -> Self {
        StlcToken::Variable {
            name: name.as_ref().to_string(),
            declared: Some(declared),
            abstracted: false,
            context: None,
        }
    }

    pub fn as_variable(&self) -> Option<(&str, Option<BaseType>, bool, Option<BaseType>)> {
        match self {
            StlcToken::Variable {
                name,
                declared,
                abstracted,
                context,
            } => Some((name.as_str(), *declared, *abstracted, *context)),
            _ => None,
        }
    }
}

impl Display for StlcToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StlcToken::True => "true",
            StlcToken::False => "false",
            StlcToken::Pred => "pred",
            StlcToken::Succ => "succ",
            StlcToken::IsZero => "iszero",
            StlcToken::Zero => "0",
            StlcToken::If => "if",
            StlcToken::Then => "then",
            StlcToken::Else => "else",
            StlcToken::LParen => "(",
            StlcToken::RParen => ")",
            StlcToken::Variable { name, .. } => name.as_str(),
            StlcToken::OpaqueFn => "f",
        };
        write!(f, "{}", s)
    }
}
