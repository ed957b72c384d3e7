use crate::ast::{BaseType, StlcToken};

/// Names bound by enclosing abstractions, each with the context type its
/// binder assigned. Presence in the map is what "abstracted" means.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bindings(Vec<(String, BaseType)>);

impl Bindings {
    pub fn new() -> Self {
        Bindings(Vec::new())
    }

    pub fn bind<S: AsRef<str>>(&mut self, name: S, ty: BaseType) {
        self.0.push((name.as_ref().to_string(), ty));
    }

    /// Context type of a bound name; the innermost binding wins.
    pub fn context_type(&self, name: &str) -> Option<BaseType> {
        self.0
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, ty)| *ty)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.context_type(name).is_some()
    }

    /// Rewrite of a token run under these bindings: every variable whose
    /// name is bound comes back abstracted with its context type set, all
    /// other tokens come back unchanged. The input is never touched.
    pub fn apply(&self, tokens: &[StlcToken]) -> Vec<StlcToken> {
        tokens
            .iter()
            .map(|token| match token {
                StlcToken::Variable { name, declared, .. } => {
                    match self.context_type(name) {
                        Some(ty) => StlcToken::Variable {
                            name: name.clone(),
                            declared: *declared,
                            abstracted: true,
                            context: Some(ty),
                        },
                        None => token.clone(),
                    }
                }
                other => other.clone(),
            })
            .collect()
    }
}

/// Whether a run still calls for an abstraction step: a free variable at
/// or after the last `(`. Tokens before that bracket stay out of the scan,
/// so a free variable buried in an earlier group does not retrigger the
/// rule.
pub fn abstraction_pending(tokens: &[StlcToken]) -> bool {
    let start = tokens
        .iter()
        .rposition(|token| matches!(token, StlcToken::LParen))
        .unwrap_or(0);
    tokens[start..].iter().any(|token| {
        matches!(
            token,
            StlcToken::Variable {
                abstracted: false,
                ..
            }
        )
    })
}

/// First free variable occurrence of a run, by name.
pub fn first_unabstracted(tokens: &[StlcToken]) -> Option<&str> {
    tokens.iter().find_map(|token| match token {
        StlcToken::Variable {
            name,
            abstracted: false,
            ..
        } => Some(name.as_str()),
        _ => None,
    })
}

/// The λ-binder prefix a judgment line shows: one entry per distinct free
/// variable that still carries its declared type, in first-occurrence order
/// over `t1` then `t2`.
pub fn free_binders(t1: &[StlcToken], t2: Option<&[StlcToken]>) -> Vec<(String, BaseType)> {
    let mut binders: Vec<(String, BaseType)> = Vec::new();
    let tokens = t1.iter().chain(t2.unwrap_or(&[]).iter());
    for token in tokens {
        if let StlcToken::Variable {
            name,
            declared: Some(ty),
            abstracted: false,
            ..
        } = token
        {
            if !binders.iter().any(|(seen, _)| seen == name) {
                binders.push((name.clone(), *ty));
            }
        }
    }
    binders
}
