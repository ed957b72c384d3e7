use colored::Colorize;
use either::Either;
use std::fmt::Display;
use termtree::Tree;

use crate::ast::TypeSignature;
use crate::derivation::{Condition, Derivation, MatchStatus, Premise, Sequent, Turnstile};

/// Color-marker pair a soft-mismatched fragment is wrapped in. Consumers
/// depend on these exact strings.
pub const MARK_MISMATCH: &str = "\\color{#ff0000}";
pub const MARK_RESET: &str = "\\color{#000000}";

const VDASH: &str = " \\vdash ";

/// Markup of a type chain, arrows between the bases. The unconstrained
/// signature has no spelling of its own and renders as the literal `ERROR`.
pub fn signature_string(ty: &TypeSignature) -> String {
    if ty.is_unconstrained() {
        return "ERROR".to_string();
    }
    ty.iter()
        .map(|base| base.to_string())
        .collect::<Vec<_>>()
        .join(" \\to ")
}

fn sequent_string(sequent: &Sequent) -> String {
    let mut line = String::new();
    match sequent.turnstile {
        Turnstile::Bare => line.push(' '),
        Turnstile::Plain => line.push_str(VDASH),
        Turnstile::Gamma => {
            line.push_str(" \\Gamma");
            line.push_str(VDASH);
        }
    }
    for (name, ty) in &sequent.binders {
        line.push_str(&format!("\\lambda {name}:{ty}. "));
    }
    line.push_str(&sequent.words.join(" \\enspace "));
    line.push_str(" : ");
    line.push_str(&signature_string(&sequent.shown));
    line
}

fn condition_string(condition: &Condition) -> String {
    let body = match condition {
        Condition::InContext { name, ty, .. } => {
            format!("{} : {} \\in \\Gamma", name, signature_string(ty))
        }
    };
    match condition.status() {
        MatchStatus::Exact => body,
        MatchStatus::Mismatched => format!("{MARK_MISMATCH}{body}{MARK_RESET}"),
    }
}

fn premise_string(premise: &Premise) -> String {
    match premise {
        Either::Left(sub) => proof_string(sub),
        Either::Right(condition) => condition_string(condition),
    }
}

/// The proof markup a collaborator renders: `\dfrac{premises}{conclusion}
/// (rule)` per node, premises separated by `\enspace`, mismatched fragments
/// wrapped in the marker pair.
pub fn proof_string(tree: &Derivation) -> String {
    let premises = tree
        .premises
        .iter()
        .map(premise_string)
        .collect::<Vec<_>>()
        .join(" \\enspace ");
    let body = format!(
        "\\dfrac{{{}}}{{{}}} ({})",
        premises,
        sequent_string(&tree.conclusion),
        tree.rule
    );
    match tree.status {
        MatchStatus::Exact => body,
        MatchStatus::Mismatched => format!("{MARK_MISMATCH}{body}{MARK_RESET}"),
    }
}

/// What the terminal tree view shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TreeConfig {
    /// Judgments only.
    Conclusions,
    /// Judgments plus the side conditions of var/f steps.
    #[default]
    WithConditions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Judgement(Sequent, &'static str, MatchStatus),
    Condition(Condition),
}

fn error_string(s: String) -> String {
    format!("{}", s.red())
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: String = match self {
            Node::Judgement(sequent, rule, status) => {
                let line = format!("{sequent} ({rule})");
                match status {
                    MatchStatus::Exact => line,
                    MatchStatus::Mismatched => error_string(line),
                }
            }
            Node::Condition(condition) => match condition.status() {
                MatchStatus::Exact => format!("{condition}"),
                MatchStatus::Mismatched => error_string(format!("{condition}")),
            },
        };
        write!(f, "{s}")
    }
}

fn premise_to_tree(premise: &Premise, tree_config: &TreeConfig) -> Option<Tree<Node>> {
    match premise {
        Either::Left(sub) => Some(tree_derivation(sub, tree_config)),
        Either::Right(condition) => {
            if matches!(tree_config, TreeConfig::WithConditions) {
                Some(Tree::new(Node::Condition(condition.clone())))
            } else {
                None
            }
        }
    }
}

fn tree_derivation(tree: &Derivation, tree_config: &TreeConfig) -> Tree<Node> {
    let Derivation {
        conclusion,
        rule,
        premises,
        status,
        ty: _,
    } = tree;
    let mut show_tree = Tree::new(Node::Judgement(conclusion.clone(), rule.name(), *status));
    show_tree.extend(
        premises
            .iter()
            .filter_map(|premise| premise_to_tree(premise, tree_config)),
    );
    show_tree
}

/// Terminal rendering of a derivation, one judgment per line, mismatched
/// steps in red.
pub fn print_tree(tree: &Derivation, tree_config: &TreeConfig) -> String {
    tree_derivation(tree, tree_config).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BaseType, TypeSignature};
    use crate::derivation::RuleName;
    use either::Either;

    fn zero_leaf(turnstile: Turnstile, status: MatchStatus) -> Derivation {
        Derivation {
            conclusion: Sequent {
                turnstile,
                binders: vec![],
                words: vec!["0".to_string()],
                shown: TypeSignature::base(BaseType::Nat),
            },
            rule: RuleName::TZero,
            premises: vec![],
            status,
            ty: TypeSignature::base(BaseType::Nat),
        }
    }

    #[test]
    fn test_leaf_markup() {
        let leaf = zero_leaf(Turnstile::Plain, MatchStatus::Exact);
        assert_eq!(proof_string(&leaf), "\\dfrac{}{ \\vdash 0 : Nat} (T-zero)");
        let bare = zero_leaf(Turnstile::Bare, MatchStatus::Exact);
        assert_eq!(proof_string(&bare), "\\dfrac{}{ 0 : Nat} (T-zero)");
    }

    #[test]
    fn test_mismatch_marker_pair() {
        let leaf = zero_leaf(Turnstile::Plain, MatchStatus::Mismatched);
        let markup = proof_string(&leaf);
        assert!(markup.starts_with(MARK_MISMATCH));
        assert!(markup.ends_with(MARK_RESET));
        assert!(markup.contains("(T-zero)"));
    }

    #[test]
    fn test_wrapped_premise_and_condition() {
        let condition = Condition::InContext {
            name: "x".to_string(),
            ty: TypeSignature::base(BaseType::Nat),
            status: MatchStatus::Exact,
        };
        let node = Derivation {
            conclusion: Sequent {
                turnstile: Turnstile::Gamma,
                binders: vec![],
                words: vec!["x".to_string()],
                shown: TypeSignature::base(BaseType::Nat),
            },
            rule: RuleName::TVar,
            premises: vec![Either::Right(condition)],
            status: MatchStatus::Exact,
            ty: TypeSignature::base(BaseType::Nat),
        };
        assert_eq!(
            proof_string(&node),
            "\\dfrac{x : Nat \\in \\Gamma}{ \\Gamma \\vdash x : Nat} (T-var)"
        );
    }

    #[test]
    fn test_binder_prefix() {
        let mut abs = zero_leaf(Turnstile::Gamma, MatchStatus::Exact);
        abs.conclusion.binders = vec![("x".to_string(), BaseType::Nat)];
        abs.conclusion.words = vec!["x".to_string()];
        let markup = proof_string(&abs);
        assert!(markup.contains("\\Gamma \\vdash \\lambda x:Nat. x : Nat"));
    }

    #[test]
    fn test_unconstrained_renders_error() {
        let mut leaf = zero_leaf(Turnstile::Plain, MatchStatus::Exact);
        leaf.conclusion.shown = TypeSignature::unconstrained();
        assert!(proof_string(&leaf).contains(" : ERROR} (T-zero)"));
    }

    #[test]
    fn test_tree_view() {
        let inner = zero_leaf(Turnstile::Plain, MatchStatus::Exact);
        let outer = Derivation {
            conclusion: Sequent {
                turnstile: Turnstile::Plain,
                binders: vec![],
                words: vec!["(".to_string(), "0".to_string(), ")".to_string()],
                shown: TypeSignature::base(BaseType::Nat),
            },
            rule: RuleName::TBra,
            premises: vec![Either::Left(inner)],
            status: MatchStatus::Exact,
            ty: TypeSignature::base(BaseType::Nat),
        };
        let view = print_tree(&outer, &TreeConfig::default());
        assert!(view.contains("(T-bra)"));
        assert!(view.contains("(T-zero)"));
    }
}
