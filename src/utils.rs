/// Builds a [`TypeSignature`](crate::ast::TypeSignature) from a list of
/// base type names: `sig![Nat, Bool]` is `Nat -> Bool`, `sig![]` is the
/// unconstrained sentinel.
#[macro_export]
macro_rules! sig {
    () => {{
        $crate::ast::TypeSignature::unconstrained()
    }};
    ($($ty: ident),+ $(,)?) => {{
        $crate::ast::TypeSignature::from(vec![$($crate::ast::BaseType::$ty),+])
    }};
}
