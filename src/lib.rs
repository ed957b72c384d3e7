// base types, signatures, token alphabets
pub mod ast;
// variable binding for the STLC abstraction rule
pub mod binding;
// derivation engine for the arith/bool calculus
pub mod common;
// proof trees, rule names, errors
pub mod derivation;
// markup and terminal rendering of derivations
pub mod render;
// token-run scans shared by both engines
pub mod scan;
// derivation engine for the STLC extension
pub mod stlc;
// macros
pub mod utils;
