//! Context-free grammar analysis and parser construction.
//!
//! The crate is organized around [`Grammar`](grammar::Grammar): derivation
//! sets and LL(1) tables live next to it, while [`slr`] and [`cyk`] consume
//! it to drive bottom-up and exhaustive parsing. [`pda`] produces grammars
//! from pushdown automata.

pub mod cyk;
pub mod grammar;
pub mod ll1;
pub mod normal_form;
pub mod pda;
pub mod sets;
pub mod simplify;
pub mod slr;
pub mod source;
pub mod types;
pub mod util;

pub use crate::grammar::{Grammar, GrammarError, Lookahead, Production};
