//! SLR(1) parser construction.

pub mod driver;
pub mod lr0;
pub mod table;

pub use self::{
    driver::{Located, Location, ParseOutcome, Rejection, Token},
    lr0::{Item, LR0Automaton, StateID},
    table::{Action, Conflict, ConflictKind, ParseTable},
};

use crate::grammar::{Grammar, GrammarError, Production};
use std::fmt;

/// The SLR(1) automaton of a grammar together with its parse tables.
#[derive(Debug)]
pub struct SlrParser {
    productions: Vec<Production>,
    augmented: usize,
    automaton: LR0Automaton,
    table: ParseTable,
}

impl SlrParser {
    /// Augments `g` with `S' -> S` and builds the tables.
    ///
    /// The augmenting production is appended, so the indices of the
    /// existing productions are preserved. The grammar is checked before it
    /// is touched: on error it is left unchanged.
    #[tracing::instrument(skip_all)]
    pub fn build(g: &mut Grammar) -> Result<Self, GrammarError> {
        g.derivation_sets()?;

        let start = g.start_symbol().to_owned();
        let augmented_start = g.fresh_name(&format!("{}'", start));
        g.add_variable(augmented_start.clone());
        let augmented = g.add_production(Production::new(&*augmented_start, [start]));
        g.set_start_symbol(augmented_start);

        let automaton = lr0::lr0(g, augmented);
        let table = table::generate(g, &automaton, augmented)?;
        tracing::debug!(
            states = automaton.states.len(),
            conflicts = table.conflicts.len(),
            "SLR tables built"
        );

        Ok(Self {
            productions: g.productions().to_vec(),
            augmented,
            automaton,
            table,
        })
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Index of `S' -> S`.
    pub fn augmented_production(&self) -> usize {
        self.augmented
    }

    pub fn automaton(&self) -> &LR0Automaton {
        &self.automaton
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.table.conflicts
    }

    pub fn is_slr1(&self) -> bool {
        self.table.conflicts.is_empty()
    }

    pub fn display_states(&self) -> impl fmt::Display + '_ {
        crate::util::display_fn(|f| {
            for (i, (id, state)) in self.automaton.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(&self.productions))?;
            }
            Ok(())
        })
    }

    pub fn display_table(&self) -> impl fmt::Display + '_ {
        self.table.display(&self.productions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{examples, Lookahead};

    #[test]
    fn sums_round_trip() {
        let mut g = Grammar::define(examples::sums).unwrap();
        let parser = SlrParser::build(&mut g).unwrap();
        eprintln!("{}", parser.display_states());
        eprintln!("{}", parser.display_table());
        assert!(parser.is_slr1());

        let outcome = parser.parse(&["id", "+", "id"]);
        // T -> id, E -> T, T -> id, E -> E + T
        assert_eq!(
            outcome,
            ParseOutcome::Accepted {
                reductions: vec![2, 1, 2, 0]
            }
        );

        let outcome = parser.parse(&["id", "+"]);
        let rejection = outcome.rejection().unwrap();
        assert_eq!(rejection.got, Lookahead::End);
        assert_eq!(rejection.position, 2);
        assert_eq!(rejection.expected, vec![Lookahead::terminal("id")]);
        assert!(rejection.message.contains("expected one of {id}"), "{}", rejection);
    }

    #[test]
    fn rejects_after_reducing_to_bottom_state() {
        let mut g = Grammar::define(examples::sums).unwrap();
        let parser = SlrParser::build(&mut g).unwrap();
        // the second `+` reduces `E + T` down to the initial state first
        let outcome = parser.parse(&["id", "+", "id", "+"]);
        let rejection = outcome.rejection().unwrap();
        assert_eq!(rejection.position, 4);
        assert_eq!(rejection.got, Lookahead::End);
        assert_eq!(rejection.expected, vec![Lookahead::terminal("id")]);

        let outcome = parser.parse(&["id", "+", "id", "+", "id"]);
        assert_eq!(
            outcome,
            ParseOutcome::Accepted {
                reductions: vec![2, 1, 2, 0, 2, 0]
            }
        );
    }

    #[test]
    fn augmentation_appends() {
        let mut g = Grammar::define(examples::sums).unwrap();
        let parser = SlrParser::build(&mut g).unwrap();
        assert_eq!(parser.augmented_production(), 3);
        assert_eq!(g.start_symbol(), "E'");
        assert_eq!(g.production(3).to_string(), "E' -> E");
        assert_eq!(g.production(0).to_string(), "E -> E + T");
    }

    #[test]
    fn arithmetic_is_slr1() {
        let mut g = Grammar::define(examples::arithmetic).unwrap();
        let parser = SlrParser::build(&mut g).unwrap();
        assert!(parser.is_slr1());
        assert_eq!(parser.automaton().states.len(), 12);
        let input = ["(", "id", "+", "id", ")", "*", "id"];
        assert!(parser.parse(&input).is_accepted());
        assert!(!parser.parse(&["(", "id"]).is_accepted());
        assert!(parser.parse(&Vec::<String>::new()).rejection().is_some());
    }

    #[test]
    fn conflicts_are_surfaced() {
        let mut g = Grammar::define(examples::dangling_else).unwrap();
        let parser = SlrParser::build(&mut g).unwrap();
        eprintln!("{}", parser.display_table());
        assert!(!parser.is_slr1());
        let conflict = &parser.conflicts()[0];
        assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
        assert_eq!(conflict.lookahead, Lookahead::terminal("else"));
        // the shift is inserted first and stays in the table
        assert!(matches!(conflict.kept, Action::Shift(..)));
        assert!(parser.parse(&["if", "if", "x", "else", "x"]).is_accepted());
    }

    #[test]
    fn ambiguous_grammar_reports_both_operators() {
        let mut g = Grammar::define(examples::ambiguous_arithmetic).unwrap();
        let parser = SlrParser::build(&mut g).unwrap();
        let lookaheads: Vec<_> = parser
            .conflicts()
            .iter()
            .map(|c| c.lookahead.to_string())
            .collect();
        assert!(lookaheads.contains(&"+".to_owned()));
        assert!(lookaheads.contains(&"*".to_owned()));
    }

    #[test]
    fn tables_are_deterministic() {
        let build = || {
            let mut g = Grammar::define(examples::arithmetic).unwrap();
            SlrParser::build(&mut g).unwrap()
        };
        let (a, b) = (build(), build());
        assert_eq!(a.table(), b.table());
        assert_eq!(a.display_states().to_string(), b.display_states().to_string());
    }

    #[test]
    fn located_tokens_carry_position() {
        let mut g = Grammar::define(examples::sums).unwrap();
        let parser = SlrParser::build(&mut g).unwrap();
        let token = |terminal: &str, column| Located {
            terminal: terminal.into(),
            lexeme: terminal.into(),
            location: Location {
                offset: column - 1,
                line: 1,
                column,
            },
        };
        let tokens = [token("id", 1), token("id", 4)];
        let rejection = parser.parse(&tokens).rejection().cloned().unwrap();
        assert_eq!(rejection.position, 1);
        assert_eq!(rejection.got, Lookahead::terminal("id"));
        assert_eq!(rejection.location.map(|l| l.column), Some(4));
        assert!(rejection.message.contains("line 1, column 4"));
    }

    #[test]
    fn ill_formed_grammar_is_left_untouched() {
        let mut g = Grammar::define(|g| {
            g.variable("S");
            g.production("S", ["x"]);
        })
        .unwrap();
        assert!(SlrParser::build(&mut g).is_err());
        assert_eq!(g.start_symbol(), "S");
        assert_eq!(g.productions().len(), 1);
    }
}
