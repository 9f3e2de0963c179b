//! Pushdown automata and their conversion into context-free grammars.

use crate::{
    grammar::{fresh_name, Grammar, Production},
    source::{PdaSource, TransitionSource},
    types::Set,
    util::write_joined,
};
use itertools::Itertools as _;
use std::{fmt, iter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: String,
    pub to: String,
    /// `None` for ε-moves.
    pub input: Option<String>,
    pub stack_top: String,
    /// Replacement for the stack top, topmost first. Empty pops.
    pub push: Vec<String>,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "δ({}, {}, {}) -> ({}, ",
            self.from,
            self.input.as_deref().unwrap_or("ε"),
            self.stack_top,
            self.to
        )?;
        if self.push.is_empty() {
            f.write_str("ε")?;
        } else {
            write_joined(f, " ", &self.push)?;
        }
        f.write_str(")")
    }
}

/// A pushdown automaton accepting by empty stack.
#[derive(Debug, Clone)]
pub struct Pda {
    pub states: Set<String>,
    pub alphabet: Set<String>,
    pub stack_alphabet: Set<String>,
    pub transitions: Vec<Transition>,
    pub start_state: String,
    pub start_stack: String,
}

impl Pda {
    /// No semantic checks are made here; unknown states or symbols in
    /// transitions surface later as an ill-formed grammar.
    pub fn from_source(source: &PdaSource) -> Self {
        Self {
            states: source.states.iter().cloned().collect(),
            alphabet: source.alphabet.iter().cloned().collect(),
            stack_alphabet: source.stack_alphabet.iter().cloned().collect(),
            transitions: source
                .transitions
                .iter()
                .map(|t| Transition {
                    from: t.from.clone(),
                    to: t.to.clone(),
                    input: Some(t.input.clone()).filter(|input| !input.is_empty()),
                    stack_top: t.stack_top.clone(),
                    push: t.push.clone(),
                })
                .collect(),
            start_state: source.start_state.clone(),
            start_stack: source.start_stack.clone(),
        }
    }

    pub fn to_source(&self) -> PdaSource {
        PdaSource {
            states: self.states.iter().cloned().collect(),
            alphabet: self.alphabet.iter().cloned().collect(),
            stack_alphabet: self.stack_alphabet.iter().cloned().collect(),
            transitions: self
                .transitions
                .iter()
                .map(|t| TransitionSource {
                    from: t.from.clone(),
                    to: t.to.clone(),
                    input: t.input.clone().unwrap_or_default(),
                    stack_top: t.stack_top.clone(),
                    push: t.push.clone(),
                })
                .collect(),
            start_state: self.start_state.clone(),
            start_stack: self.start_stack.clone(),
        }
    }

    /// Converts the automaton into a grammar by the triple construction.
    ///
    /// The variable `[p,A,q]` derives exactly the inputs that take the
    /// automaton from `p` to `q` while popping `A` off the stack. A push of
    /// `k` symbols yields `|states|^k` productions.
    #[tracing::instrument(skip_all)]
    pub fn to_cfg(&self) -> Grammar {
        let triples: Vec<String> = self
            .states
            .iter()
            .flat_map(|p| {
                self.stack_alphabet
                    .iter()
                    .flat_map(move |a| self.states.iter().map(move |q| triple(p, a, q)))
            })
            .collect();
        let start = fresh_name("S", |name| {
            self.alphabet.contains(name) || triples.iter().any(|t| t == name)
        });

        let mut productions: Vec<Production> = self
            .states
            .iter()
            .map(|q| {
                Production::new(
                    &*start,
                    [triple(&self.start_state, &self.start_stack, q)],
                )
            })
            .collect();

        for t in &self.transitions {
            if t.push.is_empty() {
                productions.push(Production::new(
                    triple(&t.from, &t.stack_top, &t.to),
                    t.input.iter(),
                ));
                continue;
            }

            // [from,top,r_k] -> a [to,B1,r1] [r1,B2,r2] ... [r_{k-1},Bk,r_k]
            for targets in iter::repeat(self.states.iter())
                .take(t.push.len())
                .multi_cartesian_product()
            {
                let mut body: Vec<String> = t.input.iter().cloned().collect();
                let mut current = &t.to;
                for (symbol, &target) in t.push.iter().zip(&targets) {
                    body.push(triple(current, symbol, target));
                    current = target;
                }
                productions.push(Production {
                    head: triple(&t.from, &t.stack_top, current),
                    body,
                });
            }
        }

        tracing::debug!(
            variables = triples.len() + 1,
            productions = productions.len(),
            "converted PDA into grammar"
        );

        let variables = iter::once(start.clone()).chain(triples).collect();
        Grammar::from_parts(variables, self.alphabet.clone(), productions, start)
    }
}

fn triple(p: &str, a: &str, q: &str) -> String {
    format!("[{},{},{}]", p, a, q)
}
