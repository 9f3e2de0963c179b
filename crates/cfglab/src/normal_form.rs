//! Conversion into Chomsky normal form, the input shape of [`crate::cyk`].

use crate::{
    grammar::{fresh_name, Grammar, GrammarError, Production},
    types::{Map, Queue, Set},
};
use std::{iter, mem};

impl Grammar {
    /// Returns an equivalent grammar whose productions all have the shape
    /// `A -> B C`, `A -> t`, or `S -> ε` for the start symbol `S`.
    ///
    /// New variables get names that collide with no existing symbol.
    ///
    /// Duplicate productions are merged, so alternatives that only differed
    /// through unit or ε-productions collapse into one. Ambiguity reported on
    /// the result is ambiguity of the binary grammar, not of `self`.
    #[tracing::instrument(skip_all)]
    pub fn to_binary_form(&self) -> Result<Grammar, GrammarError> {
        self.validate()?;

        let mut b = Binarizer {
            variables: self.variables.clone(),
            terminals: self.terminals.clone(),
            productions: self.productions.clone(),
            start: self.start.clone(),
        };
        b.isolate_start();
        b.lift_terminals();
        b.split_bodies();
        b.remove_epsilon();
        b.remove_units();

        let mut g = Grammar::from_parts(b.variables, b.terminals, b.productions, b.start);
        g.remove_useless_productions();
        tracing::debug!(
            variables = g.variables.len(),
            productions = g.productions.len(),
            "converted into binary form"
        );
        Ok(g)
    }

    pub fn is_binary_form(&self) -> bool {
        let start_in_body = self
            .productions
            .iter()
            .any(|p| p.body.contains(&self.start));
        self.productions.iter().all(|p| match p.body.as_slice() {
            [] => p.head == self.start && !start_in_body,
            [t] => self.is_terminal(t),
            [l, r] => self.is_variable(l) && self.is_variable(r),
            _ => false,
        })
    }
}

struct Binarizer {
    variables: Set<String>,
    terminals: Set<String>,
    productions: Vec<Production>,
    start: String,
}

impl Binarizer {
    fn fresh(&mut self, base: &str) -> String {
        let name = fresh_name(base, |name| {
            self.variables.contains(name) || self.terminals.contains(name)
        });
        self.variables.insert(name.clone());
        name
    }

    /// Keeps the start symbol out of every body.
    fn isolate_start(&mut self) {
        if !self.productions.iter().any(|p| p.body.contains(&self.start)) {
            return;
        }
        let base = format!("{}0", self.start);
        let start = self.fresh(&base);
        let production = Production::new(&*start, [self.start.clone()]);
        self.productions.insert(0, production);
        self.start = start;
    }

    /// Replaces terminals in bodies of length two or more by `<t> -> t`.
    fn lift_terminals(&mut self) {
        let mut lifted: Map<String, String> = Map::default();
        let mut productions = mem::take(&mut self.productions);
        for p in &mut productions {
            if p.body.len() < 2 {
                continue;
            }
            for symbol in &mut p.body {
                if !self.terminals.contains(symbol.as_str()) {
                    continue;
                }
                let variable = match lifted.get(symbol.as_str()) {
                    Some(variable) => variable.clone(),
                    None => {
                        let variable = self.fresh(&format!("<{}>", symbol));
                        lifted.insert(symbol.clone(), variable.clone());
                        variable
                    }
                };
                *symbol = variable;
            }
        }
        productions.extend(
            lifted
                .into_iter()
                .map(|(terminal, variable)| Production::new(variable, [terminal])),
        );
        self.productions = productions;
    }

    /// `A -> X1 X2 ... Xn` becomes `A -> X1 A_1`, `A_1 -> X2 A_2`, ...
    fn split_bodies(&mut self) {
        let mut counter = 0;
        let mut productions = Vec::with_capacity(self.productions.len());
        for p in mem::take(&mut self.productions) {
            if p.body.len() <= 2 {
                productions.push(p);
                continue;
            }
            let n = p.body.len();
            let mut head = p.head.clone();
            for symbol in &p.body[..n - 2] {
                counter += 1;
                let rest = self.fresh(&format!("{}_{}", p.head, counter));
                productions.push(Production::new(head, [symbol.clone(), rest.clone()]));
                head = rest;
            }
            productions.push(Production::new(head, &p.body[n - 2..]));
        }
        self.productions = productions;
    }

    fn remove_epsilon(&mut self) {
        let mut nullable: Set<&str> = Set::default();
        let mut changed = true;
        while changed {
            changed = false;
            for p in &self.productions {
                if p.body.iter().all(|s| nullable.contains(s.as_str())) {
                    changed |= nullable.insert(&p.head);
                }
            }
        }

        let mut productions: Set<Production> = Set::default();
        for p in &self.productions {
            match p.body.as_slice() {
                [] => {}
                [x, y] => {
                    productions.insert(p.clone());
                    if nullable.contains(x.as_str()) {
                        productions.insert(Production::new(&*p.head, [y]));
                    }
                    if nullable.contains(y.as_str()) {
                        productions.insert(Production::new(&*p.head, [x]));
                    }
                }
                _ => {
                    productions.insert(p.clone());
                }
            }
        }
        if nullable.contains(self.start.as_str()) {
            productions.insert(Production::new(&*self.start, iter::empty::<String>()));
        }
        self.productions = productions.into_iter().collect();
    }

    fn remove_units(&mut self) {
        let is_unit = |p: &Production| p.body.len() == 1 && self.variables.contains(&p.body[0]);

        let mut productions: Set<Production> = Set::default();
        for v in &self.variables {
            let mut chain: Set<&str> = Set::default();
            chain.insert(v);
            let mut queue: Queue<&str> = iter::once(v.as_str()).collect();
            while let Some(u) = queue.pop() {
                for p in self.productions.iter().filter(|p| p.head == u && is_unit(p)) {
                    if chain.insert(&p.body[0]) {
                        queue.push(&p.body[0]);
                    }
                }
            }

            for u in chain {
                for p in self.productions.iter().filter(|p| p.head == u && !is_unit(p)) {
                    productions.insert(Production::new(&**v, &p.body));
                }
            }
        }
        self.productions = productions.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::examples;

    #[test]
    fn arithmetic_binary_form() {
        let g = Grammar::define(examples::arithmetic).unwrap();
        let b = g.to_binary_form().unwrap();
        eprintln!("{}", b);
        assert!(b.is_binary_form());
        assert!(!g.is_binary_form());
        assert_eq!(b.start_symbol(), "E0");
    }

    #[test]
    fn nullable_start_keeps_epsilon() {
        let g = Grammar::define(examples::nested).unwrap();
        let b = g.to_binary_form().unwrap();
        eprintln!("{}", b);
        assert!(b.is_binary_form());
        assert!(b
            .productions_of(b.start_symbol())
            .any(|(_, p)| p.is_epsilon()));
    }

    #[test]
    fn binary_grammar_is_a_fixed_point() {
        let g = Grammar::define(|g| {
            g.variable("S").variable("A");
            g.terminal("a");
            g.production("S", ["A", "A"]);
            g.production("A", ["a"]);
        })
        .unwrap();
        let b = g.to_binary_form().unwrap();
        assert_eq!(b.to_string(), g.to_string());
    }

    #[test]
    fn fresh_names_do_not_collide() {
        let g = Grammar::define(|g| {
            g.variable("S").variable("<a>");
            g.terminal("a").terminal("b");
            g.production("S", ["a", "<a>"]);
            g.production("<a>", ["b"]);
        })
        .unwrap();
        let b = g.to_binary_form().unwrap();
        eprintln!("{}", b);
        assert!(b.is_binary_form());
        assert!(b.is_variable("<a>'"));
    }

    #[test]
    fn unit_alternatives_are_merged() {
        let g = Grammar::define(|g| {
            g.variable("S").variable("A").variable("B");
            g.terminal("a");
            g.production("S", ["A"]);
            g.production("S", ["B"]);
            g.production("A", ["a"]);
            g.production("B", ["a"]);
        })
        .unwrap();
        let b = g.to_binary_form().unwrap();
        let productions: Vec<_> = b.productions().iter().map(|p| p.to_string()).collect();
        assert_eq!(productions, ["S -> a"]);

        let report = crate::cyk::ParseForest::from_chars(&b, "a")
            .unwrap()
            .analyze();
        assert!(report.accepted);
        assert!(!report.is_ambiguous());
    }

    #[test]
    fn ill_formed_grammar_is_rejected() {
        let g = Grammar::define(|g| {
            g.variable("S");
            g.production("S", ["x"]);
        })
        .unwrap();
        assert!(g.to_binary_form().is_err());
    }
}
