//! LL(1) predictive parsing tables.

use crate::{
    grammar::{Grammar, GrammarError, Lookahead, LookaheadSet},
    types::Map,
    util::display_fn,
};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LL1Entry {
    /// Expand the variable with the production at this index.
    Production(usize),
    Error,
}

/// Two productions demanded the same cell. The one inserted first is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LL1Conflict {
    pub variable: String,
    pub lookahead: Lookahead,
    pub kept: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct LL1Table {
    columns: Vec<Lookahead>,
    rows: Map<String, Map<Lookahead, LL1Entry>>,
    conflicts: Vec<LL1Conflict>,
}

impl Grammar {
    #[tracing::instrument(skip_all)]
    pub fn build_ll1_table(&self) -> Result<LL1Table, GrammarError> {
        let sets = self.derivation_sets()?;

        let columns: Vec<Lookahead> = self
            .terminals()
            .iter()
            .map(Lookahead::terminal)
            .chain(Some(Lookahead::End))
            .collect();
        let mut rows: Map<String, Map<Lookahead, LL1Entry>> = self
            .variables()
            .iter()
            .map(|v| {
                let row = columns.iter().map(|c| (c.clone(), LL1Entry::Error)).collect();
                (v.clone(), row)
            })
            .collect();

        let mut conflicts = vec![];
        for (index, p) in self.productions().iter().enumerate() {
            let first = sets.first_of(p.body.iter().map(String::as_str));
            let mut lookaheads: Vec<&Lookahead> =
                first.iter().filter(|l| **l != Lookahead::Epsilon).collect();
            if first.contains(&Lookahead::Epsilon) {
                lookaheads.extend(sets.follow(&p.head).into_iter().flatten());
            }

            let row = &mut rows[p.head.as_str()];
            for lookahead in lookaheads {
                let entry = row.entry(lookahead.clone()).or_insert(LL1Entry::Error);
                match *entry {
                    LL1Entry::Error => *entry = LL1Entry::Production(index),
                    LL1Entry::Production(kept) if kept != index => {
                        tracing::warn!(
                            "LL(1) conflict at ({}, {}): keeping `{}', dropping `{}'",
                            p.head,
                            lookahead,
                            self.production(kept),
                            p
                        );
                        conflicts.push(LL1Conflict {
                            variable: p.head.clone(),
                            lookahead: lookahead.clone(),
                            kept,
                            rejected: index,
                        });
                    }
                    LL1Entry::Production(..) => {}
                }
            }
        }

        Ok(LL1Table {
            columns,
            rows,
            conflicts,
        })
    }

    /// FIRST, FOLLOW and the LL(1) table in a serializable form.
    pub fn ll1_report(&self) -> Result<LL1Report, GrammarError> {
        let sets = self.derivation_sets()?;
        let table = self.build_ll1_table()?;

        let for_variables = |sets: &Map<String, LookaheadSet>| {
            sets.iter()
                .filter(|(name, _)| self.is_variable(name))
                .map(|(name, set)| (name.clone(), set.iter().cloned().collect()))
                .collect()
        };

        let cells = table
            .rows
            .iter()
            .map(|(variable, row)| {
                let row = row
                    .iter()
                    .map(|(lookahead, entry)| {
                        let cell = match entry {
                            LL1Entry::Production(index) => self.production(*index).to_string(),
                            LL1Entry::Error => "<ERR>".to_owned(),
                        };
                        (lookahead.clone(), cell)
                    })
                    .collect();
                (variable.clone(), row)
            })
            .collect();

        Ok(LL1Report {
            first: for_variables(sets.first_sets()),
            follow: for_variables(sets.follow_sets()),
            table: cells,
            conflicts: table.conflicts,
        })
    }
}

impl LL1Table {
    pub fn get(&self, variable: &str, lookahead: &Lookahead) -> Option<LL1Entry> {
        self.rows.get(variable)?.get(lookahead).copied()
    }

    pub fn columns(&self) -> &[Lookahead] {
        &self.columns
    }

    pub fn conflicts(&self) -> &[LL1Conflict] {
        &self.conflicts
    }

    pub fn is_ll1(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// The lookaheads for which `variable` has a production.
    pub fn expected(&self, variable: &str) -> Vec<&Lookahead> {
        self.rows
            .get(variable)
            .into_iter()
            .flatten()
            .filter(|(_, entry)| **entry != LL1Entry::Error)
            .map(|(lookahead, _)| lookahead)
            .collect()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (variable, row)) in self.rows.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### {}", variable)?;
                for (lookahead, entry) in row {
                    if let LL1Entry::Production(index) = entry {
                        writeln!(f, "- {} => {}", lookahead, g.production(*index))?;
                    }
                }
            }
            if !self.conflicts.is_empty() {
                writeln!(f, "\n## conflicts")?;
                for c in &self.conflicts {
                    writeln!(
                        f,
                        "- ({}, {}): kept `{}', rejected `{}'",
                        c.variable,
                        c.lookahead,
                        g.production(c.kept),
                        g.production(c.rejected)
                    )?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LL1Report {
    pub first: Map<String, Vec<Lookahead>>,
    pub follow: Map<String, Vec<Lookahead>>,
    #[serde(rename = "ll1_table")]
    pub table: Map<String, Map<Lookahead, String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<LL1Conflict>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::examples;

    #[test]
    fn textbook_table() {
        let g = Grammar::define(examples::arithmetic_ll1).unwrap();
        let table = g.build_ll1_table().unwrap();
        eprintln!("{}", table.display(&g));

        assert!(table.is_ll1());
        assert_eq!(
            table.get("E", &Lookahead::terminal("id")),
            Some(LL1Entry::Production(0))
        );
        assert_eq!(
            table.get("E'", &Lookahead::End),
            Some(LL1Entry::Production(2))
        );
        assert_eq!(
            table.get("T'", &Lookahead::terminal("+")),
            Some(LL1Entry::Production(5))
        );
        assert_eq!(
            table.get("F", &Lookahead::terminal("+")),
            Some(LL1Entry::Error)
        );
        let expected: Vec<_> = table.expected("F").into_iter().cloned().collect();
        assert_eq!(
            expected,
            vec![Lookahead::terminal("("), Lookahead::terminal("id")]
        );
    }

    #[test]
    fn conflicts_keep_first_entry() {
        let g = Grammar::define(examples::ambiguous_arithmetic).unwrap();
        let table = g.build_ll1_table().unwrap();
        assert!(!table.is_ll1());
        assert_eq!(
            table.get("E", &Lookahead::terminal("id")),
            Some(LL1Entry::Production(0))
        );
        assert!(table.conflicts().contains(&LL1Conflict {
            variable: "E".into(),
            lookahead: Lookahead::terminal("id"),
            kept: 0,
            rejected: 2,
        }));
    }

    #[test]
    fn report_serializes_error_cells() {
        let g = Grammar::define(examples::nested).unwrap();
        let report = serde_json::to_value(g.ll1_report().unwrap()).unwrap();
        assert_eq!(report["ll1_table"]["S"]["a"], "S -> a S b");
        assert_eq!(report["ll1_table"]["S"]["b"], "S -> ε");
        assert_eq!(report["ll1_table"]["S"]["<EOS>"], "S -> ε");
        assert_eq!(report["first"]["S"], serde_json::json!(["ε", "a"]));
        assert!(report.get("conflicts").is_none());
    }
}
