//! CYK recognition with parse-forest extraction and ambiguity detection.
//!
//! The grammar must be in binary form (see [`Grammar::to_binary_form`]).

pub mod tree;

pub use self::tree::{NodeID, ParseTrees, TreeArena, TreeNode};

use crate::{
    grammar::{Grammar, GrammarError},
    types::{Map, Set},
    util::{display_fn, write_joined},
};
use serde::Serialize;
use std::fmt;

/// How many parse trees [`ParseForest::analyze`] extracts.
pub const DEFAULT_TREE_LIMIT: usize = 2;

/// One way a variable derives a span of the input.
///
/// Variables are referred to by their index in the grammar's variable set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Derivation {
    /// `A -> t` where `t` is the single token of the span.
    Terminal,
    /// `A -> left right`, with `left` covering `i..=split`.
    Binary {
        left: usize,
        right: usize,
        split: usize,
    },
}

type Cell = Map<usize, Vec<Derivation>>;

/// The filled CYK table. Cell `(i, j)` holds every variable deriving
/// tokens `i..=j`, with all the ways it does so.
#[derive(Debug, Clone)]
pub struct ParseForest {
    variables: Vec<String>,
    start: usize,
    accepts_empty: bool,
    tokens: Vec<String>,
    cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Ambiguity {
    Unambiguous { derivation: String },
    Ambiguous { first: String, second: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CykReport {
    pub accepted: bool,
    /// `None` when the input is rejected.
    pub ambiguity: Option<Ambiguity>,
}

impl CykReport {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self.ambiguity, Some(Ambiguity::Ambiguous { .. }))
    }
}

impl ParseForest {
    /// Fills the table for `tokens`, each a terminal name.
    #[tracing::instrument(skip_all, fields(len = tokens.len()))]
    pub fn build<S>(g: &Grammar, tokens: &[S]) -> Result<Self, GrammarError>
    where
        S: AsRef<str>,
    {
        g.validate()?;
        let index = |name: &str| {
            g.variables()
                .get_index_of(name)
                .ok_or_else(|| GrammarError::UnknownSymbol(name.to_owned()))
        };
        let start = index(g.start_symbol())?;

        let mut accepts_empty = false;
        let mut terminal_rules: Map<&str, Set<usize>> = Map::default();
        let mut binary_rules: Map<(usize, usize), Set<usize>> = Map::default();
        for p in g.productions() {
            let head = index(&p.head)?;
            match p.body.as_slice() {
                [] if head == start => accepts_empty = true,
                [t] if g.is_terminal(t) => {
                    terminal_rules.entry(t).or_default().insert(head);
                }
                [l, r] if g.is_variable(l) && g.is_variable(r) => {
                    binary_rules
                        .entry((index(l)?, index(r)?))
                        .or_default()
                        .insert(head);
                }
                _ => return Err(GrammarError::NotBinaryForm(p.to_string())),
            }
        }

        let n = tokens.len();
        let mut cells = vec![Cell::default(); n * (n + 1) / 2];
        for (i, token) in tokens.iter().enumerate() {
            if let Some(heads) = terminal_rules.get(token.as_ref()) {
                let cell = &mut cells[cell_index(i, i)];
                for &head in heads {
                    cell.entry(head).or_default().push(Derivation::Terminal);
                }
            }
        }

        let mut found = vec![];
        for len in 2..=n {
            for i in 0..=n - len {
                let j = i + len - 1;
                for split in i..j {
                    let left = &cells[cell_index(i, split)];
                    let right = &cells[cell_index(split + 1, j)];
                    for &b in left.keys() {
                        for &c in right.keys() {
                            for &a in binary_rules.get(&(b, c)).into_iter().flatten() {
                                let derivation = Derivation::Binary {
                                    left: b,
                                    right: c,
                                    split,
                                };
                                found.push((a, derivation));
                            }
                        }
                    }
                }
                let cell = &mut cells[cell_index(i, j)];
                for (a, derivation) in found.drain(..) {
                    cell.entry(a).or_default().push(derivation);
                }
            }
        }

        Ok(Self {
            variables: g.variables().iter().cloned().collect(),
            start,
            accepts_empty,
            tokens: tokens.iter().map(|t| t.as_ref().to_owned()).collect(),
            cells,
        })
    }

    /// Fills the table treating each character of `input` as a terminal.
    pub fn from_chars(g: &Grammar, input: &str) -> Result<Self, GrammarError> {
        let tokens: Vec<String> = input.chars().map(String::from).collect();
        Self::build(g, &tokens)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn accepts(&self) -> bool {
        match self.tokens.len() {
            0 => self.accepts_empty,
            n => self.cells[cell_index(0, n - 1)].contains_key(&self.start),
        }
    }

    /// Variables deriving tokens `i..=j`, in discovery order.
    pub fn cell(&self, i: usize, j: usize) -> Vec<&str> {
        if i > j || j >= self.tokens.len() {
            return vec![];
        }
        self.cells[cell_index(i, j)]
            .keys()
            .map(|v| self.variables[*v].as_str())
            .collect()
    }

    /// The ways `variable` derives tokens `i..=j`.
    pub fn derivations(&self, variable: &str, i: usize, j: usize) -> &[Derivation] {
        let Some(v) = self.variables.iter().position(|name| name == variable) else {
            return &[];
        };
        if i > j || j >= self.tokens.len() {
            return &[];
        }
        self.cells[cell_index(i, j)]
            .get(&v)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Extracts at most `limit` distinct parse trees of the whole input.
    pub fn parse_trees(&self, limit: usize) -> ParseTrees {
        let mut trees = ParseTrees::default();
        if limit == 0 || !self.accepts() {
            return trees;
        }
        if self.tokens.is_empty() {
            let epsilon = trees.arena.leaf("ε");
            let root = trees.arena.node(&self.variables[self.start], vec![epsilon]);
            trees.roots.push(root);
            return trees;
        }

        let mut memo = Map::default();
        let n = self.tokens.len();
        trees.roots = self.trees_of(&mut trees.arena, &mut memo, self.start, 0, n - 1, limit);
        trees
    }

    fn trees_of(
        &self,
        arena: &mut TreeArena,
        memo: &mut Map<(usize, usize, usize), Vec<NodeID>>,
        variable: usize,
        i: usize,
        j: usize,
        limit: usize,
    ) -> Vec<NodeID> {
        if let Some(found) = memo.get(&(variable, i, j)) {
            return found.clone();
        }

        let label = &self.variables[variable];
        let mut found = vec![];
        let derivations = self.cells[cell_index(i, j)]
            .get(&variable)
            .map_or(&[][..], Vec::as_slice);
        for derivation in derivations {
            if found.len() >= limit {
                break;
            }
            match *derivation {
                Derivation::Terminal => {
                    let leaf = arena.leaf(&self.tokens[i]);
                    found.push(arena.node(label, vec![leaf]));
                }
                Derivation::Binary { left, right, split } => {
                    let lefts = self.trees_of(arena, memo, left, i, split, limit);
                    let rights = self.trees_of(arena, memo, right, split + 1, j, limit);
                    'pairs: for &l in &lefts {
                        for &r in &rights {
                            if found.len() >= limit {
                                break 'pairs;
                            }
                            found.push(arena.node(label, vec![l, r]));
                        }
                    }
                }
            }
        }

        memo.insert((variable, i, j), found.clone());
        found
    }

    /// Membership plus up to two derivations of the input.
    ///
    /// Ambiguity is judged on the binary grammar the forest was built from.
    /// [`Grammar::to_binary_form`] merges duplicate productions, so an
    /// ambiguous source grammar may come out unambiguous here.
    pub fn analyze(&self) -> CykReport {
        let trees = self.parse_trees(DEFAULT_TREE_LIMIT).render();
        let ambiguity = match trees.as_slice() {
            [] => None,
            [derivation] => Some(Ambiguity::Unambiguous {
                derivation: derivation.clone(),
            }),
            [first, second, ..] => Some(Ambiguity::Ambiguous {
                first: first.clone(),
                second: second.clone(),
            }),
        };
        CykReport {
            accepted: self.accepts(),
            ambiguity,
        }
    }

    /// Renders the triangular table, longest span first.
    pub fn display_table(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            let n = self.tokens.len();
            for len in (1..=n).rev() {
                for i in 0..=n - len {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    f.write_str("{")?;
                    let mut names = self.cell(i, i + len - 1);
                    names.sort_unstable();
                    write_joined(f, ", ", names)?;
                    f.write_str("}")?;
                }
                writeln!(f)?;
            }
            write_joined(f, "   ", &self.tokens)
        })
    }
}

fn cell_index(i: usize, j: usize) -> usize {
    debug_assert!(i <= j);
    j * (j + 1) / 2 + i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::examples;

    fn ambiguous() -> Grammar {
        Grammar::define(examples::ambiguous_arithmetic)
            .unwrap()
            .to_binary_form()
            .unwrap()
    }

    #[test]
    fn requires_binary_form() {
        let g = Grammar::define(examples::sums).unwrap();
        assert!(matches!(
            ParseForest::build(&g, &["id"]),
            Err(GrammarError::NotBinaryForm(..))
        ));
    }

    #[test]
    fn small_binary_grammar() {
        let g = Grammar::define(|g| {
            g.variable("S").variable("A").variable("B");
            g.terminal("a").terminal("b");
            g.production("S", ["A", "B"]);
            g.production("A", ["a"]);
            g.production("B", ["b"]);
        })
        .unwrap();

        let forest = ParseForest::from_chars(&g, "ab").unwrap();
        eprintln!("{}", forest.display_table());
        assert!(forest.accepts());
        assert_eq!(forest.cell(0, 1), ["S"]);
        assert_eq!(
            forest.derivations("S", 0, 1),
            [Derivation::Binary {
                left: 1,
                right: 2,
                split: 0
            }]
        );
        let report = forest.analyze();
        assert_eq!(
            report.ambiguity,
            Some(Ambiguity::Unambiguous {
                derivation: "(S (A a) (B b))".into()
            })
        );

        assert!(!ParseForest::from_chars(&g, "ba").unwrap().accepts());
        assert!(!ParseForest::from_chars(&g, "").unwrap().accepts());
    }

    #[test]
    fn ambiguous_expression_has_two_witnesses() {
        let g = ambiguous();
        let forest = ParseForest::build(&g, &["id", "+", "id", "*", "id"]).unwrap();
        eprintln!("{}", forest.display_table());
        let report = forest.analyze();
        assert!(report.accepted);
        match report.ambiguity {
            Some(Ambiguity::Ambiguous { first, second }) => assert_ne!(first, second),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn single_operator_is_unambiguous() {
        let g = ambiguous();
        let report = ParseForest::build(&g, &["id", "+", "id"]).unwrap().analyze();
        assert!(report.accepted);
        assert!(!report.is_ambiguous());
    }

    #[test]
    fn rejected_input_has_no_derivation() {
        let g = ambiguous();
        let report = ParseForest::build(&g, &["id", "+"]).unwrap().analyze();
        assert_eq!(
            report,
            CykReport {
                accepted: false,
                ambiguity: None
            }
        );
    }

    #[test]
    fn empty_input_needs_epsilon_start() {
        let g = Grammar::define(examples::nested)
            .unwrap()
            .to_binary_form()
            .unwrap();
        let forest = ParseForest::from_chars(&g, "").unwrap();
        assert!(forest.accepts());
        assert!(ParseForest::from_chars(&g, "aabb").unwrap().accepts());
        assert!(!ParseForest::from_chars(&g, "aab").unwrap().accepts());
    }

    #[test]
    fn tree_limit_is_respected() {
        let g = ambiguous();
        let tokens = ["id", "+", "id", "+", "id", "+", "id"];
        let forest = ParseForest::build(&g, &tokens).unwrap();
        assert_eq!(forest.parse_trees(1).len(), 1);
        assert_eq!(forest.parse_trees(3).len(), 3);
        assert_eq!(forest.parse_trees(100).len(), 5);
    }
}
