//! Grammar types.

use crate::{
    sets::DerivationSets,
    source::{GrammarSource, ProductionSource},
    types::Set,
    util::write_joined,
};
use serde::{Serialize, Serializer};
use std::{cell::OnceCell, fmt};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarError {
    #[error("the start symbol `{0}' is not declared as a variable")]
    UndeclaredStart(String),

    #[error("the symbol `{0}' is declared both as a terminal and as a variable")]
    SymbolClash(String),

    #[error("empty symbol name in {0}")]
    EmptySymbolName(&'static str),

    #[error("ill-formed grammar: the head of `{production}' is not a variable")]
    HeadNotVariable { production: String },

    #[error("ill-formed grammar: `{symbol}' in `{production}' is neither a terminal nor a variable")]
    UndeclaredSymbol { symbol: String, production: String },

    #[error("unknown symbol `{0}'")]
    UnknownSymbol(String),

    #[error("the production `{0}' is not in binary form")]
    NotBinaryForm(String),
}

/// An element of FIRST/FOLLOW sets and the column key of parse tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lookahead {
    /// The empty string. Only appears in FIRST sets.
    Epsilon,
    /// The end of input.
    End,
    Terminal(String),
}

impl Lookahead {
    pub fn terminal(name: impl Into<String>) -> Self {
        Self::Terminal(name.into())
    }

    pub fn as_terminal(&self) -> Option<&str> {
        match self {
            Self::Terminal(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Lookahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epsilon => f.write_str("ε"),
            Self::End => f.write_str("<EOS>"),
            Self::Terminal(name) => f.write_str(name),
        }
    }
}

impl Serialize for Lookahead {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub type LookaheadSet = Set<Lookahead>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production {
    pub head: String,
    /// The right-hand side. An empty body derives ε.
    pub body: Vec<String>,
}

impl Production {
    pub fn new<I>(head: impl Into<String>, body: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            head: head.into(),
            body: body.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> ", self.head)?;
        if self.body.is_empty() {
            f.write_str("ε")
        } else {
            write_joined(f, " ", &self.body)
        }
    }
}

/// A context-free grammar.
///
/// Productions are identified by their position in [`productions`](Self::productions).
/// Positions never shift except through the bulk mutators
/// ([`set_productions`](Self::set_productions) and the simplification passes).
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) variables: Set<String>,
    pub(crate) terminals: Set<String>,
    pub(crate) productions: Vec<Production>,
    pub(crate) start: String,
    sets: OnceCell<DerivationSets>,
}

impl Grammar {
    /// Builds a grammar from its declarative description.
    ///
    /// Symbol declarations are checked here. Productions are only checked
    /// when derived sets are first requested.
    pub fn from_source(source: &GrammarSource) -> Result<Self, GrammarError> {
        let names = source
            .variables
            .iter()
            .map(|v| (v, "variables"))
            .chain(source.terminals.iter().map(|t| (t, "terminals")))
            .chain(source.productions.iter().map(|p| (&p.head, "production heads")))
            .chain(
                source
                    .productions
                    .iter()
                    .flat_map(|p| p.body.iter().map(|s| (s, "production bodies"))),
            );
        for (name, location) in names {
            if name.is_empty() {
                return Err(GrammarError::EmptySymbolName(location));
            }
        }

        let grammar = Self::from_parts(
            source.variables.iter().cloned().collect(),
            source.terminals.iter().cloned().collect(),
            source
                .productions
                .iter()
                .map(|p| Production::new(&*p.head, &p.body))
                .collect(),
            source.start.clone(),
        );
        grammar.validate_declarations()?;
        Ok(grammar)
    }

    pub(crate) fn from_parts(
        variables: Set<String>,
        terminals: Set<String>,
        productions: Vec<Production>,
        start: String,
    ) -> Self {
        Self {
            variables,
            terminals,
            productions,
            start,
            sets: OnceCell::new(),
        }
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef),
    {
        let mut def = GrammarDef::default();
        f(&mut def);
        def.end()
    }

    pub fn to_source(&self) -> GrammarSource {
        GrammarSource {
            variables: self.variables.iter().cloned().collect(),
            terminals: self.terminals.iter().cloned().collect(),
            productions: self
                .productions
                .iter()
                .map(|p| ProductionSource {
                    head: p.head.clone(),
                    body: p.body.clone(),
                })
                .collect(),
            start: self.start.clone(),
        }
    }

    pub fn variables(&self) -> &Set<String> {
        &self.variables
    }

    pub fn terminals(&self) -> &Set<String> {
        &self.terminals
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, index: usize) -> &Production {
        &self.productions[index]
    }

    /// Productions whose head is `head`, with their indices.
    pub fn productions_of<'g>(
        &'g self,
        head: &'g str,
    ) -> impl Iterator<Item = (usize, &'g Production)> + 'g {
        self.productions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.head == head)
    }

    pub fn start_symbol(&self) -> &str {
        &self.start
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.contains(symbol)
    }

    pub fn is_variable(&self, symbol: &str) -> bool {
        self.variables.contains(symbol)
    }

    /// Appends a production and returns its index.
    pub fn add_production(&mut self, production: Production) -> usize {
        self.invalidate_caches();
        self.productions.push(production);
        self.productions.len() - 1
    }

    /// Declares a new variable. Returns `false` if it was already declared.
    pub fn add_variable(&mut self, name: impl Into<String>) -> bool {
        self.invalidate_caches();
        self.variables.insert(name.into())
    }

    pub fn set_productions(&mut self, productions: Vec<Production>) {
        self.invalidate_caches();
        self.productions = productions;
    }

    pub fn set_variables<I>(&mut self, variables: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.invalidate_caches();
        self.variables = variables.into_iter().collect();
    }

    pub fn set_terminals<I>(&mut self, terminals: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.invalidate_caches();
        self.terminals = terminals.into_iter().collect();
    }

    pub fn set_start_symbol(&mut self, start: impl Into<String>) {
        self.invalidate_caches();
        self.start = start.into();
    }

    /// Drops every derived set computed so far.
    pub fn invalidate_caches(&mut self) {
        self.sets.take();
    }

    /// Returns the FIRST/FOLLOW/nullable sets, computing them on first use.
    pub fn derivation_sets(&self) -> Result<&DerivationSets, GrammarError> {
        if let Some(sets) = self.sets.get() {
            return Ok(sets);
        }
        let sets = DerivationSets::compute(self)?;
        Ok(self.sets.get_or_init(|| sets))
    }

    /// Returns `base` primed as many times as needed to avoid any declared symbol.
    pub fn fresh_name(&self, base: &str) -> String {
        fresh_name(base, |name| self.is_variable(name) || self.is_terminal(name))
    }

    fn validate_declarations(&self) -> Result<(), GrammarError> {
        if let Some(clash) = self.terminals.iter().find(|t| self.variables.contains(*t)) {
            return Err(GrammarError::SymbolClash(clash.clone()));
        }
        if !self.variables.contains(&self.start) {
            return Err(GrammarError::UndeclaredStart(self.start.clone()));
        }
        Ok(())
    }

    /// Checks every declaration and every production.
    pub(crate) fn validate(&self) -> Result<(), GrammarError> {
        self.validate_declarations()?;
        for production in &self.productions {
            if !self.is_variable(&production.head) {
                return Err(GrammarError::HeadNotVariable {
                    production: production.to_string(),
                });
            }
            if let Some(symbol) = production
                .body
                .iter()
                .find(|s| !self.is_variable(s) && !self.is_terminal(s))
            {
                return Err(GrammarError::UndeclaredSymbol {
                    symbol: symbol.clone(),
                    production: production.to_string(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn fresh_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut name = base.to_owned();
    while taken(&name) {
        name.push('\'');
    }
    name
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut variables: Vec<_> = self.variables.iter().collect();
        variables.sort();
        let mut terminals: Vec<_> = self.terminals.iter().collect();
        terminals.sort();
        let mut productions: Vec<_> = self.productions.iter().collect();
        productions.sort();

        f.write_str("V = {")?;
        write_joined(f, ", ", variables)?;
        f.write_str("}\nT = {")?;
        write_joined(f, ", ", terminals)?;
        f.write_str("}\nP = {\n")?;
        for production in productions {
            writeln!(f, "    {}", production)?;
        }
        writeln!(f, "}}")?;
        write!(f, "S = {}", self.start)
    }
}

/// Incremental grammar definition used by [`Grammar::define`].
///
/// The start symbol defaults to the first declared variable.
#[derive(Debug, Default)]
pub struct GrammarDef {
    source: GrammarSource,
    start: Option<String>,
}

impl GrammarDef {
    pub fn terminal(&mut self, name: &str) -> &mut Self {
        self.source.terminals.push(name.to_owned());
        self
    }

    pub fn variable(&mut self, name: &str) -> &mut Self {
        self.source.variables.push(name.to_owned());
        self
    }

    pub fn production<'a>(
        &mut self,
        head: &str,
        body: impl IntoIterator<Item = &'a str>,
    ) -> &mut Self {
        self.source.productions.push(ProductionSource {
            head: head.to_owned(),
            body: body.into_iter().map(str::to_owned).collect(),
        });
        self
    }

    pub fn start_symbol(&mut self, name: &str) -> &mut Self {
        self.start = Some(name.to_owned());
        self
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        self.source.start = match self.start {
            Some(start) => start,
            None => self.source.variables.first().cloned().unwrap_or_default(),
        };
        Grammar::from_source(&self.source)
    }
}

/// Small grammars shared by tests and benchmarks.
pub mod examples {
    use super::GrammarDef;

    /// `E -> E + T | T`, `T -> id`
    pub fn sums(g: &mut GrammarDef) {
        g.variable("E").variable("T");
        g.terminal("+").terminal("id");
        g.production("E", ["E", "+", "T"]);
        g.production("E", ["T"]);
        g.production("T", ["id"]);
    }

    /// `S -> a S b | ε`
    pub fn nested(g: &mut GrammarDef) {
        g.variable("S");
        g.terminal("a").terminal("b");
        g.production("S", ["a", "S", "b"]);
        g.production("S", []);
    }

    /// `E -> E + E | E * E | id`
    pub fn ambiguous_arithmetic(g: &mut GrammarDef) {
        g.variable("E");
        g.terminal("+").terminal("*").terminal("id");
        g.production("E", ["E", "+", "E"]);
        g.production("E", ["E", "*", "E"]);
        g.production("E", ["id"]);
    }

    /// The textbook expression grammar with precedence levels.
    pub fn arithmetic(g: &mut GrammarDef) {
        for v in ["E", "T", "F"] {
            g.variable(v);
        }
        for t in ["+", "*", "(", ")", "id"] {
            g.terminal(t);
        }
        g.production("E", ["E", "+", "T"]);
        g.production("E", ["T"]);
        g.production("T", ["T", "*", "F"]);
        g.production("T", ["F"]);
        g.production("F", ["(", "E", ")"]);
        g.production("F", ["id"]);
    }

    /// [`arithmetic`] after left-recursion elimination; LL(1).
    pub fn arithmetic_ll1(g: &mut GrammarDef) {
        for v in ["E", "E'", "T", "T'", "F"] {
            g.variable(v);
        }
        for t in ["+", "*", "(", ")", "id"] {
            g.terminal(t);
        }
        g.production("E", ["T", "E'"]);
        g.production("E'", ["+", "T", "E'"]);
        g.production("E'", []);
        g.production("T", ["F", "T'"]);
        g.production("T'", ["*", "F", "T'"]);
        g.production("T'", []);
        g.production("F", ["(", "E", ")"]);
        g.production("F", ["id"]);
    }

    /// The dangling-else grammar: `S -> if S | if S else S | x`.
    pub fn dangling_else(g: &mut GrammarDef) {
        g.variable("S");
        g.terminal("if").terminal("else").terminal("x");
        g.production("S", ["if", "S"]);
        g.production("S", ["if", "S", "else", "S"]);
        g.production("S", ["x"]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_sorts_components() {
        let g = Grammar::define(examples::nested).unwrap();
        assert_eq!(
            g.to_string(),
            "V = {S}\nT = {a, b}\nP = {\n    S -> ε\n    S -> a S b\n}\nS = S"
        );
    }

    #[test]
    fn start_must_be_a_variable() {
        let err = Grammar::define(|g| {
            g.variable("A").terminal("a").start_symbol("a");
            g.production("A", ["a"]);
        })
        .unwrap_err();
        assert_eq!(err, GrammarError::UndeclaredStart("a".into()));
    }

    #[test]
    fn undeclared_start_symbol() {
        let err = Grammar::define(|g| {
            g.variable("A").terminal("a").start_symbol("B");
        })
        .unwrap_err();
        assert_eq!(err, GrammarError::UndeclaredStart("B".into()));
    }

    #[test]
    fn terminals_and_variables_are_disjoint() {
        let err = Grammar::define(|g| {
            g.variable("A").terminal("A");
        })
        .unwrap_err();
        assert_eq!(err, GrammarError::SymbolClash("A".into()));
    }

    #[test]
    fn empty_names_are_rejected() {
        let err = Grammar::define(|g| {
            g.variable("A").terminal("a");
            g.production("A", ["a", ""]);
        })
        .unwrap_err();
        assert_eq!(err, GrammarError::EmptySymbolName("production bodies"));
    }

    #[test]
    fn mutators_invalidate_derived_sets() {
        let mut g = Grammar::define(examples::sums).unwrap();
        assert!(!g.derivation_sets().unwrap().is_nullable("T"));
        g.add_production(Production::new("T", Vec::<String>::new()));
        assert!(g.derivation_sets().unwrap().is_nullable("T"));
    }

    #[test]
    fn fresh_names_avoid_declared_symbols() {
        let g = Grammar::define(|g| {
            g.variable("S").variable("S'");
            g.terminal("a");
            g.production("S", ["a"]);
        })
        .unwrap();
        assert_eq!(g.fresh_name("S'"), "S''");
        assert_eq!(g.fresh_name("X"), "X");
    }
}
