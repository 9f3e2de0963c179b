//! Calculation of FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, GrammarError, Lookahead, LookaheadSet},
    types::{Map, Set},
};

/// The derived sets of a grammar, computed together by fixed-point iteration.
#[derive(Debug, Clone, Default)]
pub struct DerivationSets {
    nullable: Set<String>,
    first: Map<String, LookaheadSet>,
    follow: Map<String, LookaheadSet>,
}

impl DerivationSets {
    #[tracing::instrument(skip_all)]
    pub(crate) fn compute(g: &Grammar) -> Result<Self, GrammarError> {
        g.validate()?;

        let nullable = nullable_set(g);
        let mut first = first_sets(g, &nullable);
        let mut follow = follow_sets(g, &nullable, &first);

        for v in &nullable {
            if let Some(set) = first.get_mut(v) {
                set.insert(Lookahead::Epsilon);
            }
        }
        for set in first.values_mut().chain(follow.values_mut()) {
            set.sort();
        }
        tracing::debug!(
            symbols = first.len(),
            nullable = nullable.len(),
            "derivation sets computed"
        );

        Ok(Self {
            nullable,
            first,
            follow,
        })
    }

    /// `FIRST(symbol)`, sorted. `None` for undeclared symbols.
    pub fn first(&self, symbol: &str) -> Option<&LookaheadSet> {
        self.first.get(symbol)
    }

    /// `FOLLOW(symbol)`, sorted. `None` for undeclared symbols.
    pub fn follow(&self, symbol: &str) -> Option<&LookaheadSet> {
        self.follow.get(symbol)
    }

    pub fn is_nullable(&self, symbol: &str) -> bool {
        self.nullable.contains(symbol)
    }

    /// `FIRST(X1 X2 ... Xn)`. Contains ε iff every symbol is nullable.
    pub fn first_of<'a, I>(&self, symbols: I) -> LookaheadSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut res = LookaheadSet::default();
        for symbol in symbols {
            if let Some(first) = self.first.get(symbol) {
                res.extend(first.iter().filter(|l| **l != Lookahead::Epsilon).cloned());
            }
            if !self.nullable.contains(symbol) {
                res.sort();
                return res;
            }
        }
        res.insert(Lookahead::Epsilon);
        res.sort();
        res
    }

    pub(crate) fn first_sets(&self) -> &Map<String, LookaheadSet> {
        &self.first
    }

    pub(crate) fn follow_sets(&self) -> &Map<String, LookaheadSet> {
        &self.follow
    }
}

impl Grammar {
    pub fn first_set(&self, symbol: &str) -> Result<&LookaheadSet, GrammarError> {
        self.derivation_sets()?
            .first(symbol)
            .ok_or_else(|| GrammarError::UnknownSymbol(symbol.to_owned()))
    }

    pub fn follow_set(&self, symbol: &str) -> Result<&LookaheadSet, GrammarError> {
        self.derivation_sets()?
            .follow(symbol)
            .ok_or_else(|| GrammarError::UnknownSymbol(symbol.to_owned()))
    }

    pub fn first_of<S>(&self, symbols: &[S]) -> Result<LookaheadSet, GrammarError>
    where
        S: AsRef<str>,
    {
        let sets = self.derivation_sets()?;
        if let Some(unknown) = symbols.iter().find(|s| sets.first(s.as_ref()).is_none()) {
            return Err(GrammarError::UnknownSymbol(unknown.as_ref().to_owned()));
        }
        Ok(sets.first_of(symbols.iter().map(AsRef::as_ref)))
    }

    pub fn is_nullable(&self, symbol: &str) -> Result<bool, GrammarError> {
        let sets = self.derivation_sets()?;
        if sets.first(symbol).is_none() {
            return Err(GrammarError::UnknownSymbol(symbol.to_owned()));
        }
        Ok(sets.is_nullable(symbol))
    }
}

/// Calculate the set of nullable variables in this grammar.
fn nullable_set(g: &Grammar) -> Set<String> {
    let mut nullable: Set<String> = g
        .productions()
        .iter()
        .filter_map(|p| p.is_epsilon().then(|| p.head.clone()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for p in g.productions() {
            if nullable.contains(&p.head) {
                continue;
            }
            if p.body.iter().all(|s| nullable.contains(s)) {
                nullable.insert(p.head.clone());
                changed = true;
            }
        }
    }

    nullable
}

/// FIRST sets without ε, iterated until no set grows.
fn first_sets(g: &Grammar, nullable: &Set<String>) -> Map<String, LookaheadSet> {
    let mut first: Map<String, LookaheadSet> = Map::default();
    for t in g.terminals() {
        first.insert(t.clone(), Some(Lookahead::terminal(t)).into_iter().collect());
    }
    for v in g.variables() {
        first.insert(v.clone(), LookaheadSet::default());
    }

    let mut changed = true;
    while changed {
        changed = false;
        for p in g.productions() {
            let mut added = vec![];
            for symbol in &p.body {
                added.extend(first[symbol.as_str()].iter().cloned());
                if !nullable.contains(symbol) {
                    break;
                }
            }
            let head = &mut first[p.head.as_str()];
            for lookahead in added {
                changed |= head.insert(lookahead);
            }
        }
    }

    first
}

fn follow_sets(
    g: &Grammar,
    nullable: &Set<String>,
    first: &Map<String, LookaheadSet>,
) -> Map<String, LookaheadSet> {
    let mut follow: Map<String, LookaheadSet> = g
        .variables()
        .iter()
        .chain(g.terminals())
        .map(|s| (s.clone(), LookaheadSet::default()))
        .collect();
    follow[g.start_symbol()].insert(Lookahead::End);

    let mut changed = true;
    while changed {
        changed = false;
        for p in g.productions() {
            for (i, symbol) in p.body.iter().enumerate() {
                let mut added = vec![];
                let mut trailing_nullable = true;
                for next in &p.body[i + 1..] {
                    added.extend(first[next.as_str()].iter().cloned());
                    if !nullable.contains(next) {
                        trailing_nullable = false;
                        break;
                    }
                }
                if trailing_nullable && *symbol != p.head {
                    added.extend(follow[p.head.as_str()].iter().cloned());
                }
                let target = &mut follow[symbol.as_str()];
                for lookahead in added {
                    changed |= target.insert(lookahead);
                }
            }
        }
    }

    follow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::examples;

    fn set(items: &[Lookahead]) -> Vec<Lookahead> {
        items.to_vec()
    }

    fn t(name: &str) -> Lookahead {
        Lookahead::terminal(name)
    }

    #[test]
    fn first_of_terminal_is_itself() {
        let g = Grammar::define(examples::sums).unwrap();
        let first: Vec<_> = g.first_set("id").unwrap().iter().cloned().collect();
        assert_eq!(first, set(&[t("id")]));
    }

    #[test]
    fn nested_first_and_follow() {
        let g = Grammar::define(examples::nested).unwrap();
        let first: Vec<_> = g.first_set("S").unwrap().iter().cloned().collect();
        assert_eq!(first, set(&[Lookahead::Epsilon, t("a")]));
        let follow: Vec<_> = g.follow_set("S").unwrap().iter().cloned().collect();
        assert_eq!(follow, set(&[Lookahead::End, t("b")]));
    }

    #[test]
    fn epsilon_production_puts_epsilon_in_first() {
        let g = Grammar::define(examples::arithmetic_ll1).unwrap();
        assert!(g.first_set("E'").unwrap().contains(&Lookahead::Epsilon));
        assert!(!g.first_set("E").unwrap().contains(&Lookahead::Epsilon));
        assert!(g.is_nullable("T'").unwrap());
    }

    #[test]
    fn start_symbol_is_followed_by_end() {
        let g = Grammar::define(examples::arithmetic).unwrap();
        assert!(g.follow_set("E").unwrap().contains(&Lookahead::End));
    }

    #[test]
    fn textbook_follow_sets() {
        let g = Grammar::define(examples::arithmetic_ll1).unwrap();
        let follow = |s| -> Vec<Lookahead> { g.follow_set(s).unwrap().iter().cloned().collect() };
        assert_eq!(follow("E"), set(&[Lookahead::End, t(")")]));
        assert_eq!(follow("E'"), set(&[Lookahead::End, t(")")]));
        assert_eq!(follow("T"), set(&[Lookahead::End, t(")"), t("+")]));
        assert_eq!(follow("F"), set(&[Lookahead::End, t(")"), t("*"), t("+")]));
    }

    #[test]
    fn mutually_recursive_follow_sets_converge() {
        // A and B appear at the end of each other's bodies.
        let g = Grammar::define(|g| {
            g.variable("S").variable("A").variable("B");
            g.terminal("a").terminal("b").terminal("c");
            g.production("S", ["A", "c"]);
            g.production("A", ["a", "B"]);
            g.production("A", []);
            g.production("B", ["b", "A"]);
        })
        .unwrap();
        let follow_b: Vec<_> = g.follow_set("B").unwrap().iter().cloned().collect();
        assert_eq!(follow_b, set(&[t("c")]));
    }

    #[test]
    fn first_of_sequence() {
        let g = Grammar::define(examples::arithmetic_ll1).unwrap();
        let first: Vec<_> = g.first_of(&["T'", "E'"]).unwrap().into_iter().collect();
        assert_eq!(first, set(&[Lookahead::Epsilon, t("*"), t("+")]));
        let empty: [&str; 0] = [];
        let first: Vec<_> = g.first_of(&empty).unwrap().into_iter().collect();
        assert_eq!(first, set(&[Lookahead::Epsilon]));
    }

    #[test]
    fn undeclared_body_symbol_is_ill_formed() {
        let g = Grammar::define(|g| {
            g.variable("S").terminal("a");
            g.production("S", ["a", "X"]);
        })
        .unwrap();
        assert!(matches!(
            g.first_set("S"),
            Err(GrammarError::UndeclaredSymbol { symbol, .. }) if symbol == "X"
        ));
    }

    #[test]
    fn unknown_query_symbol() {
        let g = Grammar::define(examples::sums).unwrap();
        assert_eq!(
            g.follow_set("nope"),
            Err(GrammarError::UnknownSymbol("nope".into()))
        );
    }
}
