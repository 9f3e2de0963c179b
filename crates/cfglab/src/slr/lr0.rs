//! Canonical collection of LR(0) item sets.

use crate::{
    grammar::{Grammar, Production},
    types::Map,
    util::display_fn,
};
use bit_set::BitSet;
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl StateID {
    pub const INITIAL: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }
}

/// The LR(0) item: a production with a position marker in its body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: usize,
    pub dot: usize,
}

impl Item {
    pub fn next_symbol<'p>(&self, productions: &'p [Production]) -> Option<&'p str> {
        productions[self.production]
            .body
            .get(self.dot)
            .map(String::as_str)
    }

    pub fn is_complete(&self, productions: &[Production]) -> bool {
        self.dot == productions[self.production].body.len()
    }

    fn advance(self) -> Self {
        Self {
            dot: self.dot + 1,
            ..self
        }
    }

    pub fn display<'p>(&'p self, productions: &'p [Production]) -> impl fmt::Display + 'p {
        display_fn(|f| {
            let production = &productions[self.production];
            write!(f, "{} -> [", production.head)?;
            for (i, symbol) in production.body.iter().enumerate() {
                if i == self.dot {
                    f.write_str(" .")?;
                }
                write!(f, " {}", symbol)?;
            }
            if self.dot == production.body.len() {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

#[derive(Debug, Clone)]
pub struct LR0State {
    /// The closure-complete item set, sorted.
    pub items: Vec<Item>,
    pub shifts: Map<String, StateID>,
    pub gotos: Map<String, StateID>,
    /// Productions whose item is complete in this state.
    pub reduces: Vec<usize>,
}

impl LR0State {
    pub fn display<'p>(&'p self, productions: &'p [Production]) -> impl fmt::Display + 'p {
        display_fn(|f| {
            writeln!(f, "## items:")?;
            for item in &self.items {
                writeln!(f, "- {}", item.display(productions))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", t, to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", n, to)?;
                }
            }
            if !self.reduces.is_empty() {
                writeln!(f, "## reduces:")?;
                for reduce in &self.reduces {
                    writeln!(f, "- {}", productions[*reduce])?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
}

/// Closure and goto over the productions of a fixed grammar.
pub struct ItemSets<'g> {
    g: &'g Grammar,
    by_head: Map<&'g str, Vec<usize>>,
}

impl<'g> ItemSets<'g> {
    pub fn new(g: &'g Grammar) -> Self {
        let mut by_head: Map<&str, Vec<usize>> = Map::default();
        for (index, p) in g.productions().iter().enumerate() {
            by_head.entry(&p.head).or_default().push(index);
        }
        Self { g, by_head }
    }

    /// Adds `B -> . γ` for every `B` right after a dot, until nothing changes.
    pub fn closure<I>(&self, kernel: I) -> Vec<Item>
    where
        I: IntoIterator<Item = Item>,
    {
        let productions = self.g.productions();
        let mut items: BTreeSet<Item> = kernel.into_iter().collect();
        let mut expanded = BitSet::with_capacity(self.g.variables().len());
        let mut pending: Vec<Item> = items.iter().copied().collect();

        while let Some(item) = pending.pop() {
            let Some(symbol) = item.next_symbol(productions) else {
                continue;
            };
            let Some(variable) = self.g.variables().get_index_of(symbol) else {
                continue;
            };
            if !expanded.insert(variable) {
                continue;
            }
            for &production in self.by_head.get(symbol).into_iter().flatten() {
                let new_item = Item { production, dot: 0 };
                if items.insert(new_item) {
                    pending.push(new_item);
                }
            }
        }

        items.into_iter().collect()
    }

    pub fn goto(&self, items: &[Item], symbol: &str) -> Vec<Item> {
        let productions = self.g.productions();
        let kernel: Vec<Item> = items
            .iter()
            .filter(|item| item.next_symbol(productions) == Some(symbol))
            .map(|item| item.advance())
            .collect();
        if kernel.is_empty() {
            return kernel;
        }
        self.closure(kernel)
    }
}

/// Calculate the canonical LR(0) collection, starting from the item
/// `augmented -> . S`.
///
/// States are numbered in discovery order. Symbols are tried terminals
/// first, then variables, each in declaration order.
#[tracing::instrument(skip_all)]
pub fn lr0(g: &Grammar, augmented: usize) -> LR0Automaton {
    let productions = g.productions();
    let sets = ItemSets::new(g);
    let symbols: Vec<&str> = g
        .terminals()
        .iter()
        .chain(g.variables())
        .map(String::as_str)
        .collect();

    let mut state_id = {
        let mut next_state_id = 0;
        move || {
            let id = StateID(next_state_id);
            next_state_id += 1;
            id
        }
    };

    let mut known = Map::<Vec<Item>, StateID>::default();
    let mut pending_states = VecDeque::<(StateID, Vec<Item>)>::new();

    let initial = sets.closure(Some(Item {
        production: augmented,
        dot: 0,
    }));
    let id = state_id();
    known.insert(initial.clone(), id);
    pending_states.push_back((id, initial));

    let mut states = Map::<StateID, LR0State>::default();
    while let Some((current, items)) = pending_states.pop_front() {
        let mut shifts = Map::default();
        let mut gotos = Map::default();
        for &symbol in &symbols {
            let next_items = sets.goto(&items, symbol);
            if next_items.is_empty() {
                continue;
            }
            let next = match known.get(&next_items) {
                Some(id) => *id,
                None => {
                    let id = state_id();
                    known.insert(next_items.clone(), id);
                    pending_states.push_back((id, next_items));
                    id
                }
            };
            if g.is_terminal(symbol) {
                shifts.insert(symbol.to_owned(), next);
            } else {
                gotos.insert(symbol.to_owned(), next);
            }
        }

        let reduces = items
            .iter()
            .filter(|item| item.is_complete(productions))
            .map(|item| item.production)
            .collect();

        states.insert(
            current,
            LR0State {
                items,
                shifts,
                gotos,
                reduces,
            },
        );
    }
    tracing::debug!(states = states.len(), "LR(0) collection built");

    LR0Automaton { states }
}
