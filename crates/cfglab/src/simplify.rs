//! Removal of unreachable symbols and useless productions.
//!
//! Both passes are infallible: symbols that are used but never declared are
//! treated as non-generating, and the start symbol is always kept.

use crate::{
    grammar::Grammar,
    types::{Queue, Set},
};
use bit_vec::BitVec;

impl Grammar {
    /// Symbols reachable from the start symbol, the start symbol included.
    pub fn reachable_symbols(&self) -> Set<String> {
        let mut reachable = Set::default();
        reachable.insert(self.start.clone());

        let mut queue: Queue<&str> = Some(self.start.as_str()).into_iter().collect();
        while let Some(variable) = queue.pop() {
            for (_, p) in self.productions_of(variable) {
                for symbol in &p.body {
                    if reachable.insert(symbol.clone()) {
                        queue.push(symbol);
                    }
                }
            }
        }

        reachable
    }

    /// Declared terminals plus every variable that derives some terminal string.
    pub fn generating_symbols(&self) -> Set<String> {
        let mut generating: Set<String> = self.terminals.iter().cloned().collect();
        let mut done = BitVec::from_elem(self.productions.len(), false);

        let mut changed = true;
        while changed {
            changed = false;
            for (i, p) in self.productions.iter().enumerate() {
                if done[i] || !p.body.iter().all(|s| generating.contains(s)) {
                    continue;
                }
                done.set(i, true);
                changed |= generating.insert(p.head.clone());
            }
        }

        generating
    }

    #[tracing::instrument(skip_all)]
    pub fn remove_unreachable_symbols(&mut self) {
        let reachable = self.reachable_symbols();
        self.productions.retain(|p| reachable.contains(&p.head));
        self.variables.retain(|v| reachable.contains(v));
        self.terminals.retain(|t| reachable.contains(t));
        self.invalidate_caches();
    }

    /// Drops productions that mention non-generating symbols, then
    /// unreachable symbols, until neither step changes the grammar.
    #[tracing::instrument(skip_all)]
    pub fn remove_useless_productions(&mut self) {
        loop {
            let size = self.size();

            let generating = self.generating_symbols();
            let keep: BitVec = self
                .productions
                .iter()
                .map(|p| p.body.iter().all(|s| generating.contains(s)))
                .collect();
            let mut index = 0;
            self.productions.retain(|_| {
                index += 1;
                keep[index - 1]
            });
            let start = &self.start;
            self.variables
                .retain(|v| v == start || generating.contains(v));
            self.remove_unreachable_symbols();

            if self.size() == size {
                break;
            }
            tracing::trace!(before = ?size, after = ?self.size(), "simplification round");
        }
    }

    fn size(&self) -> (usize, usize, usize) {
        (
            self.variables.len(),
            self.terminals.len(),
            self.productions.len(),
        )
    }
}
