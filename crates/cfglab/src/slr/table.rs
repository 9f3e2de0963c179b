//! Calculation of SLR(1) ACTION/GOTO tables.

use super::lr0::{LR0Automaton, StateID};
use crate::{
    grammar::{Grammar, GrammarError, Lookahead, Production},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce by the production at this index.
    Reduce(usize),

    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

/// A table cell that was demanded by two different actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub lookahead: Lookahead,
    /// The action that stays in the table.
    pub kept: Action,
    pub rejected: Action,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match (self.kept, self.rejected) {
            (Action::Shift(..), _) | (_, Action::Shift(..)) => ConflictKind::ShiftReduce,
            _ => ConflictKind::ReduceReduce,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<Lookahead, Action>,
    pub gotos: Map<String, StateID>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    pub states: Map<StateID, ParseTableRow>,
    pub conflicts: Vec<Conflict>,
}

impl ParseTable {
    pub fn display<'p>(&'p self, productions: &'p [Production]) -> impl fmt::Display + 'p {
        display_fn(|f| {
            for (i, (id, row)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## actions")?;
                for (lookahead, action) in &row.actions {
                    match action {
                        Action::Shift(n) => writeln!(f, "- {} => shift({:?})", lookahead, n)?,
                        Action::Reduce(p) => {
                            writeln!(f, "- {} => reduce({})", lookahead, productions[*p])?
                        }
                        Action::Accept => writeln!(f, "- {} => accept", lookahead)?,
                    }
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in &row.gotos {
                    writeln!(f, "- {} => goto({:?})", symbol, goto)?;
                }
            }

            if !self.conflicts.is_empty() {
                writeln!(f, "\n## conflicts")?;
                for c in &self.conflicts {
                    writeln!(
                        f,
                        "- {:?} on {} ({:?}): kept {:?}, rejected {:?}",
                        c.state,
                        c.lookahead,
                        c.kind(),
                        c.kept,
                        c.rejected
                    )?;
                }
            }
            Ok(())
        })
    }
}

/// Fills ACTION and GOTO from the LR(0) collection.
///
/// Shifts go in first, then the accept action, then reduces on the
/// FOLLOW set of their head. The first action inserted into a cell wins.
#[tracing::instrument(skip_all)]
pub fn generate(
    g: &Grammar,
    lr0: &LR0Automaton,
    augmented: usize,
) -> Result<ParseTable, GrammarError> {
    let sets = g.derivation_sets()?;

    let mut states = Map::default();
    let mut conflicts = vec![];
    for (&id, lr0_state) in &lr0.states {
        let mut row = ParseTableRow::default();

        for (t, &next) in &lr0_state.shifts {
            insert_action(
                &mut row,
                id,
                Lookahead::terminal(t),
                Action::Shift(next),
                &mut conflicts,
            );
        }
        for &reduce in &lr0_state.reduces {
            if reduce == augmented {
                insert_action(&mut row, id, Lookahead::End, Action::Accept, &mut conflicts);
                continue;
            }
            let head = &g.production(reduce).head;
            for lookahead in sets.follow(head).into_iter().flatten() {
                insert_action(
                    &mut row,
                    id,
                    lookahead.clone(),
                    Action::Reduce(reduce),
                    &mut conflicts,
                );
            }
        }

        for (n, &next) in &lr0_state.gotos {
            row.gotos.insert(n.clone(), next);
        }

        states.insert(id, row);
    }

    Ok(ParseTable { states, conflicts })
}

fn insert_action(
    row: &mut ParseTableRow,
    state: StateID,
    lookahead: Lookahead,
    action: Action,
    conflicts: &mut Vec<Conflict>,
) {
    match row.actions.get(&lookahead) {
        None => {
            row.actions.insert(lookahead, action);
        }
        Some(&kept) if kept != action => {
            tracing::warn!(
                "SLR conflict in state {:?} on {}: keeping {:?}, rejecting {:?}",
                state,
                lookahead,
                kept,
                action
            );
            conflicts.push(Conflict {
                state,
                lookahead,
                kept,
                rejected: action,
            });
        }
        Some(..) => {}
    }
}
