//! Shift-reduce driver over the SLR tables.

use super::{lr0::StateID, table::Action, SlrParser};
use crate::grammar::Lookahead;
use std::fmt;

/// A trait for abstracting input tokens.
pub trait Token {
    /// The terminal this token is an instance of.
    fn terminal(&self) -> &str;

    fn location(&self) -> Option<Location> {
        None
    }
}

impl Token for &str {
    fn terminal(&self) -> &str {
        self
    }
}

impl Token for String {
    fn terminal(&self) -> &str {
        self
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Byte offset into the source.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A token carrying its lexeme and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub terminal: String,
    pub lexeme: String,
    pub location: Location,
}

impl Token for Located {
    fn terminal(&self) -> &str {
        &self.terminal
    }

    fn location(&self) -> Option<Location> {
        Some(self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The input was accepted. `reductions` lists the productions applied,
    /// which is a rightmost derivation in reverse.
    Accepted { reductions: Vec<usize> },
    Rejected(Rejection),
}

impl ParseOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Accepted { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub message: String,
    pub state: StateID,
    pub got: Lookahead,
    /// Lookaheads with an action in `state`, sorted.
    pub expected: Vec<Lookahead>,
    /// Index of the offending token. Equals the input length at end of input.
    pub position: usize,
    pub location: Option<Location>,
}

impl SlrParser {
    /// Runs the shift-reduce loop over `tokens`; the end marker is implicit.
    #[tracing::instrument(skip_all, fields(len = tokens.len()))]
    pub fn parse<T: Token>(&self, tokens: &[T]) -> ParseOutcome {
        let mut stack = vec![StateID::INITIAL];
        let mut reductions = vec![];
        let mut position = 0;

        loop {
            // reductions never pop the bottom state
            let current = stack[stack.len() - 1];
            let lookahead = match tokens.get(position) {
                Some(token) => Lookahead::terminal(token.terminal()),
                None => Lookahead::End,
            };

            let action = self
                .table
                .states
                .get(&current)
                .and_then(|row| row.actions.get(&lookahead));
            match action {
                Some(Action::Shift(next)) => {
                    tracing::trace!("shift {} -> {:?}", lookahead, next);
                    stack.push(*next);
                    position += 1;
                }

                Some(Action::Reduce(index)) => {
                    let production = &self.productions[*index];
                    tracing::trace!("reduce {}", production);
                    let len = production.body.len();
                    if len >= stack.len() {
                        let message = format!("state stack underflow reducing `{}'", production);
                        return ParseOutcome::Rejected(self.reject(
                            current, tokens, position, message,
                        ));
                    }
                    stack.truncate(stack.len() - len);
                    let top = stack[stack.len() - 1];
                    let goto = self
                        .table
                        .states
                        .get(&top)
                        .and_then(|row| row.gotos.get(&production.head));
                    match goto {
                        Some(next) => {
                            stack.push(*next);
                            reductions.push(*index);
                        }
                        None => {
                            let message = format!(
                                "no transition on `{}' from state {:?}",
                                production.head, top
                            );
                            return ParseOutcome::Rejected(self.reject(
                                top, tokens, position, message,
                            ));
                        }
                    }
                }

                Some(Action::Accept) => {
                    tracing::trace!("accept");
                    return ParseOutcome::Accepted { reductions };
                }

                None => {
                    let message = self.unexpected_message(current, &lookahead, tokens, position);
                    return ParseOutcome::Rejected(self.reject(current, tokens, position, message));
                }
            }
        }
    }

    fn expected(&self, state: StateID) -> Vec<Lookahead> {
        let mut expected: Vec<Lookahead> = self
            .table
            .states
            .get(&state)
            .into_iter()
            .flat_map(|row| row.actions.keys().cloned())
            .collect();
        expected.sort();
        expected
    }

    fn unexpected_message<T: Token>(
        &self,
        state: StateID,
        got: &Lookahead,
        tokens: &[T],
        position: usize,
    ) -> String {
        let expected: Vec<String> = self
            .expected(state)
            .iter()
            .map(ToString::to_string)
            .collect();
        let at = match tokens.get(position).and_then(Token::location) {
            Some(location) => format!(" at {}", location),
            None => format!(" at token {}", position),
        };
        format!(
            "syntax error{}: expected one of {{{}}}, got `{}'",
            at,
            expected.join(", "),
            got
        )
    }

    fn reject<T: Token>(
        &self,
        state: StateID,
        tokens: &[T],
        position: usize,
        message: String,
    ) -> Rejection {
        let token = tokens.get(position);
        Rejection {
            message,
            state,
            got: match token {
                Some(token) => Lookahead::terminal(token.terminal()),
                None => Lookahead::End,
            },
            expected: self.expected(state),
            position,
            location: token.and_then(Token::location),
        }
    }
}
