//! Declarative descriptions of grammars and pushdown automata.
//!
//! Both formats are JSON documents. The capitalized key spellings
//! (`Variables`, `StackAlphabet`, `stacktop`, ...) are accepted as aliases.

use crate::{grammar::GrammarError, pda::Pda, Grammar};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    #[error("malformed source: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarSource {
    #[serde(alias = "Variables")]
    pub variables: Vec<String>,
    #[serde(alias = "Terminals")]
    pub terminals: Vec<String>,
    #[serde(alias = "Productions")]
    pub productions: Vec<ProductionSource>,
    #[serde(alias = "Start")]
    pub start: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionSource {
    #[serde(alias = "Head")]
    pub head: String,
    /// An empty body stands for ε.
    #[serde(alias = "Body")]
    pub body: Vec<String>,
}

impl GrammarSource {
    pub fn from_json_str(source: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(source)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdaSource {
    #[serde(alias = "States")]
    pub states: Vec<String>,
    #[serde(alias = "Alphabet")]
    pub alphabet: Vec<String>,
    #[serde(alias = "StackAlphabet")]
    pub stack_alphabet: Vec<String>,
    #[serde(alias = "Transitions")]
    pub transitions: Vec<TransitionSource>,
    #[serde(alias = "StartState")]
    pub start_state: String,
    #[serde(alias = "StartStack")]
    pub start_stack: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSource {
    pub from: String,
    pub to: String,
    /// The consumed input symbol. Missing or empty means ε.
    #[serde(default)]
    pub input: String,
    #[serde(alias = "stacktop")]
    pub stack_top: String,
    /// Symbols pushed in place of the stack top, topmost first.
    #[serde(alias = "replacement")]
    pub push: Vec<String>,
}

impl PdaSource {
    pub fn from_json_str(source: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(source)?)
    }
}

pub fn parse_grammar(source: &str) -> Result<Grammar, SourceError> {
    let source = GrammarSource::from_json_str(source)?;
    Ok(Grammar::from_source(&source)?)
}

pub fn read_grammar(path: impl AsRef<Path>) -> Result<Grammar, SourceError> {
    let source = fs::read_to_string(path)?;
    parse_grammar(&source)
}

pub fn parse_pda(source: &str) -> Result<Pda, SourceError> {
    let source = PdaSource::from_json_str(source)?;
    Ok(Pda::from_source(&source))
}

pub fn read_pda(path: impl AsRef<Path>) -> Result<Pda, SourceError> {
    let source = fs::read_to_string(path)?;
    parse_pda(&source)
}
