// ============================================================
// Layer 3 — Actions
// ============================================================
// A parsing action is one of four transitions. Arc actions
// carry the relation label they assign to the dependent.
//
// Text form (as it appears in corpora and output):
//   SHIFT
//   SWAP
//   LEFT-ARC(label)    top of stack is the head
//   RIGHT-ARC(label)   second item is the head
//
// The ActionSet is the fixed, corpus-derived vocabulary of
// actions. Its order is the enumeration order used whenever
// legal actions are listed, so it also decides tie-breaks
// between equally scored actions.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::ParseError;

const SHIFT: &str = "SHIFT";
const SWAP: &str = "SWAP";
const LEFT_ARC: &str = "LEFT-ARC";
const RIGHT_ARC: &str = "RIGHT-ARC";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Shift,
    Swap,
    LeftArc(String),
    RightArc(String),
}

impl Action {
    /// Relation label for arc actions, `None` for SHIFT and SWAP
    pub fn label(&self) -> Option<&str> {
        match self {
            Action::Shift | Action::Swap => None,
            Action::LeftArc(label) | Action::RightArc(label) => Some(label),
        }
    }

    pub fn is_arc(&self) -> bool {
        self.label().is_some()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift => f.write_str(SHIFT),
            Action::Swap => f.write_str(SWAP),
            Action::LeftArc(label) => write!(f, "{LEFT_ARC}({label})"),
            Action::RightArc(label) => write!(f, "{RIGHT_ARC}({label})"),
        }
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            SHIFT => return Ok(Action::Shift),
            SWAP => return Ok(Action::Swap),
            _ => {}
        }

        let unknown = || ParseError::UnknownAction(s.to_string());
        let open = s.find('(').ok_or_else(unknown)?;
        let label = s[open + 1..].strip_suffix(')').ok_or_else(unknown)?;
        if label.is_empty() {
            return Err(unknown());
        }
        match &s[..open] {
            LEFT_ARC => Ok(Action::LeftArc(label.to_string())),
            RIGHT_ARC => Ok(Action::RightArc(label.to_string())),
            _ => Err(unknown()),
        }
    }
}

// ─── ActionSet ────────────────────────────────────────────────────────────────
/// Ordered action vocabulary. Indices are stable for the life of
/// a model: they index the action and relation embedding tables
/// and the rows of the scorer output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionSet {
    actions: Vec<Action>,
    index:   HashMap<Action, usize>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `action`, adding it if unseen
    pub fn get_or_insert(&mut self, action: Action) -> usize {
        if let Some(&id) = self.index.get(&action) {
            return id;
        }
        let id = self.actions.len();
        self.index.insert(action.clone(), id);
        self.actions.push(action);
        id
    }

    pub fn index_of(&self, action: &Action) -> Option<usize> {
        self.index.get(action).copied()
    }

    /// Parse and look up an action string without growing the set
    pub fn lookup(&self, text: &str) -> Result<usize, ParseError> {
        let action: Action = text.parse()?;
        self.index_of(&action)
            .ok_or_else(|| ParseError::UnknownAction(text.to_string()))
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// (index, action) pairs in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Action)> {
        self.actions.iter().enumerate()
    }

    /// Map a sequence of indices back to actions.
    /// Indices come from this set, so an unknown one is an internal error.
    pub fn resolve(&self, sequence: &[usize]) -> Result<Vec<&Action>, ParseError> {
        sequence
            .iter()
            .map(|&i| {
                self.get(i)
                    .ok_or_else(|| ParseError::UnknownAction(format!("#{i}")))
            })
            .collect()
    }
}

/// Literal action sets for tests. Corpus loading goes through
/// `get_or_insert`, which reports malformed actions.
#[cfg(test)]
impl<S: AsRef<str>> FromIterator<S> for ActionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ActionSet::new();
        for text in iter {
            let action = text
                .as_ref()
                .parse()
                .unwrap_or_else(|e| panic!("bad action literal {:?}: {e}", text.as_ref()));
            set.get_or_insert(action);
        }
        set
    }
}
