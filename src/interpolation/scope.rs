//! Snapshots of the containers enclosing the field being resolved
//!
//! Each frame is a copy of a container taken when the walker entered it. Sibling fields
//! therefore see each other's pre-resolution values, never their replacements.

use super::fuzzy::fuzzy_get;
use crate::manifest::Node;
use indexmap::IndexMap;

#[derive(Debug, Default, Clone)]
pub struct Scope {
    frames: Vec<IndexMap<String, Node>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a container
    pub fn push(&mut self, snapshot: IndexMap<String, Node>) {
        self.frames.push(snapshot);
    }

    /// Leave the innermost container
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Look `key` up from the innermost container outwards
    pub fn lookup(&self, key: &str) -> Option<&Node> {
        self.frames.iter().rev().find_map(|frame| fuzzy_get(frame, key))
    }

    /// Every field name in scope, innermost first, without repeats
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for frame in self.frames.iter().rev() {
            for key in frame.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
        names
    }
}
