// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store-configuration tree (spec.md §3 "Store-configuration tree",
//! §6 "Key inheritance").
//!
//! A [`ConfNode`] is an immutable, read-only view over one `<block>` of the
//! configuration grammar plus its named child blocks. Resolution of a key
//! `K` for a store of type `T` is: this node's own `K` → walking ancestors
//! for `T::K` → (implicitly, since every node's ancestor chain terminates at
//! the parsed root) the top-level config's `T::K`. This crate does not keep
//! a separate mutable global default table (spec.md §9 "Key inheritance
//! with process-global fallback") — every node we construct carries a real
//! parent link all the way to the root, so the ancestor walk already
//! reaches what the original called `g_handler`'s config.
//!
//! `type`, `category`, and `categories` are never inherited, matching §6.

use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;

const NON_INHERITED_KEYS: [&str; 3] = ["type", "category", "categories"];

/// A mutable tree under construction, used by the config-grammar loader
/// (`scribe-config`) before it freezes the tree into [`ConfNode`]s.
#[derive(Debug, Default)]
pub struct ConfBuilder {
    values: IndexMap<String, String>,
    children: IndexMap<String, ConfBuilder>,
}

impl ConfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key = value` unless `key` is already present, in which case
    /// the existing value is kept (spec.md §6: "first-match-wins within a
    /// block"). Returns `true` if this call observed a duplicate so the
    /// caller can log a warning.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.values.contains_key(&key) {
            return true;
        }
        self.values.insert(key, value.into());
        false
    }

    /// Inserts a child block unless `name` is already present, in which
    /// case the existing child is kept. Returns `true` on a duplicate name.
    pub fn add_child(&mut self, name: impl Into<String>, child: ConfBuilder) -> bool {
        let name = name.into();
        if self.children.contains_key(&name) {
            return true;
        }
        self.children.insert(name, child);
        false
    }

    /// Freezes this subtree, wiring up parent links top-down.
    pub fn build(self) -> Arc<ConfNode> {
        build_node(self)
    }
}

fn build_node(builder: ConfBuilder) -> Arc<ConfNode> {
    let children: IndexMap<String, Arc<ConfNode>> = builder
        .children
        .into_iter()
        .map(|(name, child)| (name, build_node(child)))
        .collect();
    let node = Arc::new(ConfNode {
        values: builder.values,
        children,
        parent: OnceLock::new(),
    });
    for child in node.children.values() {
        let _ = child.parent.set(Arc::downgrade(&node));
    }
    node
}

/// An immutable node in the configuration tree.
#[derive(Debug)]
pub struct ConfNode {
    values: IndexMap<String, String>,
    children: IndexMap<String, Arc<ConfNode>>,
    parent: OnceLock<Weak<ConfNode>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfError {
    #[error("key '{key}' has value '{value}' which is not a valid {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl ConfNode {
    fn parent(&self) -> Option<Arc<ConfNode>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    /// Own-node value lookup, no inheritance. Used for `type`, `category`,
    /// `categories`, and anything else that must not inherit.
    pub fn own_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// This node's `type` value, used to build the `T::K` inherited key.
    pub fn store_type(&self) -> Option<&str> {
        self.own_string("type")
    }

    /// Resolves `key` per the inheritance rule described at module level.
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(v) = self.values.get(key) {
            return Some(v.clone());
        }
        if NON_INHERITED_KEYS.contains(&key) {
            return None;
        }
        let store_type = self.store_type()?;
        let qualified = format!("{store_type}::{key}");
        let mut node = self.parent();
        while let Some(n) = node {
            if let Some(v) = n.values.get(&qualified) {
                return Some(v.clone());
            }
            node = n.parent();
        }
        None
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get_string(key)?.as_str() {
            "yes" | "true" | "1" => Some(true),
            "no" | "false" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get_string(key)?.trim().parse().ok()
    }

    pub fn get_unsigned(&self, key: &str) -> Option<u64> {
        self.get_string(key)?.trim().parse().ok()
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get_string(key)?.trim().parse().ok()
    }

    /// `category` or `categories`: a single name or a whitespace-separated
    /// list. Never inherited.
    pub fn category_list(&self) -> Vec<String> {
        let raw = self
            .own_string("categories")
            .or_else(|| self.own_string("category"));
        match raw {
            Some(s) => s.split_whitespace().map(str::to_string).collect(),
            None => Vec::new(),
        }
    }

    pub fn get_store(&self, name: &str) -> Option<Arc<ConfNode>> {
        self.children.get(name).cloned()
    }

    /// This node's own key/value pairs, no inheritance, no children.
    /// Used by the bucket store to clone a template block's settings
    /// while overriding one key (see [`ConfNode::with_override`]).
    pub fn own_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A new frozen node with the same own values as `self` (children are
    /// not carried over) except `key`, which is set to `value`. For bucket
    /// templates, which are leaf file/thriftfile stores (spec.md §4.6).
    ///
    /// Keeps `self`'s own ancestor chain rather than detaching the result:
    /// a bucket template's inherited keys (e.g. `file::fs_type` set on an
    /// enclosing block) must still resolve the same way after the override
    /// as they did before it.
    pub fn with_override(&self, key: &str, value: impl Into<String>) -> Arc<ConfNode> {
        let mut values: IndexMap<String, String> = self
            .own_entries()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        values.insert(key.to_string(), value.into());
        let node = Arc::new(ConfNode {
            values,
            children: IndexMap::new(),
            parent: OnceLock::new(),
        });
        if let Some(parent) = self.parent() {
            let _ = node.parent.set(Arc::downgrade(&parent));
        }
        node
    }

    /// All child blocks in configuration order.
    pub fn all_stores(&self) -> Vec<(&str, Arc<ConfNode>)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
    }

    /// Child blocks whose name starts with `prefix` (e.g. bucket store's
    /// `bucket0`, `bucket1`, ... explicit children).
    pub fn stores_with_prefix(&self, prefix: &str) -> Vec<(&str, Arc<ConfNode>)> {
        self.children
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "conf_tests.rs"]
mod tests;
