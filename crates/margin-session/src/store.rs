// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The namespace store: the session's only mutable state.
//!
//! Everything is keyed by namespace (the absolute path of a user module).
//! Entries are created lazily on first write and live for the session's
//! lifetime; re-registration overwrites, nothing is ever deleted except by
//! [`NamespaceStore::reset`].

use margin_engine::Value;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

use crate::error::{EvalError, Result};

/// An outward-facing export name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportName {
    /// A named export
    Named(String),
    /// The anonymous default export
    Default,
}

/// What an import asks for from its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import { name } from '...'`
    Named(String),
    /// `import x from '...'`
    Default,
    /// `import * as x from '...'`
    Namespace,
}

/// Where an import resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Another user module, by absolute path
    User(PathBuf),
    /// A host built-in module, by id
    BuiltIn(String),
}

/// One imported binding, keyed by its local name.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    /// The local binding name
    pub local: String,
    /// What is being imported
    pub kind: ImportKind,
    /// The resolved target
    pub target: ImportTarget,
}

/// The bindings, exports and imports of one namespace.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRecord {
    /// Top-level bindings: local name → current value
    pub bindings: FxHashMap<String, Value>,
    /// Exports: outward name → local binding name
    pub exports: FxHashMap<ExportName, String>,
    /// Imports: local name → import record
    pub imports: FxHashMap<String, ImportRecord>,
}

/// The session-wide registry of namespaces.
#[derive(Debug, Default)]
pub struct NamespaceStore {
    spaces: FxHashMap<PathBuf, NamespaceRecord>,
}

impl NamespaceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a namespace entry exists. This is the "being evaluated"
    /// marker that breaks import cycles.
    pub fn touch(&mut self, namespace: &Path) {
        self.spaces.entry(namespace.to_path_buf()).or_default();
    }

    /// Whether the namespace has an entry (evaluated, or mid-evaluation).
    pub fn has_been_evaluated(&self, namespace: &Path) -> bool {
        self.spaces.contains_key(namespace)
    }

    /// Registers (or overwrites) a top-level binding.
    pub fn put_binding(&mut self, namespace: &Path, local: &str, value: Value) {
        self.spaces
            .entry(namespace.to_path_buf())
            .or_default()
            .bindings
            .insert(local.to_string(), value);
    }

    /// Registers a named export. The local binding must already exist.
    pub fn put_export(&mut self, namespace: &Path, local: &str, exported: &str) -> Result<()> {
        self.put_export_entry(namespace, local, ExportName::Named(exported.to_string()))
    }

    /// Registers the default export. The local binding must already exist.
    pub fn put_default_export(&mut self, namespace: &Path, local: &str) -> Result<()> {
        self.put_export_entry(namespace, local, ExportName::Default)
    }

    fn put_export_entry(
        &mut self,
        namespace: &Path,
        local: &str,
        exported: ExportName,
    ) -> Result<()> {
        let record = self.spaces.entry(namespace.to_path_buf()).or_default();
        if !record.bindings.contains_key(local) {
            return Err(EvalError::MissingLocal {
                namespace: namespace.to_path_buf(),
                local: local.to_string(),
                exported: match exported {
                    ExportName::Named(name) => name,
                    ExportName::Default => "default".to_string(),
                },
            });
        }
        record.exports.insert(exported, local.to_string());
        Ok(())
    }

    /// Registers (or overwrites) an import, keyed by its local name.
    pub fn put_import(&mut self, namespace: &Path, record: ImportRecord) {
        self.spaces
            .entry(namespace.to_path_buf())
            .or_default()
            .imports
            .insert(record.local.clone(), record);
    }

    /// A read-only copy of one namespace's tables (empty if unknown).
    pub fn snapshot(&self, namespace: &Path) -> NamespaceRecord {
        self.spaces.get(namespace).cloned().unwrap_or_default()
    }

    /// Reads a binding's current value.
    pub fn binding(&self, namespace: &Path, local: &str) -> Option<Value> {
        self.spaces
            .get(namespace)?
            .bindings
            .get(local)
            .cloned()
    }

    /// Follows the export chain: outward name → local → binding. Missing at
    /// any step yields `None`, which callers surface as `undefined`.
    pub fn resolve_export(&self, namespace: &Path, name: &ExportName) -> Option<Value> {
        let record = self.spaces.get(namespace)?;
        let local = record.exports.get(name)?;
        record.bindings.get(local).cloned()
    }

    /// The current default-export value, if one is registered.
    pub fn default_export(&self, namespace: &Path) -> Option<Value> {
        self.resolve_export(namespace, &ExportName::Default)
    }

    /// Clears everything.
    pub fn reset(&mut self) {
        self.spaces.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> PathBuf {
        PathBuf::from("/tmp/store-test.js")
    }

    #[test]
    fn test_touch_marks_namespace() {
        let mut store = NamespaceStore::new();
        assert!(!store.has_been_evaluated(&ns()));
        store.touch(&ns());
        assert!(store.has_been_evaluated(&ns()));
    }

    #[test]
    fn test_binding_overwrite_is_last_writer_wins() {
        let mut store = NamespaceStore::new();
        store.put_binding(&ns(), "x", Value::Number(1.0));
        store.put_binding(&ns(), "x", Value::Number(2.0));
        assert!(matches!(
            store.binding(&ns(), "x"),
            Some(Value::Number(n)) if n == 2.0
        ));
        assert_eq!(store.snapshot(&ns()).bindings.len(), 1);
    }

    #[test]
    fn test_export_requires_existing_local() {
        let mut store = NamespaceStore::new();
        let err = store.put_export(&ns(), "missing", "missing").unwrap_err();
        assert!(matches!(err, EvalError::MissingLocal { local, .. } if local == "missing"));

        store.put_binding(&ns(), "x", Value::Number(1.0));
        store.put_export(&ns(), "x", "renamed").unwrap();
        assert!(matches!(
            store.resolve_export(&ns(), &ExportName::Named("renamed".into())),
            Some(Value::Number(n)) if n == 1.0
        ));
    }

    #[test]
    fn test_default_export_chain() {
        let mut store = NamespaceStore::new();
        store.put_binding(&ns(), "f", Value::String("callable".into()));
        store.put_default_export(&ns(), "f").unwrap();
        assert!(store.default_export(&ns()).is_some());
    }

    #[test]
    fn test_missing_export_resolves_to_none() {
        let mut store = NamespaceStore::new();
        store.touch(&ns());
        assert!(store
            .resolve_export(&ns(), &ExportName::Named("ghost".into()))
            .is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = NamespaceStore::new();
        store.put_binding(&ns(), "x", Value::Number(1.0));
        store.reset();
        assert!(!store.has_been_evaluated(&ns()));
    }
}
