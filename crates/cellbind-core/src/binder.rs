#![forbid(unsafe_code)]

//! The binding engine: registration, invalidation, and lazy evaluation.
//!
//! # Design
//!
//! [`Binder`] wires the four underlying pieces together: the path
//! resolver, the cell arena, the binding registry, and the computed store.
//! Registering a computed property resolves its own path and every
//! dependency path, records the definition, binds the name to each
//! dependency, and installs the accessor slots. Reading the computed
//! property evaluates lazily and caches; writing a tracked dependency
//! updates its shadow value and synchronously marks every dependent dirty
//! before the write returns.
//!
//! Cloning a `Binder` creates a new handle to the **same** engine state.
//!
//! # Invariants
//!
//! 1. A computed name has at most one live definition; re-registration
//!    atomically replaces it and rebinds the dependency list.
//! 2. A dirty definition is recomputed exactly once by the next read;
//!    a clean one is served from cache without invoking the derivation.
//! 3. A dependency path is intercepted only while at least one name is
//!    bound to it; the last unbind restores a plain field holding the
//!    last observed value.
//! 4. Resolution failures surface before any registry, store, or arena
//!    mutation.
//!
//! # Failure Modes
//!
//! - **Derivation panics**: the dirty flag stays set, so the next read
//!   retries; the name also remains on the evaluation stack, so further
//!   reads of it report a cycle instead of recursing.
//! - **Derivation reads its own name** (directly or through a chain): the
//!   inner read fails with [`BindError::CycleDetected`]. The closure
//!   usually defaults that read to absent and the outer evaluation
//!   completes.
//! - **Stale path references**: replacing a whole sub-object detaches the
//!   accessor slots installed on its old fields; reads and writes through
//!   previously resolved paths reach the replacement's plain fields and
//!   no longer invalidate anything.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::cells::{CellId, CellTree, PathRef, Slot};
use crate::error::{BindError, Result};
use crate::path::PathResolver;
use crate::registry::Bindings;
use crate::store::{ComputedStore, DeriveFn};
use crate::value::Value;

struct Inner {
    tree: CellTree,
    resolver: PathResolver,
    bindings: Bindings,
    store: ComputedStore,
    /// Names currently being evaluated, outermost first.
    evaluating: Vec<String>,
}

/// A dependency-tracking computed-property engine over a tree of
/// path-addressed cells.
pub struct Binder {
    inner: Rc<RefCell<Inner>>,
}

impl Clone for Binder {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    /// Create an engine with an empty root object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                tree: CellTree::new(),
                resolver: PathResolver::new(),
                bindings: Bindings::new(),
                store: ComputedStore::new(),
                evaluating: Vec::new(),
            })),
        }
    }

    /// Declare or redeclare a computed property.
    ///
    /// `name` is the dotted path of the computed slot, `deps` the dotted
    /// paths it derives from, and `derive` the derivation closure, called
    /// with this engine as its context. An empty `name` or empty `deps`
    /// is a silent no-op: malformed registrations are safe to make
    /// speculatively. Malformed *paths* are not: any resolution failure
    /// is returned before the engine mutates anything.
    pub fn compute(
        &self,
        name: &str,
        deps: &[&str],
        derive: impl Fn(&Binder) -> Value + 'static,
    ) -> Result<()> {
        if name.is_empty() || deps.is_empty() {
            trace!(name, "ignoring registration with empty name or deps");
            return Ok(());
        }
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        // Resolve everything first so a failure leaves no trace.
        let name_rf = inner.resolver.resolve(&inner.tree, name)?;
        let mut dep_refs: Vec<(String, PathRef)> = Vec::with_capacity(deps.len());
        for dep in deps {
            let rf = inner.resolver.resolve(&inner.tree, dep)?;
            dep_refs.push(((*dep).to_owned(), rf));
        }

        match inner.store.get(name).map(|def| def.deps.clone()) {
            Some(old_deps) => {
                for dep in &old_deps {
                    Self::unbind_dep(inner, dep, name);
                }
            }
            None => {
                inner.tree.install_computed(&name_rf, name);
            }
        }

        let derive: DeriveFn = Rc::new(derive);
        let dep_names: Vec<String> = dep_refs.iter().map(|(dep, _)| dep.clone()).collect();
        inner.store.register(name, dep_names, derive);

        for (dep, rf) in &dep_refs {
            if inner.bindings.bind(dep, name) {
                let initial = Self::current_value(&inner.tree, &inner.store, rf);
                inner.tree.install_tracked(rf, initial, dep);
            }
        }
        debug!(name, deps = deps.len(), "registered computed property");
        Ok(())
    }

    /// Tear down a computed property: unbind it from its dependencies,
    /// retire its definition, and freeze its last cached value as a plain
    /// field. Unknown names are silently ignored.
    pub fn destruct(&self, name: &str) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let Some(def) = inner.store.retire(name) else {
            trace!(name, "ignoring teardown of unregistered name");
            return;
        };
        for dep in &def.deps {
            Self::unbind_dep(inner, dep, name);
        }
        if let Ok(rf) = inner.resolver.resolve(&inner.tree, name) {
            inner.tree.set_plain(&rf, def.cached);
        }
        debug!(name, "destructed computed property");
    }

    /// Write a field. A tracked dependency updates its shadow value and
    /// synchronously marks every bound dependent dirty before returning;
    /// a plain or absent field is written directly (created if missing);
    /// a computed slot is read-only and the write is silently ignored.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        enum Write {
            Plain,
            Ignore,
            Shadow(CellId, String),
        }

        let value = value.into();
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let rf = inner.resolver.resolve(&inner.tree, path)?;

        let write = match inner.tree.leaf_cell(&rf) {
            Some(id) => match inner.tree.slot(id) {
                Slot::Computed { .. } => Write::Ignore,
                Slot::Tracked { key, .. } => Write::Shadow(id, key.clone()),
                Slot::Plain(_) => Write::Plain,
            },
            None => Write::Plain,
        };
        match write {
            Write::Ignore => {
                trace!(path, "ignoring write to computed slot");
            }
            Write::Plain => {
                inner.tree.write_plain(&rf, value);
            }
            Write::Shadow(id, key) => {
                inner.tree.write_shadow(id, value);
                let dependents = inner.bindings.dependents(&key);
                trace!(
                    path = key.as_str(),
                    dependents = dependents.len(),
                    "dependency written, invalidating"
                );
                for dependent in &dependents {
                    inner.store.mark_dirty(dependent);
                }
            }
        }
        Ok(())
    }

    /// Read a field. A computed slot evaluates lazily (recomputing only
    /// when dirty); a tracked slot returns its shadow value; an absent
    /// leaf yields [`Value::Absent`].
    ///
    /// # Errors
    ///
    /// [`BindError::PathNotFound`]/[`BindError::InvalidPath`] from
    /// resolution, and [`BindError::CycleDetected`] when a derivation
    /// reads the computed name it is itself deriving.
    pub fn get(&self, path: &str) -> Result<Value> {
        let computed = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let rf = inner.resolver.resolve(&inner.tree, path)?;
            match inner.tree.leaf_cell(&rf) {
                None => return Ok(Value::Absent),
                Some(id) => match inner.tree.slot(id) {
                    Slot::Computed { name } => name.clone(),
                    _ => {
                        let store = &inner.store;
                        return Ok(inner.tree.compose(id, &|n| store.cached(n)));
                    }
                },
            }
        };
        self.evaluate(&computed)
    }

    /// Mark every computed name bound to `path` dirty, in binding order.
    /// Untracked paths are silently ignored.
    pub fn invalidate(&self, path: &str) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let dependents = inner.bindings.dependents(path);
        trace!(path, count = dependents.len(), "invalidating dependents");
        for name in &dependents {
            inner.store.mark_dirty(name);
        }
    }

    /// Adjust the dirty flag of a computed name without evaluating:
    /// `keep_dirty == false` clears it, freezing the cached value against
    /// a pending invalidation; `keep_dirty == true` preserves it. Unknown
    /// names are silently ignored.
    pub fn revalidate(&self, name: &str, keep_dirty: bool) {
        self.inner.borrow_mut().store.revalidate(name, keep_dirty);
    }

    /// Whether the named computed property is registered and currently
    /// dirty. Unknown names are reported clean.
    #[must_use]
    pub fn is_dirty(&self, name: &str) -> bool {
        self.inner
            .borrow()
            .store
            .get(name)
            .is_some_and(|def| def.dirty)
    }

    /// Whether a computed property is registered under `name`.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.borrow().store.contains(name)
    }

    fn evaluate(&self, name: &str) -> Result<Value> {
        let derive = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let Some(def) = inner.store.get(name) else {
                return Ok(Value::Absent);
            };
            if !def.dirty {
                return Ok(def.cached.clone());
            }
            if inner.evaluating.iter().any(|n| n == name) {
                return Err(BindError::CycleDetected {
                    name: name.to_owned(),
                });
            }
            let derive = Rc::clone(&def.derive);
            inner.evaluating.push(name.to_owned());
            derive
        };

        // User code runs with no engine borrow held, so it may read and
        // write other fields freely.
        trace!(name, "recomputing dirty computed property");
        let value = (*derive)(self);

        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if let Some(pos) = inner.evaluating.iter().rposition(|n| n == name) {
            inner.evaluating.remove(pos);
        }
        // The derivation may have destructed its own name; then the value
        // is returned but nothing is cached.
        if let Some(def) = inner.store.get_mut(name) {
            def.cached = value.clone();
            def.dirty = false;
        }
        Ok(value)
    }

    /// Current value at a resolved location, for seeding a tracked slot's
    /// shadow. Computed children render from their caches; evaluation is
    /// never entered here.
    fn current_value(tree: &CellTree, store: &ComputedStore, rf: &PathRef) -> Value {
        match tree.leaf_cell(rf) {
            Some(id) => tree.compose(id, &|n| store.cached(n)),
            None => Value::Absent,
        }
    }

    fn unbind_dep(inner: &mut Inner, dep: &str, name: &str) {
        if inner.bindings.unbind(dep, name)
            && let Ok(rf) = inner.resolver.resolve(&inner.tree, dep)
        {
            inner.tree.restore(&rf);
        }
    }
}
