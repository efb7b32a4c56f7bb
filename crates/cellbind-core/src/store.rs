#![forbid(unsafe_code)]

//! Computed-property store: definitions, caches, and dirty flags.
//!
//! One live definition per name. The dirty flag protocol: `dirty == true`
//! means the next read must invoke the derivation before returning;
//! `dirty == false` means the cached value is authoritative. Evaluation
//! itself lives on [`Binder`](crate::binder::Binder), because it calls
//! back into user code; the store only owns the state.

use std::rc::Rc;

use ahash::AHashMap;

use crate::binder::Binder;
use crate::value::Value;

/// A derivation closure, invoked with the engine handle as its context.
pub(crate) type DeriveFn = Rc<dyn Fn(&Binder) -> Value>;

pub(crate) struct ComputedDef {
    pub deps: Vec<String>,
    pub derive: DeriveFn,
    pub cached: Value,
    pub dirty: bool,
}

pub(crate) struct ComputedStore {
    defs: AHashMap<String, ComputedDef>,
}

impl ComputedStore {
    pub(crate) fn new() -> Self {
        Self {
            defs: AHashMap::new(),
        }
    }

    /// Store or replace a definition, marked dirty. Returns the previous
    /// dependency list when re-registering, so the caller can rebind.
    pub(crate) fn register(
        &mut self,
        name: &str,
        deps: Vec<String>,
        derive: DeriveFn,
    ) -> Option<Vec<String>> {
        let def = ComputedDef {
            deps,
            derive,
            cached: Value::Absent,
            dirty: true,
        };
        self.defs.insert(name.to_owned(), def).map(|old| old.deps)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ComputedDef> {
        self.defs.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ComputedDef> {
        self.defs.get_mut(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Cached value for a name, absent if unknown or never evaluated.
    pub(crate) fn cached(&self, name: &str) -> Value {
        self.defs
            .get(name)
            .map(|def| def.cached.clone())
            .unwrap_or_default()
    }

    /// Unconditionally flag the cache stale. Idempotent; unknown names are
    /// ignored.
    pub(crate) fn mark_dirty(&mut self, name: &str) {
        if let Some(def) = self.defs.get_mut(name) {
            def.dirty = true;
        }
    }

    /// The caching toggle: `keep_dirty == false` clears the flag so the
    /// cached value stands; `keep_dirty == true` preserves a pending
    /// invalidation.
    pub(crate) fn revalidate(&mut self, name: &str, keep_dirty: bool) {
        if let Some(def) = self.defs.get_mut(name) {
            def.dirty = def.dirty && keep_dirty;
        }
    }

    /// Remove and return the definition.
    pub(crate) fn retire(&mut self, name: &str) -> Option<ComputedDef> {
        self.defs.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_nothing() -> DeriveFn {
        Rc::new(|_: &Binder| Value::Absent)
    }

    #[test]
    fn registration_starts_dirty() {
        let mut store = ComputedStore::new();
        assert!(store.register("full", vec!["a".into()], derive_nothing()).is_none());
        assert!(store.get("full").unwrap().dirty);
    }

    #[test]
    fn reregistration_returns_previous_deps() {
        let mut store = ComputedStore::new();
        store.register("full", vec!["a".into(), "b".into()], derive_nothing());
        let old = store.register("full", vec!["b".into()], derive_nothing());
        assert_eq!(old, Some(vec!["a".to_owned(), "b".to_owned()]));
        assert_eq!(store.get("full").unwrap().deps, vec!["b".to_owned()]);
    }

    #[test]
    fn revalidate_clears_unless_kept() {
        let mut store = ComputedStore::new();
        store.register("full", vec!["a".into()], derive_nothing());
        store.revalidate("full", true);
        assert!(store.get("full").unwrap().dirty);
        store.revalidate("full", false);
        assert!(!store.get("full").unwrap().dirty);
        // Clean and kept: stays clean.
        store.revalidate("full", true);
        assert!(!store.get("full").unwrap().dirty);
    }

    #[test]
    fn mark_dirty_is_idempotent_and_ignores_unknown() {
        let mut store = ComputedStore::new();
        store.register("full", vec!["a".into()], derive_nothing());
        store.revalidate("full", false);
        store.mark_dirty("full");
        store.mark_dirty("full");
        assert!(store.get("full").unwrap().dirty);
        store.mark_dirty("ghost");
    }

    #[test]
    fn retire_removes_the_definition() {
        let mut store = ComputedStore::new();
        store.register("full", vec!["a".into()], derive_nothing());
        assert!(store.retire("full").is_some());
        assert!(!store.contains("full"));
        assert!(store.retire("full").is_none());
    }

    #[test]
    fn cached_defaults_to_absent() {
        let store = ComputedStore::new();
        assert!(store.cached("ghost").is_absent());
    }
}
