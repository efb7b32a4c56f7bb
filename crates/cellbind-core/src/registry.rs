#![forbid(unsafe_code)]

//! Binding registry: which computed names depend on which tracked paths.
//!
//! Each tracked dependency path carries its dependents in insertion order,
//! with no duplicates. The registry only bookkeeps; installing and removing
//! the actual interception is the caller's job, signalled by the return
//! values of [`Bindings::bind`] and [`Bindings::unbind`].

use ahash::AHashMap;

pub(crate) struct Bindings {
    by_path: AHashMap<String, Vec<String>>,
}

impl Bindings {
    pub(crate) fn new() -> Self {
        Self {
            by_path: AHashMap::new(),
        }
    }

    /// Record that `name` depends on `path`. Returns `true` when the path
    /// was not tracked before, i.e. the caller must install interception.
    /// Re-binding an already-present name is a no-op (append-or-skip).
    pub(crate) fn bind(&mut self, path: &str, name: &str) -> bool {
        match self.by_path.get_mut(path) {
            Some(names) => {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_owned());
                }
                false
            }
            None => {
                self.by_path.insert(path.to_owned(), vec![name.to_owned()]);
                true
            }
        }
    }

    /// Drop `name` from `path`'s binding set. Returns `true` when the set
    /// emptied and the path was retired, i.e. the caller must uninstall
    /// interception.
    pub(crate) fn unbind(&mut self, path: &str, name: &str) -> bool {
        let Some(names) = self.by_path.get_mut(path) else {
            return false;
        };
        names.retain(|n| n != name);
        if names.is_empty() {
            self.by_path.remove(path);
            true
        } else {
            false
        }
    }

    /// Snapshot of the names bound to a path, in insertion order.
    pub(crate) fn dependents(&self, path: &str) -> Vec<String> {
        self.by_path.get(path).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    fn is_tracked(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_bind_reports_newly_tracked() {
        let mut bindings = Bindings::new();
        assert!(bindings.bind("a", "sum"));
        assert!(!bindings.bind("a", "product"));
        assert_eq!(bindings.dependents("a"), vec!["sum", "product"]);
    }

    #[test]
    fn rebinding_a_bound_name_is_a_no_op() {
        let mut bindings = Bindings::new();
        bindings.bind("a", "sum");
        bindings.bind("a", "product");
        bindings.bind("a", "sum");
        assert_eq!(bindings.dependents("a"), vec!["sum", "product"]);
    }

    #[test]
    fn unbind_retires_emptied_paths() {
        let mut bindings = Bindings::new();
        bindings.bind("a", "sum");
        bindings.bind("a", "product");
        assert!(!bindings.unbind("a", "sum"));
        assert!(bindings.is_tracked("a"));
        assert!(bindings.unbind("a", "product"));
        assert!(!bindings.is_tracked("a"));
    }

    #[test]
    fn unbind_unknown_path_is_harmless() {
        let mut bindings = Bindings::new();
        assert!(!bindings.unbind("nope", "sum"));
    }

    #[test]
    fn dependents_of_untracked_path_is_empty() {
        let bindings = Bindings::new();
        assert!(bindings.dependents("a").is_empty());
    }
}
