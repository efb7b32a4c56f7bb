#![forbid(unsafe_code)]

//! The host attribute graph: an arena of tagged cells.
//!
//! Every field the engine can address is a cell in a flat arena, reached
//! through a [`CellId`] handle. A cell is one of:
//!
//! - `Plain` — an ordinary field holding a scalar or an object (a map of
//!   field name to child cell).
//! - `Tracked` — a read/write accessor slot for a dependency property:
//!   reads return the shadow value, writes update the shadow and fan out
//!   invalidation keyed by the captured dependency path string.
//! - `Computed` — a read-only derived slot: reads proxy to the evaluation
//!   of the named computed property.
//!
//! Reads and writes dispatch on the tag, which is the statically-typed
//! rendition of swapping a plain field for a getter/setter pair. Object
//! values are decomposed into child cells on write and recomposed on read.
//!
//! # Invariants
//!
//! 1. Cell 0 is the root object and always holds an object.
//! 2. Overwriting a field reuses its cell in place, so previously resolved
//!    `(container, leaf)` references stay coherent: they observe the new
//!    value through the container's field map.
//! 3. Replacing an object value orphans its old child cells; orphans are
//!    never collected (teardown is the only reclamation point, and it only
//!    restores slots, never frees them).

use std::collections::BTreeMap;

use crate::value::Value;

/// Stable handle to a cell in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellId(u32);

/// A resolved field location: the containing object cell plus the field
/// name. Leaf lookup happens at access time, so a `PathRef` survives the
/// containing object being rewritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathRef {
    pub container: CellId,
    pub leaf: String,
}

/// What a cell holds: a scalar value or an exploded object.
#[derive(Debug, Clone)]
pub(crate) enum Stored {
    Scalar(Value),
    Object(BTreeMap<String, CellId>),
}

/// The accessor tag of a cell.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Plain(Stored),
    Tracked {
        shadow: Stored,
        /// The literal dependency path this slot was tracked under; writes
        /// fan out invalidation through the binding set for this key.
        key: String,
    },
    Computed {
        name: String,
    },
}

pub(crate) struct CellTree {
    cells: Vec<Slot>,
}

impl CellTree {
    pub(crate) const ROOT: CellId = CellId(0);

    pub(crate) fn new() -> Self {
        Self {
            cells: vec![Slot::Plain(Stored::Object(BTreeMap::new()))],
        }
    }

    fn alloc(&mut self, slot: Slot) -> CellId {
        let id = CellId(self.cells.len() as u32);
        self.cells.push(slot);
        id
    }

    pub(crate) fn slot(&self, id: CellId) -> &Slot {
        &self.cells[id.0 as usize]
    }

    fn slot_mut(&mut self, id: CellId) -> &mut Slot {
        &mut self.cells[id.0 as usize]
    }

    /// The field map of an object-valued cell, or `None` if the cell holds
    /// a scalar or a computed slot.
    pub(crate) fn object_fields(&self, id: CellId) -> Option<&BTreeMap<String, CellId>> {
        match self.slot(id) {
            Slot::Plain(Stored::Object(map)) | Slot::Tracked { shadow: Stored::Object(map), .. } => {
                Some(map)
            }
            _ => None,
        }
    }

    fn object_fields_mut(&mut self, id: CellId) -> Option<&mut BTreeMap<String, CellId>> {
        match self.slot_mut(id) {
            Slot::Plain(Stored::Object(map)) | Slot::Tracked { shadow: Stored::Object(map), .. } => {
                Some(map)
            }
            _ => None,
        }
    }

    /// The cell currently occupying a resolved field location, if the
    /// field exists.
    pub(crate) fn leaf_cell(&self, rf: &PathRef) -> Option<CellId> {
        self.object_fields(rf.container)?.get(&rf.leaf).copied()
    }

    /// The cell at a field location, created as an absent plain field if
    /// missing. Fails (returns `None`) only when the container no longer
    /// holds an object — a stale reference.
    fn ensure_leaf(&mut self, rf: &PathRef) -> Option<CellId> {
        if let Some(id) = self.leaf_cell(rf) {
            return Some(id);
        }
        self.object_fields(rf.container)?;
        let id = self.alloc(Slot::Plain(Stored::Scalar(Value::Absent)));
        let fields = self.object_fields_mut(rf.container)?;
        fields.insert(rf.leaf.clone(), id);
        Some(id)
    }

    /// Explode a value into stored form, allocating child cells for every
    /// object field.
    pub(crate) fn decompose(&mut self, value: Value) -> Stored {
        match value {
            Value::Object(map) => {
                let mut fields = BTreeMap::new();
                for (key, child) in map {
                    let stored = self.decompose(child);
                    let id = self.alloc(Slot::Plain(stored));
                    fields.insert(key, id);
                }
                Stored::Object(fields)
            }
            scalar => Stored::Scalar(scalar),
        }
    }

    /// Recompose the value held by a cell. Computed children are rendered
    /// through `computed` (the caller supplies cached values; composition
    /// never re-enters evaluation).
    pub(crate) fn compose(&self, id: CellId, computed: &dyn Fn(&str) -> Value) -> Value {
        match self.slot(id) {
            Slot::Plain(stored) | Slot::Tracked { shadow: stored, .. } => {
                self.compose_stored(stored, computed)
            }
            Slot::Computed { name } => computed(name),
        }
    }

    fn compose_stored(&self, stored: &Stored, computed: &dyn Fn(&str) -> Value) -> Value {
        match stored {
            Stored::Scalar(value) => value.clone(),
            Stored::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, id)| (key.clone(), self.compose(*id, computed)))
                    .collect(),
            ),
        }
    }

    /// Write an ordinary field, reusing the existing cell in place or
    /// creating it. Returns `false` on a stale reference.
    pub(crate) fn write_plain(&mut self, rf: &PathRef, value: Value) -> bool {
        let stored = self.decompose(value);
        match self.ensure_leaf(rf) {
            Some(id) => {
                *self.slot_mut(id) = Slot::Plain(stored);
                true
            }
            None => false,
        }
    }

    /// Update the shadow value of a tracked cell.
    pub(crate) fn write_shadow(&mut self, id: CellId, value: Value) {
        let stored = self.decompose(value);
        if let Slot::Tracked { shadow, .. } = self.slot_mut(id) {
            *shadow = stored;
        }
    }

    /// Replace the field with a read-only derived slot. Any prior value is
    /// discarded; re-installation over an existing computed slot is fine.
    pub(crate) fn install_computed(&mut self, rf: &PathRef, name: &str) -> bool {
        match self.ensure_leaf(rf) {
            Some(id) => {
                *self.slot_mut(id) = Slot::Computed {
                    name: name.to_owned(),
                };
                true
            }
            None => false,
        }
    }

    /// Replace the field with a read/write tracked slot seeded with the
    /// field's captured current value.
    pub(crate) fn install_tracked(&mut self, rf: &PathRef, initial: Value, key: &str) -> bool {
        let shadow = self.decompose(initial);
        match self.ensure_leaf(rf) {
            Some(id) => {
                *self.slot_mut(id) = Slot::Tracked {
                    shadow,
                    key: key.to_owned(),
                };
                true
            }
            None => false,
        }
    }

    /// Restore a tracked slot to a plain field holding its last shadow
    /// value. Idempotent: non-tracked slots are left untouched.
    pub(crate) fn restore(&mut self, rf: &PathRef) {
        let Some(id) = self.leaf_cell(rf) else { return };
        let slot = self.slot_mut(id);
        if let Slot::Tracked { shadow, .. } = slot {
            let shadow = std::mem::replace(shadow, Stored::Scalar(Value::Absent));
            *slot = Slot::Plain(shadow);
        }
    }

    /// Force the field to a plain value, whatever slot currently occupies
    /// it. Used at computed teardown to freeze the last cached value.
    pub(crate) fn set_plain(&mut self, rf: &PathRef, value: Value) {
        let stored = self.decompose(value);
        if let Some(id) = self.ensure_leaf(rf) {
            *self.slot_mut(id) = Slot::Plain(stored);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_ref(leaf: &str) -> PathRef {
        PathRef {
            container: CellTree::ROOT,
            leaf: leaf.to_owned(),
        }
    }

    fn no_computed(_: &str) -> Value {
        Value::Absent
    }

    #[test]
    fn write_then_compose_roundtrips_scalars() {
        let mut tree = CellTree::new();
        assert!(tree.write_plain(&root_ref("x"), Value::Int(7)));
        let id = tree.leaf_cell(&root_ref("x")).unwrap();
        assert_eq!(tree.compose(id, &no_computed), Value::Int(7));
    }

    #[test]
    fn objects_decompose_into_child_cells() {
        let mut tree = CellTree::new();
        tree.write_plain(&root_ref("name"), Value::object([("first", "A"), ("last", "B")]));
        let name = tree.leaf_cell(&root_ref("name")).unwrap();
        let fields = tree.object_fields(name).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(tree.compose(name, &no_computed), Value::object([("first", "A"), ("last", "B")]));
    }

    #[test]
    fn overwrite_reuses_the_cell() {
        let mut tree = CellTree::new();
        tree.write_plain(&root_ref("x"), Value::Int(1));
        let before = tree.leaf_cell(&root_ref("x")).unwrap();
        tree.write_plain(&root_ref("x"), Value::Int(2));
        let after = tree.leaf_cell(&root_ref("x")).unwrap();
        assert_eq!(before, after);
        assert_eq!(tree.compose(after, &no_computed), Value::Int(2));
    }

    #[test]
    fn tracked_reads_return_the_shadow() {
        let mut tree = CellTree::new();
        tree.write_plain(&root_ref("x"), Value::Int(1));
        tree.install_tracked(&root_ref("x"), Value::Int(1), "x");
        let id = tree.leaf_cell(&root_ref("x")).unwrap();
        tree.write_shadow(id, Value::Int(5));
        assert_eq!(tree.compose(id, &no_computed), Value::Int(5));
    }

    #[test]
    fn restore_freezes_the_shadow_and_is_idempotent() {
        let mut tree = CellTree::new();
        tree.install_tracked(&root_ref("x"), Value::Int(3), "x");
        tree.restore(&root_ref("x"));
        let id = tree.leaf_cell(&root_ref("x")).unwrap();
        assert!(matches!(tree.slot(id), Slot::Plain(_)));
        assert_eq!(tree.compose(id, &no_computed), Value::Int(3));
        // Plain slot: restore is a no-op.
        tree.restore(&root_ref("x"));
        assert_eq!(tree.compose(id, &no_computed), Value::Int(3));
    }

    #[test]
    fn install_computed_discards_prior_value() {
        let mut tree = CellTree::new();
        tree.write_plain(&root_ref("full"), Value::Int(9));
        tree.install_computed(&root_ref("full"), "full");
        let id = tree.leaf_cell(&root_ref("full")).unwrap();
        assert!(matches!(tree.slot(id), Slot::Computed { .. }));
        assert_eq!(tree.compose(id, &|_| Value::Int(42)), Value::Int(42));
    }

    #[test]
    fn writes_through_a_scalar_container_fail() {
        let mut tree = CellTree::new();
        tree.write_plain(&root_ref("x"), Value::Int(1));
        let x = tree.leaf_cell(&root_ref("x")).unwrap();
        let stale = PathRef {
            container: x,
            leaf: "y".to_owned(),
        };
        assert!(!tree.write_plain(&stale, Value::Int(2)));
    }

    #[test]
    fn ensure_leaf_creates_absent_fields() {
        let mut tree = CellTree::new();
        assert!(tree.leaf_cell(&root_ref("missing")).is_none());
        tree.write_plain(&root_ref("missing"), Value::Absent);
        let id = tree.leaf_cell(&root_ref("missing")).unwrap();
        assert_eq!(tree.compose(id, &no_computed), Value::Absent);
    }
}
