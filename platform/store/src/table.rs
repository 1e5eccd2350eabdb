use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::{StoreError, StoreResult};

/// Cloneable handle to a keyed collection of records.
///
/// Locks are never held across `.await`; every operation is a single
/// critical section, so a read-check-write inside one call is atomic.
#[derive(Debug)]
pub struct MemoryTable<T> {
    kind: &'static str,
    rows: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Clone for MemoryTable<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<T: Clone> MemoryTable<T> {
    /// `kind` names the record type in errors, e.g. `"deal"`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn insert(&self, id: Uuid, value: T) -> StoreResult<()> {
        let mut rows = self.rows.write();
        if rows.contains_key(&id) {
            return Err(StoreError::Duplicate {
                kind: self.kind,
                id,
            });
        }
        rows.insert(id, value);
        Ok(())
    }

    /// Build a row from the current contents and insert it under one write lock.
    pub fn insert_with(
        &self,
        id: Uuid,
        build: impl FnOnce(&mut dyn Iterator<Item = &T>) -> T,
    ) -> StoreResult<T> {
        let mut rows = self.rows.write();
        if rows.contains_key(&id) {
            return Err(StoreError::Duplicate {
                kind: self.kind,
                id,
            });
        }
        let value = build(&mut rows.values());
        rows.insert(id, value.clone());
        Ok(value)
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.rows.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.rows.read().values().cloned().collect()
    }

    pub fn filter(&self, mut keep: impl FnMut(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .values()
            .filter(|row| keep(row))
            .cloned()
            .collect()
    }

    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        self.rows.read().values().find(|row| pred(row)).cloned()
    }

    pub fn count(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        self.rows.read().values().filter(|row| pred(row)).count()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Replace the row only if the stored value still satisfies `expected`.
    pub fn replace_if(
        &self,
        id: Uuid,
        value: T,
        expected: impl FnOnce(&T) -> bool,
    ) -> StoreResult<()> {
        let mut rows = self.rows.write();
        let Some(current) = rows.get_mut(&id) else {
            return Err(StoreError::NotFound {
                kind: self.kind,
                id,
            });
        };
        if !expected(current) {
            return Err(StoreError::Conflict {
                kind: self.kind,
                id,
            });
        }
        *current = value;
        Ok(())
    }

    /// Apply `f` to the row in place and return the updated copy.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> StoreResult<T> {
        let mut rows = self.rows.write();
        let row = rows.get_mut(id).ok_or(StoreError::NotFound {
            kind: self.kind,
            id: *id,
        })?;
        f(row);
        Ok(row.clone())
    }

    /// Apply `f` to every row matching `pred`; `f` reports whether it changed the row.
    pub fn update_where(
        &self,
        mut pred: impl FnMut(&T) -> bool,
        mut f: impl FnMut(&mut T) -> bool,
    ) -> usize {
        let mut rows = self.rows.write();
        rows.values_mut()
            .filter(|row| pred(row))
            .map(|row| f(row))
            .filter(|changed| *changed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        version: u32,
        read: bool,
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let table = MemoryTable::new("row");
        let id = Uuid::new_v4();
        table.insert(id, Row { version: 1, read: false }).unwrap();
        let err = table.insert(id, Row { version: 2, read: false }).unwrap_err();
        assert_eq!(err, StoreError::Duplicate { kind: "row", id });
        assert_eq!(table.get(&id).unwrap().version, 1);
    }

    #[test]
    fn replace_if_detects_stale_snapshot() {
        let table = MemoryTable::new("row");
        let id = Uuid::new_v4();
        table.insert(id, Row { version: 1, read: false }).unwrap();

        table
            .replace_if(id, Row { version: 2, read: false }, |cur| cur.version == 1)
            .unwrap();
        let err = table
            .replace_if(id, Row { version: 3, read: false }, |cur| cur.version == 1)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(table.get(&id).unwrap().version, 2);
    }

    #[test]
    fn replace_if_on_missing_row_is_not_found() {
        let table: MemoryTable<Row> = MemoryTable::new("row");
        let err = table
            .replace_if(Uuid::new_v4(), Row { version: 1, read: false }, |_| true)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "row", .. }));
    }

    #[test]
    fn update_where_counts_only_changed_rows() {
        let table = MemoryTable::new("row");
        table.insert(Uuid::new_v4(), Row { version: 1, read: true }).unwrap();
        table.insert(Uuid::new_v4(), Row { version: 1, read: false }).unwrap();
        table.insert(Uuid::new_v4(), Row { version: 2, read: false }).unwrap();

        let changed = table.update_where(
            |row| row.version == 1,
            |row| !std::mem::replace(&mut row.read, true),
        );
        assert_eq!(changed, 1);
        assert_eq!(table.count(|row| !row.read), 1);
    }

    #[test]
    fn insert_with_sees_existing_rows() {
        let table = MemoryTable::new("row");
        table.insert(Uuid::new_v4(), Row { version: 4, read: false }).unwrap();
        let row = table
            .insert_with(Uuid::new_v4(), |rows| Row {
                version: rows.map(|r| r.version).max().unwrap_or(0) + 1,
                read: false,
            })
            .unwrap();
        assert_eq!(row.version, 5);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn clones_share_rows() {
        let table = MemoryTable::new("row");
        let other = table.clone();
        table.insert(Uuid::new_v4(), Row { version: 1, read: false }).unwrap();
        assert_eq!(other.len(), 1);
    }
}
