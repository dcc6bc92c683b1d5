//! `$id`/`$ref` bookkeeping.
//!
//! Only [`Shared`](crate::describe::Shared) values have an identity, so only
//! they are tracked. On write the tracker maps a value's identity (its `Rc`
//! allocation) to an id; on read it maps ids to the already materialized
//! handle so later `$ref`s resolve to the same `Rc`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::describe::TypeKey;
use crate::error::{Error, Result};

/// A materialized shared value: a type-erased `Rc<RefCell<T>>` that can be cloned.
pub struct SharedHandle {
    type_key: TypeKey,
    value: Box<dyn Any>,
    share: fn(&dyn Any) -> Option<Box<dyn Any>>,
}

impl SharedHandle {
    pub(crate) fn new(
        type_key: TypeKey,
        value: Box<dyn Any>,
        share: fn(&dyn Any) -> Option<Box<dyn Any>>,
    ) -> Self {
        SharedHandle {
            type_key,
            value,
            share,
        }
    }

    /// The shared type, `Rc<RefCell<T>>`.
    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    #[must_use]
    pub fn value(&self) -> &dyn Any {
        &*self.value
    }

    /// Another handle to the same allocation.
    #[must_use]
    pub fn share(&self) -> Option<Box<dyn Any>> {
        (self.share)(&*self.value)
    }
}

impl fmt::Debug for SharedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandle")
            .field("type_key", &self.type_key)
            .finish_non_exhaustive()
    }
}

/// Call-scoped id table. A fresh one is built for every serialize or deserialize call.
pub trait ReferenceResolver {
    /// The id of `identity`, assigning the next one on first sight.
    ///
    /// The caller keeps the value alive for the rest of the call once an id
    /// is assigned, so an identity is never shared by two live values.
    fn get_reference(&mut self, identity: usize) -> String;

    fn is_referenced(&self, identity: usize) -> bool;

    /// Records the value materialized for `id`.
    ///
    /// # Errors
    ///
    /// Another value already has the id.
    fn add_reference(&mut self, id: &str, handle: SharedHandle) -> Result<()>;

    fn resolve_reference(&self, id: &str) -> Option<&SharedHandle>;
}

/// Sequential ids starting at `"1"`.
#[derive(Debug, Default)]
pub struct DefaultReferenceResolver {
    next: usize,
    ids: HashMap<usize, String>,
    handles: HashMap<String, SharedHandle>,
}

impl DefaultReferenceResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceResolver for DefaultReferenceResolver {
    fn get_reference(&mut self, identity: usize) -> String {
        if let Some(id) = self.ids.get(&identity) {
            return id.clone();
        }
        self.next += 1;
        let id = self.next.to_string();
        tracing::trace!(id = %id, "assigned reference id");
        self.ids.insert(identity, id.clone());
        id
    }

    fn is_referenced(&self, identity: usize) -> bool {
        self.ids.contains_key(&identity)
    }

    fn add_reference(&mut self, id: &str, handle: SharedHandle) -> Result<()> {
        if self.handles.contains_key(id) {
            return Err(Error::reference(format!(
                "A different value already has the Id '{id}'."
            )));
        }
        tracing::trace!(id = %id, type_name = %handle.type_key(), "registered reference");
        self.handles.insert(id.to_string(), handle);
        Ok(())
    }

    fn resolve_reference(&self, id: &str) -> Option<&SharedHandle> {
        self.handles.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{shared, Shared};
    use std::rc::Rc;

    fn share_i32(value: &dyn Any) -> Option<Box<dyn Any>> {
        value
            .downcast_ref::<Shared<i32>>()
            .map(|rc| Box::new(Rc::clone(rc)) as Box<dyn Any>)
    }

    #[test]
    fn test_ids_are_sequential_and_stable() {
        let mut resolver = DefaultReferenceResolver::new();
        assert!(!resolver.is_referenced(10));
        assert_eq!(resolver.get_reference(10), "1");
        assert_eq!(resolver.get_reference(20), "2");
        assert_eq!(resolver.get_reference(10), "1");
        assert!(resolver.is_referenced(20));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut resolver = DefaultReferenceResolver::new();
        let value = shared(5);
        let handle = SharedHandle::new(
            TypeKey::of::<Shared<i32>>(),
            Box::new(Rc::clone(&value)),
            share_i32,
        );
        resolver.add_reference("1", handle).unwrap();

        let again = SharedHandle::new(TypeKey::of::<Shared<i32>>(), Box::new(shared(6)), share_i32);
        let err = resolver.add_reference("1", again).unwrap_err();
        assert_eq!(err.message(), "A different value already has the Id '1'.");
    }

    #[test]
    fn test_resolved_handle_shares_allocation() {
        let mut resolver = DefaultReferenceResolver::new();
        let value = shared(5);
        let handle = SharedHandle::new(
            TypeKey::of::<Shared<i32>>(),
            Box::new(Rc::clone(&value)),
            share_i32,
        );
        resolver.add_reference("7", handle).unwrap();

        let copy = resolver.resolve_reference("7").unwrap().share().unwrap();
        let copy = copy.downcast::<Shared<i32>>().unwrap();
        assert!(Rc::ptr_eq(&value, &copy));
        assert!(resolver.resolve_reference("8").is_none());
    }
}
