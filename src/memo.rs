// src/memo.rs

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::lazy::Lazy;

/// A memoized, keyed resolver built over lazy cells. Clones share one
/// private table, and the resolver callback receives a clone of the handle,
/// so it can request dependent keys through the same cache; overlapping
/// subproblems then share one memoized cell and are computed once.
///
/// The table only records present results. A key whose answer is `None` is
/// re-resolved on every call, which lets a resolver's answer for one key
/// become available after other keys have been resolved.
pub struct Memo<K, V> {
    table: Rc<RefCell<HashMap<K, V>>>,
    resolver: Rc<dyn Fn(Memo<K, V>, K) -> Lazy<Option<V>>>,
}

impl<K, V> Clone for Memo<K, V> {
    fn clone(&self) -> Self {
        Memo {
            table: Rc::clone(&self.table),
            resolver: Rc::clone(&self.resolver),
        }
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    pub fn new(resolver: impl Fn(Memo<K, V>, K) -> Lazy<Option<V>> + 'static) -> Self {
        Memo {
            table: Rc::new(RefCell::new(HashMap::new())),
            resolver: Rc::new(resolver),
        }
    }

    /// Resolve `key`. A cached present value comes back as an already-final
    /// cell; an uncached key gets a freshly composed lazy cell that records
    /// the value in the table once forced to a present result. The resolver
    /// callback runs now, but the work it composes does not.
    pub fn call(&self, key: K) -> Lazy<Option<V>> {
        if let Some(hit) = self.table.borrow().get(&key) {
            return Lazy::now(Some(hit.clone()));
        }
        let produced = (self.resolver)(self.clone(), key.clone());
        let table = Rc::clone(&self.table);
        produced.map(move |resolved| {
            if let Some(value) = &resolved {
                table.borrow_mut().insert(key.clone(), value.clone());
            }
            resolved
        })
    }

    /// Whether `key` has a recorded present value. Never resolves anything.
    pub fn is_cached(&self, key: &K) -> bool {
        self.table.borrow().contains_key(key)
    }
}

/// Build a memoized resolver from a recursive resolution function; the
/// function's first argument is the resolver handle itself.
pub fn memoize<K, V>(resolver: impl Fn(Memo<K, V>, K) -> Lazy<Option<V>> + 'static) -> Memo<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    Memo::new(resolver)
}
