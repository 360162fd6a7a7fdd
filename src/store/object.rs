//! object.rs
//! The capability surface of bound external objects: member reads and the
//! optional change-notification source a member access subscribes to.

use super::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type ObjectRef = Rc<dyn Object>;

/// Receives the name of the changed member; `None` or `""` means "anything
/// may have changed".
pub type ChangeHandler = Rc<dyn Fn(Option<&str>)>;

/// An external object a binding graph can read from.
pub trait Object {
    fn type_name(&self) -> &str;

    /// Reads a member by name. `None` when the object has no such member.
    fn member(&self, name: &str) -> Option<Value>;

    /// The object's change-notification capability, if it has one.
    fn change_notification(&self) -> Option<&dyn NotifyChanged> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey(pub u64);

pub trait NotifyChanged {
    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionKey;
    /// Returns `false` when the key was unknown (already removed).
    fn unsubscribe(&self, key: SubscriptionKey) -> bool;
}

/// Whether a notification naming `changed` concerns `member`.
pub fn concerns(changed: Option<&str>, member: &str) -> bool {
    match changed {
        None | Some("") => true,
        Some(name) => name == member,
    }
}

/// A ready-made [`NotifyChanged`] implementation.
///
/// Dispatch iterates a snapshot of the handler list and re-checks membership
/// before each call, so a handler removed by an earlier handler in the same
/// dispatch is not invoked.
#[derive(Default)]
pub struct ChangeNotifier {
    handlers: RefCell<Vec<(SubscriptionKey, ChangeHandler)>>,
    next_key: Cell<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn notify(&self, member: Option<&str>) {
        let snapshot: Vec<(SubscriptionKey, ChangeHandler)> = self.handlers.borrow().clone();
        for (key, handler) in snapshot {
            let live = self.handlers.borrow().iter().any(|(k, _)| *k == key);
            if live {
                handler(member);
            }
        }
    }
}

impl NotifyChanged for ChangeNotifier {
    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionKey {
        let key = SubscriptionKey(self.next_key.get());
        self.next_key.set(key.0 + 1);
        self.handlers.borrow_mut().push((key, handler));
        key
    }

    fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        match handlers.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                handlers.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier").field("subscribers", &self.subscriber_count()).finish()
    }
}

/// Scoped subscription to an object's change notifications. Dropping the
/// guard unsubscribes.
pub struct Subscription {
    target: ObjectRef,
    key: SubscriptionKey,
}

impl Subscription {
    /// Subscribes `handler` to `target`. `None` if the object cannot notify.
    pub fn watch(target: &ObjectRef, handler: ChangeHandler) -> Option<Self> {
        let source = target.change_notification()?;
        let key = source.subscribe(handler);
        Some(Self { target: Rc::clone(target), key })
    }

    /// Whether this guard is attached to exactly `object`.
    pub fn is_on(&self, object: &ObjectRef) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.target), Rc::as_ptr(object))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.target.change_notification() {
            source.unsubscribe(self.key);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("target", &self.target.type_name())
            .field("key", &self.key)
            .finish()
    }
}

/// A dynamic object with named members.
///
/// Observable bags notify their subscribers on every [`set`](Self::set);
/// non-observable bags expose no notification capability at all.
pub struct PropertyBag {
    type_name: String,
    members: RefCell<BTreeMap<String, Value>>,
    notifier: Option<ChangeNotifier>,
}

impl PropertyBag {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            members: RefCell::new(BTreeMap::new()),
            notifier: Some(ChangeNotifier::new()),
        }
    }

    pub fn non_observable(type_name: &str) -> Self {
        Self { notifier: None, ..Self::new(type_name) }
    }

    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.members.borrow_mut().insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.members.borrow().get(name).cloned()
    }

    /// Stores `value` and notifies subscribers with the member name.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.members.borrow_mut().insert(name.to_string(), value.into());
        if let Some(n) = &self.notifier {
            n.notify(Some(name));
        }
    }

    /// Notifies subscribers that anything may have changed.
    pub fn touch(&self) {
        if let Some(n) = &self.notifier {
            n.notify(None);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.as_ref().map_or(0, ChangeNotifier::subscriber_count)
    }
}

impl Object for PropertyBag {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn member(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn change_notification(&self) -> Option<&dyn NotifyChanged> {
        self.notifier.as_ref().map(|n| n as &dyn NotifyChanged)
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBag")
            .field("type_name", &self.type_name)
            .field("members", &self.members.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<usize>>, ChangeHandler) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        (hits, Rc::new(move |_| h.set(h.get() + 1)))
    }

    #[test]
    fn test_guard_unsubscribes_on_drop() {
        let bag: ObjectRef = Rc::new(PropertyBag::new("Person"));
        let (hits, handler) = counter();
        let guard = Subscription::watch(&bag, handler).expect("observable");
        let source = bag.change_notification().expect("observable");
        assert!(guard.is_on(&bag));
        drop(guard);
        assert!(!source.unsubscribe(SubscriptionKey(0)));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_non_observable_bag_cannot_be_watched() {
        let bag: ObjectRef = Rc::new(PropertyBag::non_observable("Point").with("x", 1));
        let (_, handler) = counter();
        assert!(Subscription::watch(&bag, handler).is_none());
        assert_eq!(bag.member("x"), Some(Value::I32(1)));
    }

    #[test]
    fn test_handler_removed_mid_dispatch_is_skipped() {
        let bag = Rc::new(PropertyBag::new("Person"));
        let obj: ObjectRef = bag.clone();
        let (hits, second) = counter();

        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let v = Rc::clone(&victim);
        let _first = Subscription::watch(&obj, Rc::new(move |_| drop(v.borrow_mut().take())));
        *victim.borrow_mut() = Subscription::watch(&obj, second);

        bag.set("age", 3);
        assert_eq!(hits.get(), 0);
        assert_eq!(bag.subscriber_count(), 1);
    }

    #[test]
    fn test_wildcard_matching() {
        assert!(concerns(None, "age"));
        assert!(concerns(Some(""), "age"));
        assert!(concerns(Some("age"), "age"));
        assert!(!concerns(Some("name"), "age"));
    }
}
