//! Typed publish/subscribe channels
//!
//! Each event kind gets its own [`Channel`]. Handlers run synchronously, in
//! subscription order, after the triggering mutation has been applied. They
//! receive a shared reference to the emitting layer or map, so they can read
//! the grid but never restructure it.

use std::fmt;

use tilegrid_autotile::AtlasCoord;

use crate::element::{ElementId, GridElement};
use crate::geometry::{Direction, GridSize, Position};

/// Handle returned by [`Channel::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<C, E> = Box<dyn FnMut(&C, &E)>;

/// An ordered list of event handlers
pub struct Channel<C, E> {
    handlers: Vec<(SubscriptionId, Handler<C, E>)>,
    next_id: u64,
}

impl<C, E> Channel<C, E> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a handler; it runs after every previously registered one
    pub fn subscribe(&mut self, handler: impl FnMut(&C, &E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, context: &C, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(context, event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C, E> Default for Channel<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> fmt::Debug for Channel<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Why an element left its layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// `remove_element` / `remove_element_at`
    Direct,
    /// Overwritten by a new element at the same cell
    Replaced,
    /// Evicted by an insertion on a concurrent layer
    Evicted,
    /// Displaced by a unique element with the same name
    Namesake,
    /// Trimmed away by `reduce_towards`
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementCreated {
    pub id: ElementId,
    pub position: Position,
}

/// Carries the detached element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRemoved {
    pub element: GridElement,
    pub cause: RemovalCause,
}

/// A tile whose display changed during a format pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileFormatted {
    pub id: ElementId,
    pub position: Position,
    pub previous: AtlasCoord,
    pub display: AtlasCoord,
}

/// A grid size change; `amount` is negative when shrinking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridResized {
    pub direction: Direction,
    pub amount: i32,
    pub old_size: GridSize,
    pub new_size: GridSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut channel: Channel<(), u32> = Channel::new();

        let first = log.clone();
        channel.subscribe(move |_, value| first.borrow_mut().push(("first", *value)));
        let second = log.clone();
        channel.subscribe(move |_, value| second.borrow_mut().push(("second", *value)));

        channel.emit(&(), &7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut channel: Channel<(), ()> = Channel::new();

        let counter = count.clone();
        let id = channel.subscribe(move |_, _| *counter.borrow_mut() += 1);
        channel.emit(&(), &());
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        channel.emit(&(), &());

        assert_eq!(*count.borrow(), 1);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_handler_sees_context() {
        let seen = Rc::new(RefCell::new(String::new()));
        let mut channel: Channel<String, ()> = Channel::new();
        let sink = seen.clone();
        channel.subscribe(move |context, _| sink.borrow_mut().push_str(context));
        channel.emit(&"walls".to_string(), &());
        assert_eq!(*seen.borrow(), "walls");
    }
}
