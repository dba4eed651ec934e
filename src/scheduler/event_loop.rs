//! In-process FIFO event loop
//!
//! Deterministic: tasks run in the order they were deferred, and only when the
//! owner calls [`EventLoop::run`] or [`EventLoop::turn`].

use super::{Scheduler, Task};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Cloneable handle to a shared task queue
#[derive(Clone, Default)]
pub struct EventLoop {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one task. Returns false if the queue was empty.
    pub fn turn(&self) -> bool {
        // The borrow must end before the task runs: tasks defer more tasks.
        let task = self.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run until idle, including tasks deferred while running
    ///
    /// Returns the number of tasks run.
    pub fn run(&self) -> usize {
        let mut ran = 0;
        while self.turn() {
            ran += 1;
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl Scheduler for EventLoop {
    fn defer(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_run_in_fifo_order() {
        let event_loop = EventLoop::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            event_loop.defer(Box::new(move || order.borrow_mut().push(i)));
        }
        assert_eq!(event_loop.pending(), 3);
        assert!(order.borrow().is_empty());

        assert_eq!(event_loop.run(), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn test_tasks_deferred_while_running_run_later() {
        let event_loop = EventLoop::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let inner_loop = event_loop.clone();
        let inner_order = order.clone();
        event_loop.defer(Box::new(move || {
            inner_order.borrow_mut().push("outer");
            let order = inner_order.clone();
            inner_loop.defer(Box::new(move || order.borrow_mut().push("inner")));
            inner_order.borrow_mut().push("outer done");
        }));

        assert!(event_loop.turn());
        assert_eq!(*order.borrow(), vec!["outer", "outer done"]);
        assert_eq!(event_loop.pending(), 1);

        assert_eq!(event_loop.run(), 1);
        assert_eq!(*order.borrow(), vec!["outer", "outer done", "inner"]);
        assert!(!event_loop.turn());
    }
}
