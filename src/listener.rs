//! Lifecycle listeners fired around every controller dispatch.
//!
//! Three independent sequences exist:
//!
//! | Sequence        | Fired                                              |
//! |-----------------|----------------------------------------------------|
//! | Instantiation   | right after the controller factory returned        |
//! | Initialization  | after the controller's own `on_init` hook          |
//! | Invoke          | after argument extraction, before the action runs  |
//!
//! Listeners are appended while the application is configured and visited in
//! append order on every dispatch. Once the application starts serving, the
//! lists are moved into the frozen dispatch pipeline and can no longer change.
//! A listener error stops the remaining listeners and fails the dispatch.

use std::fmt;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::controller::{Arguments, Controller, ControllerMethod};

/// Identifies a listener sequence in errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerStage {
    Instantiation,
    Initialization,
    Invoke,
}

impl fmt::Display for ListenerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerStage::Instantiation => write!(f, "instantiation"),
            ListenerStage::Initialization => write!(f, "initialization"),
            ListenerStage::Invoke => write!(f, "invoke"),
        }
    }
}

pub trait ControllerInstantiationListener: Send + Sync {
    fn on_instantiation(
        &self,
        ctx: &mut RequestContext,
        controller: &mut dyn Controller,
        method: &ControllerMethod,
    ) -> anyhow::Result<()>;
}

pub trait ControllerInitializationListener: Send + Sync {
    fn on_initialization(
        &self,
        ctx: &mut RequestContext,
        controller: &mut dyn Controller,
        method: &ControllerMethod,
    ) -> anyhow::Result<()>;
}

pub trait ControllerInvokeListener: Send + Sync {
    fn on_invoke(
        &self,
        ctx: &mut RequestContext,
        controller: &mut dyn Controller,
        method: &ControllerMethod,
        args: &Arguments,
    ) -> anyhow::Result<()>;
}

impl<F> ControllerInstantiationListener for F
where
    F: Fn(&mut RequestContext, &mut dyn Controller, &ControllerMethod) -> anyhow::Result<()> + Send + Sync,
{
    fn on_instantiation(
        &self,
        ctx: &mut RequestContext,
        controller: &mut dyn Controller,
        method: &ControllerMethod,
    ) -> anyhow::Result<()> {
        self(ctx, controller, method)
    }
}

impl<F> ControllerInitializationListener for F
where
    F: Fn(&mut RequestContext, &mut dyn Controller, &ControllerMethod) -> anyhow::Result<()> + Send + Sync,
{
    fn on_initialization(
        &self,
        ctx: &mut RequestContext,
        controller: &mut dyn Controller,
        method: &ControllerMethod,
    ) -> anyhow::Result<()> {
        self(ctx, controller, method)
    }
}

impl<F> ControllerInvokeListener for F
where
    F: Fn(&mut RequestContext, &mut dyn Controller, &ControllerMethod, &Arguments) -> anyhow::Result<()>
        + Send
        + Sync,
{
    fn on_invoke(
        &self,
        ctx: &mut RequestContext,
        controller: &mut dyn Controller,
        method: &ControllerMethod,
        args: &Arguments,
    ) -> anyhow::Result<()> {
        self(ctx, controller, method, args)
    }
}

/// Append-only, ordered list of listeners
pub struct ListenerList<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

pub type InstantiationListenerList = ListenerList<dyn ControllerInstantiationListener>;
pub type InitializationListenerList = ListenerList<dyn ControllerInitializationListener>;
pub type InvokeListenerList = ListenerList<dyn ControllerInvokeListener>;

impl<L: ?Sized> ListenerList<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Append a listener; it runs after every listener added before it.
    pub fn add(&mut self, listener: Arc<L>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listeners in append order
    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.listeners.iter().map(|l| l.as_ref())
    }
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for ListenerList<L> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.iter().map(Arc::clone).collect(),
        }
    }
}

impl<L: ?Sized> fmt::Debug for ListenerList<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    trait Tag: Send + Sync {
        fn tag(&self) -> &'static str;
    }

    impl Tag for Named {
        fn tag(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn test_iteration_follows_append_order() {
        let mut list: ListenerList<dyn Tag> = ListenerList::new();
        list.add(Arc::new(Named("l1")))
            .add(Arc::new(Named("l2")))
            .add(Arc::new(Named("l3")));

        let order: Vec<_> = list.iter().map(|l| l.tag()).collect();
        assert_eq!(order, vec!["l1", "l2", "l3"]);
        assert_eq!(list.len(), 3);
        // Repeated iteration yields the same order.
        let again: Vec<_> = list.iter().map(|l| l.tag()).collect();
        assert_eq!(order, again);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(ListenerStage::Invoke.to_string(), "invoke");
        assert_eq!(ListenerStage::Instantiation.to_string(), "instantiation");
    }
}
