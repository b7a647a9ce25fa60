//! Declarative tree descriptions consumed by the reconciler.
//!
//! An [`Element`] names what one tree position should render: a host
//! element by tag, a text leaf, or a functional unit. The author-facing
//! builder syntax lives outside this crate; only plain constructors are
//! provided here. Primitive children coerce to text descriptions via the
//! `From` impls.

use std::fmt;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::event::EventHandler;
use crate::hooks::Scope;
use crate::{key_of, Key, RenderError};

/// Render function of a functional unit.
///
/// State cells are reached through the explicit [`Scope`] rather than
/// process-wide registers, and hook usage errors propagate out through the
/// `Result`, aborting the pass that invoked the unit.
pub type ComponentFn = dyn Fn(&mut Scope, &Props) -> Result<Element, RenderError>;

/// A functional rendering unit with a stable identity.
///
/// Identity decides reuse during reconciliation: two descriptions with the
/// same component identity at the same position keep the unit's state
/// cells alive across passes.
#[derive(Clone)]
pub struct Component {
    id: usize,
    render: Rc<ComponentFn>,
}

impl Component {
    /// Wrap a plain function item. Function pointers have a stable address,
    /// so the same function always reconciles as the same unit.
    pub fn new(f: fn(&mut Scope, &Props) -> Result<Element, RenderError>) -> Self {
        Self {
            id: f as usize,
            render: Rc::new(f),
        }
    }

    /// Wrap a shared closure. Identity follows the allocation, so callers
    /// must reuse the same `Rc` across renders for the unit to be reused.
    pub fn from_shared(render: Rc<ComponentFn>) -> Self {
        Self {
            id: Rc::as_ptr(&render).cast::<()>() as usize,
            render,
        }
    }

    pub fn render(&self, scope: &mut Scope, props: &Props) -> Result<Element, RenderError> {
        (self.render)(scope, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").field("id", &self.id).finish()
    }
}

/// What an element renders as: the reconciler's `elementType`.
#[derive(Debug, Clone)]
pub enum ElementKind {
    /// Host element named by tag.
    Host(String),
    /// Text leaf; content lives in the props bag.
    Text,
    /// Functional unit.
    Component(Component),
}

impl ElementKind {
    /// Whether two kinds describe the same logical element type, the first
    /// half of the reuse check (the other half being key equality).
    pub fn same_identity(&self, other: &ElementKind) -> bool {
        match (self, other) {
            (ElementKind::Host(a), ElementKind::Host(b)) => a == b,
            (ElementKind::Text, ElementKind::Text) => true,
            (ElementKind::Component(a), ElementKind::Component(b)) => a == b,
            _ => false,
        }
    }
}

/// Opaque props bag carried by every description node.
///
/// For host kinds the `children` field holds nested descriptions; text
/// leaves carry their content; event handlers sit under their callback
/// names for the delegation layer to find.
#[derive(Clone, Default)]
pub struct Props {
    attrs: HashMap<String, String>,
    handlers: HashMap<String, EventHandler>,
    children: Vec<Element>,
    text: Option<String>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.text = Some(content.into());
        self
    }

    /// Attach a handler under an explicit callback name.
    pub fn on(mut self, callback_name: impl Into<String>, handler: EventHandler) -> Self {
        self.handlers.insert(callback_name.into(), handler);
        self
    }

    pub fn on_click(self, handler: EventHandler) -> Self {
        self.on("onClick", handler)
    }

    pub fn on_click_capture(self, handler: EventHandler) -> Self {
        self.on("onClickCapture", handler)
    }

    pub fn child_list(&self) -> &[Element] {
        &self.children
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn handler(&self, callback_name: &str) -> Option<EventHandler> {
        self.handlers.get(callback_name).cloned()
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Equality over the host-facing parts of the bag: attributes, text
    /// content, and handler identity. Children are reconciled structurally
    /// and deliberately excluded.
    pub fn host_props_eq(&self, other: &Props) -> bool {
        if self.attrs != other.attrs || self.text != other.text {
            return false;
        }
        if self.handlers.len() != other.handlers.len() {
            return false;
        }
        self.handlers.iter().all(|(name, handler)| {
            other
                .handlers
                .get(name)
                .is_some_and(|h| Rc::ptr_eq(handler, h))
        })
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("attrs", &self.attrs)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("children", &self.children.len())
            .field("text", &self.text)
            .finish()
    }
}

/// One node of the declarative input tree.
#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    key: Option<Key>,
    props: Props,
}

impl Element {
    pub fn host(tag: impl Into<String>, props: Props) -> Self {
        Self {
            kind: ElementKind::Host(tag.into()),
            key: None,
            props,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Text,
            key: None,
            props: Props::new().text(content),
        }
    }

    pub fn component(f: fn(&mut Scope, &Props) -> Result<Element, RenderError>) -> Self {
        Self::from_component(Component::new(f), Props::new())
    }

    pub fn from_component(component: Component, props: Props) -> Self {
        Self {
            kind: ElementKind::Component(component),
            key: None,
            props,
        }
    }

    /// Attach a stable identity used across reconciliation.
    pub fn keyed(mut self, key: impl std::hash::Hash) -> Self {
        self.key = Some(key_of(&key));
        self
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn key(&self) -> Option<Key> {
        self.key
    }

    pub fn props(&self) -> &Props {
        &self.props
    }
}

impl From<&str> for Element {
    fn from(content: &str) -> Self {
        Element::text(content)
    }
}

impl From<String> for Element {
    fn from(content: String) -> Self {
        Element::text(content)
    }
}
