//! Capability predicates used to filter traversals.
//!
//! A predicate is any `Fn(&ProjectNode) -> bool`. The constructors here fail
//! closed: a node that does not implement a capability simply does not match.

use crate::node::{Capability, ProjectNode};

/// Matches nodes whose kind implements `capability`.
#[must_use]
pub fn implements(capability: Capability) -> impl Fn(&ProjectNode) -> bool + Copy {
    move |node| node.implements(capability)
}

/// Matches nodes that implement `capability` and have it switched on.
#[must_use]
pub fn enabled(capability: Capability) -> impl Fn(&ProjectNode) -> bool + Copy {
    move |node| node.is_enabled(capability)
}

/// Matches nodes producing a Drone step.
#[must_use]
pub fn has_drone_output() -> impl Fn(&ProjectNode) -> bool + Copy {
    enabled(Capability::Drone)
}

/// Matches nodes accepted by both predicates.
pub fn all_of<A, B>(first: A, second: B) -> impl Fn(&ProjectNode) -> bool
where
    A: Fn(&ProjectNode) -> bool,
    B: Fn(&ProjectNode) -> bool,
{
    move |node| first(node) && second(node)
}

/// Matches nodes accepted by either predicate.
pub fn any_of<A, B>(first: A, second: B) -> impl Fn(&ProjectNode) -> bool
where
    A: Fn(&ProjectNode) -> bool,
    B: Fn(&ProjectNode) -> bool,
{
    move |node| first(node) || second(node)
}

/// Inverts a predicate.
pub fn not<P>(predicate: P) -> impl Fn(&ProjectNode) -> bool
where
    P: Fn(&ProjectNode) -> bool,
{
    move |node| !predicate(node)
}
