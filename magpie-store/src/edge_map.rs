// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adjacency storage for one named edge relation.

use std::collections::HashMap;
use std::hash::Hash;

/// Directed edges of a single relation, with payloads on the outbound side
/// and a reverse index for inbound one-hop traversal.
///
/// At most one edge exists per `(from, to)` pair; inserting again replaces
/// the payload.
#[derive(Clone, Debug)]
pub struct EdgeMap<F, T, P = ()> {
    out: HashMap<F, Vec<(T, P)>>,
    inbound: HashMap<T, Vec<F>>,
}

impl<F, T, P> Default for EdgeMap<F, T, P> {
    fn default() -> Self {
        Self {
            out: HashMap::new(),
            inbound: HashMap::new(),
        }
    }
}

impl<F, T, P> EdgeMap<F, T, P>
where
    F: Clone + Eq + Hash,
    T: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge. Returns `true` when a new edge was created, `false`
    /// when an existing edge had its payload replaced.
    pub fn insert(&mut self, from: F, to: T, payload: P) -> bool {
        let targets = self.out.entry(from.clone()).or_default();
        if let Some(slot) = targets.iter_mut().find(|(t, _)| *t == to) {
            slot.1 = payload;
            return false;
        }
        targets.push((to.clone(), payload));
        self.inbound.entry(to).or_default().push(from);
        true
    }

    pub fn contains(&self, from: &F, to: &T) -> bool {
        self.get(from, to).is_some()
    }

    pub fn get(&self, from: &F, to: &T) -> Option<&P> {
        self.out
            .get(from)?
            .iter()
            .find(|(t, _)| t == to)
            .map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, from: &F, to: &T) -> Option<&mut P> {
        self.out
            .get_mut(from)?
            .iter_mut()
            .find(|(t, _)| t == to)
            .map(|(_, p)| p)
    }

    /// One-hop outbound traversal.
    ///
    /// Returns a concrete slice iterator so the borrow is tied to the map,
    /// not to the lookup key.
    pub fn outbound(&self, from: &F) -> std::slice::Iter<'_, (T, P)> {
        self.out
            .get(from)
            .map(|targets| targets.iter())
            .unwrap_or_default()
    }

    /// One-hop inbound traversal.
    pub fn inbound(&self, to: &T) -> std::slice::Iter<'_, F> {
        self.inbound
            .get(to)
            .map(|sources| sources.iter())
            .unwrap_or_default()
    }

    pub fn out_degree(&self, from: &F) -> usize {
        self.out.get(from).map_or(0, Vec::len)
    }

    pub fn in_degree(&self, to: &T) -> usize {
        self.inbound.get(to).map_or(0, Vec::len)
    }

    /// Remove one edge, returning its payload.
    pub fn remove(&mut self, from: &F, to: &T) -> Option<P> {
        let targets = self.out.get_mut(from)?;
        let index = targets.iter().position(|(t, _)| t == to)?;
        let (_, payload) = targets.swap_remove(index);
        if targets.is_empty() {
            self.out.remove(from);
        }
        if let Some(sources) = self.inbound.get_mut(to) {
            sources.retain(|f| f != from);
            if sources.is_empty() {
                self.inbound.remove(to);
            }
        }
        Some(payload)
    }

    /// Remove every edge leaving `from`, returning the removed targets.
    pub fn remove_outbound(&mut self, from: &F) -> Vec<(T, P)> {
        let targets = self.out.remove(from).unwrap_or_default();
        for (to, _) in &targets {
            if let Some(sources) = self.inbound.get_mut(to) {
                sources.retain(|f| f != from);
                if sources.is_empty() {
                    self.inbound.remove(to);
                }
            }
        }
        targets
    }

    /// Remove every edge targeting `to`, returning the removed sources.
    pub fn remove_inbound(&mut self, to: &T) -> Vec<F> {
        let sources = self.inbound.remove(to).unwrap_or_default();
        for from in &sources {
            if let Some(targets) = self.out.get_mut(from) {
                targets.retain(|(t, _)| t != to);
                if targets.is_empty() {
                    self.out.remove(from);
                }
            }
        }
        sources
    }

    /// Iterate every edge of the relation.
    pub fn iter(&self) -> impl Iterator<Item = (&F, &T, &P)> {
        self.out
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |(to, p)| (from, to, p)))
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }
}
