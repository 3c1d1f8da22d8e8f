//! The route overlay drawn from the user to a selected camp.
//!
//! At most one route exists per map. A route is an owned resource: the slot
//! hands out a [`RouteHandle`] when a route is requested and gives the previous
//! handle back so it can be removed from the map before the next one is drawn.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camp::CampId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(u64);

impl RouteId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "route-{}", self.0)
    }
}

/// Ownership of one drawn (or requested) route. Not `Clone`: a route is
/// released exactly once, by consuming its handle.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a route handle must be released through the map capability"]
pub struct RouteHandle {
    id: RouteId,
    camp_id: CampId,
}

impl RouteHandle {
    #[must_use]
    pub const fn id(&self) -> RouteId {
        self.id
    }

    #[must_use]
    pub const fn camp_id(&self) -> CampId {
        self.camp_id
    }

    /// Gives up the handle, returning the id the map needs to remove the route.
    #[must_use]
    pub fn release(self) -> RouteId {
        debug!(route_id = %self.id, camp_id = self.camp_id, "route released");
        self.id
    }
}

/// Length and travel time reported by the routing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteState {
    Requested,
    Shown(RouteSummary),
}

#[derive(Debug)]
struct ActiveRoute {
    handle: RouteHandle,
    state: RouteState,
}

#[derive(Debug, Default)]
pub struct RouteSlot {
    next_id: u64,
    active: Option<ActiveRoute>,
}

impl RouteSlot {
    /// Starts a new route to `camp_id`.
    ///
    /// Returns the id of the new route and the handle of the route it
    /// replaces, if any. The caller releases the old handle before drawing.
    pub fn acquire(&mut self, camp_id: CampId) -> (RouteId, Option<RouteHandle>) {
        self.next_id += 1;
        let id = RouteId(self.next_id);
        let previous = self.active.replace(ActiveRoute {
            handle: RouteHandle { id, camp_id },
            state: RouteState::Requested,
        });
        debug!(route_id = %id, camp_id, replaced = previous.is_some(), "route acquired");
        (id, previous.map(|a| a.handle))
    }

    /// Takes the active route out of the slot, leaving it empty.
    pub fn release(&mut self) -> Option<RouteHandle> {
        self.active.take().map(|a| a.handle)
    }

    #[must_use]
    pub fn is_current(&self, id: RouteId) -> bool {
        self.active.as_ref().is_some_and(|a| a.handle.id == id)
    }

    /// Records the drawn route. Returns `false` for an outcome of a route that
    /// is no longer active, which the caller ignores.
    pub fn mark_shown(&mut self, id: RouteId, summary: RouteSummary) -> bool {
        match self.active.as_mut() {
            Some(active) if active.handle.id == id => {
                active.state = RouteState::Shown(summary);
                true
            }
            _ => false,
        }
    }

    /// Removes a route whose drawing failed, if it is still the active one.
    pub fn fail(&mut self, id: RouteId) -> Option<RouteHandle> {
        if self.is_current(id) {
            self.release()
        } else {
            None
        }
    }

    #[must_use]
    pub fn camp_id(&self) -> Option<CampId> {
        self.active.as_ref().map(|a| a.handle.camp_id)
    }

    #[must_use]
    pub fn state(&self) -> Option<RouteState> {
        self.active.as_ref().map(|a| a.state)
    }
}
