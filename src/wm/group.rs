//! Group Module
//!
//! Identity-based window groups with a refcounted, deferred-deletion
//! lifecycle. Groups live in an id-keyed arena and every edge is a plain
//! handle, so cascading teardown can never chase a dangling reference.

use std::collections::HashMap;
use tracing::debug;

use crate::wm::window::WindowId;

/// Stable handle of a window group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u32);

/// A cluster of windows sharing a common leader.
///
/// Destroyed exactly when it has no members and no outstanding refs; a
/// `ref`/`deref` pair pins it alive across multi-step cascades that would
/// otherwise observe it transiently empty.
#[derive(Debug, Default)]
pub struct Group {
    /// Leader id from the client hint; `None` for anonymous groups.
    pub leader: Option<WindowId>,
    /// The managed leader window, if the leader itself is managed.
    pub leader_window: Option<WindowId>,
    /// Members in mapping order. The order is load-bearing: a group
    /// transient is transient only for members mapped before it.
    pub members: Vec<WindowId>,
    refcount: u32,
}

/// Arena of all live groups, indexed by leader id.
pub struct GroupManager {
    groups: HashMap<GroupId, Group>,
    member_of: HashMap<WindowId, GroupId>,
    next_id: u32,
}

impl GroupManager {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            member_of: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn get(&self, group: GroupId) -> Option<&Group> {
        self.groups.get(&group)
    }

    /// Members of a group in mapping order; empty for a stale handle.
    pub fn members(&self, group: GroupId) -> &[WindowId] {
        self.groups
            .get(&group)
            .map(|g| g.members.as_slice())
            .unwrap_or(&[])
    }

    /// The group a window currently belongs to.
    pub fn group_of(&self, window: WindowId) -> Option<GroupId> {
        self.member_of.get(&window).copied()
    }

    pub fn find_by_leader(&self, leader: WindowId) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|(_, g)| g.leader == Some(leader))
            .map(|(&id, _)| id)
    }

    /// Create a new group, lazily claimed by its first member.
    pub fn create(&mut self, leader: Option<WindowId>) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;
        self.groups.insert(
            id,
            Group {
                leader,
                ..Group::default()
            },
        );
        debug!(group = id.0, leader = ?leader, "created group");
        id
    }

    /// Add a window to a group. Re-adding an existing member is a no-op;
    /// mapping order is preserved.
    pub fn add_member(&mut self, group: GroupId, window: WindowId) {
        let Some(g) = self.groups.get_mut(&group) else {
            return;
        };
        if !g.members.contains(&window) {
            g.members.push(window);
            self.member_of.insert(window, group);
        }
    }

    /// Remove a window from a group, destroying the group once it is
    /// empty and unreffed. Removing an absent member is a no-op.
    pub fn remove_member(&mut self, group: GroupId, window: WindowId) {
        let Some(g) = self.groups.get_mut(&group) else {
            return;
        };
        g.members.retain(|&m| m != window);
        if self.member_of.get(&window) == Some(&group) {
            self.member_of.remove(&window);
        }
        self.destroy_if_done(group);
    }

    /// Pin a group alive across a cascade that may empty it.
    pub fn ref_group(&mut self, group: GroupId) {
        if let Some(g) = self.groups.get_mut(&group) {
            g.refcount += 1;
        }
    }

    /// Drop a pin and re-check the destroy condition.
    pub fn deref_group(&mut self, group: GroupId) {
        if let Some(g) = self.groups.get_mut(&group) {
            g.refcount = g.refcount.saturating_sub(1);
        }
        self.destroy_if_done(group);
    }

    /// The leader window of a group has been mapped.
    pub fn got_leader(&mut self, group: GroupId, window: WindowId) {
        if let Some(g) = self.groups.get_mut(&group) {
            g.leader_window = Some(window);
        }
    }

    /// The leader window of a group is gone.
    pub fn lost_leader(&mut self, group: GroupId) {
        if let Some(g) = self.groups.get_mut(&group) {
            g.leader_window = None;
        }
        self.destroy_if_done(group);
    }

    /// Detach `window` from any group it leads.
    pub fn lost_leader_window(&mut self, window: WindowId) {
        let led: Vec<GroupId> = self
            .groups
            .iter()
            .filter(|(_, g)| g.leader_window == Some(window))
            .map(|(&id, _)| id)
            .collect();
        for group in led {
            self.lost_leader(group);
        }
    }

    fn destroy_if_done(&mut self, group: GroupId) {
        let done = self
            .groups
            .get(&group)
            .is_some_and(|g| g.members.is_empty() && g.refcount == 0);
        if done {
            self.groups.remove(&group);
            debug!(group = group.0, "destroyed empty group");
        }
    }
}

impl Default for GroupManager {
    fn default() -> Self {
        Self::new()
    }
}
