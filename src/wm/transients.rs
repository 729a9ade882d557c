//! Transients Module
//!
//! The main/transient relationship graph. Owner hints arrive from clients
//! in any state of disrepair (self references, loops, pointers at unmanaged
//! helper windows), so every hint is sanitized into one of three safe
//! states before it touches the graph: not transient, transient for one
//! window, or transient for the whole group. Group transients are folded
//! into the same `children` edges as explicit ones, so consumers walk a
//! single graph.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::wm::group::{GroupId, GroupManager};
use crate::wm::window::{TransientHint, WindowId, WindowKind, WindowRef};

/// Sanitized owner state of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransientFor {
    /// Not transient.
    #[default]
    None,
    /// Transient for one specific managed window.
    Window(WindowId),
    /// Transient for the whole window group.
    Group,
}

/// Hop bound shared by the helper-window ancestor climb and the owner
/// loop detection. Deeper chains are treated as cycles.
const OWNER_CHAIN_LIMIT: usize = 20;

#[derive(Debug, Default)]
struct TransiencyNode {
    transient_for: TransientFor,
    /// The raw hint as last seen, kept so a later mapping of the hinted
    /// window can upgrade a downgraded relationship.
    original_hint: TransientHint,
    /// Windows transient for this one, in attach order. Group transients
    /// appear here too, under every group member they are transient for.
    children: Vec<WindowId>,
}

/// Owner/children edges for all managed windows.
pub struct TransientManager {
    nodes: HashMap<WindowId, TransiencyNode>,
}

impl TransientManager {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Start tracking a window. Idempotent.
    pub fn register(&mut self, window: WindowId) {
        self.nodes.entry(window).or_default();
    }

    pub fn is_transient(&self, window: WindowId) -> bool {
        self.transient_for(window) != TransientFor::None
    }

    pub fn transient_for(&self, window: WindowId) -> TransientFor {
        self.nodes
            .get(&window)
            .map(|n| n.transient_for)
            .unwrap_or_default()
    }

    pub fn is_group_transient(&self, window: WindowId) -> bool {
        self.transient_for(window) == TransientFor::Group
    }

    /// Direct transient children of a window, in attach order.
    pub fn children(&self, window: WindowId) -> &[WindowId] {
        self.nodes
            .get(&window)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn original_hint(&self, window: WindowId) -> TransientHint {
        self.nodes
            .get(&window)
            .map(|n| n.original_hint)
            .unwrap_or_default()
    }

    pub fn set_original_hint(&mut self, window: WindowId, hint: TransientHint) {
        self.nodes.entry(window).or_default().original_hint = hint;
    }

    fn remove_child(&mut self, parent: WindowId, child: WindowId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|&c| c != child);
        }
    }

    /// Attach `child` under `parent`. Returns true when the attach must
    /// trigger a deferred modal re-check: the parent is the most recently
    /// activated window and the child is modal.
    fn attach_child<W: WindowRef>(
        &mut self,
        windows: &HashMap<WindowId, W>,
        parent: WindowId,
        child: WindowId,
        active: Option<WindowId>,
    ) -> bool {
        let node = self.nodes.entry(parent).or_default();
        if !node.children.contains(&child) {
            node.children.push(child);
        }
        active == Some(parent) && windows.get(&child).is_some_and(|c| c.is_modal())
    }

    /// Sanitize a raw owner hint into a safe owner state.
    ///
    /// Splash windows without a hint float above their whole app. A hint
    /// pointing at the window itself, forming a loop, or naming a window
    /// that is not managed (after climbing the native ancestor chain via
    /// `parent_of`, since clients sometimes point at embedded helper
    /// windows) is downgraded to a whole-group relationship rather than
    /// rejected.
    pub fn verify_transient_for<W, F>(
        &self,
        windows: &HashMap<WindowId, W>,
        window: &W,
        hint: TransientHint,
        parent_of: F,
    ) -> TransientFor
    where
        W: WindowRef,
        F: Fn(WindowId) -> Option<WindowId>,
    {
        let mut target = match hint {
            TransientHint::Unset => {
                if window.kind() == WindowKind::Splash {
                    return TransientFor::Group;
                }
                return TransientFor::None;
            }
            TransientHint::Root => return TransientFor::Group,
            TransientHint::Window(id) => id,
        };
        if target == window.id() {
            warn!(window = window.id().0, "owner hint points to itself");
            return TransientFor::Group;
        }
        // The hinted window may be an unmanaged helper embedded in another
        // toplevel. Climb the native tree looking for a managed ancestor.
        let before_search = target;
        let mut hops = 0;
        while !windows.contains_key(&target) && hops < OWNER_CHAIN_LIMIT {
            match parent_of(target) {
                Some(parent) => {
                    target = parent;
                    hops += 1;
                }
                None => break,
            }
        }
        if !windows.contains_key(&target) {
            // transient for a specific window, but that window is not mapped
            return TransientFor::Group;
        }
        if target != before_search {
            debug!(
                window = window.id().0,
                hinted = before_search.0,
                adjusted = target.0,
                "owner hint named a non-toplevel window, adjusted"
            );
        }
        if target == window.id() {
            warn!(window = window.id().0, "owner hint climbs back to itself");
            return TransientFor::Group;
        }
        // Loop detection over the managed owner chain. Group transients
        // cannot cause loops, they are only transient for non-transient
        // windows in the group.
        let mut count = OWNER_CHAIN_LIMIT;
        let mut loop_pos = target;
        loop {
            if loop_pos == window.id() {
                warn!(window = window.id().0, "owner hint causes a loop");
                return TransientFor::Group;
            }
            count -= 1;
            if count == 0 {
                warn!(window = window.id().0, "owner chain too deep, treating as loop");
                return TransientFor::Group;
            }
            match self.transient_for(loop_pos) {
                TransientFor::Window(next) => loop_pos = next,
                _ => break,
            }
        }
        TransientFor::Window(target)
    }

    /// Apply a sanitized owner state, detaching all current owner edges
    /// first. A change of owner re-runs group resolution, since transiency
    /// can move a window into its owner's group. Returns the deferred
    /// modal re-check flag.
    pub fn set_transient<W: WindowRef>(
        &mut self,
        groups: &mut GroupManager,
        windows: &HashMap<WindowId, W>,
        window: WindowId,
        target: TransientFor,
        active: Option<WindowId>,
    ) -> bool {
        if self.transient_for(window) == target {
            return false;
        }
        self.remove_from_main_clients(groups, window);
        self.nodes.entry(window).or_default().transient_for = target;
        let mut modal = false;
        if let TransientFor::Window(owner) = target {
            modal |= self.attach_child(windows, owner, window, active);
        }
        // force, because transiency has changed
        modal |= self.check_group(groups, windows, window, None, true, active);
        modal
    }

    fn remove_from_main_clients(&mut self, groups: &GroupManager, window: WindowId) {
        match self.transient_for(window) {
            TransientFor::None => {}
            TransientFor::Window(owner) => self.remove_child(owner, window),
            TransientFor::Group => {
                if let Some(g) = groups.group_of(window) {
                    for m in groups.members(g).to_vec() {
                        self.remove_child(m, window);
                    }
                }
            }
        }
    }

    /// Resolve which group a window belongs to and move it there.
    ///
    /// Resolution order: an explicitly requested group; the leader hint's
    /// group, except that an explicit owner's group wins over it (a dialog
    /// provided by a different app but transient for this one belongs with
    /// its owner); the owner's group when there is no leader hint; a group
    /// shared with windows of the same client leader; finally a fresh
    /// anonymous group. Membership changes rewire group-transient edges
    /// and end with a reconciliation sweep. Returns the deferred modal
    /// re-check flag.
    pub fn check_group<W: WindowRef>(
        &mut self,
        groups: &mut GroupManager,
        windows: &HashMap<WindowId, W>,
        window: WindowId,
        set_group: Option<GroupId>,
        force: bool,
        active: Option<WindowId>,
    ) -> bool {
        let Some(win) = windows.get(&window) else {
            return false;
        };
        let old_group = groups.group_of(window);
        if let Some(g) = old_group {
            // turn off automatic deleting while we shuffle membership
            groups.ref_group(g);
        }
        let mut modal = false;

        let owner = match self.transient_for(window) {
            TransientFor::Window(o) => Some(o),
            _ => None,
        };
        let target = if let Some(g) = set_group {
            g
        } else if let Some(leader) = win.group_leader() {
            let mut found = groups.find_by_leader(leader);
            if let Some(o) = owner {
                let og = groups.group_of(o);
                if og.is_some() && og != found {
                    found = og;
                }
            }
            match found {
                Some(g) => g,
                None => {
                    let g = groups.create(Some(leader));
                    if windows.contains_key(&leader) {
                        groups.got_leader(g, leader);
                    }
                    g
                }
            }
        } else if let Some(o) = owner {
            // no leader hint, but transient for something: join that group
            match groups.group_of(o) {
                Some(g) => g,
                None => groups.create(None),
            }
        } else {
            // group transient or plain window without a group; try joining
            // windows with the same client leader, then keep the current
            // group (a re-homed orphan stays with its app), then go
            // anonymous
            match self
                .find_client_leader_group(groups, windows, window, active, &mut modal)
                .or(old_group)
            {
                Some(g) => g,
                None => groups.create(None),
            }
        };

        let changed = Some(target) != old_group;
        if changed {
            if let Some(g) = old_group {
                groups.remove_member(g, window);
            }
            groups.add_member(target, window);
        }

        if changed || force {
            // group transients in the old group are no longer transient
            // for this window
            for c in self.children(window).to_vec() {
                if self.is_group_transient(c) && groups.group_of(c) != Some(target) {
                    self.remove_child(window, c);
                }
            }
            if self.is_group_transient(window) {
                if let Some(g) = old_group {
                    for m in groups.members(g).to_vec() {
                        self.remove_child(m, window);
                    }
                }
                // transient only for members mapped before it
                for m in groups.members(target).to_vec() {
                    if m == window {
                        break;
                    }
                    modal |= self.attach_child(windows, m, window, active);
                }
            }
        }

        if let Some(g) = old_group {
            groups.deref_group(g);
        }
        modal |= self.reconcile_group_transients(groups, windows, target, active);
        modal
    }

    /// Find the group used by other windows with the same client leader.
    ///
    /// When the scan turns up two such groups, the app is using group
    /// transients without setting a group for its windows; the extra group
    /// is merged into the first. Windows pinned by an explicit owner or a
    /// leader hint stay where group resolution put them.
    fn find_client_leader_group<W: WindowRef>(
        &mut self,
        groups: &mut GroupManager,
        windows: &HashMap<WindowId, W>,
        window: WindowId,
        active: Option<WindowId>,
        modal: &mut bool,
    ) -> Option<GroupId> {
        let leader = windows.get(&window)?.client_leader()?;
        let mut ret: Option<GroupId> = None;
        let mut ids: Vec<WindowId> = windows.keys().copied().collect();
        ids.sort();
        for id in ids {
            if id == window {
                continue;
            }
            let Some(cand) = windows.get(&id) else {
                continue;
            };
            if cand.client_leader() != Some(leader) {
                continue;
            }
            let Some(cg) = groups.group_of(id) else {
                continue;
            };
            match ret {
                None => ret = Some(cg),
                Some(r) if r == cg => {}
                Some(r) => {
                    debug!(
                        leader = leader.0,
                        "two groups share a client leader, merging"
                    );
                    for m in groups.members(cg).to_vec() {
                        if m == window {
                            continue;
                        }
                        let pinned = windows.get(&m).is_some_and(|w| w.group_leader().is_some())
                            || matches!(self.transient_for(m), TransientFor::Window(_));
                        if pinned {
                            continue;
                        }
                        *modal |= self.check_group(groups, windows, m, Some(r), false, active);
                    }
                }
            }
        }
        ret
    }

    /// Make sure no group transient is considered transient for a window
    /// that is (directly or indirectly) transient for it.
    ///
    /// Sweep over the members in mapping order, applying in turn: (a) a
    /// group transient is stripped from under any member whose owner chain
    /// reaches it, (b) of two mutually reachable group transients only the
    /// later-mapped one stays underneath, (c) a direct edge is collapsed
    /// when an indirect path through a third member already covers it,
    /// (d) splash group transients attach under later-mapped members too.
    pub fn reconcile_group_transients<W: WindowRef>(
        &mut self,
        groups: &GroupManager,
        windows: &HashMap<WindowId, W>,
        group: GroupId,
        active: Option<WindowId>,
    ) -> bool {
        let mut modal = false;
        let members = groups.members(group).to_vec();
        for &t in &members {
            if !self.is_group_transient(t) {
                continue;
            }
            for &m in &members {
                if m == t {
                    continue;
                }
                // (a)
                let mut seen = HashSet::new();
                let mut cur = m;
                while let TransientFor::Window(owner) = self.transient_for(cur) {
                    if owner == t {
                        self.remove_child(m, t);
                        break;
                    }
                    if !seen.insert(cur) {
                        break;
                    }
                    cur = owner;
                }
                // (b)
                if self.is_group_transient(m)
                    && self.has_transient(groups, t, m, true)
                    && self.has_transient(groups, m, t, true)
                {
                    self.remove_child(m, t);
                }
                // (c)
                for &o in &members {
                    if o == t || o == m {
                        continue;
                    }
                    if self.has_transient(groups, m, t, false)
                        && self.has_transient(groups, o, t, false)
                    {
                        if self.has_transient(groups, m, o, true) {
                            self.remove_child(m, t);
                        }
                        if self.has_transient(groups, o, m, true) {
                            self.remove_child(o, t);
                        }
                    }
                }
            }
        }
        // (d)
        for &s in &members {
            if !self.is_group_transient(s) {
                continue;
            }
            if windows.get(&s).map(|w| w.kind()) != Some(WindowKind::Splash) {
                continue;
            }
            for &m in &members {
                if m == s
                    || self.has_transient(groups, m, s, true)
                    || self.has_transient(groups, s, m, true)
                {
                    continue;
                }
                modal |= self.attach_child(windows, m, s, active);
            }
        }
        modal
    }

    /// Whether `window` is (transitively, if `indirect`) transient for
    /// `ancestor`.
    ///
    /// Explicit transients are resolved by climbing the owner chain; a
    /// chain topping out at a group transient switches to a search of
    /// `ancestor`'s children tree within the shared group. Visited sets
    /// keep this correct even while the reconciliation sweep is midway
    /// through untangling malformed state.
    pub fn has_transient(
        &self,
        groups: &GroupManager,
        ancestor: WindowId,
        window: WindowId,
        indirect: bool,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut cur = window;
        loop {
            match self.transient_for(cur) {
                TransientFor::None => return false,
                TransientFor::Window(owner) => {
                    if owner == ancestor {
                        return true;
                    }
                    if !indirect {
                        return false;
                    }
                    if !visited.insert(cur) {
                        return false;
                    }
                    cur = owner;
                }
                TransientFor::Group => break,
            }
        }
        // cur is a group transient; it can only be transient for members
        // of its own group, so search ancestor's children tree inside it
        let group = groups.group_of(cur);
        if group.is_none() || groups.group_of(ancestor) != group {
            return false;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![ancestor];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            if node != ancestor && groups.group_of(node) != group {
                continue;
            }
            let kids = self.children(node);
            if kids.contains(&cur) {
                return true;
            }
            if !indirect {
                return false;
            }
            stack.extend_from_slice(kids);
        }
        false
    }

    /// The windows this one is transient for: its owner, or every group
    /// member it is directly attached under.
    pub fn main_clients(&self, groups: &GroupManager, window: WindowId) -> Vec<WindowId> {
        match self.transient_for(window) {
            TransientFor::None => Vec::new(),
            TransientFor::Window(owner) => vec![owner],
            TransientFor::Group => {
                let Some(g) = groups.group_of(window) else {
                    return Vec::new();
                };
                groups
                    .members(g)
                    .iter()
                    .copied()
                    .filter(|&m| self.has_transient(groups, m, window, false))
                    .collect()
            }
        }
    }

    /// Depth-first search for a modal window, favoring descendants, then
    /// `window` itself if `include_self`.
    pub fn find_modal<W: WindowRef>(
        &self,
        windows: &HashMap<WindowId, W>,
        window: WindowId,
        include_self: bool,
    ) -> Option<WindowId> {
        let mut seen = HashSet::new();
        self.find_modal_inner(windows, window, include_self, &mut seen)
    }

    fn find_modal_inner<W: WindowRef>(
        &self,
        windows: &HashMap<WindowId, W>,
        window: WindowId,
        include_self: bool,
        seen: &mut HashSet<WindowId>,
    ) -> Option<WindowId> {
        if !seen.insert(window) {
            return None;
        }
        for &child in self.children(window) {
            if let Some(found) = self.find_modal_inner(windows, child, true, seen) {
                return Some(found);
            }
        }
        if include_self && windows.get(&window).is_some_and(|w| w.is_modal()) {
            return Some(window);
        }
        None
    }

    /// Detach a window from the graph and its group on unmanage. Children
    /// are left registered with a cleared owner so the caller can re-home
    /// them against their original hints.
    pub fn clean_grouping(&mut self, groups: &mut GroupManager, window: WindowId) {
        match self.transient_for(window) {
            TransientFor::Window(owner) => self.remove_child(owner, window),
            TransientFor::Group => {
                let parents: Vec<WindowId> = self.nodes.keys().copied().collect();
                for p in parents {
                    self.remove_child(p, window);
                }
            }
            TransientFor::None => {}
        }
        for child in self.children(window).to_vec() {
            self.remove_child(window, child);
            if let Some(node) = self.nodes.get_mut(&child) {
                if node.transient_for == TransientFor::Window(window) {
                    node.transient_for = TransientFor::None;
                }
            }
        }
        if let Some(g) = groups.group_of(window) {
            groups.remove_member(g, window);
        }
        self.nodes.remove(&window);
    }
}

impl Default for TransientManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::window::{Window, WindowFlags};

    fn map(
        tm: &mut TransientManager,
        gm: &mut GroupManager,
        windows: &mut HashMap<WindowId, Window>,
        w: Window,
    ) {
        let id = w.id;
        let hint = w.transient_for_hint;
        windows.insert(id, w);
        tm.register(id);
        tm.set_original_hint(id, hint);
        let target = tm.verify_transient_for(windows, &windows[&id], hint, |_| None);
        tm.set_transient(gm, windows, id, target, None);
        tm.check_group(gm, windows, id, None, false, None);
    }

    fn dialog_for(id: u32, owner: u32) -> Window {
        let mut w = Window::new(id);
        w.kind = WindowKind::Dialog;
        w.transient_for_hint = TransientHint::Window(WindowId(owner));
        w
    }

    #[test]
    fn test_unset_hint_is_not_transient() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        map(&mut tm, &mut gm, &mut windows, Window::new(1));
        assert!(!tm.is_transient(WindowId(1)));
        assert!(tm.main_clients(&gm, WindowId(1)).is_empty());
    }

    #[test]
    fn test_splash_without_hint_becomes_group_transient() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        let mut leader = Window::new(1);
        leader.group_leader = Some(WindowId(1));
        let mut splash = Window::new(2);
        splash.kind = WindowKind::Splash;
        splash.group_leader = Some(WindowId(1));
        map(&mut tm, &mut gm, &mut windows, leader);
        map(&mut tm, &mut gm, &mut windows, splash);

        assert!(tm.is_group_transient(WindowId(2)));
        assert_eq!(tm.main_clients(&gm, WindowId(2)), vec![WindowId(1)]);
    }

    #[test]
    fn test_self_hint_downgrades_to_group() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        let mut w = Window::new(1);
        w.transient_for_hint = TransientHint::Window(WindowId(1));
        map(&mut tm, &mut gm, &mut windows, w);
        assert!(tm.is_group_transient(WindowId(1)));
    }

    #[test]
    fn test_hint_naming_unmanaged_window_downgrades_to_group() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        map(&mut tm, &mut gm, &mut windows, dialog_for(1, 99));
        assert!(tm.is_group_transient(WindowId(1)));
    }

    #[test]
    fn test_helper_window_hint_climbs_to_managed_ancestor() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        map(&mut tm, &mut gm, &mut windows, Window::new(1));

        // 50 is an unmanaged helper whose native parent is window 1
        let dialog = dialog_for(2, 50);
        let id = dialog.id;
        let hint = dialog.transient_for_hint;
        windows.insert(id, dialog);
        tm.register(id);
        let target = tm.verify_transient_for(&windows, &windows[&id], hint, |w| {
            (w == WindowId(50)).then_some(WindowId(1))
        });
        assert_eq!(target, TransientFor::Window(WindowId(1)));
    }

    #[test]
    fn test_owner_loop_downgrades_to_group() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        map(&mut tm, &mut gm, &mut windows, Window::new(1));
        map(&mut tm, &mut gm, &mut windows, dialog_for(2, 1));

        // window 1 now claims to be transient for 2, closing the loop
        let w1 = windows.get_mut(&WindowId(1)).unwrap();
        w1.transient_for_hint = TransientHint::Window(WindowId(2));
        let target = tm.verify_transient_for(
            &windows,
            &windows[&WindowId(1)],
            TransientHint::Window(WindowId(2)),
            |_| None,
        );
        assert_eq!(target, TransientFor::Group);
    }

    #[test]
    fn test_transient_joins_owner_group() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        let mut main = Window::new(1);
        main.group_leader = Some(WindowId(1));
        map(&mut tm, &mut gm, &mut windows, main);
        // dialog from a helper process, no group hint of its own
        map(&mut tm, &mut gm, &mut windows, dialog_for(2, 1));

        assert_eq!(gm.group_of(WindowId(2)), gm.group_of(WindowId(1)));
        assert_eq!(tm.main_clients(&gm, WindowId(2)), vec![WindowId(1)]);
        assert_eq!(tm.children(WindowId(1)), &[WindowId(2)]);
    }

    #[test]
    fn test_owner_group_wins_over_leader_hint() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        let mut main = Window::new(1);
        main.group_leader = Some(WindowId(1));
        map(&mut tm, &mut gm, &mut windows, main);

        // dialog provided by a different app, own leader hint, but
        // transient for window 1
        let mut dialog = dialog_for(2, 1);
        dialog.group_leader = Some(WindowId(7));
        map(&mut tm, &mut gm, &mut windows, dialog);

        assert_eq!(gm.group_of(WindowId(2)), gm.group_of(WindowId(1)));
    }

    #[test]
    fn test_group_transient_only_for_earlier_members() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        for id in [1, 2] {
            let mut w = Window::new(id);
            w.group_leader = Some(WindowId(1));
            map(&mut tm, &mut gm, &mut windows, w);
        }
        let mut gt = Window::new(3);
        gt.group_leader = Some(WindowId(1));
        gt.transient_for_hint = TransientHint::Root;
        map(&mut tm, &mut gm, &mut windows, gt);
        let mut later = Window::new(4);
        later.group_leader = Some(WindowId(1));
        map(&mut tm, &mut gm, &mut windows, later);

        let mains = tm.main_clients(&gm, WindowId(3));
        assert_eq!(mains, vec![WindowId(1), WindowId(2)]);
        assert!(tm.has_transient(&gm, WindowId(1), WindowId(3), false));
        assert!(!tm.has_transient(&gm, WindowId(4), WindowId(3), false));
    }

    #[test]
    fn test_splash_attaches_under_later_members_too() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        let mut splash = Window::new(1);
        splash.kind = WindowKind::Splash;
        splash.group_leader = Some(WindowId(1));
        map(&mut tm, &mut gm, &mut windows, splash);
        let mut main = Window::new(2);
        main.group_leader = Some(WindowId(1));
        map(&mut tm, &mut gm, &mut windows, main);

        // mapped after the splash, yet the splash floats above it
        assert!(tm.has_transient(&gm, WindowId(2), WindowId(1), false));
    }

    #[test]
    fn test_indirect_reachability_through_owner_chain() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        map(&mut tm, &mut gm, &mut windows, Window::new(1));
        map(&mut tm, &mut gm, &mut windows, dialog_for(2, 1));
        map(&mut tm, &mut gm, &mut windows, dialog_for(3, 2));

        assert!(tm.has_transient(&gm, WindowId(1), WindowId(3), true));
        assert!(!tm.has_transient(&gm, WindowId(1), WindowId(3), false));
        assert!(tm.has_transient(&gm, WindowId(1), WindowId(2), false));
    }

    #[test]
    fn test_find_modal_prefers_deepest_descendant() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        map(&mut tm, &mut gm, &mut windows, Window::new(1));
        map(&mut tm, &mut gm, &mut windows, dialog_for(2, 1));
        let mut modal = dialog_for(3, 2);
        modal.flags.insert(WindowFlags::MODAL);
        map(&mut tm, &mut gm, &mut windows, modal);

        assert_eq!(tm.find_modal(&windows, WindowId(1), false), Some(WindowId(3)));
        assert_eq!(tm.find_modal(&windows, WindowId(2), false), Some(WindowId(3)));
        assert_eq!(tm.find_modal(&windows, WindowId(3), false), None);
        assert_eq!(tm.find_modal(&windows, WindowId(3), true), Some(WindowId(3)));
    }

    #[test]
    fn test_client_leader_grouping_without_hints() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        let mut a = Window::new(1);
        a.client_leader = Some(WindowId(9));
        map(&mut tm, &mut gm, &mut windows, a);
        let mut b = Window::new(2);
        b.client_leader = Some(WindowId(9));
        map(&mut tm, &mut gm, &mut windows, b);

        assert_eq!(gm.group_of(WindowId(1)), gm.group_of(WindowId(2)));
    }

    #[test]
    fn test_clean_grouping_detaches_everything() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        map(&mut tm, &mut gm, &mut windows, Window::new(1));
        map(&mut tm, &mut gm, &mut windows, dialog_for(2, 1));
        map(&mut tm, &mut gm, &mut windows, dialog_for(3, 2));

        tm.clean_grouping(&mut gm, WindowId(2));
        windows.remove(&WindowId(2));

        assert!(tm.children(WindowId(1)).is_empty());
        assert_eq!(tm.transient_for(WindowId(3)), TransientFor::None);
        assert_eq!(gm.group_of(WindowId(2)), None);
        // the orphan keeps its original hint for later re-homing
        assert_eq!(
            tm.original_hint(WindowId(3)),
            TransientHint::Window(WindowId(2))
        );
    }

    #[test]
    fn test_mutual_group_transients_keep_later_one_below() {
        let mut tm = TransientManager::new();
        let mut gm = GroupManager::new();
        let mut windows = HashMap::new();
        for id in [1, 2] {
            let mut w = Window::new(id);
            w.group_leader = Some(WindowId(1));
            w.transient_for_hint = TransientHint::Root;
            map(&mut tm, &mut gm, &mut windows, w);
        }
        // the later-mapped transient stays below the earlier one, never
        // both ways at once
        let below_1 = tm.has_transient(&gm, WindowId(1), WindowId(2), false);
        let below_2 = tm.has_transient(&gm, WindowId(2), WindowId(1), false);
        assert!(below_1 || below_2);
        assert!(!(below_1 && below_2));
    }
}
