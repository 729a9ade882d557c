//! Window Manager Module
//!
//! The per-session context owning the window arena and the relationship
//! sub-managers: groups, the transiency graph, and the focus chains. All
//! graph mutation goes through this struct on the manager's event thread;
//! hosts plug in via the [`WindowRef`] trait, a [`PolicyFilter`] and
//! [`WorkspaceHooks`].

pub mod activation;
pub mod application;
pub mod focus_chain;
pub mod group;
pub mod settings;
pub mod transients;
pub mod window;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::wm::application::{SameApplicationChecks, same_application};
use crate::wm::focus_chain::{FocusChain, FocusChainChange};
use crate::wm::group::GroupManager;
use crate::wm::settings::WindowManagerSettings;
use crate::wm::transients::TransientManager;
use crate::wm::window::{ActivityId, DesktopId, TransientHint, WindowId, WindowRef};

/// Pure override functions the core defers to before acting on a
/// requested value. Hosts use this for window rules.
pub trait PolicyFilter<W: WindowRef> {
    fn check_desktops(&self, _window: &W, desktops: Vec<DesktopId>) -> Vec<DesktopId> {
        desktops
    }
    fn check_activities(&self, _window: &W, activities: Vec<ActivityId>) -> Vec<ActivityId> {
        activities
    }
    fn check_minimize(&self, _window: &W, minimize: bool) -> bool {
        minimize
    }
}

/// Pass-through policy.
pub struct NoPolicy;

impl<W: WindowRef> PolicyFilter<W> for NoPolicy {}

/// Host callbacks. The core decides who should be focused and where
/// windows relate; stacking and low-level focus transfer live behind
/// these hooks.
pub trait WorkspaceHooks {
    /// Transiency or group membership of a window changed; the host
    /// should recompute its stacking layer.
    fn layer_changed(&mut self, _window: WindowId) {}
    /// The active window changed; the host performs the focus transfer.
    fn active_window_changed(&mut self, _window: Option<WindowId>) {}
    /// Native parent of an unmanaged window, for resolving owner hints
    /// that point at embedded helper windows.
    fn parent_window(&self, _window: WindowId) -> Option<WindowId> {
        None
    }
}

/// No-op hooks.
pub struct NullHooks;

impl WorkspaceHooks for NullHooks {}

#[derive(Debug, Default)]
struct ActivityUpdatesBlock {
    depth: u32,
    require_transients: bool,
}

/// The one context struct per manager session.
pub struct WindowManager<W: WindowRef> {
    pub windows: HashMap<WindowId, W>,
    pub groups: GroupManager,
    pub transients: TransientManager,
    pub focus_chain: FocusChain,
    pub settings: WindowManagerSettings,
    pub policy: Box<dyn PolicyFilter<W>>,
    pub hooks: Box<dyn WorkspaceHooks>,
    pub current_desktop: DesktopId,
    pub current_activity: ActivityId,
    active_window: Option<WindowId>,
    pending_modal_check: Option<WindowId>,
    block_focus: u32,
    pending_focus_update: bool,
    blocked_activity_updates: HashMap<WindowId, ActivityUpdatesBlock>,
}

impl<W: WindowRef> WindowManager<W> {
    pub fn new(settings: WindowManagerSettings) -> Self {
        let mut focus_chain = FocusChain::new(settings.desktop_count);
        focus_chain.separate_screen_focus = settings.separate_screen_focus;
        Self {
            windows: HashMap::new(),
            groups: GroupManager::new(),
            transients: TransientManager::new(),
            focus_chain,
            settings,
            policy: Box::new(NoPolicy),
            hooks: Box::new(NullHooks),
            current_desktop: 1,
            current_activity: 0,
            active_window: None,
            pending_modal_check: None,
            block_focus: 0,
            pending_focus_update: false,
            blocked_activity_updates: HashMap::new(),
        }
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.active_window
    }

    /// Start managing a window: rebuild its relationships from its live
    /// properties. Managing an already-managed window is a no-op.
    pub fn manage(&mut self, window: W) {
        let id = window.id();
        if self.windows.contains_key(&id) {
            warn!(window = id.0, "window already managed");
            return;
        }
        self.windows.insert(id, window);
        self.transients.register(id);
        if let Some(g) = self.groups.find_by_leader(id) {
            self.groups.got_leader(g, id);
        }
        self.read_transient(id);
        let modal = self.transients.check_group(
            &mut self.groups,
            &self.windows,
            id,
            None,
            false,
            self.active_window,
        );
        if modal {
            self.pending_modal_check = self.active_window;
        }
        self.check_transients_of(id);
        self.focus_chain
            .update(&self.windows, id, FocusChainChange::Update);
        self.check_active_modal();
        self.hooks.layer_changed(id);
        debug!(window = id.0, "managed window");
    }

    /// Stop managing a window: detach it everywhere, re-home its
    /// transients, and pick a replacement if it was active.
    pub fn release(&mut self, window: WindowId) {
        if !self.windows.contains_key(&window) {
            warn!(window = window.0, "release of unmanaged window");
            return;
        }
        let was_active = self.active_window == Some(window);
        // snapshot before the edges are severed
        let orphans = self.transients.children(window).to_vec();
        let former_mains = self.transients.main_clients(&self.groups, window);

        self.focus_chain.remove(window);
        self.groups.lost_leader_window(window);
        self.transients.clean_grouping(&mut self.groups, window);
        self.windows.remove(&window);
        self.blocked_activity_updates.remove(&window);
        if self.pending_modal_check == Some(window) {
            self.pending_modal_check = None;
        }
        // re-home children against their original hints; an orphan whose
        // hint now names an unmanaged window downgrades to group transient
        for orphan in orphans {
            if self.windows.contains_key(&orphan) {
                self.read_transient(orphan);
                self.hooks.layer_changed(orphan);
            }
        }
        if was_active {
            self.activate_next_window_for(Some(window), &former_mains);
        }
        self.check_active_modal();
        debug!(window = window.0, "released window");
    }

    /// Re-read a window's owner hint and apply the sanitized result.
    pub fn read_transient(&mut self, window: WindowId) {
        let (hint, target) = {
            let Some(win) = self.windows.get(&window) else {
                return;
            };
            let hint = win.transient_for_hint();
            let hooks = &self.hooks;
            let target = self.transients.verify_transient_for(&self.windows, win, hint, |w| {
                hooks.parent_window(w)
            });
            (hint, target)
        };
        self.transients.set_original_hint(window, hint);
        let modal = self.transients.set_transient(
            &mut self.groups,
            &self.windows,
            window,
            target,
            self.active_window,
        );
        if modal {
            self.pending_modal_check = self.active_window;
        }
    }

    // A newly mapped window may be the main window for transients that
    // were downgraded while it was missing; upgrade them back.
    fn check_transients_of(&mut self, mapped: WindowId) {
        let mut candidates: Vec<WindowId> = self
            .windows
            .keys()
            .copied()
            .filter(|&w| {
                w != mapped && self.transients.original_hint(w) == TransientHint::Window(mapped)
            })
            .collect();
        candidates.sort();
        for w in candidates {
            self.read_transient(w);
            self.hooks.layer_changed(w);
        }
    }

    /// Put a window on a set of desktops (empty means all). The policy
    /// filter has the last word; out-of-range desktops are dropped.
    pub fn set_window_desktops(&mut self, window: WindowId, desktops: Vec<DesktopId>) {
        let count = self.settings.desktop_count;
        let (desktops, was_on_all) = {
            let Some(win) = self.windows.get(&window) else {
                return;
            };
            let mut filtered: Vec<DesktopId> = Vec::new();
            for d in desktops {
                if d >= 1 && d <= count && !filtered.contains(&d) {
                    filtered.push(d);
                }
            }
            let filtered = self.policy.check_desktops(win, filtered);
            if win.desktops() == filtered.as_slice() {
                return;
            }
            (filtered, win.is_on_all_desktops())
        };
        let now_on_all = desktops.is_empty();
        if let Some(win) = self.windows.get_mut(&window) {
            win.set_desktops(desktops);
        }
        debug!(window = window.0, "window desktops changed");
        // transients follow their main window's on-all-desktops state
        if was_on_all != now_on_all {
            for c in self.transients.children(window).to_vec() {
                let child_on_all = self
                    .windows
                    .get(&c)
                    .is_some_and(|w| w.is_on_all_desktops());
                if child_on_all != now_on_all {
                    let target = if now_on_all {
                        Vec::new()
                    } else {
                        vec![self.current_desktop]
                    };
                    self.set_window_desktops(c, target);
                }
            }
        }
        self.focus_chain
            .update(&self.windows, window, FocusChainChange::Update);
        if self.active_window == Some(window)
            && !self
                .windows
                .get(&window)
                .is_some_and(|w| w.is_on_desktop(self.current_desktop))
        {
            self.activate_next_window(Some(window));
        }
    }

    /// Put a window on a set of activities (empty means all).
    pub fn set_window_activities(&mut self, window: WindowId, activities: Vec<ActivityId>) {
        let activities = {
            let Some(win) = self.windows.get(&window) else {
                return;
            };
            let activities = self.policy.check_activities(win, activities);
            if win.activities() == activities.as_slice() {
                return;
            }
            activities
        };
        if let Some(win) = self.windows.get_mut(&window) {
            win.set_activities(activities);
        }
        self.update_activities(window, true);
    }

    /// Propagate an activity change: cascade to transients, reposition in
    /// the chains, and re-pick focus if the active window left the current
    /// activity. While updates are blocked for the window, only the
    /// include-transients flag accumulates.
    pub fn update_activities(&mut self, window: WindowId, include_transients: bool) {
        if let Some(block) = self.blocked_activity_updates.get_mut(&window) {
            block.require_transients |= include_transients;
            return;
        }
        if include_transients {
            if let Some(acts) = self.windows.get(&window).map(|w| w.activities().to_vec()) {
                for c in self.transients.children(window).to_vec() {
                    if self
                        .windows
                        .get(&c)
                        .is_some_and(|cw| cw.activities() != acts.as_slice())
                    {
                        self.set_window_activities(c, acts.clone());
                    }
                }
            }
        }
        self.focus_chain
            .update(&self.windows, window, FocusChainChange::MakeFirst);
        if self.active_window == Some(window)
            && !self
                .windows
                .get(&window)
                .is_some_and(|w| w.is_on_activity(self.current_activity))
        {
            self.activate_next_window(Some(window));
        }
    }

    /// Defer (or resume) activity-update propagation for one window.
    /// Nested blocks compose; only the outermost unblock flushes, with the
    /// OR of every deferred request's include-transients flag.
    pub fn block_activity_updates(&mut self, window: WindowId, block: bool) {
        if block {
            self.blocked_activity_updates
                .entry(window)
                .or_default()
                .depth += 1;
        } else {
            let Some(entry) = self.blocked_activity_updates.get_mut(&window) else {
                warn!(window = window.0, "unbalanced activity-updates unblock");
                return;
            };
            entry.depth = entry.depth.saturating_sub(1);
            if entry.depth == 0 {
                let require = entry.require_transients;
                self.blocked_activity_updates.remove(&window);
                self.update_activities(window, require);
            }
        }
    }

    /// Scoped guard deferring focus re-selection; see
    /// [`FocusUpdatesBlocker`].
    pub fn block_focus_updates(&mut self) -> FocusUpdatesBlocker<'_, W> {
        FocusUpdatesBlocker::new(self)
    }

    /// Switch the current desktop and restore focus on it.
    pub fn set_current_desktop(&mut self, desktop: DesktopId) -> bool {
        if desktop < 1 || desktop > self.settings.desktop_count || desktop == self.current_desktop
        {
            return false;
        }
        self.block_focus += 1;
        self.current_desktop = desktop;
        self.focus_chain.current_desktop = desktop;
        self.block_focus -= 1;
        self.activate_window_on_new_desktop(desktop);
        debug!(desktop, "switched desktop");
        true
    }

    /// Switch the current activity and restore focus on it.
    pub fn set_current_activity(&mut self, activity: ActivityId) -> bool {
        if activity == self.current_activity {
            return false;
        }
        self.block_focus += 1;
        self.current_activity = activity;
        self.block_focus -= 1;
        self.activate_window_on_new_activity();
        debug!(activity, "switched activity");
        true
    }

    /// Change the number of virtual desktops, migrating windows stranded
    /// on removed desktops to the last surviving one.
    pub fn set_desktop_count(&mut self, count: u32) {
        let count = count.max(1);
        if count == self.settings.desktop_count {
            return;
        }
        let shrinking = count < self.settings.desktop_count;
        self.settings.desktop_count = count;
        self.focus_chain.resize(count);
        if shrinking {
            let stranded: Vec<(WindowId, Vec<DesktopId>)> = self
                .windows
                .values()
                .filter(|w| {
                    !w.is_on_all_desktops() && w.desktops().iter().any(|&d| d > count)
                })
                .map(|w| {
                    let mut kept: Vec<DesktopId> =
                        w.desktops().iter().copied().filter(|&d| d <= count).collect();
                    if kept.is_empty() {
                        kept.push(count);
                    }
                    (w.id(), kept)
                })
                .collect();
            for (w, d) in stranded {
                self.set_window_desktops(w, d);
            }
            if self.current_desktop > count {
                self.set_current_desktop(count);
            }
        }
        debug!(count, "desktop count changed");
    }

    /// Whether two managed windows belong to the same application.
    pub fn same_application(
        &self,
        a: WindowId,
        b: WindowId,
        checks: SameApplicationChecks,
    ) -> bool {
        same_application(
            &self.windows,
            &self.transients,
            &self.groups,
            a,
            b,
            self.active_window,
            checks,
        )
    }

    /// Re-home a window next to a reference in the focus chains, keeping
    /// windows of one application clustered.
    pub fn move_window_after(&mut self, window: WindowId, reference: WindowId) {
        if !self
            .windows
            .get(&window)
            .is_some_and(|w| w.wants_tab_focus())
        {
            return;
        }
        let windows = &self.windows;
        let transients = &self.transients;
        let groups = &self.groups;
        let active = self.active_window;
        self.focus_chain.move_after(window, reference, |a, b| {
            same_application(
                windows,
                transients,
                groups,
                a,
                b,
                active,
                SameApplicationChecks::empty(),
            )
        });
    }
}

/// RAII guard deferring focus re-selection across a larger operation
/// (session restore, mass close). Nested guards compose; the outermost
/// drop re-picks focus if any selection was deferred meanwhile.
pub struct FocusUpdatesBlocker<'a, W: WindowRef> {
    wm: &'a mut WindowManager<W>,
}

impl<'a, W: WindowRef> FocusUpdatesBlocker<'a, W> {
    fn new(wm: &'a mut WindowManager<W>) -> Self {
        wm.block_focus += 1;
        Self { wm }
    }
}

impl<W: WindowRef> Drop for FocusUpdatesBlocker<'_, W> {
    fn drop(&mut self) {
        self.wm.block_focus = self.wm.block_focus.saturating_sub(1);
        if self.wm.block_focus == 0 && self.wm.pending_focus_update {
            self.wm.pending_focus_update = false;
            self.wm
                .activate_window_on_new_desktop(self.wm.current_desktop);
        }
    }
}

impl<W: WindowRef> Deref for FocusUpdatesBlocker<'_, W> {
    type Target = WindowManager<W>;

    fn deref(&self) -> &Self::Target {
        self.wm
    }
}

impl<W: WindowRef> DerefMut for FocusUpdatesBlocker<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.wm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::window::{Window, WindowFlags, WindowKind};

    fn manager() -> WindowManager<Window> {
        WindowManager::new(WindowManagerSettings::default())
    }

    fn dialog_for(id: u32, owner: u32) -> Window {
        let mut w = Window::new(id);
        w.kind = WindowKind::Dialog;
        w.transient_for_hint = TransientHint::Window(WindowId(owner));
        w
    }

    #[test]
    fn test_manage_is_idempotent() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(Window::new(1));
        assert_eq!(wm.windows.len(), 1);
        assert_eq!(wm.focus_chain.chain(1), &[WindowId(1)]);
    }

    #[test]
    fn test_release_of_unmanaged_window_is_noop() {
        let mut wm = manager();
        wm.release(WindowId(9));
        assert!(wm.windows.is_empty());
    }

    #[test]
    fn test_closing_middle_of_chain_rehomes_transient() {
        // W1 owns W2, W2 owns W3, W3 owns modal W4; closing W2 re-homes
        // W3 as a group transient and W4 stays reachable from W1
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(dialog_for(2, 1));
        wm.manage(dialog_for(3, 2));
        let mut w4 = dialog_for(4, 3);
        w4.flags.insert(WindowFlags::MODAL);
        wm.manage(w4);

        wm.release(WindowId(2));

        assert!(wm.transients.is_group_transient(WindowId(3)));
        assert_eq!(
            wm.transients.main_clients(&wm.groups, WindowId(3)),
            vec![WindowId(1)]
        );
        assert_eq!(
            wm.transients.find_modal(&wm.windows, WindowId(1), false),
            Some(WindowId(4))
        );
    }

    #[test]
    fn test_group_reconciliation_collapses_indirect_edges() {
        // group [A, B (group transient), C (group transient splash)]:
        // C ends directly under B, indirectly under A; B under A only
        let mut wm = manager();
        let mut a = Window::new(1);
        a.group_leader = Some(WindowId(1));
        wm.manage(a);
        let mut b = Window::new(2);
        b.group_leader = Some(WindowId(1));
        b.transient_for_hint = TransientHint::Root;
        wm.manage(b);
        let mut c = Window::new(3);
        c.group_leader = Some(WindowId(1));
        c.kind = WindowKind::Splash;
        wm.manage(c);

        let (a, b, c) = (WindowId(1), WindowId(2), WindowId(3));
        assert_eq!(wm.transients.main_clients(&wm.groups, b), vec![a]);
        assert_eq!(wm.transients.main_clients(&wm.groups, c), vec![b]);
        assert!(wm.transients.has_transient(&wm.groups, a, c, true));
        assert!(!wm.transients.has_transient(&wm.groups, a, c, false));
        assert!(!wm.transients.has_transient(&wm.groups, c, b, true));
    }

    #[test]
    fn test_late_mapping_owner_upgrades_downgraded_transient() {
        // dialog maps before its owner: downgraded to group transient,
        // upgraded back once the owner appears
        let mut wm = manager();
        wm.manage(dialog_for(2, 1));
        assert!(wm.transients.is_group_transient(WindowId(2)));

        wm.manage(Window::new(1));
        assert_eq!(
            wm.transients.main_clients(&wm.groups, WindowId(2)),
            vec![WindowId(1)]
        );
        assert!(!wm.transients.is_group_transient(WindowId(2)));
    }

    #[test]
    fn test_owner_children_edges_stay_symmetric() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(dialog_for(2, 1));
        wm.manage(dialog_for(3, 1));

        for &(owner, child) in &[(1u32, 2u32), (1, 3)] {
            assert!(wm.transients.children(WindowId(owner)).contains(&WindowId(child)));
            assert_eq!(
                wm.transients.main_clients(&wm.groups, WindowId(child)),
                vec![WindowId(owner)]
            );
        }
        wm.release(WindowId(3));
        assert!(!wm.transients.children(WindowId(1)).contains(&WindowId(3)));
    }

    #[test]
    fn test_no_cycles_form_under_hint_rewrites() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(dialog_for(2, 1));
        // window 1 retargets onto its own transient
        if let Some(w) = wm.windows.get_mut(&WindowId(1)) {
            w.transient_for_hint = TransientHint::Window(WindowId(2));
        }
        wm.read_transient(WindowId(1));

        for id in [WindowId(1), WindowId(2)] {
            assert!(!wm.transients.has_transient(&wm.groups, id, id, true));
        }
    }

    #[test]
    fn test_activity_updates_block_flushes_once_with_ored_flag() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(dialog_for(2, 1));

        wm.block_activity_updates(WindowId(1), true);
        if let Some(w) = wm.windows.get_mut(&WindowId(1)) {
            w.activities = vec![1];
        }
        wm.update_activities(WindowId(1), false);
        wm.update_activities(WindowId(1), true);
        wm.update_activities(WindowId(1), false);
        // deferred: the transient has not followed yet
        assert!(wm.windows[&WindowId(2)].activities.is_empty());

        wm.block_activity_updates(WindowId(1), false);
        // one flush, include-transients OR'd to true
        assert_eq!(wm.windows[&WindowId(2)].activities, vec![1]);
    }

    #[test]
    fn test_nested_activity_blocks_compose() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(dialog_for(2, 1));
        wm.block_activity_updates(WindowId(1), true);
        wm.block_activity_updates(WindowId(1), true);
        if let Some(w) = wm.windows.get_mut(&WindowId(1)) {
            w.activities = vec![3];
        }
        wm.update_activities(WindowId(1), true);

        wm.block_activity_updates(WindowId(1), false);
        assert!(
            wm.windows[&WindowId(2)].activities.is_empty(),
            "inner unblock must not flush"
        );
        wm.block_activity_updates(WindowId(1), false);
        assert_eq!(wm.windows[&WindowId(2)].activities, vec![3]);
    }

    #[test]
    fn test_focus_updates_blocker_defers_selection() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(Window::new(2));
        wm.activate_window(Some(WindowId(2)));

        {
            let mut guard = wm.block_focus_updates();
            guard.release(WindowId(2));
            // selection deferred while the guard lives
            assert_eq!(guard.active_window(), None);
        }
        assert_eq!(wm.active_window(), Some(WindowId(1)));
    }

    #[test]
    fn test_desktops_filtered_and_cascaded() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.manage(dialog_for(2, 1));
        // 99 is out of range for the default four desktops
        wm.set_window_desktops(WindowId(1), vec![2, 99, 2]);
        assert_eq!(wm.windows[&WindowId(1)].desktops, vec![2]);
        // the transient follows the main window off the all-desktops state
        assert_eq!(wm.windows[&WindowId(2)].desktops, vec![1]);

        wm.set_window_desktops(WindowId(1), Vec::new());
        assert!(wm.windows[&WindowId(1)].is_on_all_desktops());
        assert!(wm.windows[&WindowId(2)].is_on_all_desktops());
    }

    #[test]
    fn test_shrinking_desktop_count_migrates_windows() {
        let mut wm = manager();
        wm.manage(Window::new(1));
        wm.set_window_desktops(WindowId(1), vec![4]);
        wm.set_current_desktop(4);

        wm.set_desktop_count(2);
        assert_eq!(wm.windows[&WindowId(1)].desktops, vec![2]);
        assert_eq!(wm.current_desktop, 2);
        assert!(!wm.focus_chain.contains(WindowId(1), 4));
    }

    #[test]
    fn test_move_window_after_clusters_same_app() {
        let mut wm = manager();
        for id in 1..=3 {
            let mut w = Window::new(id);
            w.pid = 100;
            w.resource_class = "editor".into();
            w.resource_name = "editor".into();
            w.client_machine = "localhost".into();
            wm.manage(w);
        }
        wm.activate_window(Some(WindowId(3)));
        wm.move_window_after(WindowId(1), WindowId(3));
        assert_eq!(
            wm.focus_chain.chain(1),
            &[WindowId(2), WindowId(1), WindowId(3)]
        );
    }
}
