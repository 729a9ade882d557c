//! Focus Chain Module
//!
//! One ordered chain of focusable windows per virtual desktop, plus a
//! single cross-desktop most-recently-used chain for the switcher. The
//! recent end of every chain is the back of the Vec; all "next" scans walk
//! from there backward. Duplicate and out-of-order updates are no-ops.

use std::collections::HashMap;

use tracing::debug;

use crate::wm::window::{ActivityId, DesktopId, ScreenId, WindowId, WindowRef};

/// How an update repositions a window in the chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChainChange {
    /// The window was activated: move it to the most-recent end, except
    /// that a minimized window slots in behind the other minimized ones.
    MakeFirst,
    /// Move to the least-recent end unconditionally.
    MakeLast,
    /// Membership reconcile without stealing recency from the active
    /// window.
    Update,
}

/// Per-desktop focus chains and the MRU chain.
pub struct FocusChain {
    desktop_chains: HashMap<DesktopId, Vec<WindowId>>,
    most_recently_used: Vec<WindowId>,
    pub current_desktop: DesktopId,
    pub active_window: Option<WindowId>,
    pub separate_screen_focus: bool,
}

impl FocusChain {
    pub fn new(desktop_count: u32) -> Self {
        let mut desktop_chains = HashMap::new();
        for d in 1..=desktop_count {
            desktop_chains.insert(d, Vec::new());
        }
        Self {
            desktop_chains,
            most_recently_used: Vec::new(),
            current_desktop: 1,
            active_window: None,
            separate_screen_focus: false,
        }
    }

    /// Reconcile a window's position in every chain it belongs to.
    pub fn update<W: WindowRef>(
        &mut self,
        windows: &HashMap<WindowId, W>,
        window: WindowId,
        change: FocusChainChange,
    ) {
        let Some(win) = windows.get(&window) else {
            self.remove(window);
            return;
        };
        if !win.wants_tab_focus() {
            // Doesn't want tab focus, remove it
            self.remove(window);
            return;
        }
        let minimized = win.is_minimized();
        let active = self.active_window;
        if win.is_on_all_desktops() {
            for (&desktop, chain) in self.desktop_chains.iter_mut() {
                if desktop == self.current_desktop
                    && matches!(change, FocusChainChange::MakeFirst | FocusChainChange::MakeLast)
                {
                    Self::apply(windows, chain, window, change, minimized, active);
                } else {
                    // not the current desktop: plain membership insert, so
                    // unviewed desktops don't get surprising reorders
                    Self::apply(windows, chain, window, FocusChainChange::Update, minimized, active);
                }
            }
        } else {
            for (&desktop, chain) in self.desktop_chains.iter_mut() {
                if win.is_on_desktop(desktop) {
                    Self::apply(windows, chain, window, change, minimized, active);
                } else {
                    chain.retain(|&w| w != window);
                }
            }
        }
        Self::apply(windows, &mut self.most_recently_used, window, change, minimized, active);
        debug!(window = window.0, ?change, "focus chain updated");
    }

    fn apply<W: WindowRef>(
        windows: &HashMap<WindowId, W>,
        chain: &mut Vec<WindowId>,
        window: WindowId,
        change: FocusChainChange,
        minimized: bool,
        active: Option<WindowId>,
    ) {
        match change {
            FocusChainChange::MakeFirst => {
                chain.retain(|&w| w != window);
                if minimized {
                    // slot in right behind the most recent minimized
                    // entry, so unminimized windows stay on top
                    for i in (0..chain.len()).rev() {
                        if windows.get(&chain[i]).is_some_and(|w| w.is_minimized()) {
                            chain.insert(i + 1, window);
                            return;
                        }
                    }
                    chain.insert(0, window);
                } else {
                    chain.push(window);
                }
            }
            FocusChainChange::MakeLast => {
                chain.retain(|&w| w != window);
                chain.insert(0, window);
            }
            FocusChainChange::Update => {
                if Some(window) == active {
                    chain.retain(|&w| w != window);
                    chain.push(window);
                } else if !chain.contains(&window) {
                    match active.and_then(|a| chain.iter().position(|&w| w == a)) {
                        // add the window behind the active one
                        Some(pos) => chain.insert(pos, window),
                        None => chain.push(window),
                    }
                }
            }
        }
    }

    /// Strip a window from every chain.
    pub fn remove(&mut self, window: WindowId) {
        for chain in self.desktop_chains.values_mut() {
            chain.retain(|&w| w != window);
        }
        self.most_recently_used.retain(|&w| w != window);
    }

    /// Re-home `window` directly below `reference` in every chain that
    /// contains the reference, or below the reference's same-application
    /// run when the two are unrelated, keeping app windows clustered.
    pub fn move_after<F>(&mut self, window: WindowId, reference: WindowId, same_app: F)
    where
        F: Fn(WindowId, WindowId) -> bool,
    {
        if window == reference {
            return;
        }
        for chain in self
            .desktop_chains
            .values_mut()
            .chain(std::iter::once(&mut self.most_recently_used))
        {
            Self::move_after_in_chain(chain, window, reference, &same_app);
        }
    }

    fn move_after_in_chain<F>(
        chain: &mut Vec<WindowId>,
        window: WindowId,
        reference: WindowId,
        same_app: &F,
    ) where
        F: Fn(WindowId, WindowId) -> bool,
    {
        if !chain.contains(&reference) {
            return;
        }
        chain.retain(|&w| w != window);
        let Some(refpos) = chain.iter().position(|&w| w == reference) else {
            return;
        };
        let mut pos = refpos;
        if !same_app(reference, window) {
            while pos > 0 && same_app(reference, chain[pos - 1]) {
                pos -= 1;
            }
        }
        chain.insert(pos, window);
    }

    /// Best activation candidate on a desktop: the most recent chain entry
    /// that is shown, on the given activity, and (with separate screen
    /// focus) on the given screen.
    pub fn get_for_activation<W: WindowRef>(
        &self,
        windows: &HashMap<WindowId, W>,
        desktop: DesktopId,
        activity: ActivityId,
        screen: Option<ScreenId>,
    ) -> Option<WindowId> {
        self.scan(windows, desktop, activity, screen, None)
    }

    /// Like [`Self::get_for_activation`], excluding `reference`.
    pub fn next_for_desktop<W: WindowRef>(
        &self,
        windows: &HashMap<WindowId, W>,
        reference: WindowId,
        desktop: DesktopId,
        activity: ActivityId,
        screen: Option<ScreenId>,
    ) -> Option<WindowId> {
        self.scan(windows, desktop, activity, screen, Some(reference))
    }

    fn scan<W: WindowRef>(
        &self,
        windows: &HashMap<WindowId, W>,
        desktop: DesktopId,
        activity: ActivityId,
        screen: Option<ScreenId>,
        exclude: Option<WindowId>,
    ) -> Option<WindowId> {
        let chain = self.desktop_chains.get(&desktop)?;
        chain
            .iter()
            .rev()
            .copied()
            .filter(|&w| Some(w) != exclude)
            .find(|&w| {
                windows.get(&w).is_some_and(|win| {
                    win.is_shown()
                        && win.is_on_activity(activity)
                        && match (self.separate_screen_focus, screen) {
                            (true, Some(s)) => win.screen() == s,
                            _ => true,
                        }
                })
            })
    }

    /// The most recently used window overall.
    pub fn first_most_recently_used(&self) -> Option<WindowId> {
        self.most_recently_used.last().copied()
    }

    /// The next entry toward the less-recent end, wrapping around; an
    /// unknown reference starts from the least-recent entry.
    pub fn next_most_recently_used(&self, reference: Option<WindowId>) -> Option<WindowId> {
        if self.most_recently_used.is_empty() {
            return None;
        }
        let index = reference.and_then(|r| self.most_recently_used.iter().position(|&w| w == r));
        match index {
            None => self.most_recently_used.first().copied(),
            Some(0) => self.most_recently_used.last().copied(),
            Some(i) => self.most_recently_used.get(i - 1).copied(),
        }
    }

    pub fn contains(&self, window: WindowId, desktop: DesktopId) -> bool {
        self.desktop_chains
            .get(&desktop)
            .is_some_and(|c| c.contains(&window))
    }

    /// Adjust to a new desktop count, preserving surviving desktops'
    /// chains.
    pub fn resize(&mut self, new_count: u32) {
        self.desktop_chains.retain(|&d, _| d <= new_count);
        for d in 1..=new_count {
            self.desktop_chains.entry(d).or_default();
        }
    }

    /// Chain contents for one desktop, least recent first.
    pub fn chain(&self, desktop: DesktopId) -> &[WindowId] {
        self.desktop_chains
            .get(&desktop)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::window::Window;

    fn arena(ids: &[u32]) -> HashMap<WindowId, Window> {
        ids.iter().map(|&i| (WindowId(i), Window::new(i))).collect()
    }

    #[test]
    fn test_make_first_moves_to_recent_end() {
        let windows = arena(&[1, 2, 3]);
        let mut chain = FocusChain::new(1);
        for id in [1, 2, 3] {
            chain.update(&windows, WindowId(id), FocusChainChange::MakeFirst);
        }
        assert_eq!(chain.chain(1), &[WindowId(1), WindowId(2), WindowId(3)]);

        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        assert_eq!(chain.chain(1), &[WindowId(2), WindowId(3), WindowId(1)]);
    }

    #[test]
    fn test_minimized_make_first_slots_behind_minimized_run() {
        // chain [A, B(minimized), C], C most recent; adding minimized D
        // lands directly after B
        let mut windows = arena(&[1, 2, 3, 4]);
        let mut chain = FocusChain::new(1);
        for id in [1, 2, 3] {
            chain.update(&windows, WindowId(id), FocusChainChange::MakeFirst);
        }
        windows.get_mut(&WindowId(2)).unwrap().set_minimized(true);
        windows.get_mut(&WindowId(4)).unwrap().set_minimized(true);

        chain.update(&windows, WindowId(4), FocusChainChange::MakeFirst);
        assert_eq!(
            chain.chain(1),
            &[WindowId(1), WindowId(2), WindowId(4), WindowId(3)]
        );
    }

    #[test]
    fn test_minimized_make_first_without_other_minimized_goes_last() {
        let mut windows = arena(&[1, 2, 3]);
        let mut chain = FocusChain::new(1);
        for id in [1, 2] {
            chain.update(&windows, WindowId(id), FocusChainChange::MakeFirst);
        }
        windows.get_mut(&WindowId(3)).unwrap().set_minimized(true);
        chain.update(&windows, WindowId(3), FocusChainChange::MakeFirst);
        assert_eq!(chain.chain(1), &[WindowId(3), WindowId(1), WindowId(2)]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let windows = arena(&[1, 2]);
        let mut chain = FocusChain::new(1);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        chain.update(&windows, WindowId(2), FocusChainChange::Update);
        let snapshot = chain.chain(1).to_vec();
        chain.update(&windows, WindowId(2), FocusChainChange::Update);
        assert_eq!(chain.chain(1), snapshot.as_slice());
    }

    #[test]
    fn test_update_inserts_behind_active() {
        let windows = arena(&[1, 2]);
        let mut chain = FocusChain::new(1);
        chain.active_window = Some(WindowId(1));
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        chain.update(&windows, WindowId(2), FocusChainChange::Update);
        assert_eq!(chain.chain(1), &[WindowId(2), WindowId(1)]);
    }

    #[test]
    fn test_remove_and_readd_restores_single_occurrence() {
        let windows = arena(&[1, 2]);
        let mut chain = FocusChain::new(2);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        chain.remove(WindowId(1));
        assert!(chain.chain(1).is_empty());
        chain.update(&windows, WindowId(1), FocusChainChange::Update);
        // on all desktops, so present exactly once per chain
        assert_eq!(chain.chain(1), &[WindowId(1)]);
        assert_eq!(chain.chain(2), &[WindowId(1)]);
        assert_eq!(chain.first_most_recently_used(), Some(WindowId(1)));
    }

    #[test]
    fn test_single_desktop_window_leaves_other_chains() {
        let mut windows = arena(&[1]);
        let mut chain = FocusChain::new(2);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        assert!(chain.contains(WindowId(1), 1));
        assert!(chain.contains(WindowId(1), 2));

        windows.get_mut(&WindowId(1)).unwrap().desktops = vec![2];
        chain.update(&windows, WindowId(1), FocusChainChange::Update);
        assert!(!chain.contains(WindowId(1), 1));
        assert!(chain.contains(WindowId(1), 2));
    }

    #[test]
    fn test_skip_switcher_window_is_stripped() {
        let mut windows = arena(&[1]);
        let mut chain = FocusChain::new(1);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        windows
            .get_mut(&WindowId(1))
            .unwrap()
            .flags
            .insert(crate::wm::window::WindowFlags::SKIP_SWITCHER);
        chain.update(&windows, WindowId(1), FocusChainChange::Update);
        assert!(chain.chain(1).is_empty());
        assert!(chain.first_most_recently_used().is_none());
    }

    #[test]
    fn test_get_for_activation_skips_hidden() {
        let mut windows = arena(&[1, 2]);
        let mut chain = FocusChain::new(1);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        chain.update(&windows, WindowId(2), FocusChainChange::MakeFirst);
        windows.get_mut(&WindowId(2)).unwrap().set_minimized(true);

        assert_eq!(chain.get_for_activation(&windows, 1, 0, None), Some(WindowId(1)));
        windows.get_mut(&WindowId(1)).unwrap().set_minimized(true);
        assert_eq!(chain.get_for_activation(&windows, 1, 0, None), None);
    }

    #[test]
    fn test_get_for_activation_honors_separate_screen_focus() {
        let mut windows = arena(&[1, 2]);
        windows.get_mut(&WindowId(1)).unwrap().screen = 0;
        windows.get_mut(&WindowId(2)).unwrap().screen = 1;
        let mut chain = FocusChain::new(1);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        chain.update(&windows, WindowId(2), FocusChainChange::MakeFirst);

        assert_eq!(chain.get_for_activation(&windows, 1, 0, Some(0)), Some(WindowId(2)));
        chain.separate_screen_focus = true;
        assert_eq!(chain.get_for_activation(&windows, 1, 0, Some(0)), Some(WindowId(1)));
    }

    #[test]
    fn test_next_for_desktop_excludes_reference() {
        let windows = arena(&[1, 2]);
        let mut chain = FocusChain::new(1);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        chain.update(&windows, WindowId(2), FocusChainChange::MakeFirst);
        assert_eq!(
            chain.next_for_desktop(&windows, WindowId(2), 1, 0, None),
            Some(WindowId(1))
        );
    }

    #[test]
    fn test_mru_wraps_at_the_ends() {
        let windows = arena(&[1, 2, 3]);
        let mut chain = FocusChain::new(1);
        for id in [1, 2, 3] {
            chain.update(&windows, WindowId(id), FocusChainChange::MakeFirst);
        }
        assert_eq!(chain.first_most_recently_used(), Some(WindowId(3)));
        assert_eq!(chain.next_most_recently_used(Some(WindowId(3))), Some(WindowId(2)));
        assert_eq!(chain.next_most_recently_used(Some(WindowId(2))), Some(WindowId(1)));
        // wrap from the least-recent end back to the most recent
        assert_eq!(chain.next_most_recently_used(Some(WindowId(1))), Some(WindowId(3)));
        // unknown reference starts from the least-recent entry
        assert_eq!(chain.next_most_recently_used(Some(WindowId(9))), Some(WindowId(1)));
        assert_eq!(chain.next_most_recently_used(None), Some(WindowId(1)));
    }

    #[test]
    fn test_move_after_same_application() {
        let windows = arena(&[1, 2, 3]);
        let mut chain = FocusChain::new(1);
        for id in [1, 2, 3] {
            chain.update(&windows, WindowId(id), FocusChainChange::MakeFirst);
        }
        // all same app: 1 lands directly below 3
        chain.move_after(WindowId(1), WindowId(3), |_, _| true);
        assert_eq!(chain.chain(1), &[WindowId(2), WindowId(1), WindowId(3)]);
    }

    #[test]
    fn test_move_after_clusters_below_same_app_run() {
        let windows = arena(&[1, 2, 3]);
        let mut chain = FocusChain::new(1);
        for id in [1, 2, 3] {
            chain.update(&windows, WindowId(id), FocusChainChange::MakeFirst);
        }
        // 2 is the same app as the reference 3; unrelated 1 lands below
        // the whole run
        chain.move_after(WindowId(1), WindowId(3), |a, b| {
            (a.0, b.0) != (3, 1) && (a.0, b.0) != (1, 3)
        });
        assert_eq!(chain.chain(1), &[WindowId(1), WindowId(2), WindowId(3)]);
    }

    #[test]
    fn test_resize_preserves_surviving_chains() {
        let windows = arena(&[1]);
        let mut chain = FocusChain::new(3);
        chain.update(&windows, WindowId(1), FocusChainChange::MakeFirst);
        chain.resize(2);
        assert!(chain.contains(WindowId(1), 1));
        assert!(chain.contains(WindowId(1), 2));
        assert!(!chain.contains(WindowId(1), 3));
        chain.resize(4);
        assert!(chain.chain(4).is_empty());
        assert!(chain.contains(WindowId(1), 1));
    }
}
