//! Activation Module
//!
//! Decides which window becomes active after a structural event: explicit
//! activation requests (with modal redirect), replacement picks after a
//! window goes away, desktop and activity switches, and minimize cascades.
//! The host performs the actual focus transfer through
//! [`WorkspaceHooks::active_window_changed`].
//!
//! [`WorkspaceHooks::active_window_changed`]: crate::wm::WorkspaceHooks::active_window_changed

use tracing::{debug, warn};

use crate::wm::WindowManager;
use crate::wm::focus_chain::FocusChainChange;
use crate::wm::settings::ActivationDesktopPolicy;
use crate::wm::window::{DesktopId, WindowId, WindowKind, WindowRef};

impl<W: WindowRef> WindowManager<W> {
    /// Mark a window active and reposition it in the focus chains. This is
    /// the low-level setter; it performs no desktop switching or modal
    /// redirect.
    pub fn set_active_window(&mut self, window: Option<WindowId>) {
        if self.active_window == window {
            return;
        }
        self.active_window = window;
        self.focus_chain.active_window = window;
        if let Some(id) = window {
            self.focus_chain
                .update(&self.windows, id, FocusChainChange::MakeFirst);
            debug!(window = id.0, "active window changed");
        }
        self.hooks.active_window_changed(window);
    }

    /// Activate a window the way a user request would: switch or pull
    /// desktops and activities per policy, unminimize, then request focus.
    /// `None` drops focus to null.
    pub fn activate_window(&mut self, window: Option<WindowId>) {
        self.activate_window_impl(window, false);
    }

    fn activate_window_impl(&mut self, window: Option<WindowId>, force: bool) {
        let Some(id) = window else {
            self.focus_to_null();
            return;
        };
        if !self.windows.contains_key(&id) {
            return;
        }
        let (on_desktop, on_activity, minimized, last_desktop, first_activity) = {
            let win = &self.windows[&id];
            (
                win.is_on_desktop(self.current_desktop),
                win.is_on_activity(self.current_activity),
                win.is_minimized(),
                win.desktops().last().copied(),
                win.activities().first().copied(),
            )
        };
        if !on_desktop {
            self.block_focus += 1;
            match self.settings.activation_desktop_policy {
                ActivationDesktopPolicy::SwitchToOtherDesktop => {
                    if let Some(target) = last_desktop {
                        self.set_current_desktop(target);
                    }
                }
                ActivationDesktopPolicy::BringToCurrentDesktop => {
                    let mut desktops =
                        self.windows.get(&id).map(|w| w.desktops().to_vec()).unwrap_or_default();
                    if !desktops.contains(&self.current_desktop) {
                        desktops.push(self.current_desktop);
                        self.set_window_desktops(id, desktops);
                    }
                }
            }
            self.block_focus -= 1;
        }
        if !on_activity {
            self.block_focus += 1;
            // first isn't necessarily best, but it's easiest
            if let Some(target) = first_activity {
                self.set_current_activity(target);
            }
            self.block_focus -= 1;
        }
        if minimized {
            self.unminimize_window(id);
        }
        if self.settings.focus_policy.is_reasonable() || force {
            self.request_focus_impl(id, force);
        }
    }

    /// Request focus for a window, redirecting to its modal child if it
    /// has one. Returns false when the request was refused or deferred.
    pub fn request_focus(&mut self, window: WindowId) -> bool {
        self.request_focus_impl(window, false)
    }

    fn request_focus_impl(&mut self, window: WindowId, force: bool) -> bool {
        if self.block_focus > 0 && Some(window) != self.active_window {
            // move focus later to avoid flickering
            self.pending_focus_update = true;
            return false;
        }
        if !self.windows.contains_key(&window) {
            self.focus_to_null();
            return true;
        }
        let mut target = window;
        if let Some(modal) = self.transients.find_modal(&self.windows, window, false) {
            if modal != window && self.windows.contains_key(&modal) {
                // the modal gets the interaction anyway; focus it instead
                let owner_desktops = self
                    .windows
                    .get(&window)
                    .map(|w| w.desktops().to_vec())
                    .unwrap_or_default();
                if self
                    .windows
                    .get(&modal)
                    .is_some_and(|m| m.desktops() != owner_desktops.as_slice())
                {
                    self.set_window_desktops(modal, owner_desktops);
                }
                if self.windows.get(&modal).is_some_and(|m| !m.is_shown()) {
                    self.activate_window_impl(Some(modal), force);
                    return true;
                }
                target = modal;
            }
        }
        let Some(win) = self.windows.get(&target) else {
            return false;
        };
        if !force && matches!(win.kind(), WindowKind::Dock | WindowKind::Splash) {
            // docks and splashes don't take focus unless forced
            return false;
        }
        if !win.is_shown() {
            warn!(window = target.0, "focus requested for a hidden window");
            return false;
        }
        self.pending_focus_update = false;
        self.set_active_window(Some(target));
        true
    }

    /// Pick a replacement after `window` stops being activatable (closed,
    /// minimized, moved away). No-op unless it is the active window.
    pub fn activate_next_window(&mut self, window: Option<WindowId>) -> bool {
        let former_mains = window
            .map(|w| self.transients.main_clients(&self.groups, w))
            .unwrap_or_default();
        self.activate_next_window_for(window, &former_mains)
    }

    pub(crate) fn activate_next_window_for(
        &mut self,
        window: Option<WindowId>,
        former_mains: &[WindowId],
    ) -> bool {
        if window.is_some() && window != self.active_window {
            return false;
        }
        if window.is_some() {
            self.set_active_window(None);
        }
        if self.block_focus > 0 {
            self.pending_focus_update = true;
            self.focus_to_null();
            return true;
        }
        if !self.settings.focus_policy.is_reasonable() {
            return false;
        }
        let desktop = self.current_desktop;
        let mut candidate: Option<WindowId> = None;
        // first try to pass the focus to the (former) active window's sole
        // main window
        if let Some(prev) = window {
            if former_mains.len() == 1 && self.is_usable_focus_candidate(former_mains[0], prev) {
                candidate = Some(former_mains[0]);
            }
        }
        if candidate.is_none() {
            // ask the focus chain for the next one
            candidate = match window {
                Some(prev) => self.focus_chain.next_for_desktop(
                    &self.windows,
                    prev,
                    desktop,
                    self.current_activity,
                    None,
                ),
                None => self.focus_chain.get_for_activation(
                    &self.windows,
                    desktop,
                    self.current_activity,
                    None,
                ),
            };
        }
        if candidate.is_none() {
            // last chance: focus the desktop window
            candidate = self.find_desktop_window(desktop);
        }
        match candidate {
            Some(c) => {
                self.request_focus(c);
            }
            None => self.focus_to_null(),
        }
        true
    }

    /// Restore focus after switching to a desktop.
    pub fn activate_window_on_new_desktop(&mut self, desktop: DesktopId) {
        let mut candidate = None;
        if self.settings.focus_policy.is_reasonable() {
            candidate = self.focus_chain.get_for_activation(
                &self.windows,
                desktop,
                self.current_activity,
                None,
            );
        } else if let Some(active) = self.active_window {
            // under pointer-driven policies conserve focus if the active
            // window is still visible here
            if self
                .windows
                .get(&active)
                .is_some_and(|w| w.is_shown() && w.is_on_desktop(desktop))
            {
                candidate = Some(active);
            }
        }
        if candidate.is_none() {
            candidate = self.find_desktop_window(desktop);
        }
        if candidate != self.active_window {
            self.set_active_window(None);
        }
        match candidate {
            Some(c) => {
                self.request_focus(c);
            }
            None => self.focus_to_null(),
        }
    }

    /// Restore focus after switching to an activity.
    pub fn activate_window_on_new_activity(&mut self) {
        let mut candidate = None;
        if self.settings.focus_policy.is_reasonable() {
            candidate = self.focus_chain.get_for_activation(
                &self.windows,
                self.current_desktop,
                self.current_activity,
                None,
            );
        } else if let Some(active) = self.active_window {
            if self
                .windows
                .get(&active)
                .is_some_and(|w| w.is_shown() && w.is_on_activity(self.current_activity))
            {
                candidate = Some(active);
            }
        }
        if candidate.is_none() {
            candidate = self.find_desktop_window(self.current_desktop);
        }
        if candidate != self.active_window {
            self.set_active_window(None);
        }
        match candidate {
            Some(c) => {
                self.request_focus(c);
            }
            None => self.focus_to_null(),
        }
    }

    /// Whether a window may be minimized at all. Special windows can't,
    /// except transients whose main windows are all hidden already.
    pub fn is_minimizable(&self, window: WindowId) -> bool {
        let Some(win) = self.windows.get(&window) else {
            return false;
        };
        let transient = self.transients.is_transient(window);
        if win.is_special_window() && !transient {
            return false;
        }
        if !self.policy.check_minimize(win, true) {
            return false;
        }
        if transient {
            // let secondary windows be minimized along when every main
            // window is hidden already
            let mains = self.transients.main_clients(&self.groups, window);
            let shown_main = mains
                .iter()
                .any(|m| self.windows.get(m).is_some_and(|w| w.is_shown()));
            if !shown_main {
                return true;
            }
        }
        win.wants_tab_focus()
    }

    /// Minimize a window and cascade through its transients.
    pub fn minimize_window(&mut self, window: WindowId) {
        if !self.is_minimizable(window) {
            return;
        }
        if self.windows.get(&window).is_none_or(|w| w.is_minimized()) {
            return;
        }
        if let Some(win) = self.windows.get_mut(&window) {
            win.set_minimized(true);
        }
        debug!(window = window.0, "minimized");
        self.focus_chain
            .update(&self.windows, window, FocusChainChange::MakeFirst);
        if self.active_window == Some(window) {
            self.activate_next_window(Some(window));
        }
        self.update_minimized_of_transients(window);
        self.hooks.layer_changed(window);
    }

    /// Unminimize a window and cascade through its transients.
    pub fn unminimize_window(&mut self, window: WindowId) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if !win.is_minimized() {
            return;
        }
        if self.policy.check_minimize(win, false) {
            // the policy keeps it minimized
            return;
        }
        if let Some(win) = self.windows.get_mut(&window) {
            win.set_minimized(false);
        }
        debug!(window = window.0, "unminimized");
        self.focus_chain
            .update(&self.windows, window, FocusChainChange::MakeFirst);
        self.update_minimized_of_transients(window);
        self.hooks.layer_changed(window);
    }

    /// Cascade a window's minimized state through the transiency graph:
    /// minimizing takes non-modal transients along (modals stay visible,
    /// e.g. to watch progress) and, for a modal, its main windows too;
    /// unminimizing cascades symmetrically without the modal exception.
    pub fn update_minimized_of_transients(&mut self, window: WindowId) {
        let minimized = self
            .windows
            .get(&window)
            .is_some_and(|w| w.is_minimized());
        let children = self.transients.children(window).to_vec();
        let modal = self.windows.get(&window).is_some_and(|w| w.is_modal());
        if minimized {
            for c in children {
                let Some(child) = self.windows.get(&c) else {
                    continue;
                };
                if child.is_modal() {
                    continue;
                }
                if !child.is_minimized() {
                    self.minimize_window(c);
                }
            }
            if modal {
                for m in self.transients.main_clients(&self.groups, window) {
                    self.minimize_window(m);
                }
            }
        } else {
            for c in children {
                if self.windows.get(&c).is_some_and(|w| w.is_minimized()) {
                    self.unminimize_window(c);
                }
            }
            if modal {
                for m in self.transients.main_clients(&self.groups, window) {
                    self.unminimize_window(m);
                }
            }
        }
    }

    /// Resolve a deferred modal re-check: if the most recently activated
    /// window gained a modal transient, activate the modal instead. The
    /// re-check is deferred because the graph may hold temporary loops
    /// while a transient finishes its setup.
    pub fn check_active_modal(&mut self) {
        let Some(check) = self.pending_modal_check else {
            return;
        };
        if Some(check) != self.active_window {
            self.pending_modal_check = None;
            return;
        }
        if let Some(new_modal) = self.transients.find_modal(&self.windows, check, false) {
            if new_modal != check {
                if !self.windows.contains_key(&new_modal) {
                    // postpone until the modal finishes mapping
                    return;
                }
                self.activate_window_impl(Some(new_modal), true);
            }
        }
        self.pending_modal_check = None;
    }

    /// Drop focus entirely; a defined terminal state, not an error.
    pub fn focus_to_null(&mut self) {
        self.set_active_window(None);
    }

    fn is_usable_focus_candidate(&self, candidate: WindowId, prev: WindowId) -> bool {
        if candidate == prev {
            return false;
        }
        self.windows.get(&candidate).is_some_and(|w| {
            w.is_shown()
                && w.is_on_desktop(self.current_desktop)
                && w.is_on_activity(self.current_activity)
                && (!self.focus_chain.separate_screen_focus
                    || match self.windows.get(&prev) {
                        Some(p) => w.screen() == p.screen(),
                        None => true,
                    })
        })
    }

    fn find_desktop_window(&self, desktop: DesktopId) -> Option<WindowId> {
        self.windows
            .values()
            .filter(|w| w.kind() == WindowKind::Desktop && w.is_on_desktop(desktop))
            .map(|w| w.id())
            .min()
    }
}
