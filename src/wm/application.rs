//! Application Module
//!
//! Decides whether two windows belong to the same application. Used by
//! focus-chain clustering and by hosts for focus-stealing prevention and
//! taskbar grouping.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::wm::group::GroupManager;
use crate::wm::transients::{TransientFor, TransientManager};
use crate::wm::window::{WindowId, WindowRef};

bitflags! {
    /// Relaxations applied to the classifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SameApplicationChecks: u32 {
        /// Treat separator-marked window roles as matching when one of
        /// the windows is currently active.
        const RELAXED_FOR_ACTIVE   = 1 << 0;
        /// Skip the pid and client-leader mismatch rules, for windows of
        /// one app split across processes.
        const ALLOW_CROSS_PROCESS  = 1 << 1;
    }
}

/// Whether windows `a` and `b` belong to the same application.
///
/// First-match-wins rule chain. Positive rules run first (identity,
/// transiency, shared group, shared client leader), then negative ones
/// (different process or machine, different leaders, resource or role
/// mismatch, unknown pid); anything surviving all of them is the same app.
/// Total: unknown ids classify as different applications.
pub fn same_application<W: WindowRef>(
    windows: &HashMap<WindowId, W>,
    transients: &TransientManager,
    groups: &GroupManager,
    a: WindowId,
    b: WindowId,
    active: Option<WindowId>,
    checks: SameApplicationChecks,
) -> bool {
    if a == b {
        return true;
    }
    let (Some(wa), Some(wb)) = (windows.get(&a), windows.get(&b)) else {
        return false;
    };
    let cross = checks.contains(SameApplicationChecks::ALLOW_CROSS_PROCESS);

    if transients.is_transient(a) && transients.has_transient(groups, b, a, true) {
        return true; // a has b as a main window
    }
    if transients.is_transient(b) && transients.has_transient(groups, a, b, true) {
        return true; // b has a as a main window
    }
    if let (Some(ga), Some(gb)) = (groups.group_of(a), groups.group_of(b)) {
        if ga == gb {
            return true;
        }
    }
    // a client leader equal to the window itself is the unset fallback
    let leader_of = |w: &W| w.client_leader().filter(|&l| l != w.id());
    let (la, lb) = (leader_of(wa), leader_of(wb));
    if la.is_some() && la == lb {
        return true;
    }

    if (wa.pid() != wb.pid() && !cross) || wa.client_machine() != wb.client_machine() {
        return false; // different processes
    }
    if la.is_some() && lb.is_some() && la != lb && !cross {
        return false; // different client leaders
    }
    if !resource_match(wa, wb) {
        return false; // different apps
    }
    let relaxed = checks.contains(SameApplicationChecks::RELAXED_FOR_ACTIVE);
    if !window_role_match(windows, transients, groups, a, b, active, relaxed) && !cross {
        return false; // "different" apps
    }
    if wa.pid() == 0 || wb.pid() == 0 {
        // old clients without a pid, consider them different if they
        // were not matched above
        return false;
    }
    true
}

// Resource classes are lowercased at ingestion. Two legacy toolkits set a
// per-window resource class, so their windows are matched on the resource
// name instead.
fn resource_match<W: WindowRef>(a: &W, b: &W) -> bool {
    if a.resource_name() == "xv" && a.resource_class().starts_with("xv") {
        return b.resource_name() == "xv" && b.resource_class().starts_with("xv");
    }
    if a.resource_name() == "mozilla" {
        return b.resource_name() == "mozilla";
    }
    a.resource_class() == b.resource_class()
}

// Non-transient windows with a window role containing '#' are considered
// different applications unless the roles are identical; toolkits stamp
// distinct mainwindows this way, and to the user those "are" different
// apps. With relaxed_for_active, an active window matches anyway, so that
// opening a new mainwindow from inside an app is not treated as stealing.
fn window_role_match<W: WindowRef>(
    windows: &HashMap<WindowId, W>,
    transients: &TransientManager,
    groups: &GroupManager,
    a: WindowId,
    b: WindowId,
    active: Option<WindowId>,
    relaxed_for_active: bool,
) -> bool {
    // compare the outermost non-transient ancestors
    let (a, a_group_transient) = outermost(transients, a);
    let (b, b_group_transient) = outermost(transients, b);
    if a_group_transient || b_group_transient {
        return groups.group_of(a).is_some() && groups.group_of(a) == groups.group_of(b);
    }
    let (Some(wa), Some(wb)) = (windows.get(&a), windows.get(&b)) else {
        return false;
    };
    if wa.window_role().contains('#') && wb.window_role().contains('#') {
        if !relaxed_for_active {
            return a == b;
        }
        if active != Some(a) && active != Some(b) {
            return a == b;
        }
        return true;
    }
    true
}

fn outermost(transients: &TransientManager, window: WindowId) -> (WindowId, bool) {
    let mut cur = window;
    let mut hops = 0;
    loop {
        match transients.transient_for(cur) {
            TransientFor::Window(owner) if hops < 20 => {
                cur = owner;
                hops += 1;
            }
            TransientFor::Window(_) => return (cur, false),
            TransientFor::Group => return (cur, true),
            TransientFor::None => return (cur, false),
        }
    }
}
