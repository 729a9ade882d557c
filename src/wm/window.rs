//! Window Module
//!
//! The capability surface any concrete window type exposes to the
//! relationship core, plus a plain in-memory implementation of it.

use bitflags::bitflags;

/// Stable handle of a toplevel window.
///
/// The wrapped value is the native window id. Ids may name windows the
/// manager has never seen (owner hints can point at unmanaged helper
/// windows), so holding a `WindowId` never implies the window is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

/// Virtual desktop id (1-based).
pub type DesktopId = u32;

/// Activity id.
pub type ActivityId = u32;

/// Output/screen id.
pub type ScreenId = u32;

/// Window type, as advertised by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Normal,
    Desktop,
    Dock,
    Dialog,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Notification,
}

bitflags! {
    /// Per-window boolean state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowFlags: u32 {
        const MODAL             = 1 << 0;
        const MINIMIZED         = 1 << 1;
        const HIDDEN            = 1 << 2;
        const SKIP_SWITCHER     = 1 << 3;
        const SKIP_TASKBAR      = 1 << 4;
        const DEMANDS_ATTENTION = 1 << 5;
    }
}

/// Raw owner hint, exactly as the client last requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransientHint {
    /// No owner property at all: not transient.
    #[default]
    Unset,
    /// Property present but naming no specific owner (the whole-group
    /// encoding).
    Root,
    /// Property names a specific window, managed or not.
    Window(WindowId),
}

/// Capability surface of a managed window.
///
/// Graph and chain logic is written once against this trait; each backend
/// implements it for its own window type. Desktop and activity membership
/// use the "empty means all" convention.
pub trait WindowRef {
    fn id(&self) -> WindowId;
    fn kind(&self) -> WindowKind;
    fn flags(&self) -> WindowFlags;

    /// Desktops this window lives on; empty slice means all desktops.
    fn desktops(&self) -> &[DesktopId];
    /// Activities this window lives on; empty slice means all activities.
    fn activities(&self) -> &[ActivityId];
    fn screen(&self) -> ScreenId;

    fn resource_class(&self) -> &str;
    fn resource_name(&self) -> &str;
    fn window_role(&self) -> &str;
    /// Process id, 0 when the client did not advertise one.
    fn pid(&self) -> u32;
    fn client_machine(&self) -> &str;
    /// Client-leader id, if the client set one.
    fn client_leader(&self) -> Option<WindowId>;
    /// Group leader hint, if the client set one.
    fn group_leader(&self) -> Option<WindowId>;
    /// Owner hint, untouched by any sanitizing.
    fn transient_for_hint(&self) -> TransientHint;

    // Mutators driven by the activation selector.
    fn set_minimized(&mut self, minimized: bool);
    fn set_desktops(&mut self, desktops: Vec<DesktopId>);
    fn set_activities(&mut self, activities: Vec<ActivityId>);

    fn is_modal(&self) -> bool {
        self.flags().contains(WindowFlags::MODAL)
    }

    fn is_minimized(&self) -> bool {
        self.flags().contains(WindowFlags::MINIMIZED)
    }

    /// Shown means neither minimized nor hidden by the host.
    fn is_shown(&self) -> bool {
        !self
            .flags()
            .intersects(WindowFlags::MINIMIZED | WindowFlags::HIDDEN)
    }

    fn is_on_all_desktops(&self) -> bool {
        self.desktops().is_empty()
    }

    fn is_on_desktop(&self, desktop: DesktopId) -> bool {
        self.is_on_all_desktops() || self.desktops().contains(&desktop)
    }

    fn is_on_all_activities(&self) -> bool {
        self.activities().is_empty()
    }

    fn is_on_activity(&self, activity: ActivityId) -> bool {
        self.is_on_all_activities() || self.activities().contains(&activity)
    }

    /// Docks, desktops, splashes and the like: windows that are not
    /// regular application toplevels.
    fn is_special_window(&self) -> bool {
        matches!(
            self.kind(),
            WindowKind::Desktop
                | WindowKind::Dock
                | WindowKind::Splash
                | WindowKind::Toolbar
                | WindowKind::Menu
                | WindowKind::Notification
        )
    }

    /// Whether the window participates in focus chains and the switcher.
    fn wants_tab_focus(&self) -> bool {
        matches!(
            self.kind(),
            WindowKind::Normal | WindowKind::Dialog | WindowKind::Utility
        ) && !self.flags().contains(WindowFlags::SKIP_SWITCHER)
    }
}

/// Plain in-memory window, used by tests and by hosts that keep all
/// window state inside the manager.
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub kind: WindowKind,
    pub flags: WindowFlags,
    pub desktops: Vec<DesktopId>,
    pub activities: Vec<ActivityId>,
    pub screen: ScreenId,
    pub resource_class: String,
    pub resource_name: String,
    pub window_role: String,
    pub pid: u32,
    pub client_machine: String,
    pub client_leader: Option<WindowId>,
    pub group_leader: Option<WindowId>,
    pub transient_for_hint: TransientHint,
}

impl Window {
    pub fn new(id: u32) -> Self {
        Self {
            id: WindowId(id),
            kind: WindowKind::Normal,
            flags: WindowFlags::empty(),
            desktops: Vec::new(),
            activities: Vec::new(),
            screen: 0,
            resource_class: String::new(),
            resource_name: String::new(),
            window_role: String::new(),
            pid: 0,
            client_machine: String::new(),
            client_leader: None,
            group_leader: None,
            transient_for_hint: TransientHint::Unset,
        }
    }
}

impl WindowRef for Window {
    fn id(&self) -> WindowId {
        self.id
    }

    fn kind(&self) -> WindowKind {
        self.kind
    }

    fn flags(&self) -> WindowFlags {
        self.flags
    }

    fn desktops(&self) -> &[DesktopId] {
        &self.desktops
    }

    fn activities(&self) -> &[ActivityId] {
        &self.activities
    }

    fn screen(&self) -> ScreenId {
        self.screen
    }

    fn resource_class(&self) -> &str {
        &self.resource_class
    }

    fn resource_name(&self) -> &str {
        &self.resource_name
    }

    fn window_role(&self) -> &str {
        &self.window_role
    }

    fn pid(&self) -> u32 {
        self.pid
    }

    fn client_machine(&self) -> &str {
        &self.client_machine
    }

    fn client_leader(&self) -> Option<WindowId> {
        self.client_leader
    }

    fn group_leader(&self) -> Option<WindowId> {
        self.group_leader
    }

    fn transient_for_hint(&self) -> TransientHint {
        self.transient_for_hint
    }

    fn set_minimized(&mut self, minimized: bool) {
        self.flags.set(WindowFlags::MINIMIZED, minimized);
    }

    fn set_desktops(&mut self, desktops: Vec<DesktopId>) {
        self.desktops = desktops;
    }

    fn set_activities(&mut self, activities: Vec<ActivityId>) {
        self.activities = activities;
    }
}
