//! cohort-wm
//!
//! The window-relationship and activation-selection core of a window
//! manager: window groups, the main/transient graph, per-desktop and
//! most-recently-used focus chains, and the algorithms that decide which
//! window becomes active after a structural event (close, desktop or
//! activity switch, new transient, minimize).
//!
//! The core is windowing-system agnostic: concrete window types implement
//! the [`wm::window::WindowRef`] capability trait, and all graph and chain
//! logic is written once against it. Compositing, decoration, stacking and
//! wire-protocol handling live in the host, behind the
//! [`wm::WorkspaceHooks`] and [`wm::PolicyFilter`] traits.

pub mod wm;

pub use wm::application::{SameApplicationChecks, same_application};
pub use wm::focus_chain::{FocusChain, FocusChainChange};
pub use wm::group::{Group, GroupId, GroupManager};
pub use wm::settings::{ActivationDesktopPolicy, FocusPolicy, WindowManagerSettings};
pub use wm::transients::{TransientFor, TransientManager};
pub use wm::window::{
    ActivityId, DesktopId, ScreenId, TransientHint, Window, WindowFlags, WindowId, WindowKind,
    WindowRef,
};
pub use wm::{
    FocusUpdatesBlocker, NoPolicy, NullHooks, PolicyFilter, WindowManager, WorkspaceHooks,
};
