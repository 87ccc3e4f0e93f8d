//! Capability interfaces consumed from the compositor
//!
//! The core never touches compositor objects directly. Windows, actors and
//! overlay nodes are addressed by opaque ids, and every host query or mutation
//! goes through one of the narrow traits below. A concrete compositor binding
//! implements all of them; the blanket [`Host`] trait bundles them for the
//! [`BorderManager`](crate::manager::BorderManager).

use std::fmt;

use anyhow::Result;
use bitflags::bitflags;

use crate::overlay::OverlayStyle;
use crate::types::{Position, Rect};

macro_rules! host_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

host_id!(
    /// Identity of a managed window (not owned by the core)
    WindowId
);
host_id!(
    /// Identity of a window's on-screen actor (borrowed)
    ActorId
);
host_id!(
    /// Identity of an overlay node created by the core
    OverlayId
);
host_id!(SubscriptionId);
host_id!(IdleId);

/// Window type as reported by the window manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Normal,
    Dialog,
    ModalDialog,
    /// Menus, tooltips, docks, splash screens and the like
    Other,
}

bitflags! {
    /// Host maximize bitmask
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MaximizeFlags: u32 {
        const HORIZONTAL = 1;
        const VERTICAL = 2;
        const BOTH = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

/// Object a signal subscription is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// The global display (window creation, focus, work areas)
    Display,
    /// The monitor layout manager
    Layout,
    Window(WindowId),
    Actor(ActorId),
}

/// Named change events the core subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    WindowCreated,
    WorkAreasChanged,
    FocusWindowChanged,
    MonitorsChanged,
    Shown,
    Unmanaged,
    FullscreenChanged,
    WmClassChanged,
    AppIdChanged,
    TitleChanged,
    AppearsFocusedChanged,
    PositionChanged,
    AllocationChanged,
}

/// Everything the host delivers to [`BorderManager::dispatch`](crate::manager::BorderManager::dispatch)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A new window appeared on the display
    WindowCreated(WindowId),
    /// A subscribed signal fired on `subject`
    Signal { subject: Subject, signal: Signal },
    /// A callback scheduled with [`IdleScheduler::schedule_idle`] is due
    Idle(IdleId),
    /// A persisted setting changed
    SettingsChanged { key: String },
    /// The system accent color preference changed
    AccentColorChanged,
}

impl HostEvent {
    pub fn signal(subject: Subject, signal: Signal) -> Self {
        HostEvent::Signal { subject, signal }
    }
}

/// Read access to window state
pub trait WindowOps {
    /// False once the window has been unmanaged and disposed
    fn window_exists(&self, window: WindowId) -> bool;
    fn window_type(&self, window: WindowId) -> WindowType;
    /// The window is transient for another window
    fn is_transient(&self, window: WindowId) -> bool;
    fn is_attached_dialog(&self, window: WindowId) -> bool;
    fn title(&self, window: WindowId) -> Option<String>;
    fn wm_class(&self, window: WindowId) -> Option<String>;
    fn app_id(&self, window: WindowId) -> Option<String>;
    fn is_fullscreen(&self, window: WindowId) -> bool;
    /// `None` when this host version exposes no maximize bitmask
    fn maximize_flags(&self, window: WindowId) -> Option<MaximizeFlags>;
    fn maximized_horizontally(&self, window: WindowId) -> bool;
    fn maximized_vertically(&self, window: WindowId) -> bool;
    fn frame_rect(&self, window: WindowId) -> Result<Rect>;
    /// Work area of the monitor the window is currently on
    fn work_area(&self, window: WindowId) -> Result<Rect>;
    /// The compositor-private actor, if it exists yet
    fn window_actor(&self, window: WindowId) -> Option<ActorId>;
}

/// Access to window actors
pub trait ActorOps {
    fn actor_is_destroyed(&self, actor: ActorId) -> bool;
    /// Current allocation box, `None` before the first allocation
    fn allocation(&self, actor: ActorId) -> Option<Rect>;
    fn actor_position(&self, actor: ActorId) -> Position;
    fn set_clip_to_allocation(&mut self, actor: ActorId, clip: bool) -> Result<()>;
    /// Create a hidden, non-reactive overlay node as the topmost child of `actor`
    fn create_overlay(&mut self, actor: ActorId) -> Result<OverlayId>;
    fn remove_overlay(&mut self, actor: ActorId, overlay: OverlayId) -> Result<()>;
}

/// Mutation of overlay nodes
pub trait OverlayOps {
    fn overlay_is_destroyed(&self, overlay: OverlayId) -> bool;
    fn overlay_parent(&self, overlay: OverlayId) -> Option<ActorId>;
    fn set_overlay_clip_to_allocation(&mut self, overlay: OverlayId, clip: bool) -> Result<()>;
    fn set_overlay_position(&mut self, overlay: OverlayId, position: Position) -> Result<()>;
    fn set_overlay_size(&mut self, overlay: OverlayId, width: i32, height: i32) -> Result<()>;
    fn set_overlay_visible(&mut self, overlay: OverlayId, visible: bool) -> Result<()>;
    fn set_overlay_style(&mut self, overlay: OverlayId, style: &OverlayStyle) -> Result<()>;
    fn queue_overlay_redraw(&mut self, overlay: OverlayId);
}

/// Global display queries and signal plumbing
pub trait DisplayOps {
    /// Every window that currently has an actor
    fn windows(&self) -> Vec<WindowId>;
    fn focus_window(&self) -> Option<WindowId>;
    fn primary_work_area(&self) -> Result<Rect>;
    fn connect(&mut self, subject: Subject, signal: Signal) -> Result<SubscriptionId>;
    fn disconnect(&mut self, subject: Subject, id: SubscriptionId);
}

/// Cooperative idle queue of the host event loop
pub trait IdleScheduler {
    fn schedule_idle(&mut self) -> IdleId;
    fn cancel_idle(&mut self, id: IdleId);
}

/// Everything the sync manager needs from the compositor
pub trait Host: WindowOps + ActorOps + OverlayOps + DisplayOps + IdleScheduler {}

impl<T> Host for T where T: WindowOps + ActorOps + OverlayOps + DisplayOps + IdleScheduler {}
