//! In-memory compositor used by unit tests

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, anyhow, bail};

use crate::host::{
    ActorId, ActorOps, DisplayOps, IdleId, IdleScheduler, MaximizeFlags, OverlayId, OverlayOps,
    Signal, Subject, SubscriptionId, WindowId, WindowOps, WindowType,
};
use crate::overlay::OverlayStyle;
use crate::types::{Position, Rect, Size};

#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub exists: bool,
    pub window_type: WindowType,
    pub transient: bool,
    pub attached_dialog: bool,
    pub title: Option<String>,
    pub wm_class: Option<String>,
    pub app_id: Option<String>,
    pub fullscreen: bool,
    pub maximize_flags: Option<MaximizeFlags>,
    pub maximized_horizontally: bool,
    pub maximized_vertically: bool,
    pub frame: Rect,
    pub frame_fails: bool,
    pub work_area: Rect,
    pub work_area_fails: bool,
    pub actor: Option<ActorId>,
}

#[derive(Debug, Clone)]
pub struct FakeActor {
    pub allocation: Option<Rect>,
    pub position: Position,
    pub destroyed: bool,
    pub clip_to_allocation: bool,
    pub children: Vec<OverlayId>,
}

#[derive(Debug, Clone)]
pub struct FakeOverlay {
    pub parent: Option<ActorId>,
    pub destroyed: bool,
    pub clip_to_allocation: bool,
    pub position: Position,
    pub size: Size,
    pub visible: bool,
    pub style: Option<OverlayStyle>,
    pub style_writes: usize,
    pub redraws: usize,
    /// Make every mutation of this overlay fail
    pub fail_writes: bool,
}

#[derive(Debug)]
pub struct FakeHost {
    pub windows: BTreeMap<WindowId, FakeWindow>,
    pub actors: BTreeMap<ActorId, FakeActor>,
    pub overlays: BTreeMap<OverlayId, FakeOverlay>,
    pub subscriptions: BTreeMap<SubscriptionId, (Subject, Signal)>,
    pub idle: BTreeSet<IdleId>,
    pub cancelled_idle: Vec<IdleId>,
    pub focus: Option<WindowId>,
    pub primary_work_area: Rect,
    pub primary_work_area_fails: bool,
    next_id: u64,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            windows: BTreeMap::new(),
            actors: BTreeMap::new(),
            overlays: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            idle: BTreeSet::new(),
            cancelled_idle: Vec::new(),
            focus: None,
            primary_work_area: Rect::new(0, 0, 1920, 1080),
            primary_work_area_fails: false,
            next_id: 1,
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// A normal window without an actor yet
    pub fn add_window_without_actor(&mut self, class: &str) -> WindowId {
        let id = WindowId(self.next());
        self.windows.insert(
            id,
            FakeWindow {
                exists: true,
                window_type: WindowType::Normal,
                transient: false,
                attached_dialog: false,
                title: Some(format!("{class} window")),
                wm_class: Some(class.to_string()),
                app_id: None,
                fullscreen: false,
                maximize_flags: None,
                maximized_horizontally: false,
                maximized_vertically: false,
                frame: Rect::default(),
                frame_fails: false,
                work_area: self.primary_work_area,
                work_area_fails: false,
                actor: None,
            },
        );
        id
    }

    /// Give `window` an actor; the frame follows the allocation when there is one
    pub fn attach_actor(&mut self, window: WindowId, allocation: Option<Rect>) -> ActorId {
        let actor = ActorId(self.next());
        let position = allocation.map(|a| Position::new(a.x, a.y)).unwrap_or_default();
        self.actors.insert(
            actor,
            FakeActor {
                allocation,
                position,
                destroyed: false,
                clip_to_allocation: true,
                children: Vec::new(),
            },
        );
        let w = self.window_mut(window);
        w.actor = Some(actor);
        if let Some(rect) = allocation {
            w.frame = rect;
        }
        actor
    }

    /// A normal, fully allocated window
    pub fn add_window(&mut self, class: &str, rect: Rect) -> (WindowId, ActorId) {
        let window = self.add_window_without_actor(class);
        let actor = self.attach_actor(window, Some(rect));
        (window, actor)
    }

    pub fn window_mut(&mut self, window: WindowId) -> &mut FakeWindow {
        self.windows.get_mut(&window).expect("unknown window")
    }

    pub fn actor_mut(&mut self, actor: ActorId) -> &mut FakeActor {
        self.actors.get_mut(&actor).expect("unknown actor")
    }

    pub fn overlay(&self, overlay: OverlayId) -> &FakeOverlay {
        self.overlays.get(&overlay).expect("unknown overlay")
    }

    pub fn overlay_mut(&mut self, overlay: OverlayId) -> &mut FakeOverlay {
        self.overlays.get_mut(&overlay).expect("unknown overlay")
    }

    /// The overlay currently parented under `actor`, if any
    pub fn overlay_of(&self, actor: ActorId) -> Option<OverlayId> {
        self.actors.get(&actor).and_then(|a| a.children.last().copied())
    }

    pub fn create_overlay_for_test(&mut self, actor: ActorId) -> OverlayId {
        self.create_overlay(actor).expect("overlay creation failed")
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_subscribed(&self, subject: Subject, signal: Signal) -> bool {
        self.subscriptions.values().any(|entry| *entry == (subject, signal))
    }

    /// Drain every scheduled idle callback in scheduling order
    pub fn take_idle(&mut self) -> Vec<IdleId> {
        std::mem::take(&mut self.idle).into_iter().collect()
    }

    fn live_overlay(&mut self, overlay: OverlayId) -> Result<&mut FakeOverlay> {
        let node = self
            .overlays
            .get_mut(&overlay)
            .ok_or_else(|| anyhow!("no overlay {overlay}"))?;
        if node.destroyed {
            bail!("overlay {overlay} is destroyed");
        }
        if node.fail_writes {
            bail!("overlay {overlay} rejected the write");
        }
        Ok(node)
    }

    fn window(&self, window: WindowId) -> Option<&FakeWindow> {
        self.windows.get(&window).filter(|w| w.exists)
    }
}

impl WindowOps for FakeHost {
    fn window_exists(&self, window: WindowId) -> bool {
        self.window(window).is_some()
    }

    fn window_type(&self, window: WindowId) -> WindowType {
        self.window(window).map(|w| w.window_type).unwrap_or(WindowType::Other)
    }

    fn is_transient(&self, window: WindowId) -> bool {
        self.window(window).is_some_and(|w| w.transient)
    }

    fn is_attached_dialog(&self, window: WindowId) -> bool {
        self.window(window).is_some_and(|w| w.attached_dialog)
    }

    fn title(&self, window: WindowId) -> Option<String> {
        self.window(window).and_then(|w| w.title.clone())
    }

    fn wm_class(&self, window: WindowId) -> Option<String> {
        self.window(window).and_then(|w| w.wm_class.clone())
    }

    fn app_id(&self, window: WindowId) -> Option<String> {
        self.window(window).and_then(|w| w.app_id.clone())
    }

    fn is_fullscreen(&self, window: WindowId) -> bool {
        self.window(window).is_some_and(|w| w.fullscreen)
    }

    fn maximize_flags(&self, window: WindowId) -> Option<MaximizeFlags> {
        self.window(window).and_then(|w| w.maximize_flags)
    }

    fn maximized_horizontally(&self, window: WindowId) -> bool {
        self.window(window).is_some_and(|w| w.maximized_horizontally)
    }

    fn maximized_vertically(&self, window: WindowId) -> bool {
        self.window(window).is_some_and(|w| w.maximized_vertically)
    }

    fn frame_rect(&self, window: WindowId) -> Result<Rect> {
        match self.window(window) {
            Some(w) if !w.frame_fails => Ok(w.frame),
            _ => bail!("frame rect of {window} unavailable"),
        }
    }

    fn work_area(&self, window: WindowId) -> Result<Rect> {
        match self.window(window) {
            Some(w) if !w.work_area_fails => Ok(w.work_area),
            _ => bail!("work area of {window} unavailable"),
        }
    }

    fn window_actor(&self, window: WindowId) -> Option<ActorId> {
        self.window(window).and_then(|w| w.actor)
    }
}

impl ActorOps for FakeHost {
    fn actor_is_destroyed(&self, actor: ActorId) -> bool {
        self.actors.get(&actor).is_none_or(|a| a.destroyed)
    }

    fn allocation(&self, actor: ActorId) -> Option<Rect> {
        self.actors.get(&actor).and_then(|a| a.allocation)
    }

    fn actor_position(&self, actor: ActorId) -> Position {
        self.actors.get(&actor).map(|a| a.position).unwrap_or_default()
    }

    fn set_clip_to_allocation(&mut self, actor: ActorId, clip: bool) -> Result<()> {
        let node = self.actors.get_mut(&actor).ok_or_else(|| anyhow!("no actor {actor}"))?;
        node.clip_to_allocation = clip;
        Ok(())
    }

    fn create_overlay(&mut self, actor: ActorId) -> Result<OverlayId> {
        if self.actor_is_destroyed(actor) {
            bail!("actor {actor} is destroyed");
        }
        let overlay = OverlayId(self.next());
        self.overlays.insert(
            overlay,
            FakeOverlay {
                parent: Some(actor),
                destroyed: false,
                clip_to_allocation: true,
                position: Position::default(),
                size: Size::default(),
                visible: false,
                style: None,
                style_writes: 0,
                redraws: 0,
                fail_writes: false,
            },
        );
        self.actor_mut(actor).children.push(overlay);
        Ok(overlay)
    }

    fn remove_overlay(&mut self, actor: ActorId, overlay: OverlayId) -> Result<()> {
        let node = self.actors.get_mut(&actor).ok_or_else(|| anyhow!("no actor {actor}"))?;
        node.children.retain(|child| *child != overlay);
        if let Some(o) = self.overlays.get_mut(&overlay) {
            o.parent = None;
        }
        Ok(())
    }
}

impl OverlayOps for FakeHost {
    fn overlay_is_destroyed(&self, overlay: OverlayId) -> bool {
        self.overlays.get(&overlay).is_none_or(|o| o.destroyed)
    }

    fn overlay_parent(&self, overlay: OverlayId) -> Option<ActorId> {
        self.overlays.get(&overlay).and_then(|o| o.parent)
    }

    fn set_overlay_clip_to_allocation(&mut self, overlay: OverlayId, clip: bool) -> Result<()> {
        self.live_overlay(overlay)?.clip_to_allocation = clip;
        Ok(())
    }

    fn set_overlay_position(&mut self, overlay: OverlayId, position: Position) -> Result<()> {
        self.live_overlay(overlay)?.position = position;
        Ok(())
    }

    fn set_overlay_size(&mut self, overlay: OverlayId, width: i32, height: i32) -> Result<()> {
        self.live_overlay(overlay)?.size = Size::new(width, height);
        Ok(())
    }

    fn set_overlay_visible(&mut self, overlay: OverlayId, visible: bool) -> Result<()> {
        self.live_overlay(overlay)?.visible = visible;
        Ok(())
    }

    fn set_overlay_style(&mut self, overlay: OverlayId, style: &OverlayStyle) -> Result<()> {
        let node = self.live_overlay(overlay)?;
        node.style = Some(style.clone());
        node.style_writes += 1;
        Ok(())
    }

    fn queue_overlay_redraw(&mut self, overlay: OverlayId) {
        if let Some(node) = self.overlays.get_mut(&overlay) {
            node.redraws += 1;
        }
    }
}

impl DisplayOps for FakeHost {
    fn windows(&self) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|(_, w)| w.exists && w.actor.is_some())
            .map(|(id, _)| *id)
            .collect()
    }

    fn focus_window(&self) -> Option<WindowId> {
        self.focus
    }

    fn primary_work_area(&self) -> Result<Rect> {
        if self.primary_work_area_fails {
            bail!("no primary monitor");
        }
        Ok(self.primary_work_area)
    }

    fn connect(&mut self, subject: Subject, signal: Signal) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.next());
        self.subscriptions.insert(id, (subject, signal));
        Ok(id)
    }

    fn disconnect(&mut self, _subject: Subject, id: SubscriptionId) {
        self.subscriptions.remove(&id);
    }
}

impl IdleScheduler for FakeHost {
    fn schedule_idle(&mut self) -> IdleId {
        let id = IdleId(self.next());
        self.idle.insert(id);
        id
    }

    fn cancel_idle(&mut self, id: IdleId) {
        self.idle.remove(&id);
        self.cancelled_idle.push(id);
    }
}
