//! Window tracking and border synchronization
//!
//! Each window moves through `Untracked -> WaitingForActor ->
//! WaitingForAllocation -> Tracked`. Geometry work never runs inside a host
//! callback: every request cancels the window's previous idle callback and
//! schedules a new one, so bursts of allocation changes collapse into one sync.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::config::engine::REASON_ACCENT;
use crate::config::{ConfigEngine, ResolvedConfig, SettingsStore, WindowIdentity};
use crate::geometry;
use crate::host::{
    ActorId, Host, HostEvent, IdleId, OverlayId, Signal, Subject, WindowId, WindowType,
};
use crate::overlay::{StyleFingerprint, apply_border_state};
use crate::policy;
use crate::subscription::SubscriptionBatch;

/// Per-window lifecycle messages go to info when verbose logging is on
macro_rules! lifecycle {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+)
        } else {
            debug!($($arg)+)
        }
    };
}

const TRACKED_WINDOW_SIGNALS: &[Signal] = &[
    Signal::Unmanaged,
    Signal::FullscreenChanged,
    Signal::WmClassChanged,
    Signal::AppIdChanged,
    Signal::TitleChanged,
    Signal::AppearsFocusedChanged,
    Signal::PositionChanged,
];

/// Where a window is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Untracked,
    WaitingForActor,
    WaitingForAllocation,
    Tracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingStage {
    WaitingForActor,
    WaitingForAllocation(ActorId),
}

#[derive(Debug)]
struct PendingTrack {
    stage: PendingStage,
    subscriptions: SubscriptionBatch,
}

#[derive(Debug)]
struct WindowRecord {
    actor: ActorId,
    overlay: OverlayId,
    config: Rc<ResolvedConfig>,
    fingerprint: Option<StyleFingerprint>,
    subscriptions: SubscriptionBatch,
}

pub struct BorderManager<H: Host, S: SettingsStore> {
    host: H,
    config: ConfigEngine<S>,
    records: HashMap<WindowId, WindowRecord>,
    pending_track: HashMap<WindowId, PendingTrack>,
    pending_syncs: HashMap<WindowId, IdleId>,
    idle_owners: HashMap<IdleId, WindowId>,
    global_subscriptions: SubscriptionBatch,
    last_focused: Option<WindowId>,
    enabled: bool,
}

impl<H: Host, S: SettingsStore> BorderManager<H, S> {
    pub fn new(host: H, config: ConfigEngine<S>) -> Self {
        Self {
            host,
            config,
            records: HashMap::new(),
            pending_track: HashMap::new(),
            pending_syncs: HashMap::new(),
            idle_owners: HashMap::new(),
            global_subscriptions: SubscriptionBatch::new(),
            last_focused: None,
            enabled: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &ConfigEngine<S> {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn track_state(&self, window: WindowId) -> TrackState {
        if self.records.contains_key(&window) {
            return TrackState::Tracked;
        }
        match self.pending_track.get(&window).map(|p| p.stage) {
            Some(PendingStage::WaitingForActor) => TrackState::WaitingForActor,
            Some(PendingStage::WaitingForAllocation(_)) => TrackState::WaitingForAllocation,
            None => TrackState::Untracked,
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.records.len()
    }

    /// Number of windows with a scheduled, not yet run, sync
    pub fn pending_sync_count(&self) -> usize {
        self.pending_syncs.len()
    }

    /// Overlay owned by a tracked window
    pub fn overlay_for(&self, window: WindowId) -> Option<OverlayId> {
        self.records.get(&window).map(|r| r.overlay)
    }

    /// Config currently bound to a tracked window
    pub fn config_for(&self, window: WindowId) -> Option<Rc<ResolvedConfig>> {
        self.records.get(&window).map(|r| Rc::clone(&r.config))
    }

    fn verbose(&self) -> bool {
        self.config.global().verbose_logging
    }

    /// Subscribe to global events and attach to every existing window
    pub fn enable(&mut self) -> Result<()> {
        if self.enabled {
            return Ok(());
        }

        let mut batch = SubscriptionBatch::new();
        let connected = batch
            .connect_all(
                &mut self.host,
                Subject::Display,
                &[
                    Signal::WindowCreated,
                    Signal::WorkAreasChanged,
                    Signal::FocusWindowChanged,
                ],
            )
            .and_then(|()| batch.connect(&mut self.host, Subject::Layout, Signal::MonitorsChanged));
        if let Err(e) = connected {
            batch.disconnect_all(&mut self.host);
            return Err(e).context("Failed to subscribe to display events");
        }

        self.global_subscriptions = batch;
        self.enabled = true;
        self.last_focused = self.host.focus_window();
        self.track_existing();
        info!(
            tracked = self.tracked_count(),
            subscriptions = self.global_subscriptions.len(),
            "Window borders enabled"
        );
        Ok(())
    }

    /// Drop every subscription, pending callback and overlay
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.global_subscriptions.disconnect_all(&mut self.host);
        self.untrack_all();
        self.last_focused = None;
        self.enabled = false;
        info!("Window borders disabled");
    }

    /// Entry point for everything the host delivers; never fails
    pub fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::SettingsChanged { key } => {
                self.config.handle_setting_changed(&key);
                self.retrack_all(&key);
            }
            HostEvent::AccentColorChanged => {
                self.config.handle_accent_changed();
                self.retrack_all(REASON_ACCENT);
            }
            _ if !self.enabled => debug!(?event, "Ignoring event while disabled"),
            HostEvent::WindowCreated(window) => self.track_window(window),
            HostEvent::Idle(id) => self.run_idle(id),
            HostEvent::Signal { subject, signal } => self.handle_signal(subject, signal),
        }
    }

    fn handle_signal(&mut self, subject: Subject, signal: Signal) {
        match (subject, signal) {
            (Subject::Display, Signal::WorkAreasChanged)
            | (Subject::Layout, Signal::MonitorsChanged) => self.resync_all(),
            (Subject::Display, Signal::FocusWindowChanged) => self.handle_focus_changed(),
            (Subject::Window(window), Signal::Shown) => self.handle_shown(window),
            (Subject::Window(window), Signal::Unmanaged) => self.untrack(window),
            (Subject::Window(window), Signal::FullscreenChanged) => self.handle_fullscreen(window),
            (
                Subject::Window(window),
                Signal::WmClassChanged | Signal::AppIdChanged | Signal::TitleChanged,
            ) => self.update_window_config(window),
            (Subject::Window(window), Signal::AppearsFocusedChanged) => self.queue_sync(window),
            (Subject::Window(window), Signal::PositionChanged) => {
                if let Some(record) = self.records.get(&window)
                    && !self.host.overlay_is_destroyed(record.overlay)
                {
                    self.host.queue_overlay_redraw(record.overlay);
                }
            }
            (Subject::Actor(actor), Signal::AllocationChanged) => self.handle_allocation(actor),
            _ => debug!(?subject, ?signal, "Unhandled signal"),
        }
    }

    fn is_interesting(&self, window: WindowId) -> bool {
        let modal_enabled = self.config.global().modal_enabled;
        let type_ok = match self.host.window_type(window) {
            WindowType::Normal | WindowType::Dialog => true,
            WindowType::ModalDialog => modal_enabled,
            WindowType::Other => false,
        };
        if !type_ok {
            return false;
        }
        modal_enabled || !(self.host.is_transient(window) || self.host.is_attached_dialog(window))
    }

    fn track_existing(&mut self) {
        for window in self.host.windows() {
            self.track_window(window);
        }
    }

    /// Start tracking `window`, or wait for its actor to become ready
    pub fn track_window(&mut self, window: WindowId) {
        if !self.host.window_exists(window)
            || self.records.contains_key(&window)
            || self.pending_track.contains_key(&window)
            || !self.is_interesting(window)
        {
            return;
        }

        let Some(actor) = self
            .host
            .window_actor(window)
            .filter(|actor| !self.host.actor_is_destroyed(*actor))
        else {
            self.wait(window, PendingStage::WaitingForActor);
            return;
        };

        if !geometry::content_size(&self.host, actor).is_positive() {
            self.wait(window, PendingStage::WaitingForAllocation(actor));
            return;
        }

        let _ = self
            .start_tracking(window, actor)
            .inspect_err(|e| self.log_window_error(window, e, "Failed to track window"));
    }

    fn wait(&mut self, window: WindowId, stage: PendingStage) {
        let mut subscriptions = SubscriptionBatch::new();
        let connected = match stage {
            PendingStage::WaitingForActor => subscriptions.connect_all(
                &mut self.host,
                Subject::Window(window),
                &[Signal::Shown, Signal::Unmanaged],
            ),
            PendingStage::WaitingForAllocation(actor) => subscriptions
                .connect(&mut self.host, Subject::Actor(actor), Signal::AllocationChanged)
                .and_then(|()| {
                    subscriptions.connect(&mut self.host, Subject::Window(window), Signal::Unmanaged)
                }),
        };

        if let Err(e) = connected {
            subscriptions.disconnect_all(&mut self.host);
            warn!(window = %window, error = %e, "Failed to wait for window");
            return;
        }

        debug!(window = %window, ?stage, "Waiting for window to become ready");
        self.pending_track.insert(window, PendingTrack { stage, subscriptions });
    }

    fn clear_pending_track(&mut self, window: WindowId) {
        if let Some(mut pending) = self.pending_track.remove(&window) {
            pending.subscriptions.disconnect_all(&mut self.host);
        }
    }

    fn start_tracking(&mut self, window: WindowId, actor: ActorId) -> Result<()> {
        let overlay = self
            .host
            .create_overlay(actor)
            .context(format!("Failed to create overlay on actor {}", actor))?;

        let identity = self.identity(window);
        let config = self.config.resolve_for_window(&identity);
        self.records.insert(
            window,
            WindowRecord {
                actor,
                overlay,
                config: Rc::clone(&config),
                fingerprint: None,
                subscriptions: SubscriptionBatch::new(),
            },
        );

        if let Err(e) = self.attach(window, actor, overlay) {
            self.untrack(window);
            return Err(e);
        }

        lifecycle!(
            self.verbose(),
            window = %identity.title.as_deref().unwrap_or("untitled"),
            class = %identity.wm_class.as_deref().unwrap_or("unknown class"),
            margins = ?config.margins,
            radius = ?config.radius,
            "Tracking window"
        );
        self.queue_sync(window);
        Ok(())
    }

    /// Unclip, then subscribe to everything a tracked window needs
    fn attach(&mut self, window: WindowId, actor: ActorId, overlay: OverlayId) -> Result<()> {
        self.host
            .set_clip_to_allocation(actor, false)
            .context("Failed to unclip actor")?;
        self.host
            .set_overlay_clip_to_allocation(overlay, false)
            .context("Failed to unclip overlay")?;

        let Some(record) = self.records.get_mut(&window) else {
            return Ok(());
        };
        record
            .subscriptions
            .connect(&mut self.host, Subject::Actor(actor), Signal::AllocationChanged)?;
        record
            .subscriptions
            .connect_all(&mut self.host, Subject::Window(window), TRACKED_WINDOW_SIGNALS)
    }

    /// Tear down everything held for `window`
    pub fn untrack(&mut self, window: WindowId) {
        self.cancel_sync(window);
        self.clear_pending_track(window);

        let Some(mut record) = self.records.remove(&window) else {
            return;
        };
        if !record.subscriptions.is_empty() {
            debug!(window = %window, count = record.subscriptions.len(), "Disconnecting window signals");
            record.subscriptions.disconnect_all(&mut self.host);
        }

        let attached = !self.host.overlay_is_destroyed(record.overlay)
            && !self.host.actor_is_destroyed(record.actor)
            && self.host.overlay_parent(record.overlay) == Some(record.actor);
        if attached {
            let _ = self
                .host
                .remove_overlay(record.actor, record.overlay)
                .inspect_err(|e| warn!(window = %window, error = %e, "Failed to remove overlay"));
        } else {
            debug!(window = %window, "Overlay already gone, skipping removal");
        }

        lifecycle!(self.verbose(), window = %window, "Untracked window");
    }

    fn untrack_all(&mut self) {
        let mut windows: Vec<WindowId> = self
            .records
            .keys()
            .chain(self.pending_track.keys())
            .chain(self.pending_syncs.keys())
            .copied()
            .collect();
        windows.sort_unstable();
        windows.dedup();
        for window in windows {
            self.untrack(window);
        }
    }

    /// Replace any scheduled sync of `window` with a fresh one
    fn queue_sync(&mut self, window: WindowId) {
        if !self.records.contains_key(&window) {
            return;
        }
        self.cancel_sync(window);
        let id = self.host.schedule_idle();
        self.pending_syncs.insert(window, id);
        self.idle_owners.insert(id, window);
    }

    fn cancel_sync(&mut self, window: WindowId) {
        if let Some(id) = self.pending_syncs.remove(&window) {
            self.idle_owners.remove(&id);
            self.host.cancel_idle(id);
        }
    }

    fn run_idle(&mut self, id: IdleId) {
        let Some(window) = self.idle_owners.remove(&id) else {
            debug!(idle = %id, "Ignoring stale idle callback");
            return;
        };
        self.pending_syncs.remove(&window);
        let _ = self
            .sync_window(window)
            .inspect_err(|e| self.log_window_error(window, e, "Failed to sync border"));
    }

    fn is_live(&self, window: WindowId) -> bool {
        self.records.get(&window).is_some_and(|record| {
            self.host.window_exists(window)
                && !self.host.actor_is_destroyed(record.actor)
                && !self.host.overlay_is_destroyed(record.overlay)
        })
    }

    /// Recompute and apply the border of one tracked window
    fn sync_window(&mut self, window: WindowId) -> Result<()> {
        if !self.is_live(window) {
            debug!(window = %window, "Window disposed before sync, skipping");
            return Ok(());
        }
        let rounding = self.config.global().radius_enabled;
        let Some(record) = self.records.get_mut(&window) else {
            return Ok(());
        };

        let snapshot = geometry::snapshot(&self.host, window, record.actor);
        let state = policy::decide(&snapshot, &record.config, rounding);
        apply_border_state(&mut self.host, record.overlay, &state, &mut record.fingerprint)
    }

    fn handle_shown(&mut self, window: WindowId) {
        if self.track_state(window) == TrackState::WaitingForActor {
            self.clear_pending_track(window);
            self.track_window(window);
        }
    }

    fn handle_allocation(&mut self, actor: ActorId) {
        let tracked = self
            .records
            .iter()
            .find(|(_, r)| r.actor == actor)
            .map(|(&window, _)| window);
        if let Some(window) = tracked {
            self.queue_sync(window);
            return;
        }

        let waiting = self
            .pending_track
            .iter()
            .find(|(_, p)| p.stage == PendingStage::WaitingForAllocation(actor))
            .map(|(&window, _)| window);
        if let Some(window) = waiting
            && geometry::content_size(&self.host, actor).is_positive()
        {
            self.clear_pending_track(window);
            self.track_window(window);
        }
    }

    /// Fullscreen hides at once; leaving fullscreen goes through a normal sync
    fn handle_fullscreen(&mut self, window: WindowId) {
        if !self.host.is_fullscreen(window) {
            self.queue_sync(window);
            return;
        }
        self.cancel_sync(window);
        if let Some(record) = self.records.get_mut(&window)
            && !self.host.overlay_is_destroyed(record.overlay)
        {
            record.fingerprint = None;
            let _ = self
                .host
                .set_overlay_visible(record.overlay, false)
                .inspect_err(|e| warn!(window = %window, error = %e, "Failed to hide overlay"));
        }
    }

    /// Re-resolve after an identity change; resync only if the value differs
    fn update_window_config(&mut self, window: WindowId) {
        if !self.records.contains_key(&window) {
            return;
        }
        let identity = self.identity(window);
        let config = self.config.resolve_for_window(&identity);
        let verbose = self.verbose();
        let Some(record) = self.records.get_mut(&window) else {
            return;
        };
        if *record.config == *config {
            return;
        }

        lifecycle!(
            verbose,
            window = %identity.title.as_deref().unwrap_or("untitled"),
            class = %identity.wm_class.as_deref().unwrap_or("unknown class"),
            margins = ?config.margins,
            radius = ?config.radius,
            "Updated config"
        );
        record.config = config;
        record.fingerprint = None;
        self.queue_sync(window);
    }

    /// Only tracked windows whose actor or overlay died count as stale; focus
    /// moving to or from an untracked window resyncs just the tracked side.
    fn handle_focus_changed(&mut self) {
        let current = self.host.focus_window();
        let previous = self.last_focused;
        self.last_focused = current;

        let stale = [previous, current]
            .into_iter()
            .flatten()
            .any(|w| self.records.contains_key(&w) && !self.is_live(w));
        if stale {
            debug!("Focus change touched a disposed window, resyncing all");
            self.resync_all();
            return;
        }

        for window in [previous, current].into_iter().flatten() {
            self.queue_sync(window);
        }
    }

    fn resync_all(&mut self) {
        let windows: Vec<WindowId> = self.records.keys().copied().collect();
        for window in windows {
            self.queue_sync(window);
        }
    }

    /// Drop every window and discover them again under the new settings
    fn retrack_all(&mut self, reason: &str) {
        if !self.enabled {
            return;
        }
        info!(reason = %reason, "Config changed, retracking all windows");
        self.untrack_all();
        self.last_focused = self.host.focus_window();
        self.track_existing();
    }

    fn identity(&self, window: WindowId) -> WindowIdentity {
        WindowIdentity {
            app_id: self.host.app_id(window),
            wm_class: self.host.wm_class(window),
            title: self.host.title(window),
        }
    }

    fn log_window_error(&self, window: WindowId, err: &anyhow::Error, message: &str) {
        error!(
            window = %self.host.title(window).unwrap_or_else(|| "untitled".to_string()),
            class = %self.host.wm_class(window).unwrap_or_else(|| "unknown class".to_string()),
            error = %format!("{err:#}"),
            "{message}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;
    use crate::constants::{keys, revision};
    use crate::host::MaximizeFlags;
    use crate::testing::FakeHost;
    use crate::types::{BorderWidths, Position, Radius, Rect, Size};

    const TABLE: &str = r#"{
        "@default": {"width": 3},
        "@gtkPreset": {
            "margins": {"top": -22, "right": -25, "bottom": -28, "left": -25},
            "radius": {"tl": 10, "tr": 10, "br": 0, "bl": 0}
        },
        "class:org.gnome.Terminal": "@gtkPreset",
        "class:wide": {"width": 8},
        "class:off": {"enabled": false}
    }"#;

    fn settings() -> MemorySettings {
        let mut settings = MemorySettings::new().with_accent("blue");
        settings.set_string(keys::APP_CONFIGS, TABLE).unwrap();
        settings.set_int(keys::CONFIG_VERSION, revision::CURRENT).unwrap();
        settings
    }

    fn manager_with(host: FakeHost) -> BorderManager<FakeHost, MemorySettings> {
        let mut manager = BorderManager::new(host, ConfigEngine::new(settings()));
        manager.enable().unwrap();
        manager
    }

    /// Deliver every scheduled idle callback, like one turn of the event loop
    fn run_idle(manager: &mut BorderManager<FakeHost, MemorySettings>) -> usize {
        let ids = manager.host_mut().take_idle();
        let count = ids.len();
        for id in ids {
            manager.dispatch(HostEvent::Idle(id));
        }
        count
    }

    fn signal(manager: &mut BorderManager<FakeHost, MemorySettings>, subject: Subject, signal: Signal) {
        manager.dispatch(HostEvent::signal(subject, signal));
    }

    #[test]
    fn test_enable_tracks_existing_windows() {
        let mut host = FakeHost::new();
        let (window, actor) = host.add_window("org.gnome.Terminal", Rect::new(100, 100, 800, 600));
        host.focus = Some(window);
        let mut manager = manager_with(host);

        assert_eq!(manager.track_state(window), TrackState::Tracked);
        assert!(manager.host().is_subscribed(Subject::Display, Signal::WindowCreated));
        assert!(manager.host().is_subscribed(Subject::Layout, Signal::MonitorsChanged));
        assert!(manager.host().is_subscribed(Subject::Actor(actor), Signal::AllocationChanged));
        assert!(manager.host().is_subscribed(Subject::Window(window), Signal::PositionChanged));
        assert!(!manager.host().actors[&actor].clip_to_allocation);

        assert_eq!(run_idle(&mut manager), 1);
        let overlay = manager.host().overlay(manager.overlay_for(window).unwrap()).clone();
        assert!(overlay.visible);
        assert!(!overlay.clip_to_allocation);
        let style = overlay.style.unwrap();
        assert_eq!(style.border_widths, BorderWidths::uniform(3));
        assert_eq!(style.radius, Radius { tl: 10, tr: 10, br: 0, bl: 0 });
        assert_eq!(style.color, "rgba(53, 132, 228, 0.4)");
        assert_eq!(overlay.position, Position::new(22, 19));
        assert_eq!(overlay.size, Size::new(756, 556));
    }

    #[test]
    fn test_window_without_actor_waits_for_shown() {
        let mut manager = manager_with(FakeHost::new());
        let window = manager.host_mut().add_window_without_actor("gedit");
        manager.dispatch(HostEvent::WindowCreated(window));
        assert_eq!(manager.track_state(window), TrackState::WaitingForActor);
        assert!(manager.host().is_subscribed(Subject::Window(window), Signal::Shown));

        let actor = manager.host_mut().attach_actor(window, None);
        signal(&mut manager, Subject::Window(window), Signal::Shown);
        assert_eq!(manager.track_state(window), TrackState::WaitingForAllocation);
        assert!(!manager.host().is_subscribed(Subject::Window(window), Signal::Shown));

        // Still zero: keep waiting
        signal(&mut manager, Subject::Actor(actor), Signal::AllocationChanged);
        assert_eq!(manager.track_state(window), TrackState::WaitingForAllocation);

        manager.host_mut().actor_mut(actor).allocation = Some(Rect::new(10, 10, 300, 200));
        signal(&mut manager, Subject::Actor(actor), Signal::AllocationChanged);
        assert_eq!(manager.track_state(window), TrackState::Tracked);
        assert_eq!(manager.pending_sync_count(), 1);
    }

    #[test]
    fn test_unmanaged_while_waiting_clears_pending() {
        let mut manager = manager_with(FakeHost::new());
        let window = manager.host_mut().add_window_without_actor("gedit");
        manager.dispatch(HostEvent::WindowCreated(window));
        let global = 4;
        assert_eq!(manager.host().subscription_count(), global + 2);

        manager.host_mut().window_mut(window).exists = false;
        signal(&mut manager, Subject::Window(window), Signal::Unmanaged);
        assert_eq!(manager.track_state(window), TrackState::Untracked);
        assert_eq!(manager.host().subscription_count(), global);
    }

    #[test]
    fn test_unmanaged_while_waiting_for_allocation_clears_pending() {
        let mut manager = manager_with(FakeHost::new());
        let window = manager.host_mut().add_window_without_actor("gedit");
        let actor = manager.host_mut().attach_actor(window, None);
        manager.dispatch(HostEvent::WindowCreated(window));
        assert_eq!(manager.track_state(window), TrackState::WaitingForAllocation);
        assert!(manager.host().is_subscribed(Subject::Actor(actor), Signal::AllocationChanged));
        let global = 4;
        assert_eq!(manager.host().subscription_count(), global + 2);

        manager.host_mut().window_mut(window).exists = false;
        signal(&mut manager, Subject::Window(window), Signal::Unmanaged);
        assert_eq!(manager.track_state(window), TrackState::Untracked);
        assert!(!manager.host().is_subscribed(Subject::Actor(actor), Signal::AllocationChanged));
        assert_eq!(manager.host().subscription_count(), global);
        assert_eq!(manager.tracked_count(), 0);
        assert_eq!(manager.pending_sync_count(), 0);

        // A late allocation for the forgotten actor starts nothing
        manager.host_mut().actor_mut(actor).allocation = Some(Rect::new(0, 0, 300, 200));
        signal(&mut manager, Subject::Actor(actor), Signal::AllocationChanged);
        assert_eq!(manager.track_state(window), TrackState::Untracked);
    }

    #[test]
    fn test_uninteresting_windows_skipped() {
        let mut host = FakeHost::new();
        let (menu, _) = host.add_window("menu", Rect::new(0, 0, 100, 100));
        host.window_mut(menu).window_type = WindowType::Other;
        let (modal, _) = host.add_window("modal", Rect::new(0, 0, 100, 100));
        host.window_mut(modal).window_type = WindowType::ModalDialog;
        let (transient, _) = host.add_window("transient", Rect::new(0, 0, 100, 100));
        host.window_mut(transient).transient = true;

        let manager = manager_with(host);
        assert_eq!(manager.track_state(menu), TrackState::Untracked);
        assert_eq!(manager.track_state(modal), TrackState::Tracked);
        assert_eq!(manager.track_state(transient), TrackState::Tracked);
    }

    #[test]
    fn test_modal_disabled_excludes_dialogs_and_transients() {
        let mut host = FakeHost::new();
        let (modal, _) = host.add_window("modal", Rect::new(0, 0, 100, 100));
        host.window_mut(modal).window_type = WindowType::ModalDialog;
        let (attached, _) = host.add_window("attached", Rect::new(0, 0, 100, 100));
        host.window_mut(attached).window_type = WindowType::Dialog;
        host.window_mut(attached).attached_dialog = true;
        let (plain, _) = host.add_window("plain", Rect::new(0, 0, 100, 100));

        let mut s = settings();
        s.set_bool(keys::MODAL_ENABLED, false).unwrap();
        let mut manager = BorderManager::new(host, ConfigEngine::new(s));
        manager.enable().unwrap();

        assert_eq!(manager.track_state(modal), TrackState::Untracked);
        assert_eq!(manager.track_state(attached), TrackState::Untracked);
        assert_eq!(manager.track_state(plain), TrackState::Tracked);
    }

    #[test]
    fn test_rapid_requests_coalesce_into_one_sync() {
        let mut host = FakeHost::new();
        let (window, actor) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        run_idle(&mut manager);
        let overlay = manager.overlay_for(window).unwrap();

        for width in [500, 600, 700] {
            let rect = Rect::new(100, 100, width, 300);
            manager.host_mut().actor_mut(actor).allocation = Some(rect);
            manager.host_mut().window_mut(window).frame = rect;
            signal(&mut manager, Subject::Actor(actor), Signal::AllocationChanged);
        }
        assert_eq!(manager.pending_sync_count(), 1);
        assert_eq!(manager.host().cancelled_idle.len(), 2);

        assert_eq!(run_idle(&mut manager), 1);
        assert_eq!(manager.host().overlay(overlay).size, Size::new(706, 306));
        assert_eq!(manager.pending_sync_count(), 0);
    }

    #[test]
    fn test_cancelled_idle_delivered_late_is_ignored() {
        let mut host = FakeHost::new();
        let (window, actor) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        let first = manager.host_mut().take_idle()[0];

        signal(&mut manager, Subject::Actor(actor), Signal::AllocationChanged);
        manager.dispatch(HostEvent::Idle(first));
        assert_eq!(manager.pending_sync_count(), 1);
        let overlay = manager.overlay_for(window).unwrap();
        assert!(!manager.host().overlay(overlay).visible);

        assert_eq!(run_idle(&mut manager), 1);
        assert!(manager.host().overlay(overlay).visible);
    }

    #[test]
    fn test_untrack_cancels_sync_and_removes_overlay() {
        let mut host = FakeHost::new();
        let (window, actor) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        let overlay = manager.overlay_for(window).unwrap();
        assert_eq!(manager.pending_sync_count(), 1);

        signal(&mut manager, Subject::Window(window), Signal::Unmanaged);
        assert_eq!(manager.track_state(window), TrackState::Untracked);
        assert_eq!(manager.pending_sync_count(), 0);
        assert!(manager.host().idle.is_empty());
        assert_eq!(manager.host().overlay_of(actor), None);
        assert_eq!(manager.host().overlay(overlay).parent, None);
        assert_eq!(manager.host().subscription_count(), 4);
    }

    #[test]
    fn test_untrack_skips_removal_when_actor_destroyed() {
        let mut host = FakeHost::new();
        let (window, actor) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        let overlay = manager.overlay_for(window).unwrap();

        manager.host_mut().actor_mut(actor).destroyed = true;
        signal(&mut manager, Subject::Window(window), Signal::Unmanaged);
        assert_eq!(manager.track_state(window), TrackState::Untracked);
        assert_eq!(manager.host().overlay(overlay).parent, Some(actor));
    }

    #[test]
    fn test_idle_after_disposal_is_silent() {
        let mut host = FakeHost::new();
        let (window, _) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        let overlay = manager.overlay_for(window).unwrap();

        manager.host_mut().overlay_mut(overlay).destroyed = true;
        assert_eq!(run_idle(&mut manager), 1);
        assert_eq!(manager.host().overlay(overlay).style_writes, 0);
        assert_eq!(manager.track_state(window), TrackState::Tracked);
    }

    #[test]
    fn test_sync_failure_isolated_per_window() {
        let mut host = FakeHost::new();
        let (broken, _) = host.add_window("broken", Rect::new(100, 100, 400, 300));
        let (healthy, _) = host.add_window("healthy", Rect::new(600, 100, 400, 300));
        let mut manager = manager_with(host);

        let broken_overlay = manager.overlay_for(broken).unwrap();
        manager.host_mut().overlay_mut(broken_overlay).fail_writes = true;
        assert_eq!(run_idle(&mut manager), 2);

        let healthy_overlay = manager.overlay_for(healthy).unwrap();
        assert!(manager.host().overlay(healthy_overlay).visible);
        assert!(!manager.host().overlay(broken_overlay).visible);
        assert_eq!(manager.track_state(broken), TrackState::Tracked);
    }

    #[test]
    fn test_fullscreen_hides_synchronously() {
        let mut host = FakeHost::new();
        let (window, _) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        run_idle(&mut manager);
        let overlay = manager.overlay_for(window).unwrap();
        assert!(manager.host().overlay(overlay).visible);

        manager.host_mut().window_mut(window).fullscreen = true;
        signal(&mut manager, Subject::Window(window), Signal::FullscreenChanged);
        assert!(!manager.host().overlay(overlay).visible);
        assert_eq!(manager.pending_sync_count(), 0);

        manager.host_mut().window_mut(window).fullscreen = false;
        signal(&mut manager, Subject::Window(window), Signal::FullscreenChanged);
        assert_eq!(manager.pending_sync_count(), 1);
        run_idle(&mut manager);
        assert!(manager.host().overlay(overlay).visible);
        // Hiding dropped the cached fingerprint, so the style was written again
        assert_eq!(manager.host().overlay(overlay).style_writes, 2);
    }

    #[test]
    fn test_maximized_window_hidden() {
        let mut host = FakeHost::new();
        let (window, _) = host.add_window("gedit", Rect::new(0, 0, 1920, 1080));
        host.window_mut(window).maximize_flags = Some(MaximizeFlags::BOTH);
        let mut manager = manager_with(host);
        run_idle(&mut manager);
        let overlay = manager.overlay_for(window).unwrap();
        assert!(!manager.host().overlay(overlay).visible);
    }

    #[test]
    fn test_identity_change_resyncs_only_on_value_change() {
        let mut host = FakeHost::new();
        let (window, _) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        run_idle(&mut manager);

        manager.host_mut().window_mut(window).title = Some("renamed".into());
        signal(&mut manager, Subject::Window(window), Signal::TitleChanged);
        assert_eq!(manager.pending_sync_count(), 0);

        manager.host_mut().window_mut(window).wm_class = Some("wide".into());
        signal(&mut manager, Subject::Window(window), Signal::WmClassChanged);
        assert_eq!(manager.pending_sync_count(), 1);
        assert_eq!(manager.config_for(window).unwrap().width, 8);

        run_idle(&mut manager);
        let overlay = manager.overlay_for(window).unwrap();
        let style = manager.host().overlay(overlay).style.clone().unwrap();
        assert_eq!(style.border_widths, BorderWidths::uniform(8));
    }

    #[test]
    fn test_focus_change_resyncs_previous_and_current_only() {
        let mut host = FakeHost::new();
        let (a, _) = host.add_window("a", Rect::new(100, 100, 400, 300));
        let (b, _) = host.add_window("b", Rect::new(600, 100, 400, 300));
        let (c, _) = host.add_window("c", Rect::new(100, 500, 400, 300));
        host.focus = Some(a);
        let mut manager = manager_with(host);
        run_idle(&mut manager);

        manager.host_mut().focus = Some(b);
        signal(&mut manager, Subject::Display, Signal::FocusWindowChanged);
        assert_eq!(manager.pending_sync_count(), 2);
        run_idle(&mut manager);

        let color = |m: &BorderManager<FakeHost, MemorySettings>, w| {
            m.host().overlay(m.overlay_for(w).unwrap()).style.clone().unwrap().color
        };
        assert_eq!(color(&manager, a), "rgba(102, 102, 102, 0.2)");
        assert_eq!(color(&manager, b), "rgba(53, 132, 228, 0.4)");
        assert_eq!(color(&manager, c), "rgba(102, 102, 102, 0.2)");
    }

    #[test]
    fn test_focus_change_with_stale_window_resyncs_all() {
        let mut host = FakeHost::new();
        let (a, _) = host.add_window("a", Rect::new(100, 100, 400, 300));
        let (b, _) = host.add_window("b", Rect::new(600, 100, 400, 300));
        let (c, _) = host.add_window("c", Rect::new(100, 500, 400, 300));
        host.focus = Some(a);
        let mut manager = manager_with(host);
        run_idle(&mut manager);

        let overlay_a = manager.overlay_for(a).unwrap();
        manager.host_mut().overlay_mut(overlay_a).destroyed = true;
        manager.host_mut().focus = Some(b);
        signal(&mut manager, Subject::Display, Signal::FocusWindowChanged);
        assert_eq!(manager.pending_sync_count(), 3);

        // The remembered focus moved on regardless
        manager.host_mut().focus = Some(c);
        run_idle(&mut manager);
        signal(&mut manager, Subject::Display, Signal::FocusWindowChanged);
        assert_eq!(manager.pending_sync_count(), 2);
    }

    #[test]
    fn test_work_area_change_resyncs_all() {
        let mut host = FakeHost::new();
        host.add_window("a", Rect::new(100, 100, 400, 300));
        host.add_window("b", Rect::new(600, 100, 400, 300));
        let mut manager = manager_with(host);
        run_idle(&mut manager);

        signal(&mut manager, Subject::Display, Signal::WorkAreasChanged);
        assert_eq!(manager.pending_sync_count(), 2);
        run_idle(&mut manager);
        signal(&mut manager, Subject::Layout, Signal::MonitorsChanged);
        assert_eq!(manager.pending_sync_count(), 2);
    }

    #[test]
    fn test_position_change_only_redraws() {
        let mut host = FakeHost::new();
        let (window, _) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        run_idle(&mut manager);

        signal(&mut manager, Subject::Window(window), Signal::PositionChanged);
        let overlay = manager.overlay_for(window).unwrap();
        assert_eq!(manager.host().overlay(overlay).redraws, 1);
        assert_eq!(manager.pending_sync_count(), 0);
    }

    #[test]
    fn test_settings_change_retracks_everything() {
        let mut host = FakeHost::new();
        let (window, actor) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        run_idle(&mut manager);
        let old_overlay = manager.overlay_for(window).unwrap();

        manager
            .config
            .settings_mut()
            .set_string(keys::APP_CONFIGS, r#"{"class:gedit":{"width":6}}"#)
            .unwrap();
        manager.dispatch(HostEvent::SettingsChanged { key: keys::APP_CONFIGS.to_string() });

        let new_overlay = manager.overlay_for(window).unwrap();
        assert_ne!(old_overlay, new_overlay);
        assert_eq!(manager.host().overlay(old_overlay).parent, None);
        assert_eq!(manager.host().overlay_of(actor), Some(new_overlay));
        assert_eq!(manager.config_for(window).unwrap().width, 6);
        assert_eq!(manager.pending_sync_count(), 1);
    }

    #[test]
    fn test_accent_change_recolors() {
        let mut host = FakeHost::new();
        let (window, _) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        host.focus = Some(window);
        let mut manager = manager_with(host);

        manager.config.settings_mut().accent = Some("red".into());
        manager.dispatch(HostEvent::AccentColorChanged);
        run_idle(&mut manager);

        let overlay = manager.overlay_for(window).unwrap();
        let style = manager.host().overlay(overlay).style.clone().unwrap();
        assert_eq!(style.color, "rgba(237, 51, 59, 0.4)");
    }

    #[test]
    fn test_disabled_rule_tracks_but_hides() {
        let mut host = FakeHost::new();
        let (window, _) = host.add_window("off", Rect::new(100, 100, 400, 300));
        let mut manager = manager_with(host);
        run_idle(&mut manager);
        assert_eq!(manager.track_state(window), TrackState::Tracked);
        let overlay = manager.overlay_for(window).unwrap();
        assert!(!manager.host().overlay(overlay).visible);
    }

    #[test]
    fn test_disable_tears_everything_down() {
        let mut host = FakeHost::new();
        let (tracked, actor) = host.add_window("gedit", Rect::new(100, 100, 400, 300));
        let waiting = host.add_window_without_actor("later");
        let mut manager = manager_with(host);
        manager.dispatch(HostEvent::WindowCreated(waiting));
        assert_eq!(manager.track_state(waiting), TrackState::WaitingForActor);

        manager.disable();
        assert!(!manager.is_enabled());
        assert_eq!(manager.track_state(tracked), TrackState::Untracked);
        assert_eq!(manager.track_state(waiting), TrackState::Untracked);
        assert_eq!(manager.host().subscription_count(), 0);
        assert!(manager.host().idle.is_empty());
        assert_eq!(manager.host().overlay_of(actor), None);

        // Events after teardown do nothing
        manager.dispatch(HostEvent::WindowCreated(tracked));
        assert_eq!(manager.track_state(tracked), TrackState::Untracked);
    }
}
