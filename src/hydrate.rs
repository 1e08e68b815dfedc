//! Client-side partial-hydration scheduling.
//!
//! The scheduler is host-agnostic: everything that touches the rendered
//! page goes through a [`HydrationSurface`], and the host drives the
//! scheduler by forwarding its dispatch events (idle callback fired, region
//! became visible, region interacted with). Per region the state machine is
//! pending → hydrated, terminal; the hydrated-id set makes every activation
//! path a no-op after the first. The four strategy groups are started
//! independently and may complete in any order.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::document::{HydrationConfig, HydrationStrategy};

/// Timer fallback when the host offers no idle-callback facility.
pub const IDLE_FALLBACK_MS: u64 = 1000;
/// Default visibility observer margin.
pub const DEFAULT_ROOT_MARGIN: &str = "50px";
/// Default visibility observer threshold.
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.1;

/// One hydration-hinted region: the element's stable id plus its strategy
/// configuration, copied verbatim from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationHint {
    pub id: String,
    #[serde(flatten)]
    pub config: HydrationConfig,
}

/// The host page seam. A browser host backs this with the DOM, an
/// intersection observer and event listeners; tests back it with a mock.
pub trait HydrationSurface {
    /// Whether a region with this id exists in the rendered markup.
    fn region_exists(&self, id: &str) -> bool;

    /// Mark the region observably hydrated (attribute/class on the region).
    fn mark_hydrated(&mut self, id: &str);

    /// Emit the hydration notification for external observers.
    fn notify_hydrated(&mut self, id: &str, strategy: HydrationStrategy);

    /// Whether the host has a native idle-callback facility.
    fn supports_idle_callback(&self) -> bool;

    /// Request an idle callback; the host later calls
    /// [`HydrationScheduler::idle_reached`].
    fn request_idle(&mut self);

    /// Start a one-shot timer; the host later calls
    /// [`HydrationScheduler::idle_reached`] when it fires.
    fn start_timer(&mut self, ms: u64);

    /// Register a region with the shared visibility observer.
    fn observe(&mut self, id: &str, root_margin: &str, threshold: f64);

    /// Deregister a region from the visibility observer.
    fn unobserve(&mut self, id: &str);

    /// Release the visibility observer entirely.
    fn disconnect_observer(&mut self);

    /// Attach the one-shot interaction listeners (pointer-down, touch-start
    /// and pointer-enter equivalents) to a region.
    fn attach_interaction_listeners(&mut self, id: &str);

    /// Detach all interaction listeners from a region.
    fn detach_interaction_listeners(&mut self, id: &str);
}

pub struct HydrationScheduler<S: HydrationSurface> {
    surface: S,
    hints: Vec<HydrationHint>,
    hydrated: HashSet<String>,
    idle_pending: Vec<String>,
    destroyed: bool,
}

impl<S: HydrationSurface> HydrationScheduler<S> {
    pub fn new(surface: S, hints: Vec<HydrationHint>) -> Self {
        Self {
            surface,
            hints,
            hydrated: HashSet::new(),
            idle_pending: Vec::new(),
            destroyed: false,
        }
    }

    /// Start all four strategy groups. `immediate` regions hydrate
    /// synchronously before this returns; the other groups wait for their
    /// host events. `never` regions are not scheduled at all.
    pub fn start(&mut self) {
        let hints = self.hints.clone();
        let mut wants_idle = false;

        for hint in &hints {
            match hint.config.strategy {
                HydrationStrategy::Immediate => {
                    self.activate(&hint.id, HydrationStrategy::Immediate);
                }
                HydrationStrategy::Idle => {
                    self.idle_pending.push(hint.id.clone());
                    wants_idle = true;
                }
                HydrationStrategy::Visible => {
                    let viewport = hint.config.viewport.as_ref();
                    let root_margin = viewport
                        .and_then(|v| v.root_margin.as_deref())
                        .unwrap_or(DEFAULT_ROOT_MARGIN);
                    let threshold = viewport
                        .and_then(|v| v.threshold)
                        .unwrap_or(DEFAULT_VISIBILITY_THRESHOLD);
                    self.surface.observe(&hint.id, root_margin, threshold);
                }
                HydrationStrategy::Interaction => {
                    self.surface.attach_interaction_listeners(&hint.id);
                }
                HydrationStrategy::Never => {}
            }
        }

        if wants_idle {
            if self.surface.supports_idle_callback() {
                self.surface.request_idle();
            } else {
                self.surface.start_timer(IDLE_FALLBACK_MS);
            }
        }
    }

    /// Host signal: the idle callback or its fallback timer fired.
    pub fn idle_reached(&mut self) {
        let pending = std::mem::take(&mut self.idle_pending);
        for id in pending {
            self.activate(&id, HydrationStrategy::Idle);
        }
    }

    /// Host signal: a visible-strategy region intersected the viewport.
    /// Activates once and deregisters the region; repeat intersections for
    /// the same id are no-ops.
    pub fn region_visible(&mut self, id: &str) {
        if self.destroyed {
            return;
        }
        self.surface.unobserve(id);
        self.activate(id, HydrationStrategy::Visible);
    }

    /// Host signal: an interaction-strategy region received its first
    /// interaction.
    pub fn region_interacted(&mut self, id: &str) {
        self.surface.detach_interaction_listeners(id);
        self.activate(id, HydrationStrategy::Interaction);
    }

    /// Release the visibility observer. Pending visibility activations are
    /// stopped; idle- and interaction-driven activations that still fire
    /// simply no-op against the hydrated set.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.surface.disconnect_observer();
    }

    pub fn is_hydrated(&self, id: &str) -> bool {
        self.hydrated.contains(id)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Exactly-once activation. Failure to locate the region leaves it
    /// pending; a later event may still hydrate it.
    fn activate(&mut self, id: &str, strategy: HydrationStrategy) {
        if self.hydrated.contains(id) {
            return;
        }
        if !self.surface.region_exists(id) {
            warn!("hydration region '{}' not found, left pending", id);
            return;
        }
        self.surface.mark_hydrated(id);
        self.hydrated.insert(id.to_string());
        self.surface.notify_hydrated(id, strategy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{HydrationPriority, ViewportConfig};

    #[derive(Default)]
    struct MockSurface {
        regions: HashSet<String>,
        marked: Vec<String>,
        notifications: Vec<(String, HydrationStrategy)>,
        idle_supported: bool,
        idle_requested: bool,
        timer_started: Option<u64>,
        observed: Vec<(String, String, f64)>,
        unobserved: Vec<String>,
        observer_disconnected: bool,
        listeners: HashSet<String>,
    }

    impl MockSurface {
        fn with_regions(ids: &[&str]) -> Self {
            Self {
                regions: ids.iter().map(|s| s.to_string()).collect(),
                idle_supported: true,
                ..Self::default()
            }
        }
    }

    impl HydrationSurface for MockSurface {
        fn region_exists(&self, id: &str) -> bool {
            self.regions.contains(id)
        }
        fn mark_hydrated(&mut self, id: &str) {
            self.marked.push(id.to_string());
        }
        fn notify_hydrated(&mut self, id: &str, strategy: HydrationStrategy) {
            self.notifications.push((id.to_string(), strategy));
        }
        fn supports_idle_callback(&self) -> bool {
            self.idle_supported
        }
        fn request_idle(&mut self) {
            self.idle_requested = true;
        }
        fn start_timer(&mut self, ms: u64) {
            self.timer_started = Some(ms);
        }
        fn observe(&mut self, id: &str, root_margin: &str, threshold: f64) {
            self.observed
                .push((id.to_string(), root_margin.to_string(), threshold));
        }
        fn unobserve(&mut self, id: &str) {
            self.unobserved.push(id.to_string());
        }
        fn disconnect_observer(&mut self) {
            self.observer_disconnected = true;
        }
        fn attach_interaction_listeners(&mut self, id: &str) {
            self.listeners.insert(id.to_string());
        }
        fn detach_interaction_listeners(&mut self, id: &str) {
            self.listeners.remove(id);
        }
    }

    fn hint(id: &str, strategy: HydrationStrategy) -> HydrationHint {
        HydrationHint {
            id: id.to_string(),
            config: HydrationConfig::strategy(strategy),
        }
    }

    #[test]
    fn immediate_hydrates_at_start_idle_waits() {
        let surface = MockSurface::with_regions(&["btn1", "btn2"]);
        let mut scheduler = HydrationScheduler::new(
            surface,
            vec![
                hint("btn1", HydrationStrategy::Immediate),
                hint("btn2", HydrationStrategy::Idle),
            ],
        );
        scheduler.start();

        assert!(scheduler.is_hydrated("btn1"));
        assert!(!scheduler.is_hydrated("btn2"));
        assert!(scheduler.surface().idle_requested);

        scheduler.idle_reached();
        assert!(scheduler.is_hydrated("btn2"));
        assert_eq!(
            scheduler.surface().notifications,
            vec![
                ("btn1".to_string(), HydrationStrategy::Immediate),
                ("btn2".to_string(), HydrationStrategy::Idle)
            ]
        );
    }

    #[test]
    fn idle_falls_back_to_timer_without_host_support() {
        let mut surface = MockSurface::with_regions(&["a"]);
        surface.idle_supported = false;
        let mut scheduler =
            HydrationScheduler::new(surface, vec![hint("a", HydrationStrategy::Idle)]);
        scheduler.start();

        assert!(!scheduler.surface().idle_requested);
        assert_eq!(scheduler.surface().timer_started, Some(IDLE_FALLBACK_MS));
    }

    #[test]
    fn visible_observes_with_defaults_and_config() {
        let surface = MockSurface::with_regions(&["plain", "tuned"]);
        let mut tuned = hint("tuned", HydrationStrategy::Visible);
        tuned.config.viewport = Some(ViewportConfig {
            root_margin: Some("200px".to_string()),
            threshold: Some(0.5),
        });
        let mut scheduler = HydrationScheduler::new(
            surface,
            vec![hint("plain", HydrationStrategy::Visible), tuned],
        );
        scheduler.start();

        assert_eq!(
            scheduler.surface().observed,
            vec![
                (
                    "plain".to_string(),
                    DEFAULT_ROOT_MARGIN.to_string(),
                    DEFAULT_VISIBILITY_THRESHOLD
                ),
                ("tuned".to_string(), "200px".to_string(), 0.5)
            ]
        );

        scheduler.region_visible("plain");
        assert!(scheduler.is_hydrated("plain"));
        assert_eq!(scheduler.surface().unobserved, vec!["plain".to_string()]);
        assert!(!scheduler.is_hydrated("tuned"));
    }

    #[test]
    fn interaction_detaches_listeners_on_first_fire() {
        let surface = MockSurface::with_regions(&["card"]);
        let mut scheduler =
            HydrationScheduler::new(surface, vec![hint("card", HydrationStrategy::Interaction)]);
        scheduler.start();
        assert!(scheduler.surface().listeners.contains("card"));

        scheduler.region_interacted("card");
        assert!(scheduler.is_hydrated("card"));
        assert!(scheduler.surface().listeners.is_empty());
    }

    #[test]
    fn never_strategy_is_not_scheduled() {
        let surface = MockSurface::with_regions(&["static"]);
        let mut scheduler =
            HydrationScheduler::new(surface, vec![hint("static", HydrationStrategy::Never)]);
        scheduler.start();

        assert!(!scheduler.is_hydrated("static"));
        assert!(scheduler.surface().observed.is_empty());
        assert!(scheduler.surface().listeners.is_empty());
        assert!(!scheduler.surface().idle_requested);
        assert!(scheduler.surface().timer_started.is_none());
    }

    #[test]
    fn activation_is_exactly_once() {
        let surface = MockSurface::with_regions(&["v"]);
        let mut scheduler =
            HydrationScheduler::new(surface, vec![hint("v", HydrationStrategy::Visible)]);
        scheduler.start();

        scheduler.region_visible("v");
        scheduler.region_visible("v");
        assert_eq!(scheduler.surface().notifications.len(), 1);
        assert_eq!(scheduler.surface().marked, vec!["v".to_string()]);
    }

    #[test]
    fn missing_region_stays_pending() {
        let surface = MockSurface::with_regions(&[]);
        let mut scheduler =
            HydrationScheduler::new(surface, vec![hint("ghost", HydrationStrategy::Immediate)]);
        scheduler.start();

        assert!(!scheduler.is_hydrated("ghost"));
        assert!(scheduler.surface().notifications.is_empty());
    }

    #[test]
    fn destroy_releases_observer_and_blocks_visibility() {
        let surface = MockSurface::with_regions(&["v", "i"]);
        let mut scheduler = HydrationScheduler::new(
            surface,
            vec![
                hint("v", HydrationStrategy::Visible),
                hint("i", HydrationStrategy::Idle),
            ],
        );
        scheduler.start();
        scheduler.destroy();

        assert!(scheduler.surface().observer_disconnected);
        scheduler.region_visible("v");
        assert!(!scheduler.is_hydrated("v"));

        // Idle activations are not cancelled; they remain cheap no-ops or
        // late activations.
        scheduler.idle_reached();
        assert!(scheduler.is_hydrated("i"));
    }

    #[test]
    fn hint_serializes_flattened() {
        let mut h = hint("btn", HydrationStrategy::Visible);
        h.config.priority = Some(HydrationPriority::High);
        let value = serde_json::to_value(&h).unwrap();
        assert_eq!(value["id"], "btn");
        assert_eq!(value["strategy"], "visible");
        assert_eq!(value["priority"], "high");
    }
}
