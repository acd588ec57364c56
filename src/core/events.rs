//! Event Bus for Decoupled Communication
//!
//! Input, combat and AI code never call each other directly. Producers
//! `publish()` a [`GameEvent`] on the shared [`EventBus`]; every handler
//! subscribed to that event's [`EventKind`] is invoked synchronously.
//!
//! # Design Principles
//!
//! - **Type Safety**: All events are strongly typed via the `GameEvent` enum
//! - **Snapshot Delivery**: A publish only reaches the handlers registered when
//!   it started, so handlers may subscribe or unsubscribe while being called
//! - **Isolation**: A failing handler is logged and skipped, the rest still run
//! - **Mailboxes**: Controllers forward the events they care about into an
//!   [`EventQueue`] and process them at the start of their own update, which
//!   keeps handlers free of re-entrant borrows
//!
//! # Example
//!
//! ```ignore
//! let bus = Rc::new(EventBus::new());
//! let on_death = handler(|event| {
//!     if let GameEvent::EnemyDied { enemy, .. } = event {
//!         log::info!("{enemy:?} died");
//!     }
//!     Ok(())
//! });
//! bus.subscribe(EventKind::EnemyDied, &on_death);
//! bus.publish(&GameEvent::EnemyDied { enemy, position: Vec3::ZERO });
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use glam::{Vec2, Vec3};
use hecs::Entity;
use rustc_hash::FxHashMap;

// ============================================================================
// Event Types
// ============================================================================

/// Game events for inter-system communication.
///
/// # Extensibility
///
/// The `#[non_exhaustive]` attribute allows adding new variants without
/// breaking downstream code that uses wildcard patterns.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GameEvent {
    // -------------------------------------------------------------------------
    // Input Events (already decoded by the host)
    // -------------------------------------------------------------------------
    /// Movement stick / WASD vector, each axis in [-1, 1].
    MovementInput {
        /// Input direction (x = strafe, y = forward)
        direction: Vec2,
    },
    /// Camera look delta.
    LookInput {
        /// Pointer or stick delta
        delta: Vec2,
    },
    /// Jump button changed.
    JumpInput {
        /// Whether the button is held
        pressed: bool,
    },
    /// Sprint button changed.
    SprintInput {
        /// Whether the button is held
        pressed: bool,
    },
    /// Crouch button changed.
    CrouchInput {
        /// Whether the button is held
        pressed: bool,
    },
    /// Attack button changed.
    AttackInput {
        /// Whether the button is held
        pressed: bool,
    },
    /// Aim (secondary mouse) button changed.
    AimInput {
        /// Whether the button is held
        pressed: bool,
    },
    /// Dash button changed.
    DashInput {
        /// Whether the button is held
        pressed: bool,
    },
    /// Parry button changed.
    ParryInput {
        /// Whether the button is held
        pressed: bool,
    },
    /// Interact button changed.
    InteractInput {
        /// Whether the button is held
        pressed: bool,
    },

    // -------------------------------------------------------------------------
    // Player Events
    // -------------------------------------------------------------------------
    /// The player started a swing.
    PlayerAttack {
        /// The attacking player
        player: Entity,
        /// 0-based position in the current combo
        combo_index: usize,
        /// Damage this swing deals on hit
        damage: f32,
    },
    /// The player started a dash.
    PlayerDashStarted {
        /// The dashing player
        player: Entity,
        /// Locked-in dash direction
        direction: Vec3,
    },
    /// The player's dash finished and its cooldown started.
    PlayerDashEnded {
        /// The player
        player: Entity,
    },
    /// An attacker was caught inside the player's parry window.
    ParrySucceeded {
        /// The parrying player
        player: Entity,
        /// The parried attacker
        attacker: Entity,
    },
    /// The player lost health.
    PlayerDamaged {
        /// The damaged player
        player: Entity,
        /// Damage actually applied
        amount: f32,
        /// Health left afterwards
        remaining: f32,
    },
    /// The player's health reached zero.
    PlayerDied {
        /// The dead player
        player: Entity,
        /// Where it happened
        position: Vec3,
    },

    // -------------------------------------------------------------------------
    // Enemy Events
    // -------------------------------------------------------------------------
    /// An enemy was hit.
    EnemyDamaged {
        /// The enemy that was hit
        target: Entity,
        /// Damage dealt
        amount: f32,
        /// Direction of the hit, from attacker towards target
        direction: Vec3,
        /// Who dealt the damage, if known
        source: Option<Entity>,
    },
    /// An enemy spotted a target.
    EnemyTargetDetected {
        /// The enemy that saw something
        enemy: Entity,
        /// What it saw
        target: Entity,
        /// Distance at detection time
        distance: f32,
    },
    /// An enemy landed a melee hit.
    EnemyAttack {
        /// The attacking enemy
        attacker: Entity,
        /// The entity being hit
        target: Entity,
        /// Damage of the hit
        power: f32,
    },
    /// An enemy's ranged shot struck something.
    EnemyRangedAttack {
        /// The shooting enemy
        attacker: Entity,
        /// The entity that was struck
        target: Entity,
        /// Damage of the shot
        power: f32,
        /// Travel direction of the shot
        direction: Vec3,
    },
    /// An enemy launched a projectile.
    ///
    /// The host flies it and publishes `EnemyRangedAttack` on impact.
    ProjectileFired {
        /// The shooting enemy
        owner: Entity,
        /// What it was aimed at
        target: Entity,
        /// Launch point
        origin: Vec3,
        /// Unit travel direction
        direction: Vec3,
        /// Launch speed (units/s)
        speed: f32,
        /// Damage on impact
        damage: f32,
        /// Seconds before it falls away harmlessly
        lifetime: f32,
    },
    /// An enemy asked nearby allies for help.
    EnemyHelpCall {
        /// The calling enemy
        caller: Entity,
        /// Where the caller stood
        position: Vec3,
        /// The caller's target, if it has one
        target: Option<Entity>,
    },
    /// An enemy died.
    EnemyDied {
        /// The dead enemy
        enemy: Entity,
        /// Where it died
        position: Vec3,
    },

    // -------------------------------------------------------------------------
    // World Events
    // -------------------------------------------------------------------------
    /// A noise that enemies may hear.
    SoundEmitted {
        /// Origin of the sound
        position: Vec3,
        /// Loudness in [0, 1]
        intensity: f32,
        /// What made the noise, if known
        source: Option<Entity>,
    },
}

/// Discriminant of a [`GameEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Movement stick changed
    MovementInput,
    /// Look delta changed
    LookInput,
    /// Jump pressed or released
    JumpInput,
    /// Sprint pressed or released
    SprintInput,
    /// Crouch pressed or released
    CrouchInput,
    /// Attack pressed or released
    AttackInput,
    /// Aim pressed or released
    AimInput,
    /// Dash pressed or released
    DashInput,
    /// Parry pressed or released
    ParryInput,
    /// Interact pressed or released
    InteractInput,
    /// Player swung
    PlayerAttack,
    /// Player dash began
    PlayerDashStarted,
    /// Player dash finished
    PlayerDashEnded,
    /// Player deflected an attacker
    ParrySucceeded,
    /// Player lost health
    PlayerDamaged,
    /// Player health reached zero
    PlayerDied,
    /// Damage addressed to an enemy
    EnemyDamaged,
    /// Enemy acquired a target
    EnemyTargetDetected,
    /// Enemy melee strike
    EnemyAttack,
    /// Enemy ranged shot landed
    EnemyRangedAttack,
    /// Enemy projectile launched
    ProjectileFired,
    /// Enemy called nearby allies
    EnemyHelpCall,
    /// Enemy health reached zero
    EnemyDied,
    /// Audible noise in the world
    SoundEmitted,
}

impl EventKind {
    /// Every input kind, in the order the player controller subscribes them.
    pub const INPUTS: [EventKind; 10] = [
        EventKind::MovementInput,
        EventKind::LookInput,
        EventKind::JumpInput,
        EventKind::SprintInput,
        EventKind::CrouchInput,
        EventKind::AttackInput,
        EventKind::AimInput,
        EventKind::DashInput,
        EventKind::ParryInput,
        EventKind::InteractInput,
    ];
}

impl GameEvent {
    /// Subscription key of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MovementInput { .. } => EventKind::MovementInput,
            Self::LookInput { .. } => EventKind::LookInput,
            Self::JumpInput { .. } => EventKind::JumpInput,
            Self::SprintInput { .. } => EventKind::SprintInput,
            Self::CrouchInput { .. } => EventKind::CrouchInput,
            Self::AttackInput { .. } => EventKind::AttackInput,
            Self::AimInput { .. } => EventKind::AimInput,
            Self::DashInput { .. } => EventKind::DashInput,
            Self::ParryInput { .. } => EventKind::ParryInput,
            Self::InteractInput { .. } => EventKind::InteractInput,
            Self::PlayerAttack { .. } => EventKind::PlayerAttack,
            Self::PlayerDashStarted { .. } => EventKind::PlayerDashStarted,
            Self::PlayerDashEnded { .. } => EventKind::PlayerDashEnded,
            Self::ParrySucceeded { .. } => EventKind::ParrySucceeded,
            Self::PlayerDamaged { .. } => EventKind::PlayerDamaged,
            Self::PlayerDied { .. } => EventKind::PlayerDied,
            Self::EnemyDamaged { .. } => EventKind::EnemyDamaged,
            Self::EnemyTargetDetected { .. } => EventKind::EnemyTargetDetected,
            Self::EnemyAttack { .. } => EventKind::EnemyAttack,
            Self::EnemyRangedAttack { .. } => EventKind::EnemyRangedAttack,
            Self::ProjectileFired { .. } => EventKind::ProjectileFired,
            Self::EnemyHelpCall { .. } => EventKind::EnemyHelpCall,
            Self::EnemyDied { .. } => EventKind::EnemyDied,
            Self::SoundEmitted { .. } => EventKind::SoundEmitted,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure reported by an event handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The handler refused the event
    Rejected(String),
    /// The receiving mailbox is borrowed elsewhere
    MailboxBusy,
    /// The receiving mailbox is at capacity
    MailboxFull(usize),
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "event rejected: {reason}"),
            Self::MailboxBusy => write!(f, "mailbox is busy"),
            Self::MailboxFull(cap) => write!(f, "mailbox is full ({cap} events)"),
        }
    }
}

impl std::error::Error for EventError {}

// ============================================================================
// Event Bus
// ============================================================================

/// Subscriber callback. Identity is the `Rc` allocation, so keep a clone of
/// the handle to unsubscribe later.
pub type EventHandler = Rc<dyn Fn(&GameEvent) -> Result<(), EventError>>;

/// Wrap a closure as an [`EventHandler`].
pub fn handler<F>(f: F) -> EventHandler
where
    F: Fn(&GameEvent) -> Result<(), EventError> + 'static,
{
    Rc::new(f)
}

/// Per-session publish/subscribe hub.
///
/// All methods take `&self`; the subscriber table sits behind a `RefCell` and
/// is never borrowed while handlers run.
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<FxHashMap<EventKind, Vec<EventHandler>>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`.
    ///
    /// Returns `false` if this exact handler is already registered for `kind`.
    pub fn subscribe(&self, kind: EventKind, handler: &EventHandler) -> bool {
        let mut table = self.subscribers.borrow_mut();
        let list = table.entry(kind).or_default();
        if list.iter().any(|h| Rc::ptr_eq(h, handler)) {
            return false;
        }
        list.push(Rc::clone(handler));
        true
    }

    /// Remove `handler` from `kind`. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, kind: EventKind, handler: &EventHandler) -> bool {
        let mut table = self.subscribers.borrow_mut();
        let Some(list) = table.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !Rc::ptr_eq(h, handler));
        before != list.len()
    }

    /// Deliver `event` to every handler subscribed to its kind right now.
    ///
    /// Returns the number of handlers that accepted the event.
    pub fn publish(&self, event: &GameEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<EventHandler> = match self.subscribers.borrow().get(&kind) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return 0,
        };

        let mut delivered = 0;
        for (index, handler) in snapshot.iter().enumerate() {
            match handler(event) {
                Ok(()) => delivered += 1,
                Err(e) => log::error!("{kind:?} subscriber #{index} failed: {e}"),
            }
        }
        log::trace!("published {kind:?} to {delivered}/{} handlers", snapshot.len());
        delivered
    }

    /// Drop every subscription. Owners must subscribe again afterwards.
    pub fn reset(&self) {
        self.subscribers.borrow_mut().clear();
        log::info!("event bus reset");
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.borrow().get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.subscribers.borrow();
        f.debug_struct("EventBus")
            .field("kinds", &table.len())
            .field("handlers", &table.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

// ============================================================================
// Event Queue (per-owner mailbox)
// ============================================================================

/// Bounded FIFO of events waiting for their owner's next update.
///
/// A controller subscribes a forwarding handler (see [`EventQueue::forwarder`])
/// and drains the queue at the start of each frame.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<GameEvent>,
    capacity: usize,
    dropped: usize,
}

impl EventQueue {
    /// Default capacity of a mailbox.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create a queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a queue holding at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append an event, failing if the queue is full.
    pub fn push(&mut self, event: GameEvent) -> Result<(), EventError> {
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            log::warn!(
                "Mailbox full ({} events), dropping {:?} ({} dropped so far)",
                self.capacity,
                event.kind(),
                self.dropped
            );
            return Err(EventError::MailboxFull(self.capacity));
        }
        self.events.push_back(event);
        Ok(())
    }

    /// Take every queued event in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }

    /// Number of queued events.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if nothing is queued.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events refused because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Drop every queued event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Build a handler that copies accepted events into `queue`.
    ///
    /// The handler holds only a weak reference; once the owner drops its
    /// queue, deliveries are rejected instead of piling up.
    pub fn forwarder(
        queue: &Rc<RefCell<EventQueue>>,
        accept: impl Fn(&GameEvent) -> bool + 'static,
    ) -> EventHandler {
        let weak: Weak<RefCell<EventQueue>> = Rc::downgrade(queue);
        handler(move |event| {
            if !accept(event) {
                return Ok(());
            }
            let queue = weak
                .upgrade()
                .ok_or_else(|| EventError::Rejected("mailbox owner dropped".into()))?;
            let mut queue = queue.try_borrow_mut().map_err(|_| EventError::MailboxBusy)?;
            queue.push(event.clone())
        })
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn counter(hits: &Rc<Cell<u32>>) -> EventHandler {
        let hits = Rc::clone(hits);
        handler(move |_| {
            hits.set(hits.get() + 1);
            Ok(())
        })
    }

    fn jump() -> GameEvent {
        GameEvent::JumpInput { pressed: true }
    }

    #[test]
    fn test_event_kind_matches_variant() {
        assert_eq!(jump().kind(), EventKind::JumpInput);
        let sound = GameEvent::SoundEmitted {
            position: Vec3::ZERO,
            intensity: 0.5,
            source: None,
        };
        assert_eq!(sound.kind(), EventKind::SoundEmitted);
    }

    #[test]
    fn test_subscribe_deduplicates() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let handler = counter(&hits);

        assert!(bus.subscribe(EventKind::JumpInput, &handler));
        assert!(!bus.subscribe(EventKind::JumpInput, &handler));
        assert_eq!(bus.subscriber_count(EventKind::JumpInput), 1);

        bus.publish(&jump());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_same_handler_on_two_kinds() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let handler = counter(&hits);

        bus.subscribe(EventKind::JumpInput, &handler);
        bus.subscribe(EventKind::CrouchInput, &handler);
        bus.publish(&jump());
        bus.publish(&GameEvent::CrouchInput { pressed: true });
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_unsubscribe_missing_is_noop() {
        let bus = EventBus::new();
        let handler = counter(&Rc::new(Cell::new(0)));
        assert!(!bus.unsubscribe(EventKind::JumpInput, &handler));

        bus.subscribe(EventKind::JumpInput, &handler);
        assert!(bus.unsubscribe(EventKind::JumpInput, &handler));
        assert!(!bus.unsubscribe(EventKind::JumpInput, &handler));
        assert_eq!(bus.publish(&jump()), 0);
    }

    #[test]
    fn test_publish_isolates_failing_handler() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let failing = handler(|_| Err(EventError::Rejected("boom".into())));
        let ok = counter(&hits);

        bus.subscribe(EventKind::JumpInput, &failing);
        bus.subscribe(EventKind::JumpInput, &ok);

        assert_eq!(bus.publish(&jump()), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_subscribe_during_publish_misses_in_flight_event() {
        let bus = Rc::new(EventBus::new());
        let late_hits = Rc::new(Cell::new(0));
        let late = counter(&late_hits);

        let adder: EventHandler = {
            let bus = Rc::clone(&bus);
            let late = Rc::clone(&late);
            handler(move |_| {
                bus.subscribe(EventKind::JumpInput, &late);
                Ok(())
            })
        };
        bus.subscribe(EventKind::JumpInput, &adder);

        bus.publish(&jump());
        assert_eq!(late_hits.get(), 0);

        bus.publish(&jump());
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_unsubscribe_during_publish_keeps_snapshot() {
        let bus = Rc::new(EventBus::new());
        let victim_hits = Rc::new(Cell::new(0));
        let victim = counter(&victim_hits);

        let remover: EventHandler = {
            let bus = Rc::clone(&bus);
            let victim = Rc::clone(&victim);
            handler(move |_| {
                bus.unsubscribe(EventKind::JumpInput, &victim);
                Ok(())
            })
        };
        bus.subscribe(EventKind::JumpInput, &remover);
        bus.subscribe(EventKind::JumpInput, &victim);

        bus.publish(&jump());
        assert_eq!(victim_hits.get(), 1);

        bus.publish(&jump());
        assert_eq!(victim_hits.get(), 1);
    }

    #[test]
    fn test_reset_clears_subscribers() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let handler = counter(&hits);
        bus.subscribe(EventKind::JumpInput, &handler);

        bus.reset();
        assert_eq!(bus.publish(&jump()), 0);

        assert!(bus.subscribe(EventKind::JumpInput, &handler));
        bus.publish(&jump());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_queue_capacity() {
        let mut queue = EventQueue::with_capacity(2);
        queue.push(jump()).unwrap();
        queue.push(jump()).unwrap();
        assert_eq!(queue.push(jump()), Err(EventError::MailboxFull(2)));
        assert_eq!(queue.push(jump()), Err(EventError::MailboxFull(2)));
        assert_eq!(queue.dropped(), 2);

        assert_eq!(queue.drain().count(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_forwarder_filters_and_queues() {
        let bus = EventBus::new();
        let queue = Rc::new(RefCell::new(EventQueue::new()));
        let handler = EventQueue::forwarder(&queue, |e| {
            matches!(e, GameEvent::JumpInput { pressed: true })
        });
        bus.subscribe(EventKind::JumpInput, &handler);

        bus.publish(&jump());
        bus.publish(&GameEvent::JumpInput { pressed: false });
        assert_eq!(queue.borrow().len(), 1);
    }

    #[test]
    fn test_forwarder_busy_mailbox_is_reported() {
        let bus = EventBus::new();
        let queue = Rc::new(RefCell::new(EventQueue::new()));
        let handler = EventQueue::forwarder(&queue, |_| true);
        bus.subscribe(EventKind::JumpInput, &handler);

        let _held = queue.borrow_mut();
        assert_eq!(bus.publish(&jump()), 0);
    }

    #[test]
    fn test_forwarder_after_owner_dropped() {
        let bus = EventBus::new();
        let queue = Rc::new(RefCell::new(EventQueue::new()));
        let handler = EventQueue::forwarder(&queue, |_| true);
        bus.subscribe(EventKind::JumpInput, &handler);
        drop(queue);

        assert_eq!(bus.publish(&jump()), 0);
    }
}
