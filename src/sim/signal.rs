//! Listener registries for input clicks and game-state broadcasts

use serde::{Deserialize, Serialize};

/// Handle returned by `Signal::add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered list of listeners invoked on `emit`
pub struct Signal<T> {
    listeners: Vec<(ListenerId, Box<dyn FnMut(&T)>)>,
    next_id: u64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&T) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Call every listener in registration order
    pub fn emit(&mut self, value: &T) {
        for (_, listener) in &mut self.listeners {
            listener(value);
        }
    }
}

/// Broadcast game state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    None,
    Paused,
    Playing,
}

/// Zero-argument click source (tap, mouse button, space)
#[derive(Debug, Default)]
pub struct InputSource {
    clicked: Signal<()>,
}

impl InputSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_click_listener(&mut self, listener: impl FnMut() + 'static) -> ListenerId {
        let mut listener = listener;
        self.clicked.add_listener(move |_| listener())
    }

    pub fn remove_click_listener(&mut self, id: ListenerId) -> bool {
        self.clicked.remove_listener(id)
    }

    /// Report one click to every listener
    pub fn click(&mut self) {
        self.clicked.emit(&());
    }
}

/// Publishes `GamePhase` changes
#[derive(Debug, Default)]
pub struct GameStateBroadcaster {
    phase: GamePhase,
    changed: Signal<GamePhase>,
}

impl GameStateBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GamePhase) + 'static) -> ListenerId {
        self.changed.add_listener(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.changed.remove_listener(id)
    }

    /// Set and broadcast a phase; repeated phases are still broadcast
    pub fn set_phase(&mut self, phase: GamePhase) {
        self.phase = phase;
        self.changed.emit(&phase);
    }
}
