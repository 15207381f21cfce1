//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::core::StateId;
use crate::host::{AuthorityOracle, Clock, LocalAuthority, SystemClock, TickSource};
use crate::machine::{Engine, MachineConfig, ReplicationMode, StateMachine};

/// Builder for constructing state machines with a fluent API.
///
/// Unset collaborators default to a [`SystemClock`], [`LocalAuthority`]
/// and no tick source.
pub struct StateMachineBuilder<T: StateId> {
    default: Option<T>,
    config: MachineConfig,
    clock: Option<Box<dyn Clock>>,
    authority: Option<Box<dyn AuthorityOracle>>,
    tick_source: Option<Box<dyn TickSource>>,
}

impl<T: StateId> StateMachineBuilder<T> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            default: None,
            config: MachineConfig::default(),
            clock: None,
            authority: None,
            tick_source: None,
        }
    }

    /// Set the state every history slot starts in (required).
    pub fn default_state(mut self, state: T) -> Self {
        self.default = Some(state);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn retroactive_horizon(mut self, horizon: f64) -> Self {
        self.config.retroactive_horizon = horizon;
        self
    }

    pub fn mode(mut self, mode: ReplicationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn authority(mut self, authority: impl AuthorityOracle + 'static) -> Self {
        self.authority = Some(Box::new(authority));
        self
    }

    pub fn tick_source(mut self, source: impl TickSource + 'static) -> Self {
        self.tick_source = Some(Box::new(source));
        self
    }

    /// Build the state machine.
    ///
    /// Fails when the default state is missing, the configuration is
    /// invalid, or `T`'s conversion pair does not round-trip.
    pub fn build(self) -> Result<StateMachine<T>, BuildError> {
        let default = self.default.ok_or(BuildError::MissingDefaultState)?;
        self.config.validate().map_err(BuildError::InvalidConfig)?;
        T::verify_round_trip()?;

        let engine = Engine::new(
            self.config,
            default.to_i32(),
            self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            self.authority.unwrap_or_else(|| Box::new(LocalAuthority)),
            self.tick_source.unwrap_or_else(|| Box::new(())),
        );
        Ok(StateMachine::from_engine(engine, default))
    }
}

impl<T: StateId> Default for StateMachineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
