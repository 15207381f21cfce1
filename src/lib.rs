//! Retrostate: a replicated finite state machine with retroactive catch-up
//!
//! Only the latest state of a machine is guaranteed to reach every
//! observer. Retrostate keeps a short history of recent transitions plus a
//! monotonic change counter so that any observer can replay the
//! transitions it missed, in order, within a bounded time horizon.
//!
//! # Core Concepts
//!
//! - **State buffer**: the newest few `(state, timestamp)` records and the
//!   count of committed transitions, forming a single-writer log
//! - **Reconciliation**: the read-side catch-up that turns the log into an
//!   ordered replay of missed transitions
//! - **Callbacks**: enter/exit/update/pair callbacks dispatched in a fixed
//!   order, each behind its own panic boundary, optionally restricted to
//!   the authority or to remotes
//! - **Rules**: conditional and timed automatic transitions, delayed
//!   transitions, and blocked states
//! - **Host interfaces**: clock, authority flag and tick source are injected,
//!   so the engine is deterministic under test
//!
//! # Example
//!
//! ```rust
//! use retrostate::host::{ManualClock, SharedAuthority};
//! use retrostate::{state_enum, MachineConfig, StateMachine};
//!
//! state_enum! {
//!     pub enum Player {
//!         Idle = 0,
//!         Run = 1,
//!         Jump = 2,
//!     }
//! }
//!
//! let clock = ManualClock::new(0.0);
//! let mut server = StateMachine::builder()
//!     .default_state(Player::Idle)
//!     .config(MachineConfig::replicated())
//!     .clock(clock.clone())
//!     .authority(SharedAuthority::new(true))
//!     .build()
//!     .unwrap();
//! let mut client = StateMachine::builder()
//!     .default_state(Player::Idle)
//!     .config(MachineConfig::replicated())
//!     .clock(clock.clone())
//!     .authority(SharedAuthority::new(false))
//!     .build()
//!     .unwrap();
//!
//! server.transition_to(Player::Run);
//! clock.advance(0.1);
//! server.transition_to(Player::Jump);
//!
//! // The client only ever sees the latest replicated buffer.
//! let replayed = client.apply_replicated_state(server.replicated_state()).unwrap();
//! assert_eq!(replayed, 2);
//! assert_eq!(client.get_current_state(), Player::Jump);
//! ```

pub mod builder;
pub mod callbacks;
pub mod core;
pub mod host;
pub mod machine;
pub mod rules;

// Re-export commonly used types
pub use builder::{BuildError, StateMachineBuilder};
pub use crate::core::{ReplicatedState, StateId, Target};
pub use machine::{MachineConfig, ReplicationMode, StateMachine};
