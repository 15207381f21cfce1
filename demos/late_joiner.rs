//! Late Joiner Replay
//!
//! This example demonstrates how a reader that missed several transitions
//! catches up from the replicated history.
//!
//! Key concepts:
//! - One authority writes, readers only observe
//! - The replicated payload carries the last few records plus a counter
//! - The retroactive horizon decides how much history is replayed
//!
//! Run with: cargo run --example late_joiner

use retrostate::host::{ManualClock, SharedAuthority};
use retrostate::{state_enum, MachineConfig, StateMachine};

state_enum! {
    enum Player {
        Idle = 0,
        Run = 1,
        Jump = 2,
    }
}

fn replica(clock: &ManualClock, has_authority: bool, horizon: f64) -> StateMachine<Player> {
    StateMachine::builder()
        .default_state(Player::Idle)
        .config(MachineConfig::replicated().with_horizon(horizon))
        .clock(clock.clone())
        .authority(SharedAuthority::new(has_authority))
        .build()
        .unwrap()
}

fn join(label: &str, clock: &ManualClock, server: &StateMachine<Player>, horizon: f64) {
    let mut client = replica(clock, false, horizon);
    client.on_state_changed(|from, to| println!("    replayed {:?} -> {:?}", from, to));

    println!("{} (horizon {}s):", label, horizon);
    let replayed = client
        .apply_replicated_state(server.replicated_state())
        .unwrap();
    println!(
        "    {} transition(s) replayed, now in {:?}\n",
        replayed,
        client.get_current_state()
    );
}

fn main() {
    println!("=== Late Joiner Replay ===\n");

    let clock = ManualClock::new(0.0);
    let mut server = replica(&clock, true, 7.0);

    server.transition_to(Player::Run);
    clock.set(0.1);
    server.transition_to(Player::Jump);
    clock.set(0.2);
    server.transition_to(Player::Idle);
    clock.set(0.25);

    println!(
        "Server committed {} transitions, current state {:?}\n",
        server.change_count(),
        server.get_current_state()
    );

    join("Client with a generous horizon", &clock, &server, 7.0);
    join("Client with a strict horizon", &clock, &server, 0.05);

    println!("Key Characteristics:");
    println!("- Missed transitions replay oldest first");
    println!("- Stale intermediate steps are dropped past the horizon");
    println!("- The step into the current state is always replayed");

    println!("\n=== Example Complete ===");
}
