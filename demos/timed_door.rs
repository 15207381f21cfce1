//! Timed Door
//!
//! This example demonstrates automatic transitions on a single local
//! machine.
//!
//! Key concepts:
//! - Timed rules that leave a state after a fixed duration
//! - Conditional rules polled every tick
//! - Blocked states and progress callbacks
//!
//! Run with: cargo run --example timed_door

use retrostate::builder::local_machine;
use retrostate::host::ManualClock;
use retrostate::{state_enum, StateMachine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

state_enum! {
    enum Door {
        Closed = 0,
        Opening = 1,
        Open = 2,
        Locked = 3,
    }
}

fn main() {
    println!("=== Timed Door ===\n");

    let clock = ManualClock::new(0.0);
    let mut door = StateMachine::builder()
        .default_state(Door::Closed)
        .clock(clock.clone())
        .build()
        .unwrap();

    let button = Arc::new(AtomicBool::new(false));
    let pressed = Arc::clone(&button);
    door.add_state_transition(
        Door::Closed,
        Door::Opening,
        Some(move || pressed.load(Ordering::SeqCst)),
    );
    door.add_state_transition_after(Door::Opening, Door::Open, 1.0);
    door.add_state_transition_after(Door::Open, Door::Closed, 2.0);

    door.on_transition_tick(Door::Opening, Door::Open, |progress| {
        println!("    opening... {:.0}%", progress * 100.0);
    });
    door.on_state_changed(|from, to| println!("  {:?} -> {:?}", from, to));

    println!("Pressing the button:");
    button.store(true, Ordering::SeqCst);
    for _ in 0..8 {
        clock.advance(0.5);
        door.tick(0.5);
    }
    button.store(false, Ordering::SeqCst);

    println!("\nLocking the door:");
    door.block(Door::Opening);
    button.store(true, Ordering::SeqCst);
    door.tick(0.5);
    println!("  still {:?} while Opening is blocked", door.get_current_state());

    let mut spare = local_machine(Door::Locked).unwrap();
    println!("\nA machine built with local_machine starts in {:?}", spare.get_current_state());
    spare.transition_to(Door::Closed);
    println!("and moves freely: now {:?}", spare.get_current_state());

    println!("\n=== Example Complete ===");
}
