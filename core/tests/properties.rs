//! Property-based tests for the engine's cross-cutting invariants:
//! IR2 nibble conservation, exact serialisation round-trips, and inertness
//! while powered off. Unlike the colocated unit tests, these exercise
//! randomised sequences of macro-ticks and key presses rather than fixed
//! scenarios.

use proptest::prelude::*;

use mk61_core::ik13::Ik13;
use mk61_core::ir2::{Ir2, MTICK_COUNT};
use mk61_core::nibble::Nibble;
use mk61_core::panel::PowerState;
use mk61_core::reader::{RegMem, RegStack};
use mk61_core::rom::RomSet;
use mk61_core::Engine;

/// Byte offset of `ir2_a`'s state inside a buffer written by
/// [`mk61_core::Engine::write_state`]: the 4-byte magic, then the three
/// `IK13` states in fixed role order, ahead of `ir2_a`.
fn ir2_a_offset() -> usize {
    4 + Ik13::state_size() * 3
}

/// Extract the sorted nibble multiset an `IR2`'s `M[]` ring holds from a
/// full engine state buffer, without exposing the engine's private fields.
/// `Ir2::write_state` writes `M[]` first, so the ring's `MTICK_COUNT` nibbles
/// are the leading bytes of its segment.
fn ir2_nibble_multiset(buf: &[u8], ir2_offset: usize) -> Vec<u8> {
    let mut values = buf[ir2_offset..ir2_offset + MTICK_COUNT].to_vec();
    values.sort_unstable();
    values
}

fn all_reg_stack() -> [RegStack; 5] {
    [RegStack::X1, RegStack::X, RegStack::Y, RegStack::Z, RegStack::T]
}

fn all_reg_mem() -> [RegMem; 15] {
    use RegMem::{R0, R1, R2, R3, R4, R5, R6, R7, R8, R9, Ra, Rb, Rc, Rd, Re};
    [R0, R1, R2, R3, R4, R5, R6, R7, R8, R9, Ra, Rb, Rc, Rd, Re]
}

fn snapshot(engine: &Engine) -> Vec<String> {
    let mut out: Vec<String> = all_reg_stack()
        .into_iter()
        .map(|r| engine.get_reg_stack_str(r))
        .collect();
    out.extend(all_reg_mem().into_iter().map(|r| engine.get_reg_mem_str(r)));
    out.push(engine.get_indicator_str());
    out.push(engine.get_prog_counter_str());
    out
}

proptest! {
    /// Invariant: while powered off, no sequence of macro-ticks changes any
    /// public accessor's output.
    #[test]
    fn power_off_inertness(step_count in 0usize..50) {
        let mut engine = Engine::new(RomSet::default());
        let before = snapshot(&engine);

        for _ in 0..step_count {
            engine.do_step();
        }

        prop_assert_eq!(snapshot(&engine), before);
        prop_assert!(!engine.is_output_required());
    }

    /// Invariant: writing then reading an engine's state restores a state
    /// indistinguishable from the original through every public accessor,
    /// regardless of how many macro-ticks and key presses produced it.
    #[test]
    fn serialisation_round_trips_after_arbitrary_activity(
        key1s in prop::collection::vec(0i32..16, 0..10),
        step_count in 0usize..10,
    ) {
        let mut engine = Engine::new(RomSet::default());
        engine.set_power_state(PowerState::On);

        for key1 in key1s {
            let _ = engine.do_key_press(key1, 1);
            engine.do_step();
        }
        for _ in 0..step_count {
            engine.do_step();
        }

        let mut buf = Vec::new();
        engine.write_state(&mut buf).unwrap();

        let mut restored = Engine::new(RomSet::default());
        restored.read_state(&mut &buf[..]).unwrap();

        prop_assert_eq!(snapshot(&restored), snapshot(&engine));
        prop_assert_eq!(restored.get_angle_unit(), engine.get_angle_unit());
        prop_assert_eq!(restored.get_power_state(), engine.get_power_state());
        prop_assert_eq!(restored.is_running(), engine.is_running());
        prop_assert_eq!(restored.is_output_required(), engine.is_output_required());
    }

    /// Invariant: an IR2's memory ring only ever rotates, so the multiset of
    /// nibbles it holds never changes no matter how many micro-ticks a
    /// closed feedback loop runs for.
    #[test]
    fn ir2_conservation_across_arbitrary_rotation(
        seed in prop::collection::vec(0u8..10, MTICK_COUNT),
        extra_ticks in 0usize..(MTICK_COUNT * 3),
    ) {
        let mut ir2 = Ir2::new();
        // Load the seed values into the ring: one tick per position.
        for value in &seed {
            ir2.set_input(Nibble::new(*value));
            ir2.tick();
        }

        // Close the loop (feed each output straight back in) and walk one
        // full cycle to capture the ring's current multiset.
        let mut before: Vec<u8> = Vec::with_capacity(MTICK_COUNT);
        for _ in 0..MTICK_COUNT {
            let out = ir2.output();
            before.push(out.value());
            ir2.set_input(out);
            ir2.tick();
        }
        before.sort_unstable();

        for _ in 0..extra_ticks {
            let out = ir2.output();
            ir2.set_input(out);
            ir2.tick();
        }

        let mut after: Vec<u8> = Vec::with_capacity(MTICK_COUNT);
        for _ in 0..MTICK_COUNT {
            let out = ir2.output();
            after.push(out.value());
            ir2.set_input(out);
            ir2.tick();
        }
        after.sort_unstable();

        prop_assert_eq!(before, after);
    }

    /// Invariant: across a macro-tick of the real `IK1302`-`IR2`-`IK1303`-`IR2`-`IK1306`
    /// ring, both `IR2`s only ever rotate, the same as the closed-loop case
    /// above — the wiring inside `Engine`/`Ring` doesn't inject or drop
    /// nibbles anywhere along the way.
    #[test]
    fn ir2_conservation_across_the_wired_ring(
        key1s in prop::collection::vec(0i32..16, 0..10),
        step_count in 0usize..10,
    ) {
        let mut engine = Engine::new(RomSet::default());
        engine.set_power_state(PowerState::On);

        let mut before_buf = Vec::new();
        engine.write_state(&mut before_buf).unwrap();
        let ir2_a_before = ir2_nibble_multiset(&before_buf, ir2_a_offset());
        let ir2_b_before = ir2_nibble_multiset(&before_buf, ir2_a_offset() + Ir2::state_size());

        for key1 in key1s {
            let _ = engine.do_key_press(key1, 1);
            engine.do_step();
        }
        for _ in 0..step_count {
            engine.do_step();
        }

        let mut after_buf = Vec::new();
        engine.write_state(&mut after_buf).unwrap();
        let ir2_a_after = ir2_nibble_multiset(&after_buf, ir2_a_offset());
        let ir2_b_after = ir2_nibble_multiset(&after_buf, ir2_a_offset() + Ir2::state_size());

        prop_assert_eq!(ir2_a_before, ir2_a_after);
        prop_assert_eq!(ir2_b_before, ir2_b_after);
    }
}
