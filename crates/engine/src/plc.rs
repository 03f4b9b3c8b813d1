// SPDX-License-Identifier: Apache-2.0

//! Standard PLC function blocks: edge detectors, timers, counters.
//!
//! Every block is keyed by a caller-supplied `id` that scopes its state in
//! the [`StateStore`]; time-based blocks advance by the scan delta. Blocks
//! that need an internal edge detector derive its id from the caller id with
//! a block-specific suffix, so a user-level `edge_rise("X")` never aliases a
//! user-level `ctu("X")`.

use crate::state::StateStore;

/// Rising-edge detector: true exactly when `signal` transitions false→true.
pub fn edge_rise(state: &mut StateStore, id: &str, signal: bool) -> bool {
    let key = format!("edge:rise:{id}");
    let prev = state.get_bool(&key, false);
    state.set_bool(key, signal);
    !prev && signal
}

/// Falling-edge detector: true exactly when `signal` transitions true→false.
pub fn edge_fall(state: &mut StateStore, id: &str, signal: bool) -> bool {
    let key = format!("edge:fall:{id}");
    let prev = state.get_bool(&key, false);
    state.set_bool(key, signal);
    prev && !signal
}

/// On-delay timer: true once `input` has been held for `pt_ms`.
pub fn ton(state: &mut StateStore, id: &str, input: bool, pt_ms: u64, delta_ms: u64) -> bool {
    let key = format!("ton:{id}:et");
    if input {
        let et = state.get_int(&key, 0) + i64::try_from(delta_ms).unwrap_or(i64::MAX);
        state.set_int(key, et);
        et >= i64::try_from(pt_ms).unwrap_or(i64::MAX)
    } else {
        state.set_int(key, 0);
        false
    }
}

/// Off-delay timer: true while `input` holds and for `pt_ms` after it drops.
pub fn tof(state: &mut StateStore, id: &str, input: bool, pt_ms: u64, delta_ms: u64) -> bool {
    let key = format!("tof:{id}:et");
    if input {
        state.set_int(key, 0);
        return true;
    }
    let et = state.get_int(&key, 0) + i64::try_from(delta_ms).unwrap_or(i64::MAX);
    state.set_int(key, et);
    et < i64::try_from(pt_ms).unwrap_or(i64::MAX)
}

/// Pulse timer: a rising edge of `input` starts a one-shot `pt_ms` pulse.
/// Edges arriving while the pulse runs are absorbed.
pub fn tp(state: &mut StateStore, id: &str, input: bool, pt_ms: u64, delta_ms: u64) -> bool {
    let rise = edge_rise(state, &format!("tp:{id}:rise"), input);
    let running_key = format!("tp:{id}:running");
    let et_key = format!("tp:{id}:et");
    let mut running = state.get_bool(&running_key, false);
    let mut et = state.get_int(&et_key, 0);
    if rise && !running {
        running = true;
        et = 0;
    }
    if running {
        et += i64::try_from(delta_ms).unwrap_or(i64::MAX);
        if et >= i64::try_from(pt_ms).unwrap_or(i64::MAX) {
            running = false;
        }
    }
    state.set_bool(running_key, running);
    state.set_int(et_key, et);
    running
}

/// Up counter: counts rising edges of `input`; `q` once the count reaches
/// `pv`. `reset` forces the count back to zero. Returns `(q, cv)`.
pub fn ctu(
    state: &mut StateStore,
    id: &str,
    input: bool,
    pv: i64,
    reset: bool,
) -> (bool, i64) {
    let cv_key = format!("ctu:{id}:cv");
    let mut cv = state.get_int(&cv_key, 0);
    if reset {
        cv = 0;
    }
    if edge_rise(state, &format!("ctu:{id}:edge"), input) {
        cv += 1;
    }
    state.set_int(cv_key, cv);
    (cv >= pv, cv)
}

/// Down counter: starts at `pv` (also on `reset`), counts rising edges of
/// `input` downward; `q` once the count reaches zero. Returns `(q, cv)`.
pub fn ctd(
    state: &mut StateStore,
    id: &str,
    input: bool,
    pv: i64,
    reset: bool,
) -> (bool, i64) {
    let cv_key = format!("ctd:{id}:cv");
    let mut cv = state.get_int(&cv_key, pv);
    if reset {
        cv = pv;
    }
    if edge_rise(state, &format!("ctd:{id}:edge"), input) {
        cv -= 1;
    }
    state.set_int(cv_key, cv);
    (cv <= 0, cv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_rise_fires_once_per_transition() {
        let mut state = StateStore::new();
        assert!(edge_rise(&mut state, "x", true));
        assert!(!edge_rise(&mut state, "x", true));
        assert!(!edge_rise(&mut state, "x", false));
        assert!(edge_rise(&mut state, "x", true));
    }

    #[test]
    fn edge_fall_fires_once_per_transition() {
        let mut state = StateStore::new();
        assert!(!edge_fall(&mut state, "x", true));
        assert!(edge_fall(&mut state, "x", false));
        assert!(!edge_fall(&mut state, "x", false));
    }

    #[test]
    fn ton_accumulates_and_resets() {
        let mut state = StateStore::new();
        assert!(!ton(&mut state, "t", true, 30, 10));
        assert!(!ton(&mut state, "t", true, 30, 10));
        assert!(ton(&mut state, "t", true, 30, 10));
        assert!(ton(&mut state, "t", true, 30, 10));
        assert!(!ton(&mut state, "t", false, 30, 10));
        assert!(!ton(&mut state, "t", true, 30, 10));
    }

    #[test]
    fn tof_holds_after_input_drops() {
        let mut state = StateStore::new();
        assert!(tof(&mut state, "t", true, 25, 10));
        assert!(tof(&mut state, "t", false, 25, 10));
        assert!(tof(&mut state, "t", false, 25, 10));
        assert!(!tof(&mut state, "t", false, 25, 10));
    }

    #[test]
    fn tp_pulses_once_and_absorbs_retriggers() {
        let mut state = StateStore::new();
        assert!(tp(&mut state, "p", true, 25, 10));
        // Re-assert input mid-pulse: absorbed.
        assert!(tp(&mut state, "p", false, 25, 10));
        assert!(!tp(&mut state, "p", true, 25, 10));
        // Pulse ended; a fresh rising edge restarts it.
        assert!(!tp(&mut state, "p", false, 25, 10));
        assert!(tp(&mut state, "p", true, 25, 10));
    }

    #[test]
    fn ctu_counts_rising_edges() {
        let mut state = StateStore::new();
        assert_eq!(ctu(&mut state, "c", true, 3, false), (false, 1));
        assert_eq!(ctu(&mut state, "c", true, 3, false), (false, 1));
        assert_eq!(ctu(&mut state, "c", false, 3, false), (false, 1));
        assert_eq!(ctu(&mut state, "c", true, 3, false), (false, 2));
        assert_eq!(ctu(&mut state, "c", false, 3, false), (false, 2));
        assert_eq!(ctu(&mut state, "c", true, 3, false), (true, 3));
        assert_eq!(ctu(&mut state, "c", false, 3, true), (false, 0));
    }

    #[test]
    fn ctd_counts_down_from_preset() {
        let mut state = StateStore::new();
        assert_eq!(ctd(&mut state, "c", true, 2, false), (false, 1));
        assert_eq!(ctd(&mut state, "c", false, 2, false), (false, 1));
        assert_eq!(ctd(&mut state, "c", true, 2, false), (true, 0));
        assert_eq!(ctd(&mut state, "c", false, 2, true), (false, 2));
    }

    #[test]
    fn counter_ids_do_not_alias_user_edges() {
        let mut state = StateStore::new();
        // A user edge detector named like the counter must keep its own
        // transition memory.
        assert!(edge_rise(&mut state, "X", true));
        let (_, cv) = ctu(&mut state, "X", true, 10, false);
        assert_eq!(cv, 1);
        assert!(!edge_rise(&mut state, "X", true));
        let (_, cv) = ctu(&mut state, "X", false, 10, false);
        assert_eq!(cv, 1);
        let (_, cv) = ctu(&mut state, "X", true, 10, false);
        assert_eq!(cv, 2);
    }

    #[test]
    fn blocks_with_distinct_ids_are_independent() {
        let mut state = StateStore::new();
        assert!(!ton(&mut state, "a", true, 20, 10));
        assert!(!ton(&mut state, "b", true, 40, 10));
        assert!(ton(&mut state, "a", true, 20, 10));
        assert!(!ton(&mut state, "b", true, 40, 10));
    }
}
