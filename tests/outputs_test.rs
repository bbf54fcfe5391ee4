//! Output shaping: monoflop refresh pattern, EVSE gating and the disabled
//! bypass.

mod common;

use std::time::Duration;

use common::{fast_config, Rig, TICK};
use triphase::selector::OperatingMode;
use triphase::sim::RelayCall;
use triphase::switcher::SequencerState;

#[test]
fn disabled_module_bypasses_all_three_phases() {
    let mut rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, false));
    rig.connect_vehicle();
    rig.evse.set_relay_output(true);
    rig.tick();

    assert_eq!(rig.switcher.sequencer_state(), SequencerState::Inactive);
    assert_eq!(rig.switcher.requested_phases(), 0);
    // Bypass: the charger behaves as a plain three-phase charger
    assert_eq!(rig.relay.channels(), [false, true, true, true]);
}

#[test]
fn energized_channels_are_refreshed_monoflops() {
    let mut rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, false));
    rig.connect_vehicle();
    rig.evse.set_relay_output(true);
    rig.tick();

    rig.relay.clear_calls();
    let ticks = 8u32;
    for _ in 0..ticks {
        rig.sync_contactor_feedback();
        rig.tick();
    }

    let calls = rig.relay.calls();
    for channel in 1..=3usize {
        let refreshes = calls
            .iter()
            .filter(|c| {
                matches!(c, RelayCall::Monoflop { channel: ch, on: true, duration_ms } if *ch == channel && *duration_ms == 2000)
            })
            .count();
        // One refresh per tick; the pulse outlives the refresh interval by 8x
        assert_eq!(refreshes, ticks as usize);
    }
    assert!(TICK.as_millis() * 2 <= 2000);

    // The unused channel is held off with a steady command
    assert!(calls
        .iter()
        .any(|c| matches!(c, RelayCall::Steady { channel: 0, on: false })));
}

#[test]
fn channels_follow_committed_phase_count() {
    let mut rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    rig.connect_vehicle();
    rig.tick();
    rig.set_power(3000); // two phases in 1/2/3-dynamic
    assert_eq!(rig.switcher.requested_phases_pending(), 2);

    rig.run_for(Duration::from_secs(11));
    rig.evse_reports_charging();
    rig.tick();
    assert_eq!(rig.switcher.sequencer_state(), SequencerState::Active);
    assert_eq!(rig.switcher.requested_phases(), 2);
    assert_eq!(rig.relay.channels(), [false, true, true, false]);
}

#[test]
fn outputs_gated_on_evse_relay_output() {
    let mut rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    rig.connect_vehicle();
    rig.tick();
    rig.set_power(5000);
    rig.run_for(Duration::from_secs(11));

    // Committed three phases, but the EVSE has not closed its contactor yet
    assert_eq!(rig.switcher.requested_phases(), 3);
    assert_eq!(rig.relay.channels(), [false, false, false, false]);

    rig.evse_reports_charging();
    rig.tick();
    assert_eq!(rig.relay.channels(), [false, true, true, true]);

    rig.evse.set_relay_output(false);
    rig.sync_contactor_feedback();
    rig.tick();
    assert_eq!(rig.relay.channels(), [false, false, false, false]);
}

#[test]
fn relay_write_failure_aborts_tick_without_state_change() {
    let mut rig = Rig::new(fast_config(OperatingMode::OneTwoThreePhasesDynamic, true));
    rig.connect_vehicle();
    rig.tick();
    assert_eq!(rig.switcher.sequencer_state(), SequencerState::Standby);

    rig.relay.set_fail(true);
    rig.run_for(Duration::from_secs(1));
    assert_eq!(rig.switcher.sequencer_state(), SequencerState::Standby);
    assert!(!rig.switcher.contactor_error());

    rig.relay.set_fail(false);
    rig.run_for(Duration::from_secs(1));
    assert_eq!(rig.switcher.sequencer_state(), SequencerState::Standby);
}
