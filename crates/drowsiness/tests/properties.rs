//! Property tests for the escalation state machine

use std::time::{Duration, Instant};

use drowsiness::{
    ControlEvent, Mode, MonitorConfig, NoFacePolicy, PerceptionSample, PostAlarmPolicy,
    RecoveryPolicy, StepModel, SystemController,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Input {
    Sample { face_present: bool, eyes_open_count: u8, gap_ms: u64 },
    Tick { gap_ms: u64 },
    TestAlarm,
    Reset,
}

fn arb_input() -> impl Strategy<Value = Input> {
    prop_oneof![
        20 => (any::<bool>(), 0u8..=3, 0u64..200).prop_map(
            |(face_present, eyes_open_count, gap_ms)| Input::Sample {
                face_present,
                eyes_open_count,
                gap_ms,
            }
        ),
        3 => (0u64..2000).prop_map(|gap_ms| Input::Tick { gap_ms }),
        1 => Just(Input::TestAlarm),
        1 => Just(Input::Reset),
    ]
}

fn arb_config() -> impl Strategy<Value = MonitorConfig> {
    (
        prop_oneof![
            Just(RecoveryPolicy::FullReset),
            (1u32..20).prop_map(|step| RecoveryPolicy::Decay { step }),
        ],
        prop_oneof![Just(NoFacePolicy::Freeze), Just(NoFacePolicy::TreatAsClosed)],
        prop_oneof![
            Just(PostAlarmPolicy::ResetToZero),
            Just(PostAlarmPolicy::ResetToHalfThreshold),
        ],
        prop_oneof![
            Just(StepModel::Stepped { steps: 6, step_seconds: 2.5 }),
            Just(StepModel::Continuous { duration_seconds: 10.0 }),
        ],
        1u32..5,
        0.2f64..2.0,
    )
        .prop_map(
            |(recovery, no_face, post_alarm, step_model, max_alarms, alarm_seconds)| MonitorConfig {
                recovery,
                no_face,
                post_alarm,
                step_model,
                max_alarms,
                alarm_seconds,
                ..MonitorConfig::default()
            },
        )
}

proptest! {
    #[test]
    fn alarm_invariants_hold(
        config in arb_config(),
        inputs in prop::collection::vec(arb_input(), 0..600),
    ) {
        let cooldown = config.alarm_cooldown();
        let max_alarms = config.max_alarms;
        let mut controller = SystemController::new(config).unwrap();
        let mut clock = Instant::now();
        let mut last_auto_alarm: Option<Instant> = None;
        let mut last_count = 0;
        let mut stopped_events = 0;

        for input in inputs {
            let before = controller.alarm_count();
            let event = match input {
                Input::Sample { face_present, eyes_open_count, gap_ms } => {
                    clock += Duration::from_millis(gap_ms);
                    let sample = PerceptionSample::new(clock, face_present, eyes_open_count);
                    let event = controller.on_sample(sample);
                    if event.is_some_and(|e| e.triggers_audio()) {
                        if let Some(last) = last_auto_alarm {
                            prop_assert!(clock.duration_since(last) > cooldown);
                        }
                        last_auto_alarm = Some(clock);
                    }
                    event
                }
                Input::Tick { gap_ms } => {
                    clock += Duration::from_millis(gap_ms);
                    controller.on_tick(clock)
                }
                Input::TestAlarm => {
                    let event = controller.manual_test_alarm(clock);
                    if event.is_some() {
                        last_auto_alarm = Some(clock);
                    }
                    event
                }
                Input::Reset => {
                    controller.reset();
                    last_auto_alarm = None;
                    last_count = 0;
                    stopped_events = 0;
                    prop_assert_eq!(controller.alarm_count(), 0);
                    prop_assert_eq!(controller.mode(), Mode::Normal);
                    prop_assert_eq!(controller.closed_duration_frames(), 0);
                    continue;
                }
            };

            let count = controller.alarm_count();
            prop_assert!(count >= last_count);
            prop_assert!(count <= max_alarms);
            last_count = count;

            match event {
                Some(ControlEvent::EmergencyStarted { alarm_count, .. }) => {
                    prop_assert_eq!(alarm_count, max_alarms);
                    prop_assert!(controller.is_emergency());
                }
                Some(ControlEvent::AlarmFired { alarm_count, .. }) => {
                    prop_assert_eq!(alarm_count, before + 1);
                    prop_assert!(alarm_count < max_alarms);
                    prop_assert!(!controller.is_emergency());
                }
                Some(ControlEvent::VehicleStopped { .. }) => {
                    stopped_events += 1;
                    prop_assert_eq!(stopped_events, 1);
                }
                None => {}
            }

            prop_assert_eq!(controller.is_emergency(), count == max_alarms);
        }
    }

    #[test]
    fn alternating_eyes_never_alarm(frames in 1usize..2000) {
        let mut controller = SystemController::new(MonitorConfig::default()).unwrap();
        let mut clock = Instant::now();

        for i in 0..frames {
            clock += Duration::from_millis(33);
            let eyes = if i % 2 == 0 { 0 } else { 2 };
            prop_assert!(controller.on_sample(PerceptionSample::new(clock, true, eyes)).is_none());
            prop_assert!(controller.closed_duration_frames() <= 1);
        }
    }
}
