use super::*;

fn settings(fps: u32, duration: Option<f64>) -> PlanSettings {
    PlanSettings {
        fps,
        duration,
        fade: 0.0,
        warmup: 0.0,
    }
}

fn never_probe() -> Option<f64> {
    panic!("probe must not run")
}

#[test]
fn explicit_duration_is_rounded_frames() {
    let plan = resolve_run_plan(&settings(30, Some(5.0)), None, never_probe).unwrap();
    assert_eq!(plan.total, TotalFrames::Bounded(150));

    let plan = resolve_run_plan(&settings(24, Some(1.02)), None, never_probe).unwrap();
    assert_eq!(plan.total, TotalFrames::Bounded(24));
}

#[test]
fn explicit_duration_wins_over_video() {
    let plan = resolve_run_plan(
        &settings(30, Some(2.0)),
        Some(BackgroundKind::Video),
        never_probe,
    )
    .unwrap();
    assert_eq!(plan.total, TotalFrames::Bounded(60));
}

#[test]
fn probed_video_duration_sets_total() {
    let plan =
        resolve_run_plan(&settings(30, None), Some(BackgroundKind::Video), || Some(4.0)).unwrap();
    assert_eq!(plan.total, TotalFrames::Bounded(120));
}

#[test]
fn failed_probe_means_unbounded() {
    let plan =
        resolve_run_plan(&settings(30, None), Some(BackgroundKind::Video), || None).unwrap();
    assert_eq!(plan.total, TotalFrames::Unbounded);
    assert_eq!(plan.bounded_total(), None);
    assert_eq!(plan.total_or_current(FrameIndex(41)), 42);
}

#[test]
fn no_duration_source_is_setup_error() {
    let err = resolve_run_plan(&settings(30, None), None, never_probe).unwrap_err();
    assert!(matches!(err, EffectgenError::Setup(_)));

    let err = resolve_run_plan(&settings(30, None), Some(BackgroundKind::Image), never_probe)
        .unwrap_err();
    assert!(matches!(err, EffectgenError::Setup(_)));
}

#[test]
fn invalid_timing_is_rejected() {
    assert!(resolve_run_plan(&settings(0, Some(1.0)), None, never_probe).is_err());
    assert!(resolve_run_plan(&settings(30, Some(0.0)), None, never_probe).is_err());
    assert!(resolve_run_plan(&settings(30, Some(-1.0)), None, never_probe).is_err());
    assert!(resolve_run_plan(&settings(30, Some(0.001)), None, never_probe).is_err());

    let mut s = settings(30, Some(1.0));
    s.fade = -0.5;
    assert!(resolve_run_plan(&s, None, never_probe).is_err());
}

#[test]
fn warmup_rounds_and_fade_truncates() {
    let mut s = settings(30, Some(10.0));
    s.warmup = 1.49;
    s.fade = 0.99;
    let plan = resolve_run_plan(&s, None, never_probe).unwrap();
    assert_eq!(plan.warmup_frames, 45);
    assert_eq!(plan.fade_frames, 29);
}

#[test]
fn fade_envelope_ramps_in_and_out() {
    let mut s = settings(30, Some(10.0));
    s.fade = 1.0;
    let plan = resolve_run_plan(&s, None, never_probe).unwrap();
    assert_eq!(plan.total, TotalFrames::Bounded(300));

    assert_eq!(plan.fade_envelope(FrameIndex(0)), 0.0);
    assert!((plan.fade_envelope(FrameIndex(15)) - 0.5).abs() < 1e-6);
    assert_eq!(plan.fade_envelope(FrameIndex(30)), 1.0);
    assert_eq!(plan.fade_envelope(FrameIndex(150)), 1.0);
    assert_eq!(plan.fade_envelope(FrameIndex(270)), 1.0);
    assert!((plan.fade_envelope(FrameIndex(285)) - 0.5).abs() < 1e-6);
    assert!((plan.fade_envelope(FrameIndex(299)) - 1.0 / 30.0).abs() < 1e-6);
}

#[test]
fn unbounded_runs_only_fade_in() {
    let plan = RunPlan {
        total: TotalFrames::Unbounded,
        warmup_frames: 0,
        fade_frames: 10,
    };
    assert_eq!(plan.fade_envelope(FrameIndex(5)), 0.5);
    assert_eq!(plan.fade_envelope(FrameIndex(10_000)), 1.0);
    assert_eq!(plan.collector_fade(FrameIndex(5), false), None);
}

#[test]
fn fade_multiplier_depends_on_background() {
    let plan = RunPlan {
        total: TotalFrames::Bounded(100),
        warmup_frames: 0,
        fade_frames: 10,
    };
    assert_eq!(plan.stage_fade(FrameIndex(5), true, 0.8), 0.4);
    assert_eq!(plan.stage_fade(FrameIndex(5), false, 0.8), 0.8);
    assert_eq!(plan.collector_fade(FrameIndex(5), false), Some(0.5));
    assert_eq!(plan.collector_fade(FrameIndex(5), true), None);

    let no_fade = RunPlan {
        fade_frames: 0,
        ..plan
    };
    assert_eq!(no_fade.collector_fade(FrameIndex(5), false), None);
    assert_eq!(no_fade.fade_envelope(FrameIndex(0)), 1.0);
}
