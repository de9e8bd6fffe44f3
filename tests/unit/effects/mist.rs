use super::*;
use crate::foundation::core::Resolution;

fn frame(w: u32, h: u32) -> RawFrame {
    RawFrame::black(Resolution::new(w, h).unwrap())
}

fn dense() -> Mist {
    let mut params = EffectParams::new();
    params.insert("threshold", 0.0);
    params.insert("opacity", 1.0);
    let mut mist = Mist::default();
    mist.configure(&params).unwrap();
    mist.initialize(32, 16, 30).unwrap();
    mist
}

#[test]
fn brightens_black_frame() {
    let mut mist = dense();
    let mut f = frame(32, 16);
    mist.render_frame(&mut f, false, 1.0);
    assert!(f.data().iter().any(|&b| b > 0));
}

#[test]
fn zero_fade_leaves_frame_untouched() {
    let mut mist = dense();
    let mut f = frame(32, 16);
    mist.render_frame(&mut f, true, 0.0);
    assert!(f.data().iter().all(|&b| b == 0));
}

#[test]
fn rendering_is_deterministic_and_moves_over_time() {
    let mut a = dense();
    let mut b = dense();
    let (mut fa, mut fb) = (frame(32, 16), frame(32, 16));
    a.render_frame(&mut fa, false, 1.0);
    b.render_frame(&mut fb, false, 1.0);
    assert_eq!(fa, fb);

    for _ in 0..90 {
        b.update();
    }
    let mut later = frame(32, 16);
    b.render_frame(&mut later, false, 1.0);
    assert_ne!(fa, later);
}

#[test]
fn zero_fps_is_an_init_error() {
    let mut mist = Mist::default();
    let err = mist.initialize(4, 4, 0).unwrap_err();
    assert!(matches!(err, EffectgenError::EffectInit(_)));
}

#[test]
fn fbm_stays_in_unit_range() {
    for i in 0..200 {
        let v = fbm(i as f32 * 0.37 - 20.0, i as f32 * 0.11);
        assert!((0.0..=1.0).contains(&v));
    }
}
