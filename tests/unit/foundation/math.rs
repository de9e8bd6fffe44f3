use super::*;

#[test]
fn splitmix_is_deterministic_per_seed() {
    let mut a = SplitMix64::new(42);
    let mut b = SplitMix64::new(42);
    let mut c = SplitMix64::new(43);
    let va: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
    let vb: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
    let vc: Vec<u64> = (0..4).map(|_| c.next_u64()).collect();
    assert_eq!(va, vb);
    assert_ne!(va, vc);
}

#[test]
fn splitmix_floats_stay_in_range() {
    let mut rng = SplitMix64::new(7);
    for _ in 0..1000 {
        let v = rng.next_f32();
        assert!((0.0..1.0).contains(&v));
        let r = rng.range_f32(-2.0, 3.0);
        assert!((-2.0..3.0).contains(&r));
    }
}

#[test]
fn hash2_is_unit_range() {
    for x in -20..20 {
        for y in -20..20 {
            let h = hash2(x, y);
            assert!((0.0..=1.0).contains(&h));
        }
    }
    assert_eq!(hash2(3, 4), hash2(3, 4));
}

#[test]
fn smoothstep_and_lerp_endpoints() {
    assert_eq!(smoothstep(-1.0), 0.0);
    assert_eq!(smoothstep(2.0), 1.0);
    assert_eq!(smoothstep(0.5), 0.5);
    assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    assert_eq!(unit_to_u8(1.2), 255);
    assert_eq!(unit_to_u8(-0.1), 0);
}
