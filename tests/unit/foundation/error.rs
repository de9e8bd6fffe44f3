use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        EffectgenError::setup("x")
            .to_string()
            .contains("setup error:")
    );
    assert!(
        EffectgenError::spawn("x")
            .to_string()
            .contains("spawn error:")
    );
    assert!(
        EffectgenError::effect_init("x")
            .to_string()
            .contains("effect init error:")
    );
    assert!(
        EffectgenError::encode("x")
            .to_string()
            .contains("encode error:")
    );
    assert!(
        EffectgenError::config("x")
            .to_string()
            .contains("config error:")
    );
}

#[test]
fn short_read_reports_both_sizes() {
    let msg = EffectgenError::ShortRead {
        expected: 12,
        got: 5,
    }
    .to_string();
    assert!(msg.contains("12"));
    assert!(msg.contains('5'));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = EffectgenError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
