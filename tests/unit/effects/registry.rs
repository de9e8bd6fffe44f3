use super::*;
use crate::foundation::core::Resolution;

#[test]
fn builtin_names_are_sorted() {
    let reg = EffectRegistry::builtin();
    assert_eq!(reg.names(), vec!["loopfade", "mist", "starfield"]);
}

#[test]
fn describe_reports_options() {
    let reg = EffectRegistry::builtin();
    let info = reg.describe("mist").unwrap();
    assert_eq!(info.name, "mist");
    assert!(!info.description.is_empty());
    let opacity = info.options.iter().find(|o| o.name == "opacity").unwrap();
    assert_eq!(opacity.kind, OptionKind::Float);
    assert_eq!(opacity.range, Some((0.0, 2.0)));
    assert!(reg.describe("nope").is_none());
}

#[test]
fn describe_serializes_as_json() {
    let info = EffectRegistry::builtin().describe("starfield").unwrap();
    let v = serde_json::to_value(&info).unwrap();
    assert_eq!(v["name"], "starfield");
    let shape = v["options"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["name"] == "shape")
        .unwrap();
    assert_eq!(shape["kind"], "string");
    assert!(shape.get("range").is_none());
}

#[test]
fn create_rejects_unknown_effect_and_keys() {
    let reg = EffectRegistry::builtin();
    let err = reg.create("fireworks", &EffectParams::new()).err().unwrap();
    assert!(matches!(err, EffectgenError::Config(_)));
    assert!(err.to_string().contains("available: loopfade, mist, starfield"));

    let mut params = EffectParams::new();
    params.insert("brightness", 1.0);
    let err = reg.create("mist", &params).err().unwrap();
    assert!(err.to_string().contains("no parameter 'brightness'"));
}

#[test]
fn create_enforces_ranges_and_types() {
    let reg = EffectRegistry::builtin();
    let mut params = EffectParams::new();
    params.insert("opacity", 5.0);
    let err = reg.create("mist", &params).err().unwrap();
    assert!(err.to_string().contains("outside"));

    let mut params = EffectParams::new();
    params.insert("opacity", "thick");
    assert!(reg.create("mist", &params).is_err());

    let mut params = EffectParams::new();
    params.insert("opacity", "0.5");
    assert!(reg.create("mist", &params).is_ok());
}

#[test]
fn param_getters_accept_strings_and_defaults() {
    let mut params = EffectParams::new();
    params.insert("a", "2.5");
    params.insert("n", 12);
    params.insert("frac", 1.5);
    params.insert("s", "round");
    assert_eq!(params.f64_or("a", 0.0).unwrap(), 2.5);
    assert_eq!(params.f32_or("missing", 3.0).unwrap(), 3.0);
    assert_eq!(params.u32_or("n", 0).unwrap(), 12);
    assert!(params.u32_or("frac", 0).is_err());
    assert_eq!(params.string_or("s", "x"), "round");
    assert_eq!(params.string_or("n", "x"), "12");
    assert_eq!(params.string_or("missing", "x"), "x");
}

struct Counter {
    updates: u32,
}

impl Effect for Counter {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn description(&self) -> &'static str {
        "counts updates"
    }

    fn initialize(&mut self, _w: u32, _h: u32, _fps: u32) -> EffectgenResult<()> {
        Ok(())
    }

    fn render_frame(&mut self, _frame: &mut RawFrame, _bg: bool, _fade: f32) {}

    fn update(&mut self) {
        self.updates += 1;
    }
}

#[test]
fn custom_effects_get_trait_defaults() {
    let mut reg = EffectRegistry::empty();
    reg.register(|| Box::new(Counter { updates: 0 }));
    assert_eq!(reg.names(), vec!["counter"]);

    let mut fx = reg.create("counter", &EffectParams::new()).unwrap();
    assert!(fx.options().is_empty());
    fx.set_total_frames(10);
    fx.set_global_warmup_seconds(1.0);
    fx.initialize(2, 2, 30).unwrap();
    let mut frame = RawFrame::black(Resolution::new(2, 2).unwrap());
    assert_eq!(
        fx.post_process(&mut frame, FrameIndex(0), 10),
        PostProcess::Keep
    );
}
