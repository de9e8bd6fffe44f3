use super::*;

#[cfg(unix)]
#[test]
fn read_direction_streams_child_stdout() {
    let mut handle = spawn(&argv(["sh", "-c", "printf hello"]), Direction::Read, true).unwrap();
    assert_eq!(handle.direction(), Some(Direction::Read));

    let mut out = String::new();
    handle.read_to_string(&mut out).unwrap();
    assert_eq!(out, "hello");

    let status = handle.close().unwrap().expect("first close reaps");
    assert!(status.success());
    assert!(!handle.is_open());
    assert_eq!(handle.direction(), None);
}

#[cfg(unix)]
#[test]
fn write_direction_feeds_child_stdin() {
    let mut handle = spawn(
        &argv(["sh", "-c", "test $(wc -c) -eq 4096"]),
        Direction::Write,
        true,
    )
    .unwrap();
    handle.write_all(&[7u8; 4096]).unwrap();
    let status = handle.close().unwrap().unwrap();
    assert!(status.success(), "child saw a different byte count");
}

#[cfg(unix)]
#[test]
fn close_twice_is_a_noop() {
    let mut handle = spawn(&argv(["sh", "-c", "cat > /dev/null"]), Direction::Write, true).unwrap();
    handle.write_all(b"abc").unwrap();
    assert!(handle.close().unwrap().is_some());
    assert!(handle.close().unwrap().is_none());
    assert!(handle.close().unwrap().is_none());
}

#[cfg(unix)]
#[test]
fn wrong_direction_io_is_rejected() {
    let mut handle = spawn(&argv(["sh", "-c", "true"]), Direction::Read, true).unwrap();
    let err = handle.write(b"x").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    handle.close().unwrap();

    let mut buf = [0u8; 4];
    let err = handle.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Unsupported);
}

#[test]
fn missing_executable_is_a_spawn_error() {
    let err = spawn(
        &argv(["effectgen-definitely-missing-tool"]),
        Direction::Read,
        true,
    )
    .err()
    .expect("spawn must fail");
    assert!(matches!(err, EffectgenError::Spawn(_)));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn empty_argv_is_a_spawn_error() {
    let err = spawn(&[], Direction::Write, false).err().unwrap();
    assert!(matches!(err, EffectgenError::Spawn(_)));
}

#[test]
fn executable_name_uses_platform_suffix() {
    let name = NativeChannel::default().executable_name("ffmpeg");
    let expected = format!("ffmpeg{}", std::env::consts::EXE_SUFFIX);
    assert_eq!(name, OsString::from(expected));
    assert!(!NativeChannel::default().fallback_dirs().is_empty());
}
