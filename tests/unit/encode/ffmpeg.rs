use super::*;
use crate::foundation::core::Resolution;

fn cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: 30,
    }
}

fn args_of(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<String> {
    encoder_args(opts, cfg)
        .into_iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect()
}

fn contains_seq(haystack: &[String], needle: &[&str]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.iter().zip(needle).all(|(a, b)| a == b))
}

#[test]
fn profile_follows_extension() {
    assert_eq!(
        CodecProfile::from_path(Path::new("out.MP4")),
        CodecProfile::H264 { faststart: true }
    );
    assert_eq!(
        CodecProfile::from_path(Path::new("a/b.mov")),
        CodecProfile::H264 { faststart: true }
    );
    assert_eq!(
        CodecProfile::from_path(Path::new("clip.mkv")),
        CodecProfile::H264 { faststart: false }
    );
    assert_eq!(CodecProfile::from_path(Path::new("clip.webm")), CodecProfile::Vp9);
    assert_eq!(CodecProfile::from_path(Path::new("loop.gif")), CodecProfile::Gif);
    assert_eq!(
        CodecProfile::from_path(Path::new("noext")),
        CodecProfile::H264 { faststart: false }
    );
}

#[test]
fn default_args_frame_raw_rgb_on_stdin() {
    let opts = FfmpegSinkOpts::new("ffmpeg", "out/clip.mp4");
    let args = args_of(&opts, &cfg(640, 360));
    assert_eq!(args[0], "ffmpeg");
    assert_eq!(args[1], "-n");
    assert!(contains_seq(
        &args,
        &[
            "-f",
            "rawvideo",
            "-pixel_format",
            "rgb24",
            "-video_size",
            "640x360",
            "-framerate",
            "30",
            "-i",
            "-"
        ]
    ));
    assert!(contains_seq(&args, &["-c:v", "libx264", "-preset", "medium", "-crf", "23"]));
    assert!(contains_seq(&args, &["-pix_fmt", "yuv420p"]));
    assert!(contains_seq(&args, &["-movflags", "+faststart"]));
    assert!(!args.iter().any(|a| a == "-shortest"));
    assert_eq!(args.last().map(String::as_str), Some("out/clip.mp4"));
}

#[test]
fn overwrite_and_crf_are_applied() {
    let mut opts = FfmpegSinkOpts::new("ffmpeg", "clip.webm");
    opts.overwrite = true;
    opts.crf = 31;
    let args = args_of(&opts, &cfg(320, 240));
    assert_eq!(args[1], "-y");
    assert!(contains_seq(&args, &["-c:v", "libvpx-vp9", "-crf", "31", "-b:v", "0"]));
    assert!(!args.iter().any(|a| a == "-movflags"));
}

#[test]
fn custom_params_replace_codec_args_only() {
    let mut opts = FfmpegSinkOpts::new("ffmpeg", "clip.mp4");
    opts.encoder_params = Some("-c:v libx265 -x265-params \"log-level=error\"".to_string());
    let args = args_of(&opts, &cfg(320, 240));
    assert!(contains_seq(&args, &["-video_size", "320x240"]));
    assert!(contains_seq(
        &args,
        &["-c:v", "libx265", "-x265-params", "log-level=error"]
    ));
    assert!(!args.iter().any(|a| a == "libx264"));
    assert_eq!(args.last().map(String::as_str), Some("clip.mp4"));
}

#[test]
fn audio_passthrough_maps_optional_stream() {
    let mut opts = FfmpegSinkOpts::new("ffmpeg", "clip.mp4");
    opts.audio = Some(AudioPassthrough {
        source: PathBuf::from("bg.mov"),
        codec: "aac".to_string(),
        bitrate_kbps: Some(192),
    });
    let args = args_of(&opts, &cfg(320, 240));
    assert!(contains_seq(
        &args,
        &["-i", "bg.mov", "-map", "0:v:0", "-map", "1:a:0?"]
    ));
    assert!(contains_seq(&args, &["-c:a", "aac", "-b:a", "192k"]));
    assert!(args.iter().any(|a| a == "-shortest"));
}

#[test]
fn split_params_honors_quotes() {
    assert_eq!(
        split_params("  -c:v libx264   -vf 'scale=1:2, fps=3' -metadata \"title=a b\" "),
        vec!["-c:v", "libx264", "-vf", "scale=1:2, fps=3", "-metadata", "title=a b"]
    );
    assert_eq!(split_params("''"), vec![String::new()]);
    assert!(split_params("   ").is_empty());
    assert_eq!(split_params("a 'b c"), vec!["a", "b c"]);
}

#[test]
fn begin_rejects_odd_dimensions_for_yuv420p() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(
        "ffmpeg-not-used",
        "target/ffmpeg_sink_odd/out.mp4",
    ));
    let err = sink.begin(cfg(641, 360)).unwrap_err();
    assert!(matches!(err, EffectgenError::Setup(_)));
}

#[test]
fn begin_rejects_zero_size_and_fps() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("ffmpeg-not-used", "out.mp4"));
    assert!(sink.begin(cfg(0, 360)).is_err());
    let zero_fps = SinkConfig {
        width: 2,
        height: 2,
        fps: 0,
    };
    assert!(sink.begin(zero_fps).is_err());
}

#[test]
fn begin_refuses_existing_output_without_overwrite() {
    let dir = PathBuf::from("target").join("ffmpeg_sink_existing");
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("exists.mp4");
    std::fs::write(&out, b"x").unwrap();

    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("ffmpeg-not-used", &out));
    let err = sink.begin(cfg(4, 4)).unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn missing_encoder_is_a_spawn_error() {
    let dir = PathBuf::from("target").join("ffmpeg_sink_missing");
    let mut opts = FfmpegSinkOpts::new("/definitely/not/here/ffmpeg", dir.join("out.mp4"));
    opts.overwrite = true;
    let mut sink = FfmpegSink::new(opts);
    let err = sink.begin(cfg(4, 4)).unwrap_err();
    assert!(matches!(err, EffectgenError::Spawn(_)));
    assert!(dir.is_dir());
}

#[test]
fn push_before_begin_fails_and_end_is_noop() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("ffmpeg-not-used", "out.mp4"));
    let res = Resolution::new(2, 2).unwrap();
    assert!(sink.push_frame(FrameIndex(0), &RawFrame::black(res)).is_err());
    sink.end().unwrap();
}

#[cfg(unix)]
#[test]
fn frames_stream_into_child_and_order_is_enforced() {
    // Stub encoder: swallows stdin, ignores its arguments.
    let dir = PathBuf::from("target").join("ffmpeg_sink_stub");
    std::fs::create_dir_all(&dir).unwrap();
    let stub = dir.join("fake-ffmpeg");
    std::fs::write(&stub, "#!/bin/sh\ncat > /dev/null\n").unwrap();
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let mut opts = FfmpegSinkOpts::new(&stub, dir.join("out.mp4"));
    opts.overwrite = true;
    let mut sink = FfmpegSink::new(opts);
    sink.begin(cfg(4, 2)).unwrap();

    let res = Resolution::new(4, 2).unwrap();
    let frame = RawFrame::black(res);
    sink.push_frame(FrameIndex(0), &frame).unwrap();
    sink.push_frame(FrameIndex(2), &frame).unwrap();
    assert!(sink.push_frame(FrameIndex(2), &frame).is_err());

    let wrong = RawFrame::black(Resolution::new(2, 2).unwrap());
    assert!(sink.push_frame(FrameIndex(3), &wrong).is_err());
    sink.end().unwrap();
}

#[cfg(unix)]
#[test]
fn nonzero_encoder_exit_fails_end() {
    let dir = PathBuf::from("target").join("ffmpeg_sink_fail");
    std::fs::create_dir_all(&dir).unwrap();
    let stub = dir.join("failing-ffmpeg");
    std::fs::write(&stub, "#!/bin/sh\ncat > /dev/null\nexit 3\n").unwrap();
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let mut opts = FfmpegSinkOpts::new(&stub, dir.join("out.mp4"));
    opts.overwrite = true;
    let mut sink = FfmpegSink::new(opts);
    sink.begin(cfg(2, 2)).unwrap();
    sink.push_frame(FrameIndex(0), &RawFrame::black(Resolution::new(2, 2).unwrap()))
        .unwrap();
    let err = sink.end().unwrap_err();
    assert!(matches!(err, EffectgenError::Encode(_)));
}
