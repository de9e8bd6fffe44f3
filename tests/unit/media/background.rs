use std::io::Cursor;
use std::path::PathBuf;

use super::*;

fn res() -> Resolution {
    Resolution::new(2, 2).unwrap()
}

fn frames(values: &[u8]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&v| std::iter::repeat_n(v, res().frame_bytes()))
        .collect()
}

#[test]
fn still_image_short_read_is_fatal() {
    let mut reader = Cursor::new(vec![1u8; 5]);
    let err = BackgroundSource::still_from_reader(res(), &mut reader)
        .err()
        .unwrap();
    match err {
        EffectgenError::ShortRead { expected, got } => {
            assert_eq!(expected, 12);
            assert_eq!(got, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn still_image_repeats_forever() {
    let mut reader = Cursor::new(frames(&[9]));
    let mut src = BackgroundSource::still_from_reader(res(), &mut reader).unwrap();
    assert_eq!(src.kind(), BackgroundKind::Image);
    for _ in 0..3 {
        assert_eq!(src.read_frame(), SourceRead::Frame);
        assert!(src.current().data().iter().all(|&b| b == 9));
    }
}

#[test]
fn video_reads_frames_then_reports_exhaustion() {
    let mut src = BackgroundSource::video_from_reader(res(), Box::new(Cursor::new(frames(&[1, 2]))));
    assert_eq!(src.read_frame(), SourceRead::Frame);
    assert_eq!(src.current().data()[0], 1);
    assert_eq!(src.read_frame(), SourceRead::Frame);
    assert_eq!(src.current().data()[0], 2);
    assert_eq!(src.read_frame(), SourceRead::Exhausted);
    assert!(src.is_exhausted());
    assert_eq!(src.read_frame(), SourceRead::Exhausted);
    assert_eq!(src.frames_read(), 2);
}

#[test]
fn partial_trailing_frame_keeps_last_complete_frame() {
    let mut bytes = frames(&[4]);
    bytes.extend_from_slice(&[200u8; 7]);
    let mut src = BackgroundSource::video_from_reader(res(), Box::new(Cursor::new(bytes)));
    assert_eq!(src.read_frame(), SourceRead::Frame);
    assert_eq!(src.read_frame(), SourceRead::Exhausted);
    assert!(src.current().data().iter().all(|&b| b == 4));
}

#[test]
fn closed_video_is_exhausted() {
    let mut src = BackgroundSource::video_from_reader(res(), Box::new(Cursor::new(frames(&[1]))));
    src.close();
    assert_eq!(src.read_frame(), SourceRead::Exhausted);
}

#[test]
fn decode_args_pin_resolution_rate_and_pixel_layout() {
    let ffmpeg = PathBuf::from("ffmpeg");
    let input = PathBuf::from("in.mov");
    let r = Resolution::new(640, 360).unwrap();

    let video: Vec<String> = video_decode_args(&ffmpeg, &input, r, 24)
        .into_iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect();
    let joined = video.join(" ");
    assert!(joined.contains("scale=640:360:force_original_aspect_ratio=increase,crop=640:360"));
    assert!(joined.contains("-r 24"));
    assert!(joined.ends_with("-f rawvideo -pix_fmt rgb24 -"));

    let image: Vec<String> = image_decode_args(&ffmpeg, &input, r)
        .into_iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect();
    assert!(image.join(" ").contains("-frames:v 1"));
    assert_eq!(image[0], "ffmpeg");
}
