use std::fs;

use imgsdk_codec::StandardCodec;
use imgsdk_core::{Bitmap, CodecError, ImageCodec, PixelFormat, SdkError};
use imgsdk_runtime_glow::BuiltinShaders;

use crate::{gradient, temp_path, write_png, FakeEgl};

#[test]
fn png_round_trip_is_lossless() {
    let codec = StandardCodec::default();
    let path = temp_path("codec_png", "png");
    let bitmap = gradient(64, 64);

    codec.encode(&path, &bitmap).expect("encode png");
    let back = codec.decode(&path).expect("decode png");
    assert_eq!(back, bitmap);

    let _ = fs::remove_file(path);
}

#[test]
fn jpeg_output_drops_alpha_and_stays_close() {
    let codec = StandardCodec::with_jpeg_quality(95);
    let path = temp_path("codec_jpeg", "JPG");
    let bitmap = gradient(32, 32);

    codec.encode(&path, &bitmap).expect("encode jpeg");
    let back = codec.decode(&path).expect("decode jpeg");
    assert_eq!(back.format(), PixelFormat::Rgb24);
    assert_eq!((back.width(), back.height()), (32, 32));

    let max_diff = bitmap
        .bytes()
        .chunks_exact(4)
        .zip(back.bytes().chunks_exact(3))
        .flat_map(|(a, b)| (0..3).map(move |i| a[i].abs_diff(b[i])))
        .max()
        .unwrap_or(0);
    assert!(max_diff <= 24, "jpeg drifted by {max_diff}");

    let _ = fs::remove_file(path);
}

#[test]
fn gray_images_stay_gray() {
    let codec = StandardCodec::default();
    let path = temp_path("codec_gray", "png");
    let bitmap = Bitmap::new(PixelFormat::Gray, 3, 2, vec![0, 50, 100, 150, 200, 250])
        .expect("gray bitmap");
    codec.encode(&path, &bitmap).expect("encode");
    assert_eq!(codec.decode(&path).expect("decode"), bitmap);
    let _ = fs::remove_file(path);
}

#[test]
fn unknown_extension_surfaces_through_save_output() {
    let (input, _) = write_png("codec_bmp_in", 4, 4);
    let mut env = imgsdk::SdkEnv::new_default(FakeEgl::new(), BuiltinShaders).expect("env");
    env.set_output_path(temp_path("codec_bmp_out", "bmp"))
        .expect("output");
    env.set_effect_command(&input.to_string_lossy()).expect("input");

    let err = env.save_output().expect_err("bmp is not supported");
    assert!(
        matches!(&err, SdkError::Codec(CodecError::UnsupportedFormat(ext)) if ext == "bmp"),
        "got {err:?}"
    );
    let _ = fs::remove_file(input);
}

#[test]
fn missing_input_is_reported_as_file_not_found() {
    let codec = StandardCodec::default();
    let err = codec
        .decode(&temp_path("codec_missing", "png"))
        .expect_err("missing file");
    assert!(matches!(err, CodecError::FileNotFound(_)), "got {err:?}");
}
