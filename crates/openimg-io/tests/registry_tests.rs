//! Integration tests for the format registry and file resolution.

use std::path::Path;

use openimg_core::ImageSpec;
use openimg_io::{Capability, FormatInfo, ImageInput, IoError};
use openimg_io::nullimg::NullInput;
use openimg_io::registry;

/// A tiny valid 1x1 binary PPM.
fn tiny_ppm() -> Vec<u8> {
    let mut bytes = b"P6\n1 1\n255\n".to_vec();
    bytes.extend_from_slice(&[10, 20, 30]);
    bytes
}

#[test]
fn builtin_formats_registered() {
    assert!(registry::is_format_name("pnm"));
    assert!(registry::is_format_name("null"));
    assert!(!registry::is_format_name("exr"));

    let names = registry::format_names();
    assert!(names.contains(&"pnm"));
    assert!(names.contains(&"null"));
}

#[test]
fn extension_list_covers_builtins() {
    let list = registry::extension_list();
    assert!(list.contains("pnm:ppm,pgm,pnm"));
    assert!(list.contains("null:"));
}

#[test]
fn open_resolves_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.ppm");
    std::fs::write(&path, tiny_ppm()).unwrap();

    let input = openimg_io::open(&path).unwrap();
    assert_eq!(input.format_name(), "pnm");
    assert_eq!(input.spec(0, 0).unwrap().width, 1);
}

#[test]
fn open_falls_back_to_content_probe() {
    // A PPM hiding behind an unclaimed extension still opens.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mystery.dat");
    std::fs::write(&path, tiny_ppm()).unwrap();

    let input = openimg_io::open(&path).unwrap();
    assert_eq!(input.format_name(), "pnm");
}

#[test]
fn open_probes_when_extension_lies() {
    // Called .pgm but the content is P6 color; the extension handler and
    // the probe agree it is pnm either way, so it opens.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mislabelled.pgm");
    std::fs::write(&path, tiny_ppm()).unwrap();

    let input = openimg_io::open(&path).unwrap();
    assert_eq!(input.spec(0, 0).unwrap().nchannels, 3);
}

#[test]
fn unrecognized_content_reports_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.dat");
    std::fs::write(&path, b"not an image at all").unwrap();

    let err = openimg_io::open(&path).err().unwrap();
    assert!(matches!(err, IoError::UnsupportedFormat(_)));
}

#[test]
fn global_attributes_reflect_registry() {
    let formats = openimg_io::global::get_string_attribute("format_list", "");
    assert!(formats.contains("pnm"));
    let extensions = openimg_io::global::get_string_attribute("extension_list", "");
    assert!(extensions.contains("pnm:"));

    // virtual attributes are not settable
    assert!(!openimg_io::global::attribute("format_list", "nope"));
}

fn open_echo(path: &Path, config: Option<&ImageSpec>) -> openimg_io::IoResult<Box<dyn ImageInput>> {
    Ok(Box::new(NullInput::open(path, config)?))
}

#[test]
fn declared_format_participates_in_lookup() {
    registry::declare_format(FormatInfo {
        name: "echo",
        extensions: &["echo"],
        can_read: |header| header.starts_with(b"ECHO"),
        open_input: open_echo,
        create_output: None,
        capabilities: &[Capability::MultiImage],
    });

    assert!(registry::is_format_name("echo"));
    assert!(registry::extension_list().contains("echo:echo"));

    // extension routing goes through the new handler
    let input = openimg_io::open(Path::new("synthetic.echo")).unwrap();
    assert_eq!(input.format_name(), "null");

    // read-only: no writer
    let err = registry::create_format("echo").err().unwrap();
    assert!(matches!(err, IoError::UnsupportedFormat(_)));
}

#[test]
fn create_requires_known_writable_extension() {
    assert!(openimg_io::create(Path::new("/tmp/out.ppm")).is_ok());
    assert!(openimg_io::create(Path::new("/tmp/out.tga")).is_err());
    assert!(openimg_io::create(Path::new("/tmp/noext")).is_err());
}
