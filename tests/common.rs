#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Encode a gradient of the given size in `format`.
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

/// A PNG with a translucent alpha channel.
pub fn encoded_rgba_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| Rgba([200, 40, (x % 256) as u8, 128]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(data).unwrap();
    path
}

/// Two real PNGs, a JPEG, a text file and a fake image in a nested layout.
pub fn create_test_image_files(temp_dir: &Path) -> Vec<PathBuf> {
    let mut files = vec![
        write_file(temp_dir, "a.png", &encoded_image(120, 80, ImageFormat::Png)),
        write_file(temp_dir, "b.png", &encoded_image(40, 90, ImageFormat::Png)),
        write_file(temp_dir, "c.jpg", &encoded_image(64, 64, ImageFormat::Jpeg)),
    ];
    write_file(temp_dir, "notes.txt", b"not an image");
    files.sort();
    files
}

pub fn create_nested_directory_structure(temp_dir: &Path) -> PathBuf {
    let subdir = temp_dir.join("subdir");
    std::fs::create_dir(&subdir).unwrap();
    write_file(&subdir, "nested.png", &encoded_image(30, 30, ImageFormat::Png));
    write_file(&subdir, "nested.txt", b"nested text");
    subdir
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

/// Entry names and contents of a ZIP archive, in archive order.
pub fn read_zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}
