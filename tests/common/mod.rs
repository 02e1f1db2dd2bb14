//! Synthetic PDFs for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Builds a document page by page.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Flate-compressed 8-bit RGB image with a horizontal gradient.
    pub fn rgb_image(&mut self, width: u32, height: u32) -> ObjectId {
        let data = gradient(width, height, 3);
        self.image(width, height, "DeviceRGB".into(), 8, deflate(&data))
    }

    /// Flate-compressed CMYK image.
    pub fn cmyk_image(&mut self, width: u32, height: u32) -> ObjectId {
        let data = gradient(width, height, 4);
        self.image(width, height, "DeviceCMYK".into(), 8, deflate(&data))
    }

    /// Two-entry palette (black, white) in alternating columns.
    pub fn indexed_image(&mut self, width: u32, height: u32) -> ObjectId {
        let palette = Object::String(vec![0, 0, 0, 255, 255, 255], StringFormat::Hexadecimal);
        let color_space = Object::Array(vec![
            "Indexed".into(),
            "DeviceRGB".into(),
            Object::Integer(1),
            palette,
        ]);
        let data: Vec<u8> = (0..width * height).map(|i| (i % 2) as u8).collect();
        self.image(width, height, color_space, 8, deflate(&data))
    }

    /// Baseline JPEG in a DCTDecode stream.
    pub fn jpeg_image(&mut self, width: u32, height: u32) -> ObjectId {
        let pixels = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(pixels)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let mut dict = image_dict(width, height, "DeviceRGB".into(), 8);
        dict.set("Filter", "DCTDecode");
        self.doc.add_object(Stream::new(dict, jpeg))
    }

    /// Image whose data is too short for its declared size.
    pub fn broken_image(&mut self, width: u32, height: u32) -> ObjectId {
        self.image(width, height, "DeviceRGB".into(), 8, deflate(&[1, 2, 3]))
    }

    /// Gray image whose stream holds no sample data at all.
    pub fn empty_image(&mut self, width: u32, height: u32) -> ObjectId {
        let dict = image_dict(width, height, "DeviceGray".into(), 8);
        self.doc.add_object(Stream::new(dict, Vec::new()))
    }

    /// `/ImageMask true` stencil.
    pub fn stencil_mask(&mut self, width: u32, height: u32) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ImageMask" => true,
            "BitsPerComponent" => Object::Integer(1),
        };
        dict.set("Decode", vec![Object::Integer(1), Object::Integer(0)]);
        let row = width.div_ceil(8) as usize;
        self.doc
            .add_object(Stream::new(dict, vec![0xAA; row * height as usize]))
    }

    fn image(
        &mut self,
        width: u32,
        height: u32,
        color_space: Object,
        bpc: i64,
        deflated: Vec<u8>,
    ) -> ObjectId {
        let mut dict = image_dict(width, height, color_space, bpc);
        dict.set("Filter", "FlateDecode");
        self.doc.add_object(Stream::new(dict, deflated))
    }

    /// Form XObject drawing `content` with its own resources.
    pub fn form(&mut self, xobjects: &[(&str, ObjectId)], content: &str) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Resources" => dictionary! { "XObject" => xobject_dict(xobjects) },
        };
        self.doc
            .add_object(Stream::new(dict, content.as_bytes().to_vec()))
    }

    /// Letter-sized page drawing `content` with the given XObjects.
    pub fn page(&mut self, xobjects: &[(&str, ObjectId)], content: &str) -> ObjectId {
        let contents = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => Object::Reference(contents),
            "Resources" => dictionary! { "XObject" => xobject_dict(xobjects) },
        });
        self.kids.push(Object::Reference(page));
        page
    }

    pub fn build(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => Object::Integer(count),
            }),
        );
        let catalog = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog));
        self.doc
    }

    pub fn to_bytes(self) -> Vec<u8> {
        let mut doc = self.build();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

fn image_dict(width: u32, height: u32, color_space: Object, bpc: i64) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(width as i64),
        "Height" => Object::Integer(height as i64),
        "ColorSpace" => color_space,
        "BitsPerComponent" => Object::Integer(bpc),
    }
}

fn xobject_dict(xobjects: &[(&str, ObjectId)]) -> Dictionary {
    let mut dict = Dictionary::new();
    for (name, id) in xobjects {
        dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    dict
}

fn gradient(width: u32, height: u32, channels: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * channels) as usize);
    for _ in 0..height {
        for x in 0..width {
            let v = (x * 255 / width.max(1)) as u8;
            for _ in 0..channels {
                data.push(v);
            }
        }
    }
    data
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

/// Write `bytes` to `name` inside `dir`.
pub fn write_pdf(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// The image stream named `name` on page `number`.
pub fn page_image<'a>(doc: &'a Document, number: u32, name: &str) -> &'a Stream {
    let page_id = doc.get_pages()[&number];
    let image = pdfshrink::parser::page_images(doc, page_id)
        .unwrap()
        .into_iter()
        .find(|image| image.name == name)
        .unwrap_or_else(|| panic!("no image {} on page {}", name, number));
    match doc.get_object(image.object_id).unwrap() {
        Object::Stream(stream) => stream,
        other => panic!("image {} is not a stream: {:?}", name, other),
    }
}

pub fn dict_int(dict: &Dictionary, key: &[u8]) -> i64 {
    dict.get(key).unwrap().as_i64().unwrap()
}

pub fn dict_name(dict: &Dictionary, key: &[u8]) -> String {
    String::from_utf8_lossy(dict.get(key).unwrap().as_name().unwrap()).into_owned()
}
