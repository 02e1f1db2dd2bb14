//! Writing a gray raster back as an image XObject.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::GrayImage;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Keys copied from the original image dictionary. Everything describing
/// the old samples (`/Decode`, `/DecodeParms`, `/Intent`, color-key masks)
/// is left behind.
const CARRIED_KEYS: &[&[u8]] = &[
    b"SMask",
    b"Interpolate",
    b"OC",
    b"Metadata",
    b"StructParent",
    b"Name",
];

/// Build a `/DeviceGray` 8 bpc FlateDecode image stream from `gray`.
pub fn encode_gray_stream(gray: &GrayImage, level: u32, original: &Dictionary) -> Result<Stream> {
    let (width, height) = gray.dimensions();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder
        .write_all(gray.as_raw())
        .map_err(|e| Error::ImageEncode(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::ImageEncode(e.to_string()))?;

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(i64::from(width)),
        "Height" => Object::Integer(i64::from(height)),
        "ColorSpace" => "DeviceGray",
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => "FlateDecode",
    };

    for key in CARRIED_KEYS {
        if let Ok(value) = original.get(key) {
            dict.set(key.to_vec(), value.clone());
        }
    }
    // an explicit mask image survives, a color-key array does not
    if let Ok(Object::Reference(mask)) = original.get(b"Mask") {
        dict.set("Mask", Object::Reference(*mask));
    }

    let mut stream = Stream::new(dict, compressed);
    stream.allows_compression = false;
    Ok(stream)
}

/// Swap the image stored under `id` for `replacement`.
///
/// The object keeps its id, so every page and form that draws it picks up
/// the new pixels.
pub fn replace_image(doc: &mut Document, id: ObjectId, replacement: Stream) -> Result<()> {
    match doc.objects.get_mut(&id) {
        Some(Object::Stream(stream)) => {
            *stream = replacement;
            Ok(())
        }
        Some(_) => Err(Error::Corrupted(format!("object {:?} is not a stream", id))),
        None => Err(Error::MissingObject(format!("image {:?}", id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::Luma;
    use std::io::Read;

    #[test]
    fn test_encode_gray_stream() {
        let gray = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 10 + y) as u8]));
        let stream = encode_gray_stream(&gray, 9, &Dictionary::new()).unwrap();

        assert_eq!(stream.dict.get(b"Width").unwrap(), &Object::Integer(3));
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap(),
            &Object::Name(b"DeviceGray".to_vec())
        );
        assert_eq!(
            stream.dict.get(b"Filter").unwrap(),
            &Object::Name(b"FlateDecode".to_vec())
        );

        let mut raw = Vec::new();
        ZlibDecoder::new(stream.content.as_slice())
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(raw, gray.into_raw());
    }

    #[test]
    fn test_masks_and_decode_entries() {
        let original = dictionary! {
            "SMask" => Object::Reference((12, 0)),
            "Mask" => Object::Array(vec![Object::Integer(0), Object::Integer(10)]),
            "Decode" => Object::Array(vec![Object::Integer(1), Object::Integer(0)]),
            "Intent" => "Perceptual",
            "Interpolate" => Object::Boolean(true),
        };
        let gray = GrayImage::new(1, 1);
        let stream = encode_gray_stream(&gray, 6, &original).unwrap();

        assert_eq!(stream.dict.get(b"SMask").unwrap(), &Object::Reference((12, 0)));
        assert!(stream.dict.get(b"Mask").is_err());
        assert!(stream.dict.get(b"Decode").is_err());
        assert!(stream.dict.get(b"Intent").is_err());
        assert!(stream.dict.get(b"Interpolate").is_ok());

        let stencil = dictionary! { "Mask" => Object::Reference((13, 0)) };
        let stream = encode_gray_stream(&gray, 6, &stencil).unwrap();
        assert_eq!(stream.dict.get(b"Mask").unwrap(), &Object::Reference((13, 0)));
    }

    #[test]
    fn test_replace_image_keeps_id() {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(dictionary! { "Subtype" => "Image" }, vec![1, 2, 3]));
        let replacement = encode_gray_stream(&GrayImage::new(2, 2), 9, &Dictionary::new()).unwrap();

        replace_image(&mut doc, id, replacement).unwrap();
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            panic!("image vanished");
        };
        assert_eq!(stream.dict.get(b"Width").unwrap(), &Object::Integer(2));

        assert!(replace_image(&mut doc, (999, 0), Stream::new(Dictionary::new(), vec![])).is_err());
    }
}
