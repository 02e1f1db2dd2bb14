//! Turning image XObject streams into pixels.

use std::io::Read;

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};

use super::DecodeError;
use crate::parser::objects::{get_name, get_number, get_resolved, resolve, stream_filters};

/// Images with more pixels than this are refused rather than allocated.
const MAX_PIXELS: u64 = 1 << 28;

/// Decode an image XObject into an 8-bit image.
///
/// Gray sources come back as `ImageLuma8`, everything else as `ImageRgb8`
/// (CMYK is converted on the way).
pub fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage, DecodeError> {
    let dict = &stream.dict;

    if matches!(get_resolved(doc, dict, b"ImageMask"), Some(Object::Boolean(true))) {
        return Err(DecodeError::Unsupported("stencil mask".to_string()));
    }

    let width = dimension(doc, dict, b"Width")?;
    let height = dimension(doc, dict, b"Height")?;
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(DecodeError::Invalid(format!("{}x{} is too large", width, height)));
    }

    let mut filters = stream_filters(doc, stream);
    let params = decode_params(doc, dict, filters.len());

    let last = filters.last().map(|f| canonical_filter(f).to_string());
    match last.as_deref() {
        Some("DCTDecode") => {
            filters.pop();
            let data = undo_filters(&stream.content, &filters, &params)?;
            let mut image = decode_jpeg(&data)?;
            if decode_inverted(doc, dict) {
                image.invert();
            }
            Ok(image)
        }
        Some(name @ ("JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode")) => {
            Err(DecodeError::Unsupported(name.to_string()))
        }
        _ => {
            let data = undo_filters(&stream.content, &filters, &params)?;
            let color_space = dict
                .get(b"ColorSpace")
                .map_err(|_| DecodeError::Invalid("missing /ColorSpace".to_string()))
                .and_then(|cs| ColorSpace::parse(doc, cs))?;
            let bpc = get_resolved(doc, dict, b"BitsPerComponent")
                .and_then(get_number)
                .map(|b| b as u8)
                .unwrap_or(8);
            let raster = Raster {
                width,
                height,
                bpc,
                color_space: &color_space,
                decode: decode_range(doc, dict),
            };
            raster.decode(&data)
        }
    }
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32, DecodeError> {
    get_resolved(doc, dict, key)
        .and_then(get_number)
        .filter(|v| *v >= 1.0)
        .map(|v| v as u32)
        .ok_or_else(|| {
            DecodeError::Invalid(format!("missing or bad /{}", String::from_utf8_lossy(key)))
        })
}

fn canonical_filter(name: &str) -> &str {
    match name {
        "Fl" => "FlateDecode",
        "AHx" => "ASCIIHexDecode",
        "RL" => "RunLengthDecode",
        "DCT" => "DCTDecode",
        "CCF" => "CCITTFaxDecode",
        "A85" => "ASCII85Decode",
        "LZW" => "LZWDecode",
        other => other,
    }
}

/// `/DecodeParms` for each filter in the chain.
fn decode_params<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    count: usize,
) -> Vec<Option<&'a Dictionary>> {
    let as_dict = |o: &'a Object| match resolve(doc, o) {
        Some(Object::Dictionary(d)) => Some(d),
        _ => None,
    };
    match get_resolved(doc, dict, b"DecodeParms") {
        Some(Object::Array(items)) => (0..count).map(|i| items.get(i).and_then(as_dict)).collect(),
        Some(Object::Dictionary(d)) => {
            let mut params = vec![None; count];
            if let Some(first) = params.first_mut() {
                *first = Some(d);
            }
            params
        }
        _ => vec![None; count],
    }
}

fn undo_filters(
    content: &[u8],
    filters: &[String],
    params: &[Option<&Dictionary>],
) -> Result<Vec<u8>, DecodeError> {
    let mut data = content.to_vec();
    for (i, filter) in filters.iter().enumerate() {
        let param = params.get(i).copied().flatten();
        data = match canonical_filter(filter) {
            "FlateDecode" => {
                let inflated = inflate(&data)?;
                apply_predictor(inflated, param)?
            }
            "ASCIIHexDecode" => ascii_hex_decode(&data)?,
            "RunLengthDecode" => run_length_decode(&data),
            other => return Err(DecodeError::Unsupported(other.to_string())),
        };
    }
    Ok(data)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Invalid(format!("flate: {}", e)))?;
    Ok(out)
}

fn param_int(param: Option<&Dictionary>, key: &[u8], default: usize) -> usize {
    param
        .and_then(|p| p.get(key).ok())
        .and_then(get_number)
        .filter(|v| *v >= 0.0)
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn apply_predictor(data: Vec<u8>, param: Option<&Dictionary>) -> Result<Vec<u8>, DecodeError> {
    let predictor = param_int(param, b"Predictor", 1);
    if predictor < 2 {
        return Ok(data);
    }

    let colors = param_int(param, b"Colors", 1).max(1);
    let bpc = param_int(param, b"BitsPerComponent", 8).max(1);
    let columns = param_int(param, b"Columns", 1).max(1);
    let row_len = (columns * colors * bpc).div_ceil(8);
    let bpp = (colors * bpc).div_ceil(8).max(1);

    if predictor == 2 {
        if bpc != 8 {
            return Err(DecodeError::Unsupported(format!("TIFF predictor at {} bpc", bpc)));
        }
        let mut data = data;
        for row in data.chunks_mut(row_len) {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        return Ok(data);
    }

    png_unpredict(&data, row_len, bpp)
}

/// Undo PNG row filters (`/Predictor` 10 to 15).
fn png_unpredict(data: &[u8], row_len: usize, bpp: usize) -> Result<Vec<u8>, DecodeError> {
    let stride = row_len + 1;
    let mut out = Vec::with_capacity(data.len() / stride * row_len);
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(stride) {
        if chunk.len() < stride {
            break;
        }
        let filter = chunk[0];
        let mut row = chunk[1..].to_vec();
        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            row[i] = match filter {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(DecodeError::Invalid(format!("bad PNG row filter {}", other)))
                }
            };
        }
        out.extend_from_slice(&row);
        prev = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = (byte as char)
            .to_digit(16)
            .ok_or_else(|| DecodeError::Invalid(format!("bad hex digit {:?}", byte as char)))?
            as u8;
        match high.take() {
            Some(h) => out.push(h << 4 | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn run_length_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        i += 1;
        match len {
            128 => break,
            0..=127 => {
                let end = (i + len + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                if let Some(&byte) = data.get(i) {
                    out.extend(std::iter::repeat(byte).take(257 - len));
                }
                i += 1;
            }
        }
    }
    out
}

fn decode_jpeg(data: &[u8]) -> Result<DynamicImage, DecodeError> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| DecodeError::Invalid(format!("jpeg: {}", e)))?;
    Ok(match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) => {
            DynamicImage::ImageLuma8(image.to_luma8())
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    })
}

/// First `/Decode` pair, if any.
fn decode_range(doc: &Document, dict: &Dictionary) -> Option<(f32, f32)> {
    match get_resolved(doc, dict, b"Decode") {
        Some(Object::Array(values)) => {
            let first: Vec<f32> = values.iter().take(2).filter_map(get_number).collect();
            match first.as_slice() {
                [lo, hi] => Some((*lo, *hi)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `/Decode [1 0 ...]` flips every sample.
fn decode_inverted(doc: &Document, dict: &Dictionary) -> bool {
    decode_range(doc, dict).is_some_and(|(lo, hi)| lo > hi)
}

/// Color spaces we can turn into gray.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    pub(crate) fn parse(doc: &Document, obj: &Object) -> Result<Self, DecodeError> {
        let obj = resolve(doc, obj)
            .ok_or_else(|| DecodeError::Invalid("dangling /ColorSpace".to_string()))?;
        match obj {
            Object::Name(_) => Self::from_family(get_name(obj).unwrap_or_default().as_str()),
            Object::Array(items) => {
                let family = items
                    .first()
                    .and_then(|o| resolve(doc, o))
                    .and_then(get_name)
                    .ok_or_else(|| DecodeError::Invalid("empty color space array".to_string()))?;
                match family.as_str() {
                    "ICCBased" => Self::icc_based(doc, items.get(1)),
                    "Indexed" | "I" => Self::indexed(doc, items),
                    other => Self::from_family(other),
                }
            }
            _ => Err(DecodeError::Invalid("malformed /ColorSpace".to_string())),
        }
    }

    fn from_family(name: &str) -> Result<Self, DecodeError> {
        match name {
            "DeviceGray" | "CalGray" | "G" => Ok(ColorSpace::Gray),
            "DeviceRGB" | "CalRGB" | "Lab" | "RGB" => Ok(ColorSpace::Rgb),
            "DeviceCMYK" | "CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(DecodeError::Unsupported(format!("{} color space", other))),
        }
    }

    fn icc_based(doc: &Document, profile: Option<&Object>) -> Result<Self, DecodeError> {
        let Some(Object::Stream(profile)) = profile.and_then(|p| resolve(doc, p)) else {
            return Err(DecodeError::Invalid("ICCBased without profile stream".to_string()));
        };
        match get_resolved(doc, &profile.dict, b"N").and_then(get_number) {
            Some(n) if n == 1.0 => Ok(ColorSpace::Gray),
            Some(n) if n == 3.0 => Ok(ColorSpace::Rgb),
            Some(n) if n == 4.0 => Ok(ColorSpace::Cmyk),
            _ => match profile.dict.get(b"Alternate") {
                Ok(alternate) => Self::parse(doc, alternate),
                Err(_) => Err(DecodeError::Invalid("ICCBased without /N".to_string())),
            },
        }
    }

    fn indexed(doc: &Document, items: &[Object]) -> Result<Self, DecodeError> {
        let [_, base, hival, lookup] = items else {
            return Err(DecodeError::Invalid("Indexed needs four entries".to_string()));
        };
        let base = Self::parse(doc, base)?;
        if matches!(base, ColorSpace::Indexed { .. }) {
            return Err(DecodeError::Invalid("nested Indexed color space".to_string()));
        }
        let hival = resolve(doc, hival)
            .and_then(get_number)
            .map(|h| h.clamp(0.0, 255.0) as u8)
            .ok_or_else(|| DecodeError::Invalid("Indexed without hival".to_string()))?;
        let lookup = match resolve(doc, lookup) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            Some(Object::Stream(stream)) => {
                let filters = stream_filters(doc, stream);
                let params = decode_params(doc, &stream.dict, filters.len());
                undo_filters(&stream.content, &filters, &params)?
            }
            _ => return Err(DecodeError::Invalid("Indexed without lookup table".to_string())),
        };
        Ok(ColorSpace::Indexed {
            base: Box::new(base),
            hival,
            lookup,
        })
    }

    /// Samples per pixel in the image data.
    pub(crate) fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

/// Layout of uncompressed sample data.
struct Raster<'a> {
    width: u32,
    height: u32,
    bpc: u8,
    color_space: &'a ColorSpace,
    /// First `/Decode` pair
    decode: Option<(f32, f32)>,
}

impl Raster<'_> {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, DecodeError> {
        let bpc = usize::from(self.bpc);
        let indexed = matches!(self.color_space, ColorSpace::Indexed { .. });
        if !matches!(bpc, 1 | 2 | 4 | 8 | 16) || (indexed && bpc == 16) {
            return Err(DecodeError::Unsupported(format!("{} bits per component", bpc)));
        }

        let width = self.width as usize;
        let height = self.height as usize;
        let components = self.color_space.components();
        let row_len = (width * components * bpc).div_ceil(8);
        let needed = row_len * height;
        if data.len() < needed {
            return Err(DecodeError::Invalid(format!(
                "short sample data: {} bytes, expected {}",
                data.len(),
                needed
            )));
        }

        let invert = self.decode.is_some_and(|(lo, hi)| lo > hi);

        // one byte per sample, scaled to 0..=255 (palette index for Indexed)
        let mut samples = Vec::with_capacity(width * height * components);
        for row in data[..needed].chunks(row_len) {
            for i in 0..width * components {
                let value = read_sample(row, i, bpc);
                samples.push(if indexed {
                    self.map_index(value, bpc)
                } else {
                    let value = scale_sample(value, bpc);
                    if invert {
                        255 - value
                    } else {
                        value
                    }
                });
            }
        }

        let (space, samples) = match self.color_space {
            ColorSpace::Indexed { base, hival, lookup } => {
                (base.as_ref(), expand_palette(&samples, base.components(), *hival, lookup))
            }
            other => (other, samples),
        };

        let image = match space {
            ColorSpace::Gray => GrayImage::from_raw(self.width, self.height, samples)
                .map(DynamicImage::ImageLuma8),
            ColorSpace::Rgb => RgbImage::from_raw(self.width, self.height, samples)
                .map(DynamicImage::ImageRgb8),
            ColorSpace::Cmyk => RgbImage::from_raw(self.width, self.height, cmyk_to_rgb(&samples))
                .map(DynamicImage::ImageRgb8),
            ColorSpace::Indexed { .. } => None,
        };
        image.ok_or_else(|| DecodeError::Invalid("pixel buffer size mismatch".to_string()))
    }

    /// Palette index for a raw sample, through `/Decode [dmin dmax]`.
    fn map_index(&self, value: u8, bpc: usize) -> u8 {
        let Some((lo, hi)) = self.decode else {
            return value;
        };
        let max = ((1u32 << bpc) - 1) as f32;
        (lo + f32::from(value) * (hi - lo) / max)
            .round()
            .clamp(0.0, 255.0) as u8
    }
}

/// The `index`-th sample of a row, unscaled. 16-bit samples keep their
/// high byte.
fn read_sample(row: &[u8], index: usize, bpc: usize) -> u8 {
    match bpc {
        8 => row[index],
        16 => row[index * 2],
        _ => {
            let bit = index * bpc;
            let byte = row[bit / 8];
            let shift = 8 - bpc - (bit % 8);
            (byte >> shift) & ((1u8 << bpc) - 1)
        }
    }
}

fn scale_sample(value: u8, bpc: usize) -> u8 {
    match bpc {
        1 => value * 255,
        2 => value * 85,
        4 => value * 17,
        _ => value,
    }
}

fn expand_palette(indices: &[u8], components: usize, hival: u8, lookup: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * components);
    for &index in indices {
        let start = usize::from(index.min(hival)) * components;
        match lookup.get(start..start + components) {
            Some(entry) => out.extend_from_slice(entry),
            None => out.extend(std::iter::repeat(0).take(components)),
        }
    }
    out
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(samples.len() / 4 * 3);
    for px in samples.chunks_exact(4) {
        let k = 255 - u16::from(px[3]);
        for &c in &px[..3] {
            rgb.push(((255 - u16::from(c)) * k / 255) as u8);
        }
    }
    rgb
}
