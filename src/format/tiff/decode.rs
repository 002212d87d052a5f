//! Block decoding: decompression, predictor reversal and sample conversion.
//!
//! A block is one tile or one strip. Decoded blocks are always returned as
//! `f32` samples, interleaved when the file is chunky, in row-major order
//! with the block's full width:
//!
//! ```text
//! raw bytes -> decompress -> undo predictor -> samples (f32)
//! ```

use std::io::Read;

use bytes::Bytes;
use flate2::read::ZlibDecoder;

use crate::error::TiffError;
use crate::format::jpeg::decode_jpeg_block;

use super::parser::ByteOrder;
use super::tags::Compression;

/// How sample words are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Unsigned,
    Signed,
    Float,
}

impl SampleFormat {
    /// SampleFormat tag value; 4 (undefined) reads as unsigned.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 | 4 => Some(SampleFormat::Unsigned),
            2 => Some(SampleFormat::Signed),
            3 => Some(SampleFormat::Float),
            _ => None,
        }
    }
}

/// Horizontal differencing, integer samples
const PREDICTOR_HORIZONTAL: u16 = 2;

/// Byte-shuffled differencing, float samples
const PREDICTOR_FLOATING_POINT: u16 = 3;

/// Everything needed to turn the bytes of one block into samples.
#[derive(Debug, Clone)]
pub struct BlockDecoder {
    compression: Compression,
    predictor: u16,
    bits_per_sample: u16,
    sample_format: SampleFormat,
    /// Samples per pixel inside one block (1 for planar files)
    samples: usize,
    byte_order: ByteOrder,
    jpeg_tables: Option<Bytes>,
}

impl BlockDecoder {
    /// Validate a sample layout and build a decoder for it.
    pub fn new(
        compression: Compression,
        predictor: u16,
        bits_per_sample: u16,
        sample_format: u16,
        samples: usize,
        byte_order: ByteOrder,
        jpeg_tables: Option<Bytes>,
    ) -> Result<Self, TiffError> {
        if !compression.is_supported() {
            return Err(TiffError::UnsupportedCompression(compression.name().to_string()));
        }

        let unsupported = TiffError::UnsupportedSampleFormat {
            bits: bits_per_sample,
            format: sample_format,
        };
        let format = SampleFormat::from_u16(sample_format).ok_or(unsupported.clone())?;
        match (format, bits_per_sample) {
            (SampleFormat::Unsigned | SampleFormat::Signed, 8 | 16 | 32 | 64) => {}
            (SampleFormat::Float, 32 | 64) => {}
            _ => return Err(unsupported),
        }

        if compression == Compression::Jpeg
            && (bits_per_sample != 8 || format != SampleFormat::Unsigned)
        {
            return Err(unsupported);
        }

        let predictor_ok = match predictor {
            1 => true,
            PREDICTOR_HORIZONTAL => format != SampleFormat::Float,
            PREDICTOR_FLOATING_POINT => format == SampleFormat::Float,
            _ => false,
        };
        if !predictor_ok {
            return Err(TiffError::InvalidTagValue {
                tag: "Predictor",
                message: format!("predictor {} with {:?} samples", predictor, format),
            });
        }

        Ok(Self {
            compression,
            predictor,
            bits_per_sample,
            sample_format: format,
            samples: samples.max(1),
            byte_order,
            jpeg_tables,
        })
    }

    #[inline]
    fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Decode block `index` of `width` x `rows` pixels.
    pub fn decode(
        &self,
        index: usize,
        data: &[u8],
        width: usize,
        rows: usize,
    ) -> Result<Vec<f32>, TiffError> {
        let sample_count = width * rows * self.samples;

        if self.compression == Compression::Jpeg {
            return self.decode_jpeg(index, data, width, rows);
        }

        let expected = sample_count * self.bytes_per_sample();
        let mut raw = self.decompress(index, data, expected)?;
        if raw.len() < expected {
            return Err(TiffError::Decode {
                block: index,
                message: format!("decoded {} bytes, expected {}", raw.len(), expected),
            });
        }
        raw.truncate(expected);

        let row_samples = width * self.samples;
        let words = match self.predictor {
            PREDICTOR_FLOATING_POINT => self.undo_float_predictor(&mut raw, row_samples),
            PREDICTOR_HORIZONTAL => {
                let mut words = self.words(&raw);
                self.undo_horizontal_predictor(&mut words, row_samples);
                words
            }
            _ => self.words(&raw),
        };

        Ok(words.into_iter().map(|w| self.to_f32(w)).collect())
    }

    fn decompress(&self, index: usize, data: &[u8], expected: usize) -> Result<Vec<u8>, TiffError> {
        let decode_err = |message: String| TiffError::Decode {
            block: index,
            message,
        };

        match self.compression {
            Compression::None => Ok(data.to_vec()),
            Compression::Deflate | Compression::AdobeDeflate => {
                let mut out = Vec::with_capacity(expected);
                ZlibDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| decode_err(format!("deflate: {}", e)))?;
                Ok(out)
            }
            Compression::Lzw => {
                let mut out = Vec::with_capacity(expected);
                let mut decoder =
                    weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
                let result = decoder.into_vec(&mut out).decode_all(data);
                // Some writers omit the end code; enough output is success
                if let Err(e) = result.status {
                    if out.len() < expected {
                        return Err(decode_err(format!("lzw: {}", e)));
                    }
                }
                Ok(out)
            }
            Compression::PackBits => unpack_bits(data, expected).map_err(decode_err),
            other => Err(TiffError::UnsupportedCompression(other.name().to_string())),
        }
    }

    fn decode_jpeg(
        &self,
        index: usize,
        data: &[u8],
        width: usize,
        rows: usize,
    ) -> Result<Vec<f32>, TiffError> {
        let (jpeg_width, jpeg_height, samples) =
            decode_jpeg_block(self.jpeg_tables.as_deref(), data, self.samples).map_err(
                |message| TiffError::Decode {
                    block: index,
                    message: format!("jpeg: {}", message),
                },
            )?;

        let channels = if self.samples == 1 { 1 } else { 3 };
        let (jpeg_width, jpeg_height) = (jpeg_width as usize, jpeg_height as usize);
        let mut out = vec![0f32; width * rows * self.samples];

        // The decoded image may differ from the nominal block size at edges
        for y in 0..rows.min(jpeg_height) {
            for x in 0..width.min(jpeg_width) {
                let src = (y * jpeg_width + x) * channels;
                let dst = (y * width + x) * self.samples;
                for c in 0..channels.min(self.samples) {
                    out[dst + c] = samples[src + c] as f32;
                }
            }
        }
        Ok(out)
    }

    /// Split raw bytes into sample words using the file byte order.
    fn words(&self, raw: &[u8]) -> Vec<u64> {
        let width = self.bytes_per_sample();
        raw.chunks_exact(width)
            .map(|c| self.byte_order.read_uint(c, width))
            .collect()
    }

    fn undo_horizontal_predictor(&self, words: &mut [u64], row_samples: usize) {
        let mask = if self.bits_per_sample == 64 {
            u64::MAX
        } else {
            (1u64 << self.bits_per_sample) - 1
        };
        for row in words.chunks_mut(row_samples) {
            for i in self.samples..row.len() {
                row[i] = row[i].wrapping_add(row[i - self.samples]) & mask;
            }
        }
    }

    /// Floating point predictor: bytes are differenced, then stored with all
    /// most significant bytes of a row first.
    fn undo_float_predictor(&self, raw: &mut [u8], row_samples: usize) -> Vec<u64> {
        let bps = self.bytes_per_sample();
        let row_bytes = row_samples * bps;
        let mut words = Vec::with_capacity(raw.len() / bps);

        for row in raw.chunks_mut(row_bytes) {
            for i in self.samples..row.len() {
                row[i] = row[i].wrapping_add(row[i - self.samples]);
            }
            for i in 0..row_samples {
                let mut word = 0u64;
                for b in 0..bps {
                    word = (word << 8) | row[b * row_samples + i] as u64;
                }
                words.push(word);
            }
        }
        words
    }

    fn to_f32(&self, word: u64) -> f32 {
        match (self.sample_format, self.bits_per_sample) {
            (SampleFormat::Float, 32) => f32::from_bits(word as u32),
            (SampleFormat::Float, _) => f64::from_bits(word) as f32,
            (SampleFormat::Signed, 8) => word as u8 as i8 as f32,
            (SampleFormat::Signed, 16) => word as u16 as i16 as f32,
            (SampleFormat::Signed, 32) => word as u32 as i32 as f32,
            (SampleFormat::Signed, _) => word as i64 as f32,
            (SampleFormat::Unsigned, _) => word as f32,
        }
    }
}

/// PackBits run-length decoding.
fn unpack_bits(data: &[u8], expected: usize) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(expected);
    let mut pos = 0;

    while pos < data.len() && out.len() < expected {
        let n = data[pos] as i8;
        pos += 1;
        match n {
            0..=127 => {
                let len = n as usize + 1;
                let end = pos + len;
                if end > data.len() {
                    return Err("packbits: literal run past end of data".to_string());
                }
                out.extend_from_slice(&data[pos..end]);
                pos = end;
            }
            -127..=-1 => {
                let value = *data
                    .get(pos)
                    .ok_or_else(|| "packbits: repeat run past end of data".to_string())?;
                pos += 1;
                out.extend(std::iter::repeat(value).take(1 + (-n) as usize));
            }
            // -128 is a no-op
            _ => {}
        }
    }

    Ok(out)
}
