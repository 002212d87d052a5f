//! Test utilities for integration tests.
//!
//! Provides a GeoTIFF writer for fixtures with the layouts the reader
//! supports, plus helpers for driving the router.

use std::io::Write;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use flate2::write::ZlibEncoder;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbaImage};
use tempfile::TempDir;
use tower::ServiceExt;

use raster_preview::{create_router, PreviewService, RouterConfig};

/// Half the Web Mercator world width in meters.
pub const HALF_EARTH: f64 = 20037508.342789244;

// =============================================================================
// GeoTIFF Builder
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    I16,
    F32,
}

impl SampleType {
    fn bits(self) -> u16 {
        match self {
            SampleType::U8 => 8,
            SampleType::U16 | SampleType::I16 => 16,
            SampleType::F32 => 32,
        }
    }

    fn format(self) -> u16 {
        match self {
            SampleType::U8 | SampleType::U16 => 1,
            SampleType::I16 => 2,
            SampleType::F32 => 3,
        }
    }

    fn write(self, out: &mut Vec<u8>, value: f64) {
        match self {
            SampleType::U8 => out.push(value as u8),
            SampleType::U16 => out.extend((value as u16).to_le_bytes()),
            SampleType::I16 => out.extend((value as i16).to_le_bytes()),
            SampleType::F32 => out.extend((value as f32).to_le_bytes()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    None,
    Deflate,
    Lzw,
    PackBits,
    /// Baseline JPEG per block, 8-bit gray or RGB only
    Jpeg,
}

impl Codec {
    fn tag_value(self) -> u16 {
        match self {
            Codec::None => 1,
            Codec::Lzw => 5,
            Codec::Jpeg => 7,
            Codec::Deflate => 8,
            Codec::PackBits => 32773,
        }
    }

    fn compress(self, raw: Vec<u8>, width: u32, rows: u32, samples: usize) -> Vec<u8> {
        match self {
            Codec::Jpeg => {
                let color = if samples == 1 {
                    ExtendedColorType::L8
                } else {
                    ExtendedColorType::Rgb8
                };
                let mut out = Vec::new();
                JpegEncoder::new_with_quality(&mut out, 95)
                    .encode(&raw, width, rows, color)
                    .unwrap();
                out
            }
            Codec::None => raw,
            Codec::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&raw).unwrap();
                encoder.finish().unwrap()
            }
            Codec::Lzw => weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
                .encode(&raw)
                .unwrap(),
            Codec::PackBits => {
                // Literal runs only
                let mut out = Vec::with_capacity(raw.len() + raw.len() / 128 + 1);
                for chunk in raw.chunks(128) {
                    out.push((chunk.len() - 1) as u8);
                    out.extend_from_slice(chunk);
                }
                out
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Layout {
    Tiled { width: u32, height: u32 },
    Strips { rows: u32 },
}

#[derive(Clone, Debug)]
struct Georef {
    model: u16,
    epsg: u16,
    origin: (f64, f64),
    pixel: (f64, f64),
}

#[derive(Clone, Debug)]
struct Image {
    width: u32,
    height: u32,
    /// Band-major, row-major samples
    bands: Vec<Vec<f64>>,
}

/// Builder for little-endian classic GeoTIFF files.
#[derive(Clone, Debug)]
pub struct GeoTiffBuilder {
    base: Image,
    overviews: Vec<Image>,
    sample_type: SampleType,
    layout: Layout,
    planar: bool,
    codec: Codec,
    predictor: bool,
    georef: Option<Georef>,
    nodata: Option<String>,
    alpha: bool,
    sparse_blocks: Vec<usize>,
}

struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    bytes: Vec<u8>,
}

fn shorts(values: &[u16]) -> Entry {
    Entry {
        tag: 0,
        field_type: 3,
        count: values.len() as u32,
        bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
    }
}

fn longs(values: &[u32]) -> Entry {
    Entry {
        tag: 0,
        field_type: 4,
        count: values.len() as u32,
        bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
    }
}

fn doubles(values: &[f64]) -> Entry {
    Entry {
        tag: 0,
        field_type: 12,
        count: values.len() as u32,
        bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
    }
}

fn ascii(text: &str) -> Entry {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    Entry {
        tag: 0,
        field_type: 2,
        count: bytes.len() as u32,
        bytes,
    }
}

impl Entry {
    fn tag(mut self, tag: u16) -> Self {
        self.tag = tag;
        self
    }
}

impl GeoTiffBuilder {
    /// Single-band 8-bit raster, tiled 64x64, uncompressed, no georeferencing.
    pub fn new(width: u32, height: u32, bands: Vec<Vec<f64>>) -> Self {
        for band in &bands {
            assert_eq!(band.len(), (width * height) as usize);
        }
        Self {
            base: Image {
                width,
                height,
                bands,
            },
            overviews: Vec::new(),
            sample_type: SampleType::U8,
            layout: Layout::Tiled {
                width: 64,
                height: 64,
            },
            planar: false,
            codec: Codec::None,
            predictor: false,
            georef: None,
            nodata: None,
            alpha: false,
            sparse_blocks: Vec::new(),
        }
    }

    pub fn sample_type(mut self, sample_type: SampleType) -> Self {
        self.sample_type = sample_type;
        self
    }

    pub fn tiled(mut self, width: u32, height: u32) -> Self {
        self.layout = Layout::Tiled { width, height };
        self
    }

    pub fn strips(mut self, rows: u32) -> Self {
        self.layout = Layout::Strips { rows };
        self
    }

    pub fn planar(mut self) -> Self {
        self.planar = true;
        self
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Horizontal differencing; unsigned integer samples only.
    pub fn predictor(mut self) -> Self {
        self.predictor = true;
        self
    }

    /// Web Mercator (EPSG:3857) with the top-left corner at `origin`.
    pub fn web_mercator(self, origin: (f64, f64), pixel: f64) -> Self {
        self.projected(3857, origin, pixel)
    }

    /// WGS84 lon/lat with the top-left corner at `(west, north)`.
    pub fn geographic(mut self, west: f64, north: f64, pixel: f64) -> Self {
        self.georef = Some(Georef {
            model: 2,
            epsg: 4326,
            origin: (west, north),
            pixel: (pixel, pixel),
        });
        self
    }

    pub fn projected(mut self, epsg: u16, origin: (f64, f64), pixel: f64) -> Self {
        self.georef = Some(Georef {
            model: 1,
            epsg,
            origin,
            pixel: (pixel, pixel),
        });
        self
    }

    pub fn nodata(mut self, value: &str) -> Self {
        self.nodata = Some(value.to_string());
        self
    }

    /// Mark the last band as unassociated alpha.
    pub fn alpha(mut self) -> Self {
        self.alpha = true;
        self
    }

    /// Write block `index` of the base image with zero byte count.
    pub fn sparse_block(mut self, index: usize) -> Self {
        self.sparse_blocks.push(index);
        self
    }

    /// Add a reduced-resolution image with explicit contents.
    pub fn overview(mut self, width: u32, height: u32, bands: Vec<Vec<f64>>) -> Self {
        self.overviews.push(Image {
            width,
            height,
            bands,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = vec![b'I', b'I', 42, 0, 0, 0, 0, 0];
        let mut pointer_at = 4usize;

        let images: Vec<(&Image, bool)> = std::iter::once((&self.base, false))
            .chain(self.overviews.iter().map(|o| (o, true)))
            .collect();

        for (image, reduced) in images {
            let ifd_offset = self.write_image(&mut out, image, reduced);
            out[pointer_at..pointer_at + 4].copy_from_slice(&ifd_offset.to_le_bytes());
            pointer_at = out.len() - 4;
        }
        out
    }

    /// Append blocks, external values and the IFD. Returns the IFD offset.
    fn write_image(&self, out: &mut Vec<u8>, image: &Image, reduced: bool) -> u32 {
        let spp = image.bands.len() as u16;
        let (block_width, block_height) = match self.layout {
            Layout::Tiled { width, height } => (width, height),
            Layout::Strips { rows } => (image.width, rows.min(image.height)),
        };
        let across = image.width.div_ceil(block_width);
        let down = image.height.div_ceil(block_height);
        let planes: Vec<Vec<usize>> = if self.planar {
            (0..spp as usize).map(|b| vec![b]).collect()
        } else {
            vec![(0..spp as usize).collect()]
        };

        let mut offsets = Vec::new();
        let mut counts = Vec::new();
        for bands in &planes {
            for by in 0..down {
                for bx in 0..across {
                    let index = offsets.len();
                    if !reduced && self.sparse_blocks.contains(&index) {
                        offsets.push(0);
                        counts.push(0);
                        continue;
                    }
                    let rows = match self.layout {
                        Layout::Tiled { .. } => block_height,
                        Layout::Strips { .. } => block_height.min(image.height - by * block_height),
                    };
                    let raw = self.block_bytes(
                        image,
                        bands,
                        (bx * block_width, by * block_height),
                        block_width,
                        rows,
                    );
                    let data = self.codec.compress(raw, block_width, rows, bands.len());
                    pad_even(out);
                    offsets.push(out.len() as u32);
                    counts.push(data.len() as u32);
                    out.extend(data);
                }
            }
        }

        let mut entries = vec![
            longs(&[image.width]).tag(256),
            longs(&[image.height]).tag(257),
            shorts(&vec![self.sample_type.bits(); spp as usize]).tag(258),
            shorts(&[self.codec.tag_value()]).tag(259),
            shorts(&[if spp >= 3 { 2 } else { 1 }]).tag(262),
            shorts(&[spp]).tag(277),
            shorts(&[if self.planar { 2 } else { 1 }]).tag(284),
            shorts(&vec![self.sample_type.format(); spp as usize]).tag(339),
        ];
        if reduced {
            entries.push(longs(&[1]).tag(254));
        }
        if self.predictor {
            entries.push(shorts(&[2]).tag(317));
        }
        match self.layout {
            Layout::Tiled { .. } => {
                entries.push(longs(&[block_width]).tag(322));
                entries.push(longs(&[block_height]).tag(323));
                entries.push(longs(&offsets).tag(324));
                entries.push(longs(&counts).tag(325));
            }
            Layout::Strips { .. } => {
                entries.push(longs(&offsets).tag(273));
                entries.push(longs(&[block_height]).tag(278));
                entries.push(longs(&counts).tag(279));
            }
        }
        if self.alpha {
            entries.push(shorts(&[2]).tag(338));
        }
        if !reduced {
            if let Some(ref georef) = self.georef {
                entries.push(doubles(&[georef.pixel.0, georef.pixel.1, 0.0]).tag(33550));
                entries.push(
                    doubles(&[0.0, 0.0, 0.0, georef.origin.0, georef.origin.1, 0.0]).tag(33922),
                );
                let crs_key = if georef.model == 2 { 2048 } else { 3072 };
                entries.push(
                    shorts(&[
                        1, 1, 0, 3, //
                        1024, 0, 1, georef.model, //
                        1025, 0, 1, 1, //
                        crs_key, 0, 1, georef.epsg,
                    ])
                    .tag(34735),
                );
            }
            if let Some(ref nodata) = self.nodata {
                entries.push(ascii(nodata).tag(42113));
            }
        }
        entries.sort_by_key(|e| e.tag);

        // Values that do not fit in the entry go before the IFD
        let mut value_fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.bytes.len() > 4 {
                pad_even(out);
                value_fields.push((out.len() as u32).to_le_bytes());
                out.extend(&entry.bytes);
            } else {
                let mut inline = [0u8; 4];
                inline[..entry.bytes.len()].copy_from_slice(&entry.bytes);
                value_fields.push(inline);
            }
        }

        pad_even(out);
        let ifd_offset = out.len() as u32;
        out.extend((entries.len() as u16).to_le_bytes());
        for (entry, value) in entries.iter().zip(value_fields) {
            out.extend(entry.tag.to_le_bytes());
            out.extend(entry.field_type.to_le_bytes());
            out.extend(entry.count.to_le_bytes());
            out.extend(value);
        }
        out.extend(0u32.to_le_bytes());
        ifd_offset
    }

    /// Raw bytes of one block, zero-padded past the image edge.
    fn block_bytes(
        &self,
        image: &Image,
        bands: &[usize],
        (x0, y0): (u32, u32),
        width: u32,
        rows: u32,
    ) -> Vec<u8> {
        let mut samples = Vec::with_capacity((width * rows) as usize * bands.len());
        for y in y0..y0 + rows {
            let mut row = Vec::with_capacity(width as usize * bands.len());
            for x in x0..x0 + width {
                for &b in bands {
                    let inside = x < image.width && y < image.height;
                    row.push(if inside {
                        image.bands[b][(y * image.width + x) as usize]
                    } else {
                        0.0
                    });
                }
            }
            if self.predictor {
                let step = bands.len();
                let modulus = 2f64.powi(self.sample_type.bits() as i32);
                for i in (step..row.len()).rev() {
                    row[i] = (row[i] - row[i - step]).rem_euclid(modulus);
                }
            }
            samples.extend(row);
        }

        let mut raw = Vec::new();
        for value in samples {
            self.sample_type.write(&mut raw, value);
        }
        raw
    }
}

fn pad_even(out: &mut Vec<u8>) {
    if out.len() % 2 == 1 {
        out.push(0);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Column ramp: each pixel's value is its column index.
pub fn column_ramp(width: u32, height: u32) -> Vec<f64> {
    (0..height)
        .flat_map(|_| (0..width).map(|x| x as f64))
        .collect()
}

/// Row ramp: each pixel's value is its row index.
pub fn row_ramp(width: u32, height: u32) -> Vec<f64> {
    (0..height)
        .flat_map(|y| (0..width).map(move |_| y as f64))
        .collect()
}

/// 256x256 single-band raster covering the whole Web Mercator world, so
/// tile 0/0/0 maps one output pixel to one source pixel.
pub fn world_ramp() -> GeoTiffBuilder {
    GeoTiffBuilder::new(256, 256, vec![column_ramp(256, 256)])
        .web_mercator((-HALF_EARTH, HALF_EARTH), 2.0 * HALF_EARTH / 256.0)
}

/// 100x100 lon/lat raster over 10..20 E, 40..50 N.
pub fn geographic_ramp() -> GeoTiffBuilder {
    GeoTiffBuilder::new(100, 100, vec![column_ramp(100, 100)]).geographic(10.0, 50.0, 0.1)
}

/// Write `data` into `dir` and return its path.
pub fn write_fixture(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}

// =============================================================================
// Router Helpers
// =============================================================================

pub fn test_router() -> Router {
    create_router(PreviewService::new(), RouterConfig::new().with_tracing(false))
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

pub async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

/// Register `path` under `id` and assert success.
pub async fn register(router: &Router, id: &str, path: &Path) {
    let (status, body) = post_json(
        router,
        "/preview/register",
        serde_json::json!({ "id": id, "path": path.to_str().unwrap() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

pub fn decode_png(data: &[u8]) -> RgbaImage {
    image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}

pub fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}
