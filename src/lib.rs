//! A pure Rust baseline JPEG decoder
//!
//! This crate turns a baseline (non-progressive, Huffman-coded) JPEG byte
//! stream into a raster of 8-bit RGB samples without relying on any C codec
//! library.
//!
//! # Features
//! - Marker-driven segment parsing with strict structural validation
//! - Canonical Huffman decoding of the entropy-coded segment
//! - Restart-interval resynchronization
//! - General sampling factors (1..=4) with nearest-neighbor chroma upsampling
//! - Grayscale and YCbCr images, both emitted as RGB
//!
//! # Usage
//! ```no_run
//! use pico_jpeg::Decoder;
//!
//! let pixels = Decoder::decode_file("image.jpg").unwrap();
//! ```
//!
//! # Limitations
//! Progressive, arithmetic-coded and lossless JPEGs are rejected with an
//! `Unsupported` error, as are CMYK/YIQ color modes and 12-bit precision.
//! A corrupt entropy segment aborts the whole decode; there is no
//! partial-image recovery path.

#![allow(
    clippy::needless_return,
    clippy::similar_names,
    clippy::doc_markdown
)]
#![warn(
    clippy::correctness,
    clippy::perf,
    clippy::pedantic,
    clippy::missing_errors_doc,
    clippy::panic
)]
#![deny(missing_docs)]

#[macro_use]
extern crate log;

pub use crate::decoder::{Decoder, ImageInfo};

mod bitstream;
mod color_convert;
mod components;
mod decoder;
pub mod errors;
mod headers;
mod huffman;
mod idct;
mod marker;
mod mcu;
mod misc;
mod worker;
