//! Cached records and the decoders that fill them.

pub mod bitmap;
pub mod decode;
pub mod font;
pub mod store;
