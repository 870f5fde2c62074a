pub mod sse;

use crate::error::Result;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

/// Raw upstream body, chunked however the network delivered it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;
