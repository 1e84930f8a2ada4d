pub mod loc;
pub mod raw;

pub use loc::{ChunkType, LocEnvelope, MediaType};
pub use raw::{RawEnvelope, RAW_MEDIA_TYPE};
