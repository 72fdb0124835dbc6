pub mod json;

use crate::{DispatchMessage, LaneResult};

/// Wire format of dispatch messages
pub trait MessageCodec: Send + Sync {
    /// Encode a dispatch message to bytes
    fn encode(&self, message: &DispatchMessage) -> LaneResult<Vec<u8>>;

    /// Decode bytes back into a dispatch message
    fn decode(&self, bytes: &[u8]) -> LaneResult<DispatchMessage>;

    /// Get codec identifier
    fn codec_id(&self) -> &'static str;
}
