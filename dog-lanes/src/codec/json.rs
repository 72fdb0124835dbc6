use crate::{DispatchMessage, LaneResult, codec::MessageCodec};

/// JSON codec for dispatch messages: `{"task":"small_task","job_id":"..."}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode(&self, message: &DispatchMessage) -> LaneResult<Vec<u8>> {
        Ok(serde_json::to_vec(message)?)
    }

    fn decode(&self, bytes: &[u8]) -> LaneResult<DispatchMessage> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn codec_id(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JobId, LaneError, TaskKind};

    #[test]
    fn test_wire_format() {
        let message = DispatchMessage::new(TaskKind::SmallTask, JobId::from("abc"));
        let bytes = JsonCodec.encode(&message).unwrap();

        assert_eq!(bytes, br#"{"task":"small_task","job_id":"abc"}"#);
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let err = JsonCodec
            .decode(br#"{"task":"fib_task","job_id":"abc"}"#)
            .unwrap_err();
        assert!(matches!(err, LaneError::Codec(_)));
    }

    #[test]
    fn test_codec_id() {
        assert_eq!(JsonCodec.codec_id(), "json");
    }
}
