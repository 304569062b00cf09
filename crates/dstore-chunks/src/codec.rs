use dstore_types::Ref;
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::error::CodecError;

/// Largest payload a single frame may carry.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Every message exchanged between a [`RemoteChunkStore`] and a
/// [`ChunkServer`].
///
/// [`RemoteChunkStore`]: crate::RemoteChunkStore
/// [`ChunkServer`]: crate::ChunkServer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkMessage {
    GetRequest { id: Ref },
    HasRequest { id: Ref },
    PutRequest { chunk: Chunk },
    RootRequest,
    UpdateRootRequest { current: Ref, last: Ref },
    ChunkResponse { chunk: Option<Chunk> },
    HasResponse { present: bool },
    PutResponse { id: Ref },
    RootResponse { root: Ref },
    UpdateRootResponse { swapped: bool },
    Error { message: String },
}

impl ChunkMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::GetRequest { .. } => 1,
            Self::HasRequest { .. } => 2,
            Self::PutRequest { .. } => 3,
            Self::RootRequest => 4,
            Self::UpdateRootRequest { .. } => 5,
            Self::ChunkResponse { .. } => 65,
            Self::HasResponse { .. } => 66,
            Self::PutResponse { .. } => 67,
            Self::RootResponse { .. } => 68,
            Self::UpdateRootResponse { .. } => 69,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GetRequest { .. } => "GetRequest",
            Self::HasRequest { .. } => "HasRequest",
            Self::PutRequest { .. } => "PutRequest",
            Self::RootRequest => "RootRequest",
            Self::UpdateRootRequest { .. } => "UpdateRootRequest",
            Self::ChunkResponse { .. } => "ChunkResponse",
            Self::HasResponse { .. } => "HasResponse",
            Self::PutResponse { .. } => "PutResponse",
            Self::RootResponse { .. } => "RootResponse",
            Self::UpdateRootResponse { .. } => "UpdateRootResponse",
            Self::Error { .. } => "Error",
        }
    }

    /// `true` for messages a client sends.
    pub fn is_request(&self) -> bool {
        self.type_tag() < 64
    }
}

/// Frame codec for [`ChunkMessage`]s.
pub struct ChunkCodec;

impl ChunkCodec {
    /// Encode a message with framing: [4 bytes len][1 byte tag][payload]
    pub fn encode(msg: &ChunkMessage) -> Result<Vec<u8>, CodecError> {
        let payload =
            bincode::serialize(msg).map_err(|e| CodecError::Serialization(e.to_string()))?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a framed message. Returns (message, bytes_consumed).
    pub fn decode(data: &[u8]) -> Result<(ChunkMessage, usize), CodecError> {
        if data.len() < 5 {
            return Err(CodecError::FramingError("too short".into()));
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&data[0..4]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len < 1 {
            return Err(CodecError::FramingError("zero-length frame".into()));
        }
        if len - 1 > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: len - 1,
                max: MAX_FRAME_SIZE,
            });
        }
        let total = 4 + len;
        if data.len() < total {
            return Err(CodecError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let tag = data[4];
        let msg: ChunkMessage = bincode::deserialize(&data[5..total])
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        if msg.type_tag() != tag {
            return Err(CodecError::UnknownTag(tag));
        }
        Ok((msg, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_put_request() {
        let leaf = Chunk::blob(b"leaf".to_vec());
        let msg = ChunkMessage::PutRequest {
            chunk: Chunk::value(vec![leaf.compute_ref()], b"node".to_vec()),
        };
        let frame = ChunkCodec::encode(&msg).unwrap();
        assert_eq!(frame[4], 3);
        let (decoded, consumed) = ChunkCodec::decode(&frame).unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_consumes_one_frame_of_many() {
        let a = ChunkCodec::encode(&ChunkMessage::RootRequest).unwrap();
        let b = ChunkCodec::encode(&ChunkMessage::HasResponse { present: true }).unwrap();
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let (first, used) = ChunkCodec::decode(&stream).unwrap();
        assert_eq!(first, ChunkMessage::RootRequest);
        assert_eq!(used, a.len());
        let (second, _) = ChunkCodec::decode(&stream[used..]).unwrap();
        assert_eq!(second, ChunkMessage::HasResponse { present: true });
    }

    #[test]
    fn decode_too_short() {
        assert!(matches!(
            ChunkCodec::decode(&[0, 0, 0]),
            Err(CodecError::FramingError(_))
        ));
    }

    #[test]
    fn decode_zero_length() {
        assert!(matches!(
            ChunkCodec::decode(&[0, 0, 0, 0, 1]),
            Err(CodecError::FramingError(_))
        ));
    }

    #[test]
    fn decode_incomplete_frame() {
        let frame = ChunkCodec::encode(&ChunkMessage::GetRequest {
            id: Ref::of_bytes(b"x"),
        })
        .unwrap();
        let err = ChunkCodec::decode(&frame[..frame.len() - 1]).unwrap_err();
        assert!(err.to_string().contains("incomplete"));
    }

    #[test]
    fn decode_oversized_length() {
        let mut frame = ((MAX_FRAME_SIZE + 2) as u32).to_be_bytes().to_vec();
        frame.push(1);
        assert!(matches!(
            ChunkCodec::decode(&frame),
            Err(CodecError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn decode_rejects_mismatched_tag() {
        let mut frame = ChunkCodec::encode(&ChunkMessage::RootRequest).unwrap();
        frame[4] = 99;
        assert!(matches!(
            ChunkCodec::decode(&frame),
            Err(CodecError::UnknownTag(99))
        ));
    }

    #[test]
    fn requests_and_responses_are_distinguished() {
        assert!(ChunkMessage::RootRequest.is_request());
        assert!(!ChunkMessage::RootResponse { root: Ref::null() }.is_request());
        assert!(!ChunkMessage::Error { message: "x".into() }.is_request());
        assert_eq!(ChunkMessage::RootRequest.type_name(), "RootRequest");
    }
}
