use spore_common::Message;
use tokio_util::codec::LengthDelimitedCodec;

use crate::error::NetworkError;

/// Upper bound for a single JSON frame.
pub const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Length-prefixed framing used on every TCP connection.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}

pub fn encode(message: &Message) -> Result<Vec<u8>, NetworkError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode(frame: &[u8]) -> Result<Message, NetworkError> {
    Ok(serde_json::from_slice(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spore_common::{MessageKind, TxResult};

    #[test]
    fn rejects_non_messages() {
        assert!(matches!(decode(b"{\"type\":\"Nope\"}"), Err(NetworkError::Serialization(_))));
        assert!(decode(b"\x00\x01").is_err());
    }

    #[test]
    fn keeps_result_and_peers() {
        let msg = spore_common::Message::new(MessageKind::ConnectionResponse)
            .with_result(TxResult::LockFail)
            .with_peers(vec!["a:1".into(), "b:2".into()]);
        let back = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
