use crate::{Frame, FrameType, QueueError, Result, MAX_FRAME_SIZE};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Codec for encoding/decoding broker frames with length-prefixed framing
///
/// Frame format: [4-byte length (big-endian)] [1-byte frame type] [payload]
pub struct QueueCodec;

impl Decoder for QueueCodec {
    type Item = Frame;
    type Error = QueueError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // Need at least 5 bytes for length prefix + frame type
        if src.len() < 5 {
            return Ok(None);
        }

        // Read length prefix without consuming
        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[0..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length > MAX_FRAME_SIZE {
            return Err(QueueError::FrameTooLarge(length));
        }

        // Wait for the complete frame
        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        src.advance(4); // Skip length prefix

        let frame_type_byte = src.get_u8();
        let frame_type = FrameType::from_u8(frame_type_byte)
            .ok_or(QueueError::InvalidFrameType(frame_type_byte))?;

        let payload_len = length - 1; // Subtract frame type byte
        let payload = src.split_to(payload_len);

        let frame = match frame_type {
            FrameType::EnsureStream => Frame::EnsureStream(bincode::deserialize(&payload)?),
            FrameType::Publish => Frame::Publish(bincode::deserialize(&payload)?),
            FrameType::Register => Frame::Register(bincode::deserialize(&payload)?),
            FrameType::Fetch => Frame::Fetch(bincode::deserialize(&payload)?),
            FrameType::Ack => Frame::Ack(bincode::deserialize(&payload)?),
            FrameType::InProgress => Frame::InProgress(bincode::deserialize(&payload)?),
            FrameType::Drain => Frame::Drain,
            FrameType::Deliver => Frame::Deliver(bincode::deserialize(&payload)?),
            FrameType::Ok => Frame::Ok(bincode::deserialize(&payload)?),
            FrameType::Error => Frame::Error(bincode::deserialize(&payload)?),
        };

        Ok(Some(frame))
    }
}

impl Encoder<Frame> for QueueCodec {
    type Error = QueueError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        let payload = match &item {
            Frame::EnsureStream(spec) => bincode::serialize(spec)?,
            Frame::Publish(req) => bincode::serialize(req)?,
            Frame::Register(config) => bincode::serialize(config)?,
            Frame::Fetch(req) => bincode::serialize(req)?,
            Frame::Ack(ack) => bincode::serialize(ack)?,
            Frame::InProgress(ack) => bincode::serialize(ack)?,
            Frame::Drain => Vec::new(),
            Frame::Deliver(msg) => bincode::serialize(msg)?,
            Frame::Ok(resp) => bincode::serialize(resp)?,
            Frame::Error(resp) => bincode::serialize(resp)?,
        };

        let total_length = 1 + payload.len(); // frame type + payload
        if total_length > MAX_FRAME_SIZE {
            return Err(QueueError::FrameTooLarge(total_length));
        }

        dst.reserve(4 + total_length);
        dst.put_u32(total_length as u32);
        dst.put_u8(item.frame_type().as_u8());
        dst.put_slice(&payload);

        Ok(())
    }
}
