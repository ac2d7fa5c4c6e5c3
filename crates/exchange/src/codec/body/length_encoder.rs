use crate::protocol::{PayloadItem, TransportError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    pub fn is_finish(&self) -> bool {
        self.remaining == 0
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = TransportError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                let size = bytes.remaining();
                let accepted = usize::try_from(self.remaining).map_or(size, |remaining| remaining.min(size));
                if accepted < size {
                    warn!(declared_remaining = self.remaining, chunk_size = size, "body exceeds content-length, dropping excess bytes");
                }

                dst.put(bytes.take(accepted));
                self.remaining -= accepted as u64;
                Ok(())
            }
            PayloadItem::Eof => {
                if self.remaining > 0 {
                    warn!(missing = self.remaining, "body ended before the declared content-length");
                }
                Ok(())
            }
        }
    }
}
