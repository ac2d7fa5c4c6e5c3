//! A read-only source that stops after a fixed number of bytes.

use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWrite, ReadBuf};

pin_project! {
    /// Caps the bytes read from `inner` at `limit`.
    ///
    /// Once the budget is spent every read reports end of stream. Seeking is
    /// passed through untouched and does not refill the budget; writing is
    /// rejected with [`io::ErrorKind::Unsupported`].
    ///
    /// [`source_len`](BoundedSource::source_len) reports the length of the
    /// whole underlying source, not the bound.
    #[derive(Debug)]
    pub struct BoundedSource<R> {
        #[pin]
        inner: R,
        remaining: u64,
        limit: u64,
    }
}

impl<R> BoundedSource<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self { inner, remaining: limit, limit }
    }

    /// Bytes that may still be read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The bound this source was created with.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncSeek + Unpin> BoundedSource<R> {
    /// Length of the underlying source. The current position is preserved.
    pub async fn source_len(&mut self) -> io::Result<u64> {
        let position = self.inner.stream_position().await?;
        let len = self.inner.seek(SeekFrom::End(0)).await?;
        self.inner.seek(SeekFrom::Start(position)).await?;
        Ok(len)
    }
}

impl<R: AsyncRead> AsyncRead for BoundedSource<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.project();

        if *this.remaining == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let max = usize::try_from(*this.remaining).unwrap_or(usize::MAX).min(buf.remaining());
        let mut limited = ReadBuf::new(buf.initialize_unfilled_to(max));
        ready!(this.inner.poll_read(cx, &mut limited))?;
        let filled = limited.filled().len();

        buf.advance(filled);
        *this.remaining -= filled as u64;

        Poll::Ready(Ok(()))
    }
}

impl<R: AsyncSeek> AsyncSeek for BoundedSource<R> {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        self.project().inner.start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        self.project().inner.poll_complete(cx)
    }
}

impl<R> AsyncWrite for BoundedSource<R> {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::Unsupported, "bounded source is read only")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn source() -> Cursor<Vec<u8>> {
        Cursor::new((0u8..20).collect())
    }

    #[tokio::test]
    async fn reads_stop_at_the_limit() {
        let mut bounded = BoundedSource::new(source(), 10);
        let mut buf = [0u8; 4];

        let mut reads = vec![];
        let mut total = vec![];
        loop {
            let n = bounded.read(&mut buf).await.unwrap();
            reads.push(n);
            total.extend_from_slice(&buf[..n]);
            if n == 0 {
                break;
            }
        }

        assert_eq!(reads, vec![4, 4, 2, 0]);
        assert_eq!(total, (0u8..10).collect::<Vec<_>>());
        assert_eq!(bounded.remaining(), 0);
        assert_eq!(bounded.limit(), 10);
    }

    #[tokio::test]
    async fn reads_into_a_partially_filled_buffer() {
        let mut bounded = BoundedSource::new(source(), 6);
        let mut storage = [0xffu8; 16];
        let mut buf = ReadBuf::new(&mut storage);
        buf.put_slice(b"xy");

        std::future::poll_fn(|cx| Pin::new(&mut bounded).poll_read(cx, &mut buf)).await.unwrap();

        assert_eq!(buf.filled(), b"xy\x00\x01\x02\x03\x04\x05");
        assert_eq!(bounded.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_source_keeps_reporting_eof() {
        let mut bounded = BoundedSource::new(source(), 0);
        let mut buf = [0u8; 8];

        assert_eq!(bounded.read(&mut buf).await.unwrap(), 0);
        assert_eq!(bounded.read(&mut buf).await.unwrap(), 0);
        assert_eq!(bounded.get_ref().position(), 0);
    }

    #[tokio::test]
    async fn limit_beyond_source_reads_to_its_end() {
        let mut bounded = BoundedSource::new(source(), 100);
        let mut all = vec![];

        bounded.read_to_end(&mut all).await.unwrap();

        assert_eq!(all.len(), 20);
        assert_eq!(bounded.remaining(), 80);
    }

    #[tokio::test]
    async fn seek_passes_through() {
        let mut bounded = BoundedSource::new(source(), 3);
        bounded.seek(SeekFrom::Start(15)).await.unwrap();

        let mut all = vec![];
        bounded.read_to_end(&mut all).await.unwrap();

        assert_eq!(all, vec![15, 16, 17]);
    }

    #[tokio::test]
    async fn source_len_reports_whole_source() {
        let mut bounded = BoundedSource::new(source(), 10);
        bounded.seek(SeekFrom::Start(4)).await.unwrap();

        assert_eq!(bounded.source_len().await.unwrap(), 20);
        assert_eq!(bounded.get_mut().position(), 4);
    }

    #[tokio::test]
    async fn write_is_unsupported() {
        let mut bounded = BoundedSource::new(source(), 10);

        let err = bounded.write_all(b"nope").await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert_eq!(bounded.into_inner().into_inner().len(), 20);
    }
}
