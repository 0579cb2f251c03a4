use crate::error::{ReportError, Result};
use std::io::{self, Read};

/// Pull-based byte stream over a lazy sequence of fragments.
///
/// No fragment is produced until a read needs it. Bytes pulled beyond the
/// requested size are kept for the next read.
pub struct FragmentStream<I> {
    fragments: I,
    leftover: Vec<u8>,
    exhausted: bool,
}

impl<I> FragmentStream<I>
where
    I: Iterator<Item = Result<Vec<u8>>>,
{
    pub fn new(fragments: I) -> Self {
        Self {
            fragments,
            leftover: Vec::new(),
            exhausted: false,
        }
    }

    /// Return exactly `size` bytes, or fewer once the fragments run out.
    /// An empty buffer means the stream is drained.
    pub fn read_chunk(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut data = std::mem::take(&mut self.leftover);

        while data.len() < size && !self.exhausted {
            match self.fragments.next() {
                Some(Ok(fragment)) => data.extend_from_slice(&fragment),
                Some(Err(err)) => {
                    self.leftover = data;
                    self.exhausted = true;
                    return Err(err);
                }
                None => self.exhausted = true,
            }
        }

        if data.len() > size {
            self.leftover = data.split_off(size);
        }
        Ok(data)
    }

    pub fn is_drained(&self) -> bool {
        self.exhausted && self.leftover.is_empty()
    }

    pub fn into_inner(self) -> I {
        self.fragments
    }
}

impl<I> Read for FragmentStream<I>
where
    I: Iterator<Item = Result<Vec<u8>>>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_chunk(buf.len()).map_err(into_io)?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

fn into_io(err: ReportError) -> io::Error {
    match err {
        ReportError::Io(err) => err,
        other => io::Error::other(other),
    }
}

/// Recover the report error carried through `io::Read`, if there is one.
pub(crate) fn from_io(err: io::Error) -> ReportError {
    match err.get_ref().map(|inner| inner.is::<ReportError>()) {
        Some(true) => match err.into_inner().map(|inner| inner.downcast::<ReportError>()) {
            Some(Ok(report)) => *report,
            _ => ReportError::Io(io::Error::other("report stream failed")),
        },
        _ => ReportError::Io(err),
    }
}
