use std::ops::Deref;

use futures::stream::BoxStream;

use crate::types::SequenceNumber;

/// A record handed to the log to be appended to a segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Ordering key of the record within its segment.
    pub sequence: SequenceNumber,
    pub payload: Vec<u8>,
}

/// Acknowledgement of an appended record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Produced {
    pub sequence: SequenceNumber,
}

/// A record read back from a segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub sequence: SequenceNumber,
    pub payload: Vec<u8>,
}

/// Arguments of a segment read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumeSegment {
    pub space: String,
    pub segment: String,
    pub min_sequence: SequenceNumber,
}

/// Client of an external ordered log, durably storing records in segments grouped by space.
///
/// The log owns the ordering of each segment: an append is expected to be rejected when its
/// records do not continue the segment tail.
pub trait StreamClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Appends the records, in order, to the segment. The returned stream yields one outcome per
    /// record.
    fn produce<'a>(
        &'a self,
        space: &'a str,
        segment: &'a str,
        records: Vec<Record>,
    ) -> BoxStream<'a, Result<Produced, Self::Error>>;

    /// Streams the entries of a segment from `min_sequence` onwards, by ascending sequence.
    fn consume_segment(&self, args: ConsumeSegment) -> BoxStream<'_, Result<Entry, Self::Error>>;

    /// Returns the tail sequence of the segment if the error reports a rejected append.
    fn conflicting_tail(&self, _error: &Self::Error) -> Option<SequenceNumber> {
        None
    }
}

/// Blanket implementation making a [`StreamClient`] every (smart) pointer to a [`StreamClient`],
/// e.g. `Arc<Client>`, `Box<dyn StreamClient<Error = E>>`.
impl<C, T> StreamClient for T
where
    C: StreamClient + ?Sized + 'static,
    T: Deref<Target = C> + Send + Sync,
{
    type Error = C::Error;

    fn produce<'a>(
        &'a self,
        space: &'a str,
        segment: &'a str,
        records: Vec<Record>,
    ) -> BoxStream<'a, Result<Produced, Self::Error>> {
        self.deref().produce(space, segment, records)
    }

    fn consume_segment(&self, args: ConsumeSegment) -> BoxStream<'_, Result<Entry, Self::Error>> {
        self.deref().consume_segment(args)
    }

    fn conflicting_tail(&self, error: &Self::Error) -> Option<SequenceNumber> {
        self.deref().conflicting_tail(error)
    }
}
