use crate::tcp::byte_stream::ByteStream;
use std::collections::BTreeMap;

/// Reassembles out-of-order byte runs into a contiguous stream.
///
/// Runs arrive tagged with their absolute stream offset. Whatever extends the
/// contiguous prefix is written straight into the output `ByteStream`; the
/// rest is held in a map of disjoint pending runs, bounded by the output's
/// remaining capacity. Bytes at or beyond that window are dropped and must be
/// resent.
#[derive(Debug)]
pub struct Reassembler {
    pending: BTreeMap<u64, Box<[u8]>>, // Disjoint out-of-order runs, keyed by start offset
    output: ByteStream,
    next_index: u64,         // First offset not yet written to the output
    last_index: Option<u64>, // One past the final byte of the stream, if known
}

impl Reassembler {
    /// New `Reassembler` writing into the provided `ByteStream`.
    pub fn new(output: ByteStream) -> Self {
        Reassembler {
            pending: BTreeMap::new(),
            output,
            next_index: 0,
            last_index: None,
        }
    }

    /// Insert a run of bytes starting at stream offset `index`.
    ///
    /// `is_last` marks that `data` ends the logical stream. The end-of-stream
    /// index is remembered even when the bytes themselves fall outside the
    /// current window; the output is only closed once every byte up to that
    /// index has been delivered.
    pub fn insert(&mut self, index: u64, data: &[u8], is_last: bool) {
        if is_last && self.last_index.is_none() {
            self.last_index = Some(index + data.len() as u64);
        }
        self.store(index, data);
        self.flush();
        if let Some(last) = self.last_index {
            if self.next_index >= last && !self.output.input_ended() {
                self.output.end_input();
            }
        }
    }

    /// The number of bytes held pending reassembly.
    pub fn unassembled_bytes(&self) -> u64 {
        self.pending.values().map(|run| run.len() as u64).sum()
    }

    pub fn empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// First stream offset not yet delivered to the output.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn stream_out(&self) -> &ByteStream {
        &self.output
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }

    /// Trim `data` to the writable window and merge it into the pending map,
    /// keeping the runs disjoint. Already-stored bytes win on overlap.
    fn store(&mut self, index: u64, data: &[u8]) {
        let mut window_end = self.next_index + self.output.remaining_capacity() as u64;
        // Nothing exists past the end-of-stream marker; late duplicates
        // claiming that space are stale and must not be buffered
        if let Some(last) = self.last_index {
            window_end = window_end.min(last);
        }
        let mut start = index.max(self.next_index);
        let end = (index + data.len() as u64).min(window_end);
        if start >= end {
            return;
        }
        let mut run = data[(start - index) as usize..(end - index) as usize].to_vec();

        // Clip against the nearest run at or below `start`
        if let Some((&prev_start, prev)) = self.pending.range(..=start).next_back() {
            let prev_end = prev_start + prev.len() as u64;
            if prev_end >= end {
                return; // Fully covered by an existing run
            }
            if prev_end > start {
                run.drain(..(prev_end - start) as usize);
                start = prev_end;
            }
        }

        // Absorb every run the new bytes overlap from above
        while let Some((&succ_start, _)) = self.pending.range(start..).next() {
            let run_end = start + run.len() as u64;
            if succ_start >= run_end {
                break;
            }
            let succ = self.pending.remove(&succ_start).expect("range hit");
            let succ_end = succ_start + succ.len() as u64;
            let at = (succ_start - start) as usize;
            if succ_end <= run_end {
                run[at..at + succ.len()].copy_from_slice(&succ);
            } else {
                run.truncate(at);
                run.extend_from_slice(&succ);
            }
        }

        self.pending.insert(start, run.into_boxed_slice());
    }

    /// Drain pending runs that now extend the contiguous prefix.
    fn flush(&mut self) {
        while let Some((&start, _)) = self.pending.first_key_value() {
            if start > self.next_index {
                break;
            }
            let run = self.pending.pop_first().expect("first key hit").1;
            // Admitted runs always fit: the window was sized off the output's
            // remaining capacity when they were stored
            let written = self.output.write(&run);
            debug_assert_eq!(written, run.len());
            self.next_index += written as u64;
        }
    }
}

// -- Unit tests --
