//! Splitting large payloads into continuation frames
//!
//! Images and pattern definitions are far larger than one frame. The device
//! reassembles them from a run of frames flagged `First`, `Middle`..., `Last`
//! and rejects anything out of order, so fragments are produced lazily and
//! must be sent in the order they are yielded.

use std::iter::FusedIterator;
use std::slice::Chunks;

use crate::error::FrameError;
use crate::protocol::{build_packet, PacketHeader, MAX_PAYLOAD_SIZE};
use crate::types::ContinuationFlag;

/// One frame of a fragmented transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Zero-based position in the transfer
    pub index: usize,
    pub flag: ContinuationFlag,
    /// The slice of the input payload carried by this frame
    pub payload: &'a [u8],
    packet: Vec<u8>,
}

impl<'a> Fragment<'a> {
    /// Complete frame, checksum included
    pub fn as_bytes(&self) -> &[u8] {
        &self.packet
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.packet
    }
}

/// Lazy, in-order sequence of frames covering one payload
///
/// Not `Clone`: a transfer is consumed once and cannot be restarted.
#[derive(Debug)]
pub struct Fragments<'a> {
    header: PacketHeader,
    chunks: Chunks<'a, u8>,
    index: usize,
    total: usize,
}

impl<'a> Fragments<'a> {
    /// `header` supplies packet type and command; flag and length are
    /// overwritten per frame.
    pub fn new(
        header: PacketHeader,
        payload: &'a [u8],
        max_chunk: usize,
    ) -> Result<Self, FrameError> {
        if max_chunk == 0 || max_chunk > MAX_PAYLOAD_SIZE {
            return Err(FrameError::InvalidChunkSize {
                size: max_chunk,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            header,
            chunks: payload.chunks(max_chunk),
            index: 0,
            total: payload.len().div_ceil(max_chunk),
        })
    }

    /// Number of frames in the whole transfer
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        let index = self.index;
        self.index += 1;

        let flag = ContinuationFlag::for_position(index, self.total);
        // chunk.len() <= MAX_PAYLOAD_SIZE, checked in new()
        let header = self.header.with_flag(flag).with_length(chunk.len() as u16);

        Some(Fragment {
            index,
            flag,
            payload: chunk,
            packet: build_packet(&header.to_bytes(), chunk),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Fragments<'_> {}

impl FusedIterator for Fragments<'_> {}

/// Split `payload` into frames of at most `max_chunk` payload bytes.
pub fn fragment(
    header: PacketHeader,
    payload: &[u8],
    max_chunk: usize,
) -> Result<Fragments<'_>, FrameError> {
    Fragments::new(header, payload, max_chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{cmd, verify_checksum, HEADER_SIZE};
    use crate::types::PacketType;

    fn image_header() -> PacketHeader {
        PacketHeader::new(PacketType::Write, cmd::STATIC_IMAGE)
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn test_1500_bytes_in_three_frames() {
        let data = sample(1500);
        let frames: Vec<_> = fragment(image_header(), &data, 512).unwrap().collect();

        assert_eq!(frames.len(), 3);
        let sizes: Vec<_> = frames.iter().map(|f| f.payload.len()).collect();
        assert_eq!(sizes, [512, 512, 476]);
        let flags: Vec<_> = frames.iter().map(|f| f.flag).collect();
        assert_eq!(
            flags,
            [
                ContinuationFlag::First,
                ContinuationFlag::Middle,
                ContinuationFlag::Last
            ]
        );

        for frame in &frames {
            let bytes = frame.as_bytes();
            assert!(verify_checksum(bytes));
            assert_eq!(&bytes[..3], &[0x02, 0x01, 0x05]);
            assert_eq!(bytes[3], frame.flag as u8);
            let len = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
            assert_eq!(len, frame.payload.len());
            assert_eq!(&bytes[HEADER_SIZE..bytes.len() - 1], frame.payload);
        }

        // 476 = 0x01DC
        assert_eq!(&frames[2].as_bytes()[4..6], &[0xDC, 0x01]);
    }

    #[test]
    fn test_reassembly_and_flag_counts() {
        for (len, chunk) in [(1, 512), (511, 512), (512, 512), (513, 512), (1000, 7), (64, 1)] {
            let data = sample(len);
            let frames: Vec<_> = fragment(image_header(), &data, chunk).unwrap().collect();

            assert_eq!(frames.len(), len.div_ceil(chunk), "len={len} chunk={chunk}");

            let joined: Vec<u8> = frames.iter().flat_map(|f| f.payload.iter().copied()).collect();
            assert_eq!(joined, data);

            let opens = frames.iter().filter(|f| f.flag.opens_transfer()).count();
            let closes = frames.iter().filter(|f| f.flag.closes_transfer()).count();
            assert_eq!(opens, 1);
            assert_eq!(closes, 1);
            assert!(frames.iter().all(|f| verify_checksum(f.as_bytes())));
        }
    }

    #[test]
    fn test_single_frame_uses_single_flag() {
        let data = sample(512);
        let frames: Vec<_> = fragment(image_header(), &data, 512).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].flag, ContinuationFlag::Single);
        assert_eq!(frames[0].as_bytes()[3], 0x00);
    }

    #[test]
    fn test_empty_payload_yields_nothing() {
        let mut frames = fragment(image_header(), &[], 512).unwrap();
        assert_eq!(frames.total(), 0);
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_exact_size() {
        let data = sample(1500);
        let mut frames = fragment(image_header(), &data, 512).unwrap();
        assert_eq!(frames.len(), 3);
        frames.next();
        assert_eq!(frames.len(), 2);
        frames.next();
        frames.next();
        assert_eq!(frames.len(), 0);
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_sequence_resumes_and_never_restarts() {
        let data = sample(1500);
        let mut frames = fragment(image_header(), &data, 512).unwrap();
        assert_eq!(frames.next().map(|f| f.flag), Some(ContinuationFlag::First));

        // Handing the rest on continues where the first consumer stopped
        let rest: Vec<_> = frames.by_ref().map(|f| (f.index, f.flag)).collect();
        assert_eq!(
            rest,
            [(1, ContinuationFlag::Middle), (2, ContinuationFlag::Last)]
        );
        assert!(frames.next().is_none());
        assert_eq!(frames.len(), 0);
    }

    #[test]
    fn test_invalid_chunk_sizes() {
        let data = sample(10);
        assert!(matches!(
            fragment(image_header(), &data, 0),
            Err(FrameError::InvalidChunkSize { size: 0, .. })
        ));
        assert!(matches!(
            fragment(image_header(), &data, MAX_PAYLOAD_SIZE + 1),
            Err(FrameError::InvalidChunkSize { .. })
        ));
    }
}
