use tokio::sync::mpsc;

use crate::uid::TagUid;

/// Seam over the RFID reader peripheral. Implementations expose the UID from
/// the most recent inventory frame; all-zero means an empty field.
pub trait TagReader {
    /// Parse whatever frames the peripheral has buffered.
    fn pump(&mut self);

    /// Ask the peripheral for a new inventory round.
    fn poll(&mut self);

    /// True while buffered frames are still unparsed.
    fn data_pending(&self) -> bool;

    /// UID from the latest parsed frame.
    fn current_uid(&self) -> TagUid;
}

/// Reader fed over a channel by whatever process fronts the physical
/// peripheral. The binary wires this to stdin lines.
pub struct FrameReader {
    frames: mpsc::UnboundedReceiver<TagUid>,
    current: TagUid,
}

impl FrameReader {
    pub fn new(frames: mpsc::UnboundedReceiver<TagUid>) -> Self {
        FrameReader {
            frames,
            current: TagUid::ZERO,
        }
    }
}

impl TagReader for FrameReader {
    fn pump(&mut self) {
        while let Ok(uid) = self.frames.try_recv() {
            self.current = uid;
        }
    }

    fn poll(&mut self) {
        // The frame source streams on its own; there is no request side.
    }

    fn data_pending(&self) -> bool {
        !self.frames.is_empty()
    }

    fn current_uid(&self) -> TagUid {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uid::UID_LEN;

    fn uid(tag: u8) -> TagUid {
        let mut bytes = [0u8; UID_LEN];
        bytes[0] = tag;
        TagUid::new(bytes)
    }

    #[test]
    fn test_pump_keeps_latest_frame() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut reader = FrameReader::new(rx);
        assert!(reader.current_uid().is_zero());

        tx.send(uid(1)).unwrap();
        tx.send(uid(2)).unwrap();
        assert!(reader.data_pending());

        reader.pump();
        assert_eq!(reader.current_uid(), uid(2));
        assert!(!reader.data_pending());

        // The latched UID survives quiet pumps until a new frame arrives.
        reader.pump();
        assert_eq!(reader.current_uid(), uid(2));
        tx.send(TagUid::ZERO).unwrap();
        reader.pump();
        assert!(reader.current_uid().is_zero());
    }
}
