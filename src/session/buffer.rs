use super::protocol::ProtocolError;

/// Audio submitted but not yet acknowledged by the server.
///
/// Always holds exactly the bytes in `acknowledged..submitted` of the
/// stream. It grows at the tail on submission and shrinks at the front on
/// acknowledgment; sending bytes never removes them.
#[derive(Debug, Default)]
pub struct PendingAudioBuffer {
    data: Vec<u8>,
    submitted: u64,
    acknowledged: u64,
}

impl PendingAudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
        self.submitted += chunk.len() as u64;
    }

    /// Apply an absolute acknowledgment offset, trimming the buffer front.
    ///
    /// Returns the number of bytes released. Offsets that move backwards or
    /// past the submitted total are rejected and leave the buffer untouched.
    pub fn acknowledge(&mut self, offset: u64) -> Result<usize, ProtocolError> {
        if offset < self.acknowledged {
            return Err(ProtocolError::AckRegression {
                offset,
                acknowledged: self.acknowledged,
            });
        }
        if offset > self.submitted {
            return Err(ProtocolError::AckBeyondSubmitted {
                offset,
                submitted: self.submitted,
            });
        }

        let released = (offset - self.acknowledged) as usize;
        self.data.drain(..released);
        self.acknowledged = offset;
        Ok(released)
    }

    /// Everything the server has not acknowledged yet, in stream order
    pub fn pending(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes_submitted(&self) -> u64 {
        self.submitted
    }

    pub fn bytes_acknowledged(&self) -> u64 {
        self.acknowledged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_buffer_tracks_submitted_minus_acknowledged() {
        let all = stream(1000);
        let mut buffer = PendingAudioBuffer::new();
        let mut fed = 0;
        let mut highest_ack = 0u64;

        // Interleave uneven chunks with acknowledgments
        for (chunk_len, ack) in [(100, None), (250, Some(80)), (13, Some(80)), (300, Some(350)), (337, Some(663)), (0, Some(1000))] {
            buffer.append(&all[fed..fed + chunk_len]);
            fed += chunk_len;
            if let Some(ack) = ack {
                buffer.acknowledge(ack).unwrap();
                highest_ack = ack;
            }
            assert_eq!(buffer.pending(), &all[highest_ack as usize..fed]);
            assert_eq!(buffer.len() as u64, buffer.bytes_submitted() - buffer.bytes_acknowledged());
        }

        assert!(buffer.is_empty());
        assert_eq!(buffer.bytes_submitted(), 1000);
        assert_eq!(buffer.bytes_acknowledged(), 1000);
    }

    #[test]
    fn test_replay_is_unacknowledged_tail() {
        let c1 = vec![1u8; 100];
        let c2 = vec![2u8; 50];
        let mut buffer = PendingAudioBuffer::new();
        buffer.append(&c1);
        buffer.append(&c2);

        assert_eq!(buffer.acknowledge(100).unwrap(), 100);
        assert_eq!(buffer.pending(), c2.as_slice());
    }

    #[test]
    fn test_repeated_ack_is_noop() {
        let mut buffer = PendingAudioBuffer::new();
        buffer.append(&[7; 10]);
        buffer.acknowledge(4).unwrap();

        assert_eq!(buffer.acknowledge(4).unwrap(), 0);
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn test_ack_regression_is_rejected() {
        let mut buffer = PendingAudioBuffer::new();
        buffer.append(&stream(200));
        buffer.acknowledge(150).unwrap();

        let err = buffer.acknowledge(100).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::AckRegression {
                offset: 100,
                acknowledged: 150
            }
        );
        assert_eq!(buffer.bytes_acknowledged(), 150);
        assert_eq!(buffer.pending(), &stream(200)[150..]);
    }

    #[test]
    fn test_ack_beyond_submitted_is_rejected() {
        let mut buffer = PendingAudioBuffer::new();
        buffer.append(&[0; 64]);

        let err = buffer.acknowledge(65).unwrap_err();
        assert!(matches!(err, ProtocolError::AckBeyondSubmitted { offset: 65, submitted: 64 }));
        assert_eq!(buffer.len(), 64);
        assert_eq!(buffer.bytes_acknowledged(), 0);
    }
}
