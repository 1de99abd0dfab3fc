//! Wire framing for socket transports: how a continuous byte stream is
//! split into discrete messages, each of which fires one `receive` rule.

/// `raw` delivers whatever chunk the underlying `read()` returned, `lines`
/// splits on `\n`, `length_prefixed` reads a little-endian `u64` byte count
/// followed by exactly that many payload bytes (see Open Question
/// resolutions in DESIGN.md for why little-endian/64-bit was chosen).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Raw,
    LengthPrefixed,
    Lines,
}

impl Framing {
    /// Prefixes/terminates an outbound payload the way this framing expects
    /// the peer to be able to split it back out.
    pub fn encode(self, payload: &[u8]) -> Vec<u8> {
        match self {
            Framing::Raw => payload.to_vec(),
            Framing::LengthPrefixed => {
                let mut out = Vec::with_capacity(8 + payload.len());
                out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
                out.extend_from_slice(payload);
                out
            }
            Framing::Lines => {
                let mut out = payload.to_vec();
                if out.last() != Some(&b'\n') {
                    out.push(b'\n');
                }
                out
            }
        }
    }
}

/// Accumulates inbound bytes and extracts complete frames as they become
/// available, buffering any trailing partial frame across reads.
#[derive(Default)]
pub struct FrameAssembler {
    framing: Option<Framing>,
    buffer: Vec<u8>,
}

impl FrameAssembler {
    pub fn new(framing: Framing) -> Self {
        FrameAssembler { framing: Some(framing), buffer: Vec::new() }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Drains and returns every complete frame currently buffered.
    pub fn drain_frames(&mut self) -> Vec<Vec<u8>> {
        let framing = self.framing.expect("FrameAssembler constructed via new()");
        let mut frames = Vec::new();
        loop {
            match framing {
                Framing::Raw => {
                    if self.buffer.is_empty() {
                        break;
                    }
                    frames.push(std::mem::take(&mut self.buffer));
                }
                Framing::Lines => {
                    if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                        line.pop();
                        frames.push(line);
                    } else {
                        break;
                    }
                }
                Framing::LengthPrefixed => {
                    if self.buffer.len() < 8 {
                        break;
                    }
                    let len = u64::from_le_bytes(self.buffer[0..8].try_into().unwrap()) as usize;
                    if self.buffer.len() < 8 + len {
                        break;
                    }
                    let frame = self.buffer[8..8 + len].to_vec();
                    self.buffer.drain(..8 + len);
                    frames.push(frame);
                }
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_framing_splits_on_newline() {
        let mut asm = FrameAssembler::new(Framing::Lines);
        asm.push(b"hello\nworl");
        asm.push(b"d\n");
        let frames = asm.drain_frames();
        assert_eq!(frames, vec![b"hello".to_vec(), b"world".to_vec()]);
    }

    #[test]
    fn length_prefixed_waits_for_full_payload() {
        let mut asm = FrameAssembler::new(Framing::LengthPrefixed);
        let encoded = Framing::LengthPrefixed.encode(b"hi");
        asm.push(&encoded[..5]);
        assert!(asm.drain_frames().is_empty());
        asm.push(&encoded[5..]);
        assert_eq!(asm.drain_frames(), vec![b"hi".to_vec()]);
    }

    #[test]
    fn raw_framing_passes_chunks_through() {
        let mut asm = FrameAssembler::new(Framing::Raw);
        asm.push(b"chunk");
        assert_eq!(asm.drain_frames(), vec![b"chunk".to_vec()]);
    }
}
