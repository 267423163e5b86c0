//! Command frame encoding and decoding.
//!
//! Frame format:
//! - LENGTH (4 bytes): payload length, little-endian
//! - PORT (2 bytes): destination port tag, little-endian
//!
//! The same six bytes are exchanged in both directions before every payload.

/// Size of a command frame on the wire
pub const COMMAND_FRAME_SIZE: usize = 6;

/// Errors that can occur while handling command frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Fewer than [`COMMAND_FRAME_SIZE`] bytes were supplied
    Incomplete,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Declared payload length exceeds the receiver's limit
    PayloadTooLarge,
}

/// Header announcing the payload that follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandFrame {
    /// Payload length in bytes
    pub length: u32,
    /// Routing tag chosen by the sender
    pub port: u16,
}

impl CommandFrame {
    pub const fn new(length: u32, port: u16) -> Self {
        Self { length, port }
    }

    /// Encode into the fixed wire representation
    pub const fn encode(&self) -> [u8; COMMAND_FRAME_SIZE] {
        let len = self.length.to_le_bytes();
        let port = self.port.to_le_bytes();
        [len[0], len[1], len[2], len[3], port[0], port[1]]
    }

    /// Encode into the front of `buffer`
    ///
    /// Returns the number of bytes written
    pub fn encode_into(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let dst = buffer
            .get_mut(..COMMAND_FRAME_SIZE)
            .ok_or(FrameError::BufferTooSmall)?;
        dst.copy_from_slice(&self.encode());
        Ok(COMMAND_FRAME_SIZE)
    }

    /// Decode from the fixed wire representation
    pub const fn decode(bytes: &[u8; COMMAND_FRAME_SIZE]) -> Self {
        Self {
            length: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            port: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }

    /// Decode from the front of an arbitrary slice
    ///
    /// Trailing bytes beyond the frame are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let head: &[u8; COMMAND_FRAME_SIZE] = bytes
            .get(..COMMAND_FRAME_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(FrameError::Incomplete)?;
        Ok(Self::decode(head))
    }

    /// Check the declared length against a receive limit
    ///
    /// The length is peer-controlled, so it must pass this check before any
    /// buffer is sized from it.
    pub fn check_length(&self, max_len: u32) -> Result<usize, FrameError> {
        if self.length > max_len {
            return Err(FrameError::PayloadTooLarge);
        }
        usize::try_from(self.length).map_err(|_| FrameError::PayloadTooLarge)
    }
}

/// Encode a `(length, port)` pair into a command frame
pub const fn encode(length: u32, port: u16) -> [u8; COMMAND_FRAME_SIZE] {
    CommandFrame::new(length, port).encode()
}

/// Decode a command frame into its `(length, port)` pair
pub const fn decode(bytes: &[u8; COMMAND_FRAME_SIZE]) -> (u32, u16) {
    let frame = CommandFrame::decode(bytes);
    (frame.length, frame.port)
}
