//! Packet layer over the raw byte stream.
//!
//! On the wire a packet is `0x00 | type id | COBS(payload) | 0x00`. The
//! type id is guaranteed non-zero, so only the payload is stuffed; the
//! delimiter therefore appears nowhere inside a packet and the stream is
//! self-synchronizing after any corruption.

use heapless::Vec;

use crate::cobs;

/// Reserved delimiter byte framing every packet on both sides.
pub const DELIMITER: u8 = 0x00;

/// Largest decoded payload carried by one packet.
pub const MAX_PAYLOAD: usize = 64;

/// Accumulation capacity between delimiters: type id + stuffed payload.
const MAX_STUFFED: usize = 1 + cobs::max_encoded_len(MAX_PAYLOAD);

/// Full on-wire packet size: accumulation plus both delimiters.
pub const MAX_PACKET: usize = MAX_STUFFED + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    ImuSample = 0x01,
    Status = 0x02,
    DeviceInfo = 0x03,
    Command = 0x04,
}

impl PacketType {
    pub const fn from_wire(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(Self::ImuSample),
            0x02 => Some(Self::Status),
            0x03 => Some(Self::DeviceInfo),
            0x04 => Some(Self::Command),
            _ => None,
        }
    }
}

/// Frame `payload` as a complete outbound packet in `dst`, returning the
/// wire length.
pub fn encode_packet(
    packet_type: PacketType,
    payload: &[u8],
    dst: &mut [u8],
) -> Result<usize, cobs::EncodeError> {
    if dst.len() < 4 {
        return Err(cobs::EncodeError::BufferFull);
    }
    dst[0] = DELIMITER;
    dst[1] = packet_type as u8;
    let dst_len = dst.len();
    let stuffed = cobs::encode(payload, &mut dst[2..dst_len - 1])?;
    dst[2 + stuffed] = DELIMITER;
    Ok(stuffed + 3)
}

/// One complete packet lifted out of the byte stream, payload unstuffed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub packet_type: u8,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

/// Incremental parser for the delimited byte stream.
///
/// Two states: idle (scanning for a delimiter) and accumulating. A
/// delimiter on an empty accumulation restarts it, so the most recent
/// delimiter is always the authoritative packet start. Anything malformed
/// is dropped and the parser resynchronizes on the next delimiter; it
/// never stalls, whatever the input.
pub struct Deframer {
    buf: Vec<u8, MAX_STUFFED>,
    accumulating: bool,
}

impl Deframer {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            accumulating: false,
        }
    }

    /// Feed one received byte; returns a frame when one completes.
    pub fn push(&mut self, byte: u8) -> Option<InboundFrame> {
        if !self.accumulating {
            if byte == DELIMITER {
                self.buf.clear();
                self.accumulating = true;
            }
            return None;
        }

        if byte != DELIMITER {
            if self.buf.push(byte).is_err() {
                // overran the accumulator without an end delimiter;
                // discard and resynchronize on the next one
                self.accumulating = false;
            }
            return None;
        }

        if self.buf.is_empty() {
            // repeated delimiter: restart clean from this one
            return None;
        }

        let frame = self.complete();
        self.buf.clear();
        self.accumulating = false;
        frame
    }

    /// End delimiter seen: byte 0 is the type id, the rest is stuffed
    /// payload. Undecodable packets are dropped silently.
    fn complete(&self) -> Option<InboundFrame> {
        let packet_type = self.buf[0];
        let mut payload: Vec<u8, MAX_PAYLOAD> = Vec::new();
        payload.resize_default(MAX_PAYLOAD).ok()?;
        let len = cobs::decode(&self.buf[1..], &mut payload).ok()?;
        payload.truncate(len);
        Some(InboundFrame {
            packet_type,
            payload,
        })
    }
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}
