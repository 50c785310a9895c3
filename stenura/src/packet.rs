//! Packet framing.
//!
//! Requests are 18 bytes: SOH, a sequence number, a little-endian length,
//! the action, five parameters, and a CRC over everything from the sequence
//! number through the last parameter.  Replies are 14 bytes with an error
//! word and two parameters.  When the announced length exceeds the header,
//! a data section follows, raw bytes with a CRC of their own.

use std::io::Read;

use crate::crc::checksum;
use crate::Error;

pub const SOH: u8 = 0x01;
pub const REQUEST_LEN: usize = 18;
pub const RESPONSE_LEN: usize = 14;

/// The actions the protocol defines.  Only `Open` and `ReadC` are used for
/// realtime translation; the rest belong to file management on the machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum Action {
    Close = 0x02,
    Delete = 0x03,
    DiskStatus = 0x07,
    Open = 0x0a,
    ReadC = 0x0b,
    Reset = 0x14,
    Term = 0x15,
    GetDos = 0x18,
    Diag = 0x19,
}

/// An outgoing request.
#[derive(Clone, Debug)]
pub struct Request {
    pub seq: u8,
    pub action: Action,
    pub params: [u16; 5],
    pub data: Option<Vec<u8>>,
}

impl Request {
    pub fn new(seq: u8, action: Action, params: [u16; 5]) -> Request {
        Request {
            seq,
            action,
            params,
            data: None,
        }
    }

    /// Open the realtime file, which the machine appends each new stroke to.
    pub fn open_realtime(seq: u8) -> Request {
        Request {
            seq,
            action: Action::Open,
            params: [u16::from(b'A'), 0, 0, 0, 0],
            data: Some(b"REALTIME.000".to_vec()),
        }
    }

    /// Read the next realtime bytes, starting at `offset`.
    pub fn read_bytes(seq: u8, offset: u16) -> Request {
        Request {
            seq,
            action: Action::ReadC,
            params: [1, 1, 512, 0, offset],
            data: None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let data_len = self.data.as_ref().map_or(0, |d| d.len());
        let len = (REQUEST_LEN + data_len) as u16;

        let mut out = Vec::with_capacity(REQUEST_LEN + data_len + 2);
        out.push(SOH);
        out.push(self.seq);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(self.action as u16).to_le_bytes());
        for p in self.params {
            out.extend_from_slice(&p.to_le_bytes());
        }
        let crc = checksum(&out[1..REQUEST_LEN - 2]);
        out.extend_from_slice(&crc.to_le_bytes());

        if let Some(data) = &self.data {
            out.extend_from_slice(data);
            out.extend_from_slice(&checksum(data).to_le_bytes());
        }
        out
    }
}

/// An incoming reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub seq: u8,
    pub action: u16,
    pub error: u16,
    pub p1: u16,
    pub p2: u16,
    pub data: Option<Vec<u8>>,
}

impl Response {
    /// Read one reply packet, scanning forward to the SOH first so line
    /// noise cannot wedge the reader.
    pub fn read_from(reader: &mut impl Read) -> Result<Response, Error> {
        let mut skipped = 0u32;
        loop {
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte)?;
            if byte[0] == SOH {
                break;
            }
            skipped += 1;
        }
        if skipped > 0 {
            log::warn!("skipped {} bytes looking for SOH", skipped);
        }

        let mut head = [0u8; RESPONSE_LEN - 1];
        reader.read_exact(&mut head)?;
        let seq = head[0];
        let len = u16::from_le_bytes([head[1], head[2]]);
        let action = u16::from_le_bytes([head[3], head[4]]);
        let error = u16::from_le_bytes([head[5], head[6]]);
        let p1 = u16::from_le_bytes([head[7], head[8]]);
        let p2 = u16::from_le_bytes([head[9], head[10]]);
        let crc = u16::from_le_bytes([head[11], head[12]]);

        if checksum(&head[..11]) != crc {
            return Err(Error::BadCrc);
        }
        if (len as usize) < RESPONSE_LEN {
            return Err(Error::BadLength(len));
        }

        let data = if len as usize > RESPONSE_LEN {
            let size = len as usize - RESPONSE_LEN;
            let mut data = vec![0u8; size + 2];
            reader.read_exact(&mut data)?;
            let crc = u16::from_le_bytes([data[size], data[size + 1]]);
            data.truncate(size);
            if checksum(&data) != crc {
                return Err(Error::BadCrc);
            }
            Some(data)
        } else {
            None
        };

        Ok(Response {
            seq,
            action,
            error,
            p1,
            p2,
            data,
        })
    }

    /// Encode a reply the way the machine would.  Used by tests standing in
    /// for the device.
    pub fn encode(&self) -> Vec<u8> {
        let data_len = self.data.as_ref().map_or(0, |d| d.len());
        let len = (RESPONSE_LEN + data_len) as u16;

        let mut out = Vec::with_capacity(RESPONSE_LEN + data_len + 2);
        out.push(SOH);
        out.push(self.seq);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&self.action.to_le_bytes());
        out.extend_from_slice(&self.error.to_le_bytes());
        out.extend_from_slice(&self.p1.to_le_bytes());
        out.extend_from_slice(&self.p2.to_le_bytes());
        let crc = checksum(&out[1..RESPONSE_LEN - 2]);
        out.extend_from_slice(&crc.to_le_bytes());

        if let Some(data) = &self.data {
            out.extend_from_slice(data);
            out.extend_from_slice(&checksum(data).to_le_bytes());
        }
        out
    }
}
