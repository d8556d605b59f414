//! DNS wire format encoder/decoder (RFC 1035).
//! Decoding borrows the response buffer; extracted names are owned strings.

use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

use crate::record::{Answer, QClass, RData, RecordType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("packet truncated at offset {0}")]
    Truncated(usize),
    #[error("invalid name label at offset {0}")]
    InvalidLabel(usize),
    #[error("invalid compression pointer at offset {0}")]
    InvalidPointer(usize),
    #[error("invalid UTF-8 in name")]
    InvalidUtf8,
    #[error("name too long (exceeds 255 octets)")]
    NameTooLong,
    #[error("label too long: {0} octets (max 63)")]
    LabelTooLong(usize),
    #[error("{rtype} RDATA has length {len}, expected {expected}")]
    RdataLength {
        rtype: RecordType,
        len: usize,
        expected: usize,
    },
    #[error("malformed record data at offset {0}")]
    RecordFormat(usize),
    #[error("packet is not a response")]
    NotAResponse,
    #[error("transaction id mismatch: sent {sent:#06x}, got {got:#06x}")]
    TxIdMismatch { sent: u16, got: u16 },
}

/// Unpacked header flag field.
///
/// Wire layout (network order): byte 0 is QR(7) OPCODE(6..3) AA(2) TC(1)
/// RD(0), byte 1 is RA(7) Z(6) AD(5) CD(4) RCODE(3..0). Z always encodes
/// as zero and is ignored on decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub ad: bool,
    pub cd: bool,
    pub rcode: u8,
}

impl Flags {
    pub fn to_u16(self) -> u16 {
        let mut bits = 0u16;
        if self.qr {
            bits |= 0x8000;
        }
        bits |= ((self.opcode & 0x0F) as u16) << 11;
        if self.aa {
            bits |= 0x0400;
        }
        if self.tc {
            bits |= 0x0200;
        }
        if self.rd {
            bits |= 0x0100;
        }
        if self.ra {
            bits |= 0x0080;
        }
        if self.ad {
            bits |= 0x0020;
        }
        if self.cd {
            bits |= 0x0010;
        }
        bits | (self.rcode & 0x0F) as u16
    }

    pub fn from_u16(bits: u16) -> Self {
        Self {
            qr: bits & 0x8000 != 0,
            opcode: ((bits >> 11) & 0x0F) as u8,
            aa: bits & 0x0400 != 0,
            tc: bits & 0x0200 != 0,
            rd: bits & 0x0100 != 0,
            ra: bits & 0x0080 != 0,
            ad: bits & 0x0020 != 0,
            cd: bits & 0x0010 != 0,
            rcode: (bits & 0x0F) as u8,
        }
    }
}

/// A single question: name, type, class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: QClass,
}

/// A decoded response message with its three record sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: u16,
    pub flags: Flags,
    pub answers: Vec<Answer>,
    pub authorities: Vec<Answer>,
    pub additionals: Vec<Answer>,
}

/// Header bits and EDNS opt-ins applied when encoding a query.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub rd: bool,
    pub aa: bool,
    pub ad: bool,
    pub cd: bool,
    /// When set, append a minimal OPT pseudo-record advertising this
    /// UDP payload size (RFC 6891).
    pub udp_payload_size: Option<u16>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            rd: true,
            aa: false,
            ad: false,
            cd: false,
            udp_payload_size: None,
        }
    }
}

/// Encode a single-question query message.
pub fn encode_query(
    question: &Question,
    id: u16,
    opts: &EncodeOptions,
) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::with_capacity(512);

    buf.extend_from_slice(&id.to_be_bytes());
    let flags = Flags {
        rd: opts.rd,
        aa: opts.aa,
        ad: opts.ad,
        cd: opts.cd,
        ..Flags::default()
    };
    buf.extend_from_slice(&flags.to_u16().to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    buf.extend_from_slice(&0u16.to_be_bytes()); // ANCOUNT
    buf.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    let arcount: u16 = if opts.udp_payload_size.is_some() { 1 } else { 0 };
    buf.extend_from_slice(&arcount.to_be_bytes());

    encode_name(&question.name, &mut buf)?;
    buf.extend_from_slice(&question.qtype.to_u16().to_be_bytes());
    buf.extend_from_slice(&question.qclass.to_u16().to_be_bytes());

    if let Some(size) = opts.udp_payload_size {
        // OPT pseudo-record: root name, requested payload size in CLASS,
        // zero extended-RCODE/version/flags, empty RDATA
        buf.push(0x00);
        buf.extend_from_slice(&RecordType::OPT.to_u16().to_be_bytes());
        buf.extend_from_slice(&size.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
    }

    Ok(buf)
}

/// Encode a name as length-prefixed labels with a terminal zero octet.
pub fn encode_name(name: &str, buf: &mut Vec<u8>) -> Result<(), WireError> {
    if name.is_empty() {
        buf.push(0);
        return Ok(());
    }
    let mut wire_len = 1usize; // terminal zero
    for label in name.split('.') {
        if label.len() > 63 {
            return Err(WireError::LabelTooLong(label.len()));
        }
        wire_len += 1 + label.len();
        if wire_len > 255 {
            return Err(WireError::NameTooLong);
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
    Ok(())
}

/// Parse a name from the wire, following compression pointers.
/// Returns the name and the offset just past it in the original stream.
pub fn parse_name(buf: &[u8], start: usize) -> Result<(String, usize), WireError> {
    let mut name = String::with_capacity(64);
    let mut offset = start;
    let mut jumped = false;
    let mut end_offset = 0;
    let mut wire_len = 1usize; // terminal zero octet

    loop {
        if offset >= buf.len() {
            return Err(WireError::Truncated(offset));
        }

        let len = buf[offset] as usize;

        // Compression pointer: top two bits 11, 14-bit absolute offset
        if len & 0xC0 == 0xC0 {
            if offset + 1 >= buf.len() {
                return Err(WireError::Truncated(offset));
            }
            let target = ((len & 0x3F) << 8) | buf[offset + 1] as usize;
            // Pointers may only reference earlier data. Every jump target
            // is strictly below the pointer itself, so chains terminate.
            if target >= offset {
                return Err(WireError::InvalidPointer(offset));
            }
            if !jumped {
                end_offset = offset + 2;
            }
            offset = target;
            jumped = true;
            continue;
        }

        // 0x80 and 0x40 label types are reserved
        if len & 0xC0 != 0 {
            return Err(WireError::InvalidLabel(offset));
        }

        // End of name
        if len == 0 {
            if !jumped {
                end_offset = offset + 1;
            }
            break;
        }

        offset += 1;
        if offset + len > buf.len() {
            return Err(WireError::Truncated(offset));
        }

        wire_len += 1 + len;
        if wire_len > 255 {
            return Err(WireError::NameTooLong);
        }

        if !name.is_empty() {
            name.push('.');
        }
        let label =
            std::str::from_utf8(&buf[offset..offset + len]).map_err(|_| WireError::InvalidUtf8)?;
        name.push_str(label);
        offset += len;
    }

    Ok((name, end_offset))
}

/// Parse a question entry, returning it and the offset just past it.
pub fn parse_question(buf: &[u8], start: usize) -> Result<(Question, usize), WireError> {
    let (name, after_name) = parse_name(buf, start)?;
    if after_name + 4 > buf.len() {
        return Err(WireError::Truncated(after_name));
    }
    let qtype = RecordType::from_u16(u16::from_be_bytes([buf[after_name], buf[after_name + 1]]));
    let qclass = QClass::from_u16(u16::from_be_bytes([buf[after_name + 2], buf[after_name + 3]]));
    Ok((
        Question {
            name,
            qtype,
            qclass,
        },
        after_name + 4,
    ))
}

/// Decode a response message into its header and three record sections.
pub fn decode_response(buf: &[u8]) -> Result<Response, WireError> {
    if buf.len() < 12 {
        return Err(WireError::Truncated(buf.len()));
    }

    let id = u16::from_be_bytes([buf[0], buf[1]]);
    let flags = Flags::from_u16(u16::from_be_bytes([buf[2], buf[3]]));
    if !flags.qr {
        return Err(WireError::NotAResponse);
    }
    let qd_count = u16::from_be_bytes([buf[4], buf[5]]);
    let an_count = u16::from_be_bytes([buf[6], buf[7]]);
    let ns_count = u16::from_be_bytes([buf[8], buf[9]]);
    let ar_count = u16::from_be_bytes([buf[10], buf[11]]);

    let mut offset = 12;

    // Questions are advanced over but not kept
    for _ in 0..qd_count {
        let (_, next) = parse_question(buf, offset)?;
        offset = next;
    }

    let mut answers = Vec::with_capacity(an_count as usize);
    let mut authorities = Vec::with_capacity(ns_count as usize);
    let mut additionals = Vec::with_capacity(ar_count as usize);

    for (count, section) in [
        (an_count, &mut answers),
        (ns_count, &mut authorities),
        (ar_count, &mut additionals),
    ] {
        for _ in 0..count {
            let (record, next) = parse_record(buf, offset)?;
            section.push(record);
            offset = next;
        }
    }

    Ok(Response {
        id,
        flags,
        answers,
        authorities,
        additionals,
    })
}

/// Parse one resource record. The returned offset is exactly the record's
/// name end plus the 10-octet preamble plus RDLENGTH.
fn parse_record(buf: &[u8], start: usize) -> Result<(Answer, usize), WireError> {
    let (name, after_name) = parse_name(buf, start)?;
    if after_name + 10 > buf.len() {
        return Err(WireError::Truncated(after_name));
    }

    let rtype = RecordType::from_u16(u16::from_be_bytes([buf[after_name], buf[after_name + 1]]));
    let class = QClass::from_u16(u16::from_be_bytes([buf[after_name + 2], buf[after_name + 3]]));
    let ttl = u32::from_be_bytes([
        buf[after_name + 4],
        buf[after_name + 5],
        buf[after_name + 6],
        buf[after_name + 7],
    ]);
    let rdlength = u16::from_be_bytes([buf[after_name + 8], buf[after_name + 9]]) as usize;

    let rdata_start = after_name + 10;
    if rdata_start + rdlength > buf.len() {
        return Err(WireError::Truncated(rdata_start));
    }

    let data = parse_rdata(buf, rdata_start, rdlength, rtype)?;

    Ok((
        Answer {
            name,
            rtype,
            class,
            ttl,
            data,
        },
        rdata_start + rdlength,
    ))
}

fn parse_rdata(
    buf: &[u8],
    offset: usize,
    rdlength: usize,
    rtype: RecordType,
) -> Result<RData, WireError> {
    let end = offset + rdlength;
    match rtype {
        RecordType::A => {
            if rdlength != 4 {
                return Err(WireError::RdataLength {
                    rtype,
                    len: rdlength,
                    expected: 4,
                });
            }
            Ok(RData::A(Ipv4Addr::new(
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            )))
        }
        RecordType::AAAA => {
            if rdlength != 16 {
                return Err(WireError::RdataLength {
                    rtype,
                    len: rdlength,
                    expected: 16,
                });
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[offset..end]);
            Ok(RData::AAAA(Ipv6Addr::from(octets)))
        }
        RecordType::CNAME | RecordType::NS | RecordType::PTR => {
            let (name, after) = parse_name(buf, offset)?;
            if after > end {
                return Err(WireError::RecordFormat(offset));
            }
            Ok(match rtype {
                RecordType::CNAME => RData::CNAME(name),
                RecordType::NS => RData::NS(name),
                _ => RData::PTR(name),
            })
        }
        RecordType::MX => {
            if rdlength < 3 {
                return Err(WireError::RecordFormat(offset));
            }
            let preference = u16::from_be_bytes([buf[offset], buf[offset + 1]]);
            let (exchange, after) = parse_name(buf, offset + 2)?;
            if after > end {
                return Err(WireError::RecordFormat(offset));
            }
            Ok(RData::MX {
                preference,
                exchange,
            })
        }
        RecordType::TXT => {
            // One or more <length><string> pairs, concatenated verbatim
            let mut text = Vec::with_capacity(rdlength);
            let mut pos = offset;
            while pos < end {
                let len = buf[pos] as usize;
                pos += 1;
                if pos + len > end {
                    return Err(WireError::RecordFormat(pos));
                }
                text.extend_from_slice(&buf[pos..pos + len]);
                pos += len;
            }
            Ok(RData::TXT(text))
        }
        RecordType::SOA => {
            let (mname, after_mname) = parse_name(buf, offset)?;
            let (rname, after_rname) = parse_name(buf, after_mname)?;
            if after_rname + 20 > buf.len() {
                return Err(WireError::Truncated(after_rname));
            }
            if after_rname + 20 > end {
                return Err(WireError::RecordFormat(offset));
            }
            let o = after_rname;
            Ok(RData::SOA {
                mname,
                rname,
                serial: u32::from_be_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]),
                refresh: u32::from_be_bytes([buf[o + 4], buf[o + 5], buf[o + 6], buf[o + 7]]),
                retry: u32::from_be_bytes([buf[o + 8], buf[o + 9], buf[o + 10], buf[o + 11]]),
                expire: u32::from_be_bytes([buf[o + 12], buf[o + 13], buf[o + 14], buf[o + 15]]),
                minimum: u32::from_be_bytes([buf[o + 16], buf[o + 17], buf[o + 18], buf[o + 19]]),
            })
        }
        RecordType::SRV => {
            if rdlength < 7 {
                return Err(WireError::RecordFormat(offset));
            }
            let priority = u16::from_be_bytes([buf[offset], buf[offset + 1]]);
            let weight = u16::from_be_bytes([buf[offset + 2], buf[offset + 3]]);
            let port = u16::from_be_bytes([buf[offset + 4], buf[offset + 5]]);
            let (target, after) = parse_name(buf, offset + 6)?;
            if after > end {
                return Err(WireError::RecordFormat(offset));
            }
            Ok(RData::SRV {
                priority,
                weight,
                port,
                target,
            })
        }
        _ => Ok(RData::Raw(buf[offset..end].to_vec())),
    }
}
