use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// DNS record types with wire-format numeric values (RFC 1035 and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    NAPTR,
    OPT,
    SSHFP,
    DNSKEY,
    TLSA,
    CAA,
    Unknown(u16),
}

impl RecordType {
    pub fn from_u16(val: u16) -> Self {
        match val {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            12 => Self::PTR,
            15 => Self::MX,
            16 => Self::TXT,
            28 => Self::AAAA,
            33 => Self::SRV,
            35 => Self::NAPTR,
            41 => Self::OPT,
            44 => Self::SSHFP,
            48 => Self::DNSKEY,
            52 => Self::TLSA,
            257 => Self::CAA,
            other => Self::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::PTR => 12,
            Self::MX => 15,
            Self::TXT => 16,
            Self::AAAA => 28,
            Self::SRV => 33,
            Self::NAPTR => 35,
            Self::OPT => 41,
            Self::SSHFP => 44,
            Self::DNSKEY => 48,
            Self::TLSA => 52,
            Self::CAA => 257,
            Self::Unknown(v) => v,
        }
    }

    /// Look up a type by its (already uppercased) mnemonic.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A" => Some(Self::A),
            "NS" => Some(Self::NS),
            "CNAME" => Some(Self::CNAME),
            "SOA" => Some(Self::SOA),
            "PTR" => Some(Self::PTR),
            "MX" => Some(Self::MX),
            "TXT" => Some(Self::TXT),
            "AAAA" => Some(Self::AAAA),
            "SRV" => Some(Self::SRV),
            "NAPTR" => Some(Self::NAPTR),
            "OPT" => Some(Self::OPT),
            "SSHFP" => Some(Self::SSHFP),
            "DNSKEY" => Some(Self::DNSKEY),
            "TLSA" => Some(Self::TLSA),
            "CAA" => Some(Self::CAA),
            _ => None,
        }
    }

    /// Accept a numeric type only when it names one of the known constants.
    pub fn from_number(num: u16) -> Option<Self> {
        match Self::from_u16(num) {
            Self::Unknown(_) => None,
            known => Some(known),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::NS => write!(f, "NS"),
            Self::CNAME => write!(f, "CNAME"),
            Self::SOA => write!(f, "SOA"),
            Self::PTR => write!(f, "PTR"),
            Self::MX => write!(f, "MX"),
            Self::TXT => write!(f, "TXT"),
            Self::AAAA => write!(f, "AAAA"),
            Self::SRV => write!(f, "SRV"),
            Self::NAPTR => write!(f, "NAPTR"),
            Self::OPT => write!(f, "OPT"),
            Self::SSHFP => write!(f, "SSHFP"),
            Self::DNSKEY => write!(f, "DNSKEY"),
            Self::TLSA => write!(f, "TLSA"),
            Self::CAA => write!(f, "CAA"),
            Self::Unknown(v) => write!(f, "TYPE{}", v),
        }
    }
}

/// DNS query/record class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QClass {
    IN,
    CH,
    HS,
    Unknown(u16),
}

impl QClass {
    pub fn from_u16(val: u16) -> Self {
        match val {
            1 => Self::IN,
            3 => Self::CH,
            4 => Self::HS,
            other => Self::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::IN => 1,
            Self::CH => 3,
            Self::HS => 4,
            Self::Unknown(v) => v,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IN" => Some(Self::IN),
            "CH" => Some(Self::CH),
            "HS" => Some(Self::HS),
            _ => None,
        }
    }
}

impl fmt::Display for QClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IN => write!(f, "IN"),
            Self::CH => write!(f, "CH"),
            Self::HS => write!(f, "HS"),
            Self::Unknown(v) => write!(f, "CLASS{}", v),
        }
    }
}

/// Decoded record data, one variant per handled type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(String),
    NS(String),
    PTR(String),
    MX {
        preference: u16,
        exchange: String,
    },
    /// Concatenated character-strings, kept byte-for-byte as received.
    TXT(Vec<u8>),
    SOA {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    /// Raw octets for types without a dedicated decoder.
    Raw(Vec<u8>),
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(ip) => write!(f, "{}", ip),
            Self::AAAA(ip) => {
                // Eight lowercase hex groups, no zero-run compression.
                let groups = ip.segments();
                write!(
                    f,
                    "{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}",
                    groups[0],
                    groups[1],
                    groups[2],
                    groups[3],
                    groups[4],
                    groups[5],
                    groups[6],
                    groups[7]
                )
            }
            Self::CNAME(name) | Self::NS(name) | Self::PTR(name) => write!(f, "{}", name),
            Self::MX {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            Self::TXT(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Self::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{} {} {} {} {} {} {}",
                mname, rname, serial, refresh, retry, expire, minimum
            ),
            Self::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            Self::Raw(bytes) => write!(f, "{}", hex::encode(bytes)),
        }
    }
}

/// A resource record from a response section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub name: String,
    pub rtype: RecordType,
    pub class: QClass,
    pub ttl: u32,
    pub data: RData,
}
