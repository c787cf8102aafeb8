use std::net::{Ipv4Addr, Ipv6Addr};

use int_enum::IntEnum;

use crate::labelstring::LabelString;

pub const MAX_LABEL_SIZE: usize = 63;
pub const MAX_NAME_SIZE: usize = 255;
pub const MAX_CHARACTER_STRING_SIZE: usize = 255;

pub const MESSAGE_SIZE_LIMIT_UDP: usize = 512;
pub const MESSAGE_SIZE_LIMIT_TCP: usize = 65535;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Type {
    Type(RRType),
    Other(u16),
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntEnum)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum RRType {
    A = 1,
    NS = 2,
    MD = 3,
    MF = 4,
    CNAME = 5,
    SOA = 6,
    MB = 7,
    MG = 8,
    MR = 9,
    NULL = 10,
    WKS = 11,
    PTR = 12,
    HINFO = 13,
    MINFO = 14,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    AXFR = 252,
    MAILB = 253,
    MAILA = 254,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Class {
    Class(RRClass),
    Other(u16),
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntEnum)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum RRClass {
    IN = 1,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
pub enum Opcode {
    QUERY = 0,
    IQUERY = 1,
    STATUS = 2,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
pub enum RCODE {
    NOERROR = 0,
    FORMERR = 1,
    SERVFAIL = 2,
    NXDOMAIN = 3,
    NOTIMP = 4,
    REFUSED = 5,
}

/// Decoded message header. The opcode and response code are kept as raw
/// integers so decoding stays total over arbitrary flag words; [`Opcode`]
/// and [`RCODE`] give names to the values the server works with.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Header {
    pub id: u16,
    pub response: bool,
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub response_code: u8,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Question {
    pub qname: LabelString,
    pub qtype: Type,
    pub qclass: Class,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct SoaData {
    pub mname: LabelString,
    pub rname: LabelString,
    pub serial: u32,
    pub refresh: i32,
    pub retry: i32,
    pub expire: i32,
    pub minimum: u32,
}

/// Typed resource record payload, discriminated by the record type on the
/// wire. Types the resolver does not know keep their raw rdata in `Other`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum RData {
    A(Ipv4Addr),
    NS(LabelString),
    MD(LabelString),
    MF(LabelString),
    CNAME(LabelString),
    SOA(SoaData),
    MB(LabelString),
    MG(LabelString),
    MR(LabelString),
    NULL(Vec<u8>),
    WKS {
        address: Ipv4Addr,
        protocol: u8,
        bitmap: Vec<u8>,
    },
    PTR(LabelString),
    HINFO {
        cpu: String,
        os: String,
    },
    MINFO {
        rmailbox: LabelString,
        emailbox: LabelString,
    },
    MX {
        preference: u16,
        exchange: LabelString,
    },
    TXT(Vec<String>),
    AAAA(Ipv6Addr),
    Other(Vec<u8>),
}

impl RData {
    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            RData::A(address) => Some(*address),
            _ => None,
        }
    }

    pub fn as_cname(&self) -> Option<&LabelString> {
        match self {
            RData::CNAME(target) => Some(target),
            _ => None,
        }
    }

    pub fn as_nameserver(&self) -> Option<&LabelString> {
        match self {
            RData::NS(nameserver) => Some(nameserver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct RR {
    pub name: LabelString,
    pub rtype: Type,
    pub class: Class,
    pub ttl: u32,
    pub rdata: RData,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Message {
    pub header: Header,
    pub question: Vec<Question>,
    pub answer: Vec<RR>,
    pub authority: Vec<RR>,
    pub additional: Vec<RR>,
}
