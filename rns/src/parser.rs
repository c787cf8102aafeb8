use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::warn;

use crate::{
    errors::RnsError,
    labelstring::LabelString,
    reader::Reader,
    structs::{
        Class, Header, Message, Question, RData, RRClass, RRType, SoaData, Type, RR,
        MAX_CHARACTER_STRING_SIZE, MAX_LABEL_SIZE, MAX_NAME_SIZE,
    },
    writer::Writer,
};

type Result<T> = std::result::Result<T, RnsError>;

const POINTER_MASK: u8 = 0b1100_0000;

impl From<Type> for u16 {
    fn from(value: Type) -> Self {
        match value {
            Type::Type(t) => t as u16,
            Type::Other(x) => x,
        }
    }
}

impl From<u16> for Type {
    fn from(value: u16) -> Self {
        match RRType::try_from(value) {
            Ok(rrtype) => Type::Type(rrtype),
            Err(x) => Type::Other(x),
        }
    }
}

impl From<Class> for u16 {
    fn from(value: Class) -> Self {
        match value {
            Class::Class(c) => c as u16,
            Class::Other(x) => x,
        }
    }
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        match RRClass::try_from(value) {
            Ok(rrclass) => Class::Class(rrclass),
            Err(x) => Class::Other(x),
        }
    }
}

pub trait FromBytes {
    fn from_bytes(reader: &mut Reader) -> Result<Self>
    where
        Self: Sized;
}

pub trait ToBytes {
    fn to_bytes(&self, writer: &mut Writer) -> Result<()>;
}

fn flag_bit(value: bool, bit: u16) -> u16 {
    if value {
        1 << bit
    } else {
        0
    }
}

impl FromBytes for Header {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let id = reader.read_u16()?;
        let flags = reader.read_u16()?;

        // |QR| Opcode |AA|TC|RD|RA| Z | RCODE | ; the Z bits are ignored
        Ok(Header {
            id,
            response: flags & (1 << 15) > 0,
            opcode: ((flags >> 11) & 0b1111) as u8,
            authoritative: flags & (1 << 10) > 0,
            truncated: flags & (1 << 9) > 0,
            recursion_desired: flags & (1 << 8) > 0,
            recursion_available: flags & (1 << 7) > 0,
            response_code: (flags & 0b1111) as u8,
            question_count: reader.read_u16()?,
            answer_count: reader.read_u16()?,
            authority_count: reader.read_u16()?,
            additional_count: reader.read_u16()?,
        })
    }
}

impl ToBytes for Header {
    fn to_bytes(&self, writer: &mut Writer) -> Result<()> {
        writer.write_u16(self.id);

        let mut flags = 0u16;
        flags |= flag_bit(self.response, 15);
        flags |= (u16::from(self.opcode) & 0b1111) << 11;
        flags |= flag_bit(self.authoritative, 10);
        flags |= flag_bit(self.truncated, 9);
        flags |= flag_bit(self.recursion_desired, 8);
        flags |= flag_bit(self.recursion_available, 7);
        flags |= u16::from(self.response_code) & 0b1111;
        writer.write_u16(flags);

        writer.write_u16(self.question_count);
        writer.write_u16(self.answer_count);
        writer.write_u16(self.authority_count);
        writer.write_u16(self.additional_count);

        Ok(())
    }
}

impl FromBytes for LabelString {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let mut labels = Vec::new();
        let mut offset = reader.position();
        let mut end_offset = None;
        let mut jumps = 0;
        let max_jumps = reader.len() / 2;
        // terminating zero octet counts against the 255 byte bound
        let mut wire_len = 1usize;

        loop {
            let code = reader.byte_at(offset)?;

            if code & POINTER_MASK == POINTER_MASK {
                jumps += 1;
                if jumps > max_jumps {
                    return Err(RnsError::PointerLoop);
                }
                let rhs = reader.byte_at(offset + 1)?;
                // the outer cursor resumes right after the first pointer
                if end_offset.is_none() {
                    end_offset = Some(offset + 2);
                }
                offset = usize::from(code & !POINTER_MASK) << 8 | usize::from(rhs);
            } else if code == 0 {
                reader.set_position(end_offset.unwrap_or(offset + 1));
                break;
            } else {
                if usize::from(code) > MAX_LABEL_SIZE {
                    return Err(RnsError::LabelTooLarge {
                        length: code.into(),
                    });
                }
                wire_len += 1 + usize::from(code);
                if wire_len > MAX_NAME_SIZE {
                    return Err(RnsError::NameTooLarge { length: wire_len });
                }
                let bytes = reader.slice_at(offset + 1, code.into())?;
                let label =
                    String::from_utf8(bytes.to_vec()).map_err(|e| RnsError::InvalidLabel {
                        message: e.to_string(),
                    })?;
                labels.push(label);
                offset += 1 + usize::from(code);
            }
        }

        Ok(labels.into())
    }
}

impl ToBytes for LabelString {
    fn to_bytes(&self, writer: &mut Writer) -> Result<()> {
        let wire_len = self.wire_len();
        if wire_len > MAX_NAME_SIZE {
            return Err(RnsError::NameTooLarge { length: wire_len });
        }

        for label in self.as_slice() {
            if label.len() > MAX_LABEL_SIZE {
                return Err(RnsError::LabelTooLarge {
                    length: label.len(),
                });
            }
            writer.write_u8(label.len() as u8);
            writer.write(label.as_bytes());
        }
        writer.write_u8(0);

        Ok(())
    }
}

fn read_character_string(reader: &mut Reader, end: usize, rrtype: &'static str) -> Result<String> {
    let length = usize::from(reader.read_u8()?);
    if reader.position() + length > end {
        return Err(RnsError::InvalidRRData {
            rrtype,
            message: String::from("character string runs past the record data"),
        });
    }
    let bytes = reader.read(length)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| RnsError::InvalidRRData {
        rrtype,
        message: e.to_string(),
    })
}

fn write_character_string(writer: &mut Writer, value: &str) -> Result<()> {
    if value.len() > MAX_CHARACTER_STRING_SIZE {
        return Err(RnsError::CharacterStringTooLarge {
            length: value.len(),
        });
    }
    writer.write_u8(value.len() as u8);
    writer.write(value.as_bytes());
    Ok(())
}

fn read_ipv4(reader: &mut Reader) -> Result<Ipv4Addr> {
    let bytes = reader.read(4)?;
    Ok(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
}

fn read_rdata_name(reader: &mut Reader, end: usize, rrtype: &'static str) -> Result<LabelString> {
    let name = LabelString::from_bytes(reader)?;
    if reader.position() > end {
        return Err(RnsError::InvalidRRData {
            rrtype,
            message: String::from("name runs past the record data"),
        });
    }
    Ok(name)
}

impl FromBytes for Question {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let qname = LabelString::from_bytes(reader)?;
        let qtype = Type::from(reader.read_u16()?);
        let qclass = Class::from(reader.read_u16()?);

        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }
}

impl ToBytes for Question {
    fn to_bytes(&self, writer: &mut Writer) -> Result<()> {
        self.qname.to_bytes(writer)?;
        writer.write_u16(self.qtype.into());
        writer.write_u16(self.qclass.into());
        Ok(())
    }
}

impl RData {
    fn from_bytes(reader: &mut Reader, rtype: Type, rdlength: usize) -> Result<Self> {
        let end = reader.position() + rdlength;

        let rrtype = match rtype {
            Type::Type(rrtype) => rrtype,
            Type::Other(0) => return Err(RnsError::InvalidRRType { value: 0 }),
            Type::Other(_) => return Ok(RData::Other(reader.read(rdlength)?.to_vec())),
        };

        match rrtype {
            RRType::A => {
                if rdlength != 4 {
                    return Err(RnsError::InvalidRRData {
                        rrtype: "A",
                        message: format!("expected 4 data bytes, got {}", rdlength),
                    });
                }
                Ok(RData::A(read_ipv4(reader)?))
            }
            RRType::NS => Ok(RData::NS(read_rdata_name(reader, end, "NS")?)),
            RRType::MD => Ok(RData::MD(read_rdata_name(reader, end, "MD")?)),
            RRType::MF => Ok(RData::MF(read_rdata_name(reader, end, "MF")?)),
            RRType::CNAME => Ok(RData::CNAME(read_rdata_name(reader, end, "CNAME")?)),
            RRType::SOA => {
                let rdata = RData::SOA(SoaData {
                    mname: read_rdata_name(reader, end, "SOA")?,
                    rname: read_rdata_name(reader, end, "SOA")?,
                    serial: reader.read_u32()?,
                    refresh: reader.read_i32()?,
                    retry: reader.read_i32()?,
                    expire: reader.read_i32()?,
                    minimum: reader.read_u32()?,
                });
                if reader.position() > end {
                    return Err(RnsError::InvalidRRData {
                        rrtype: "SOA",
                        message: String::from("fields run past the record data"),
                    });
                }
                Ok(rdata)
            }
            RRType::MB => Ok(RData::MB(read_rdata_name(reader, end, "MB")?)),
            RRType::MG => Ok(RData::MG(read_rdata_name(reader, end, "MG")?)),
            RRType::MR => Ok(RData::MR(read_rdata_name(reader, end, "MR")?)),
            RRType::NULL => Ok(RData::NULL(reader.read(rdlength)?.to_vec())),
            RRType::WKS => {
                if rdlength < 5 {
                    return Err(RnsError::InvalidRRData {
                        rrtype: "WKS",
                        message: format!("expected at least 5 data bytes, got {}", rdlength),
                    });
                }
                Ok(RData::WKS {
                    address: read_ipv4(reader)?,
                    protocol: reader.read_u8()?,
                    bitmap: reader.read(rdlength - 5)?.to_vec(),
                })
            }
            RRType::PTR => Ok(RData::PTR(read_rdata_name(reader, end, "PTR")?)),
            RRType::HINFO => Ok(RData::HINFO {
                cpu: read_character_string(reader, end, "HINFO")?,
                os: read_character_string(reader, end, "HINFO")?,
            }),
            RRType::MINFO => Ok(RData::MINFO {
                rmailbox: read_rdata_name(reader, end, "MINFO")?,
                emailbox: read_rdata_name(reader, end, "MINFO")?,
            }),
            RRType::MX => Ok(RData::MX {
                preference: reader.read_u16()?,
                exchange: read_rdata_name(reader, end, "MX")?,
            }),
            RRType::TXT => {
                let mut strings = Vec::new();
                while reader.position() < end {
                    strings.push(read_character_string(reader, end, "TXT")?);
                }
                if strings.is_empty() {
                    return Err(RnsError::InvalidRRData {
                        rrtype: "TXT",
                        message: String::from("expected at least one character string"),
                    });
                }
                Ok(RData::TXT(strings))
            }
            RRType::AAAA => {
                if rdlength != 16 {
                    return Err(RnsError::InvalidRRData {
                        rrtype: "AAAA",
                        message: format!("expected 16 data bytes, got {}", rdlength),
                    });
                }
                let bytes = reader.read(16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                Ok(RData::AAAA(Ipv6Addr::from(octets)))
            }
            RRType::AXFR | RRType::MAILB | RRType::MAILA => Err(RnsError::NotImplemented {
                object: format!("{:?} record decoding", rrtype),
            }),
        }
    }
}

impl ToBytes for RData {
    fn to_bytes(&self, writer: &mut Writer) -> Result<()> {
        match self {
            RData::A(address) => writer.write(&address.octets()),
            RData::NS(name)
            | RData::MD(name)
            | RData::MF(name)
            | RData::CNAME(name)
            | RData::MB(name)
            | RData::MG(name)
            | RData::MR(name)
            | RData::PTR(name) => name.to_bytes(writer)?,
            RData::SOA(soa) => {
                soa.mname.to_bytes(writer)?;
                soa.rname.to_bytes(writer)?;
                writer.write_u32(soa.serial);
                writer.write_i32(soa.refresh);
                writer.write_i32(soa.retry);
                writer.write_i32(soa.expire);
                writer.write_u32(soa.minimum);
            }
            RData::NULL(data) | RData::Other(data) => writer.write(data),
            RData::WKS {
                address,
                protocol,
                bitmap,
            } => {
                writer.write(&address.octets());
                writer.write_u8(*protocol);
                writer.write(bitmap);
            }
            RData::HINFO { cpu, os } => {
                write_character_string(writer, cpu)?;
                write_character_string(writer, os)?;
            }
            RData::MINFO { rmailbox, emailbox } => {
                rmailbox.to_bytes(writer)?;
                emailbox.to_bytes(writer)?;
            }
            RData::MX {
                preference,
                exchange,
            } => {
                writer.write_u16(*preference);
                exchange.to_bytes(writer)?;
            }
            RData::TXT(strings) => {
                for string in strings {
                    write_character_string(writer, string)?;
                }
            }
            RData::AAAA(address) => writer.write(&address.octets()),
        }

        Ok(())
    }
}

impl FromBytes for RR {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let name = LabelString::from_bytes(reader)?;
        let rtype = Type::from(reader.read_u16()?);
        let class = Class::from(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let rdlength = usize::from(reader.read_u16()?);
        if reader.unread_bytes() < rdlength {
            return Err(RnsError::InsufficientData);
        }

        let rdata_start = reader.position();
        let rdata = RData::from_bytes(reader, rtype, rdlength)?;
        // always consume exactly rdlength, whatever the variant parser did
        reader.set_position(rdata_start + rdlength);

        Ok(RR {
            name,
            rtype,
            class,
            ttl,
            rdata,
        })
    }
}

impl ToBytes for RR {
    fn to_bytes(&self, writer: &mut Writer) -> Result<()> {
        self.name.to_bytes(writer)?;
        writer.write_u16(self.rtype.into());
        writer.write_u16(self.class.into());
        writer.write_u32(self.ttl);

        // reserve the length field, write the payload, backpatch
        let length_position = writer.position();
        writer.write_u16(0);
        self.rdata.to_bytes(writer)?;
        let end_position = writer.position();

        let rdlength = end_position - length_position - 2;
        if rdlength > 0xFFFF {
            return Err(RnsError::RDataTooLarge { length: rdlength });
        }
        writer.set_position(length_position);
        writer.write_u16(rdlength as u16);
        writer.set_position(end_position);

        Ok(())
    }
}

impl FromBytes for Message {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let header = Header::from_bytes(reader)?;

        let mut question = Vec::with_capacity(header.question_count.into());
        for _ in 0..header.question_count {
            question.push(Question::from_bytes(reader)?);
        }

        let mut answer = Vec::with_capacity(header.answer_count.into());
        for _ in 0..header.answer_count {
            answer.push(RR::from_bytes(reader)?);
        }

        let mut authority = Vec::with_capacity(header.authority_count.into());
        for _ in 0..header.authority_count {
            authority.push(RR::from_bytes(reader)?);
        }

        let mut additional = Vec::with_capacity(header.additional_count.into());
        for _ in 0..header.additional_count {
            additional.push(RR::from_bytes(reader)?);
        }

        Ok(Message {
            header,
            question,
            answer,
            authority,
            additional,
        })
    }
}

impl ToBytes for Message {
    fn to_bytes(&self, writer: &mut Writer) -> Result<()> {
        self.header.to_bytes(writer)?;

        for question in &self.question {
            question.to_bytes(writer)?;
        }
        for answer in &self.answer {
            answer.to_bytes(writer)?;
        }
        for authority in &self.authority {
            authority.to_bytes(writer)?;
        }
        for additional in &self.additional {
            additional.to_bytes(writer)?;
        }

        Ok(())
    }
}

pub fn decode(bytes: &[u8]) -> Result<Message> {
    let mut reader = Reader::new(bytes);
    Message::from_bytes(&mut reader)
}

/// Encode a message into at most `limit` bytes. When the message does not
/// fit, the returned prefix carries the TC bit in its header.
pub fn encode(message: &Message, limit: usize) -> Result<Vec<u8>> {
    let mut writer = Writer::new(limit);
    message.to_bytes(&mut writer)?;

    if writer.truncated() {
        let end = writer.position();
        let mut header = message.header.clone();
        header.truncated = true;
        writer.set_position(0);
        header.to_bytes(&mut writer)?;
        writer.set_position(end);
    }

    Ok(writer.into_bytes())
}

/// Encode a response, falling back to a SERVFAIL carrying the original id
/// when the message itself cannot be encoded.
pub fn encode_or_servfail(message: &Message, limit: usize) -> Vec<u8> {
    match encode(message, limit) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to encode response");
            let fallback = Message::error_for_id(message.header.id, crate::structs::RCODE::SERVFAIL);
            encode(&fallback, limit).unwrap_or_default()
        }
    }
}
