#![cfg(any(test, feature = "test-utils"))]

use crate::labelstring::LabelString;
use crate::structs::*;

pub fn get_rr(name: Option<LabelString>) -> RR {
    RR {
        name: name.unwrap_or(LabelString::from("example.org")),
        rtype: Type::Type(RRType::A),
        class: Class::Class(RRClass::IN),
        ttl: 10,
        rdata: RData::A(std::net::Ipv4Addr::new(1, 2, 3, 4)),
    }
}

pub fn get_message(name: Option<LabelString>) -> Message {
    Message {
        header: Header {
            id: 1,
            opcode: Opcode::QUERY as u8,
            recursion_desired: true,
            question_count: 1,
            answer_count: 1,
            authority_count: 1,
            additional_count: 1,
            ..Header::default()
        },
        question: vec![Question {
            qname: name.clone().unwrap_or(LabelString::from("example.org")),
            qtype: Type::Type(RRType::A),
            qclass: Class::Class(RRClass::IN),
        }],
        answer: vec![get_rr(name.clone())],
        authority: vec![get_rr(name.clone())],
        additional: vec![get_rr(name)],
    }
}
