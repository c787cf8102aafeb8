use crate::{
    labelstring::LabelString,
    structs::{Class, Header, Message, Opcode, Question, RCODE, RR, RRClass, Type},
};

impl Message {
    /// A single-question query, as sent to upstream authoritative servers.
    pub fn query(id: u16, qname: LabelString, qtype: Type) -> Message {
        Message {
            header: Header {
                id,
                opcode: Opcode::QUERY as u8,
                question_count: 1,
                ..Header::default()
            },
            question: vec![Question {
                qname,
                qtype,
                qclass: Class::Class(RRClass::IN),
            }],
            answer: vec![],
            authority: vec![],
            additional: vec![],
        }
    }

    /// An error response carrying nothing but the echoed id and the rcode.
    pub fn error_for_id(id: u16, rcode: RCODE) -> Message {
        Message {
            header: Header {
                id,
                response: true,
                response_code: rcode as u8,
                ..Header::default()
            },
            question: vec![],
            answer: vec![],
            authority: vec![],
            additional: vec![],
        }
    }

    pub fn error_response(request: &Message, rcode: RCODE) -> Message {
        Message::error_for_id(request.header.id, rcode)
    }

    /// A successful response: id and RD echoed from the request, QR and RA
    /// set, the question echoed back, the resolved records attached.
    pub fn response(request: &Message, answers: Vec<RR>) -> Message {
        Message {
            header: Header {
                id: request.header.id,
                response: true,
                opcode: request.header.opcode,
                recursion_desired: request.header.recursion_desired,
                recursion_available: true,
                response_code: RCODE::NOERROR as u8,
                question_count: request.header.question_count,
                answer_count: answers.len() as u16,
                ..Header::default()
            },
            question: request.question.clone(),
            answer: answers,
            authority: vec![],
            additional: vec![],
        }
    }

    pub fn get_rcode(&self) -> Result<RCODE, u8> {
        RCODE::try_from(self.header.response_code)
    }
}
