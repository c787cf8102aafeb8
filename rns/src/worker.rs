use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cache::{SharedAuthorityCache, SharedResourceCache},
    resolver::{Upstream, WorkerResolver},
    structs::{Class, Message, Opcode, RCODE, RRClass},
};

/// Routes a finished response back to the transport that accepted the
/// query: the UDP writer needs the peer address, a TCP writer does not.
pub enum Responder {
    Udp {
        sender: mpsc::Sender<(Message, SocketAddr)>,
        peer: SocketAddr,
    },
    Tcp {
        sender: mpsc::Sender<Message>,
    },
}

impl Responder {
    pub async fn respond(self, message: Message) {
        match self {
            Responder::Udp { sender, peer } => {
                let _ = sender.send((message, peer)).await;
            }
            Responder::Tcp { sender } => {
                let _ = sender.send(message).await;
            }
        }
    }
}

pub struct WorkerJob {
    pub message: Message,
    pub responder: Responder,
}

/// One worker: owns its resolver state and drains its inbox strictly
/// sequentially, so queries for the same shard serialize behind each
/// other and the second one hits the record cache.
pub struct Worker<U> {
    resolver: WorkerResolver<U>,
}

impl<U: Upstream> Worker<U> {
    pub fn new(
        authority_cache: Arc<SharedAuthorityCache>,
        resource_cache: Arc<SharedResourceCache>,
        upstream: U,
    ) -> Self {
        Worker {
            resolver: WorkerResolver::new(authority_cache, resource_cache, upstream),
        }
    }

    pub async fn run(mut self, mut jobs: mpsc::Receiver<WorkerJob>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                job = jobs.recv() => {
                    let Some(job) = job else { break };
                    let response = self.process(job.message).await;
                    job.responder.respond(response).await;
                }
            }
        }
    }

    pub async fn process(&mut self, message: Message) -> Message {
        debug!(id = message.header.id, "processing job");

        if message.header.response {
            warn!("received a query with the response flag set");
            return Message::error_response(&message, RCODE::FORMERR);
        }

        if message.header.opcode != Opcode::QUERY as u8 {
            warn!(
                opcode = message.header.opcode,
                "received a query with an unsupported opcode"
            );
            return Message::error_response(&message, RCODE::NOTIMP);
        }

        if message.header.question_count != 1 {
            warn!(
                questions = message.header.question_count,
                "received a query with an unexpected number of questions"
            );
            return Message::error_response(&message, RCODE::FORMERR);
        }

        if message.header.answer_count != 0
            || message.header.authority_count != 0
            || message.header.additional_count != 0
        {
            warn!("received a query carrying resource records");
            return Message::error_response(&message, RCODE::FORMERR);
        }

        let question = &message.question[0];
        if question.qclass != Class::Class(RRClass::IN) {
            warn!(
                class = u16::from(question.qclass),
                "received a query with an unsupported class"
            );
            return Message::error_response(&message, RCODE::NOTIMP);
        }

        match self.resolver.resolve(&question.qname, question.qtype).await {
            Ok(answers) => Message::response(&message, answers),
            Err(err) => {
                warn!(name = %question.qname, error = %err, "resolution failed");
                Message::error_response(&message, err.rcode())
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use std::net::Ipv4Addr;

    use super::*;
    use crate::labelstring::LabelString;
    use crate::resolver::testing::MockUpstream;
    use crate::structs::{Header, Question, RData, RRType, Type};

    fn make_worker() -> Worker<MockUpstream> {
        Worker::new(
            Arc::new(SharedAuthorityCache::new()),
            Arc::new(SharedResourceCache::new()),
            MockUpstream::new(),
        )
    }

    fn query_message(id: u16, qname: &str) -> Message {
        Message::query(id, LabelString::from(qname), Type::Type(RRType::A))
    }

    #[tokio::test]
    async fn test_rejects_response_flag() {
        let mut worker = make_worker();

        let mut message = query_message(7, "example.com");
        message.header.response = true;

        let response = worker.process(message).await;
        assert_eq!(response.header.id, 7);
        assert_eq!(response.get_rcode(), Ok(RCODE::FORMERR));
    }

    #[tokio::test]
    async fn test_rejects_status_opcode() {
        let mut worker = make_worker();

        let mut message = query_message(8, "example.com");
        message.header.opcode = Opcode::STATUS as u8;

        let response = worker.process(message).await;
        assert_eq!(response.header.id, 8);
        assert_eq!(response.get_rcode(), Ok(RCODE::NOTIMP));
        assert_eq!(response.header.answer_count, 0);
        assert_eq!(response.header.authority_count, 0);
        assert_eq!(response.header.additional_count, 0);
    }

    #[tokio::test]
    async fn test_rejects_multiple_questions() {
        let mut worker = make_worker();

        let mut message = query_message(9, "example.com");
        message.question.push(Question {
            qname: LabelString::from("other.com"),
            qtype: Type::Type(RRType::A),
            qclass: Class::Class(RRClass::IN),
        });
        message.header.question_count = 2;

        let response = worker.process(message).await;
        assert_eq!(response.header.id, 9);
        assert_eq!(response.get_rcode(), Ok(RCODE::FORMERR));
    }

    #[tokio::test]
    async fn test_rejects_queries_with_records() {
        let mut worker = make_worker();

        let mut message = query_message(10, "example.com");
        message.header.answer_count = 1;

        let response = worker.process(message).await;
        assert_eq!(response.get_rcode(), Ok(RCODE::FORMERR));
    }

    #[tokio::test]
    async fn test_rejects_non_in_class() {
        let mut worker = make_worker();

        let mut message = query_message(11, "example.com");
        message.question[0].qclass = Class::Other(3);

        let response = worker.process(message).await;
        assert_eq!(response.get_rcode(), Ok(RCODE::NOTIMP));
    }

    #[tokio::test]
    async fn test_resolution_failure_is_servfail() {
        let mut worker = make_worker();

        let response = worker.process(query_message(12, "unreachable.example")).await;
        assert_eq!(response.header.id, 12);
        assert_eq!(response.get_rcode(), Ok(RCODE::SERVFAIL));
    }

    #[tokio::test]
    async fn test_answers_root_hostname_query() {
        let mut worker = make_worker();

        let mut message = query_message(13, "a.root-servers.net");
        message.header.recursion_desired = true;

        let response = worker.process(message).await;
        assert_eq!(response.header.id, 13);
        assert!(response.header.response);
        assert!(response.header.recursion_available);
        assert!(response.header.recursion_desired);
        assert_eq!(response.get_rcode(), Ok(RCODE::NOERROR));
        assert_eq!(response.header.answer_count, 1);
        assert_eq!(
            response.answer[0].rdata,
            RData::A(Ipv4Addr::new(198, 41, 0, 4))
        );
        assert_eq!(
            response.question[0].qname,
            LabelString::from("a.root-servers.net")
        );
    }

    #[tokio::test]
    async fn test_run_drains_inbox() {
        let worker = make_worker();
        let cancel = CancellationToken::new();
        let (job_sender, job_receiver) = mpsc::channel(4);
        let (response_sender, mut response_receiver) = mpsc::channel(4);

        let handle = tokio::spawn(worker.run(job_receiver, cancel));

        job_sender
            .send(WorkerJob {
                message: query_message(21, "a.root-servers.net"),
                responder: Responder::Tcp {
                    sender: response_sender.clone(),
                },
            })
            .await
            .unwrap();

        let response = response_receiver.recv().await.unwrap();
        assert_eq!(response.header.id, 21);
        assert_eq!(response.get_rcode(), Ok(RCODE::NOERROR));

        // closing the inbox stops the worker after the current job
        drop(job_sender);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_question_message_gets_formerr() {
        let mut worker = make_worker();

        let message = Message {
            header: Header {
                id: 30,
                ..Header::default()
            },
            question: vec![],
            answer: vec![],
            authority: vec![],
            additional: vec![],
        };

        let response = worker.process(message).await;
        assert_eq!(response.header.id, 30);
        assert_eq!(response.get_rcode(), Ok(RCODE::FORMERR));
    }
}
