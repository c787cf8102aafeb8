use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    cache::{SharedAuthorityCache, SharedResourceCache},
    config::Config,
    errors::RnsError,
    parser::{self, FromBytes},
    reader::Reader,
    resolver::TcpUpstream,
    structs::{Header, Message, RCODE, MESSAGE_SIZE_LIMIT_TCP, MESSAGE_SIZE_LIMIT_UDP},
    worker::{Responder, Worker, WorkerJob},
};

/// Recursive resolver server: transport listeners feeding a sharded pool
/// of workers over bounded channels.
pub struct Server {
    config: Config,
    cancel: CancellationToken,
}

/// Shards jobs over the worker inboxes by question name, so repeated
/// queries for one name serialize behind the same worker.
struct Dispatcher {
    workers: Vec<mpsc::Sender<WorkerJob>>,
}

impl Dispatcher {
    async fn submit(&self, job: WorkerJob) {
        let index = match job.message.question.first() {
            None => 0,
            Some(question) => {
                (fnv1a64(question.qname.canonical().as_bytes()) % self.workers.len() as u64)
                    as usize
            }
        };

        if self.workers[index].send(job).await.is_err() {
            warn!("worker inbox closed, dropping job");
        }
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Best-effort FORMERR for a message that would not decode: echo the id if
/// the header was readable, zero everything else.
fn formerr_response(bytes: &[u8]) -> Message {
    let header = Header::from_bytes(&mut Reader::new(bytes)).unwrap_or_default();
    Message::error_for_id(header.id, RCODE::FORMERR)
}

impl Server {
    pub fn new(config: Config) -> Self {
        Server {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Bind the listeners, spawn the workers and park until shutdown.
    /// Bind failures surface here so startup errors reach the caller.
    pub async fn run(&self) -> Result<(), RnsError> {
        if self.config.udp_addresses.is_empty() && self.config.tcp_addresses.is_empty() {
            warn!("no listen addresses configured");
        }

        let mut tcp_listeners = Vec::new();
        for address in &self.config.tcp_addresses {
            info!(%address, "starting tcp listener");
            tcp_listeners.push(TcpListener::bind(address.as_str()).await?);
        }

        let mut udp_sockets = Vec::new();
        for address in &self.config.udp_addresses {
            info!(%address, "starting udp listener");
            udp_sockets.push(UdpSocket::bind(address.as_str()).await?);
        }

        let workers = self.config.workers.max(1);
        debug!(workers, "spawning workers");
        let authority_cache = Arc::new(SharedAuthorityCache::new());
        let resource_cache = Arc::new(SharedResourceCache::new());
        let mut senders = Vec::with_capacity(workers);
        for _ in 0..workers {
            let (sender, receiver) = mpsc::channel(self.config.worker_queue_size);
            let worker = Worker::new(
                authority_cache.clone(),
                resource_cache.clone(),
                TcpUpstream::new(self.config.upstream_timeout),
            );
            tokio::spawn(worker.run(receiver, self.cancel.clone()));
            senders.push(sender);
        }
        let dispatcher = Arc::new(Dispatcher { workers: senders });

        for listener in tcp_listeners {
            tokio::spawn(tcp_accept_loop(
                listener,
                dispatcher.clone(),
                self.cancel.clone(),
            ));
        }
        for socket in udp_sockets {
            tokio::spawn(udp_listener_loop(
                socket,
                dispatcher.clone(),
                self.cancel.clone(),
            ));
        }

        self.cancel.cancelled().await;
        Ok(())
    }
}

async fn udp_listener_loop(
    socket: UdpSocket,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) {
    let socket = Arc::new(socket);
    let (sender, receiver) = mpsc::channel(64);
    tokio::spawn(udp_writer_loop(socket.clone(), receiver));

    let mut buffer = [0u8; MESSAGE_SIZE_LIMIT_UDP];
    loop {
        let (length, peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buffer) => match received {
                Ok(received) => received,
                Err(err) => {
                    warn!(error = %err, "failed to read udp message");
                    continue;
                }
            },
        };

        let message = match parser::decode(&buffer[..length]) {
            Ok(message) => message,
            Err(err) => {
                error!(error = %err, remote = %peer, "failed to decode udp message");
                let _ = sender.send((formerr_response(&buffer[..length]), peer)).await;
                continue;
            }
        };

        dispatcher
            .submit(WorkerJob {
                message,
                responder: Responder::Udp {
                    sender: sender.clone(),
                    peer,
                },
            })
            .await;
    }
}

async fn udp_writer_loop(
    socket: Arc<UdpSocket>,
    mut receiver: mpsc::Receiver<(Message, SocketAddr)>,
) {
    while let Some((message, peer)) = receiver.recv().await {
        let encoded = parser::encode_or_servfail(&message, MESSAGE_SIZE_LIMIT_UDP);
        if let Err(err) = socket.send_to(&encoded, peer).await {
            warn!(error = %err, remote = %peer, "failed to write udp response");
        }
    }
}

async fn tcp_accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "failed to accept tcp connection");
                    continue;
                }
            },
        };
        tokio::spawn(tcp_connection_loop(
            stream,
            peer,
            dispatcher.clone(),
            cancel.clone(),
        ));
    }
}

/// Per-connection reader: 2 octet big-endian length prefix, then exactly
/// that many bytes per message. Replies drain through a writer task so a
/// slow resolution never blocks the read side.
async fn tcp_connection_loop(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) {
    let (mut read_half, write_half) = stream.into_split();
    let (sender, receiver) = mpsc::channel(64);
    let writer = tokio::spawn(tcp_writer_loop(write_half, peer, receiver));

    loop {
        let length = tokio::select! {
            _ = cancel.cancelled() => break,
            length = read_half.read_u16() => match length {
                Ok(length) => length,
                Err(err) => {
                    if err.kind() != std::io::ErrorKind::UnexpectedEof {
                        error!(error = %err, remote = %peer, "failed to read message length from tcp connection");
                    }
                    break;
                }
            },
        };

        let mut buffer = vec![0u8; usize::from(length)];
        if let Err(err) = read_half.read_exact(&mut buffer).await {
            error!(error = %err, remote = %peer, "failed to read message from tcp connection");
            break;
        }

        let message = match parser::decode(&buffer) {
            Ok(message) => message,
            Err(err) => {
                error!(error = %err, remote = %peer, "failed to decode message from tcp connection");
                let _ = sender.send(formerr_response(&buffer)).await;
                continue;
            }
        };

        dispatcher
            .submit(WorkerJob {
                message,
                responder: Responder::Tcp {
                    sender: sender.clone(),
                },
            })
            .await;
    }

    // in-flight jobs keep their own sender clones; the writer exits once
    // the last one is gone
    drop(sender);
    let _ = writer.await;
}

async fn tcp_writer_loop(
    mut write_half: OwnedWriteHalf,
    peer: SocketAddr,
    mut receiver: mpsc::Receiver<Message>,
) {
    while let Some(message) = receiver.recv().await {
        let encoded = parser::encode_or_servfail(&message, MESSAGE_SIZE_LIMIT_TCP);
        let result = async {
            write_half.write_u16(encoded.len() as u16).await?;
            write_half.write_all(&encoded).await
        };
        if let Err(err) = result.await {
            error!(error = %err, remote = %peer, "failed to write to tcp connection");
            break;
        }
    }
}
