use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::{
    cache::{SharedAuthorityCache, SharedResourceCache},
    errors::RnsError,
    labelstring::LabelString,
    parser,
    root,
    structs::{Class, Message, RData, RRClass, RRType, Type, RR, MESSAGE_SIZE_LIMIT_TCP},
};

pub const DNS_PORT: u16 = 53;

type Result<T> = std::result::Result<T, RnsError>;

/// One query to one authoritative server. The seam exists so resolution
/// logic can be exercised against scripted servers in tests.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn query(&self, server: SocketAddr, qname: &LabelString, qtype: Type) -> Result<Message>;
}

/// Production upstream: IPv4 TCP to port 53, one ephemeral connection per
/// query, the whole attempt bounded by a timeout.
pub struct TcpUpstream {
    timeout: Duration,
}

impl TcpUpstream {
    pub fn new(timeout: Duration) -> Self {
        TcpUpstream { timeout }
    }
}

#[async_trait]
impl Upstream for TcpUpstream {
    async fn query(&self, server: SocketAddr, qname: &LabelString, qtype: Type) -> Result<Message> {
        match tokio::time::timeout(self.timeout, request_tcp(server, qname, qtype)).await {
            Ok(result) => result,
            Err(_) => Err(RnsError::Timeout),
        }
    }
}

fn addresses_from_records(records: &[RR]) -> Vec<SocketAddr> {
    records
        .iter()
        .filter_map(|record| record.rdata.as_ipv4())
        .map(|address| SocketAddr::from((address, DNS_PORT)))
        .collect()
}

async fn request_tcp(server: SocketAddr, qname: &LabelString, qtype: Type) -> Result<Message> {
    let request = Message::query(rand::random(), qname.clone(), qtype);
    let encoded = parser::encode(&request, MESSAGE_SIZE_LIMIT_TCP)?;

    let mut stream = TcpStream::connect(server).await?;
    stream.write_u16(encoded.len() as u16).await?;
    stream.write_all(&encoded).await?;

    let length = stream.read_u16().await?;
    let mut buffer = vec![0u8; usize::from(length)];
    stream.read_exact(&mut buffer).await?;

    let response = parser::decode(&buffer)?;
    if response.header.id != request.header.id {
        return Err(RnsError::IdMismatch);
    }

    Ok(response)
}

/// Iterative resolution for a single worker. The visited sets live here so
/// recursive invocations inherit them; `resolve` resets them per query.
pub struct WorkerResolver<U> {
    authority_cache: Arc<SharedAuthorityCache>,
    resource_cache: Arc<SharedResourceCache>,
    upstream: U,
    visited_cnames: HashSet<LabelString>,
    resolved_nameservers: HashSet<LabelString>,
}

impl<U: Upstream> WorkerResolver<U> {
    pub fn new(
        authority_cache: Arc<SharedAuthorityCache>,
        resource_cache: Arc<SharedResourceCache>,
        upstream: U,
    ) -> Self {
        WorkerResolver {
            authority_cache,
            resource_cache,
            upstream,
            visited_cnames: HashSet::new(),
            resolved_nameservers: HashSet::new(),
        }
    }

    pub async fn resolve(&mut self, qname: &LabelString, qtype: Type) -> Result<Vec<RR>> {
        self.visited_cnames.clear();
        self.resolved_nameservers.clear();
        self.resolve_recursive(qname.clone(), qtype).await
    }

    fn resolve_recursive(
        &mut self,
        qname: LabelString,
        qtype: Type,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RR>>> + Send + '_>> {
        Box::pin(async move {
            if let Some(records) = self.resource_cache.get(&qname, qtype).await {
                return Ok(records);
            }

            if qtype == Type::Type(RRType::A) {
                if let Some(address) = root::root_nameserver_ipv4(&qname) {
                    return Ok(vec![RR {
                        name: qname,
                        rtype: qtype,
                        class: Class::Class(RRClass::IN),
                        ttl: root::ROOT_HINT_TTL,
                        rdata: RData::A(address),
                    }]);
                }
            }

            // delegation search path, used as a stack: most specific first
            let mut nameservers = self.authority_cache.find_best(&qname).await;
            let mut answer = None;

            while let Some(nameserver) = nameservers.pop() {
                let addresses = self.nameserver_addresses(&nameserver).await;
                if addresses.is_empty() {
                    continue;
                }

                let response = match self.request_any(&addresses, &qname, qtype).await {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(%nameserver, error = %err, "no usable response from nameserver");
                        continue;
                    }
                };

                if !response.answer.is_empty() {
                    answer = Some(response.answer);
                    break;
                }

                if response.authority.is_empty() {
                    continue;
                }

                self.learn_delegation(&response, &mut nameservers).await;
            }

            let Some(mut answer) = answer else {
                return Err(RnsError::Resolution {
                    name: qname.to_string(),
                });
            };

            if qtype != Type::Type(RRType::CNAME) {
                let targets: Vec<LabelString> = answer
                    .iter()
                    .filter_map(|record| record.rdata.as_cname().cloned())
                    .collect();
                for target in targets {
                    if self.visited_cnames.insert(target.clone()) {
                        let records = self.resolve_recursive(target, qtype).await?;
                        answer.extend(records);
                    }
                }
            }

            self.resource_cache
                .put(qname, qtype, answer.clone())
                .await;

            Ok(answer)
        })
    }

    /// Candidate addresses for one nameserver name. Root names come from
    /// the built-in table and cached glue answers directly; only a
    /// glueless occurrence recurses, at most once per query, so glueless
    /// nameservers cannot loop while glued re-encounters keep resolving.
    async fn nameserver_addresses(&mut self, nameserver: &LabelString) -> Vec<SocketAddr> {
        if let Some(address) = root::root_nameserver_ipv4(nameserver) {
            return vec![SocketAddr::from((address, DNS_PORT))];
        }

        if let Some(records) = self
            .resource_cache
            .get(nameserver, Type::Type(RRType::A))
            .await
        {
            return addresses_from_records(&records);
        }

        if !self.resolved_nameservers.insert(nameserver.clone()) {
            return vec![];
        }

        match self
            .resolve_recursive(nameserver.clone(), Type::Type(RRType::A))
            .await
        {
            Ok(records) => addresses_from_records(&records),
            Err(err) => {
                debug!(%nameserver, error = %err, "failed to resolve nameserver address");
                vec![]
            }
        }
    }

    async fn request_any(
        &self,
        addresses: &[SocketAddr],
        qname: &LabelString,
        qtype: Type,
    ) -> Result<Message> {
        let mut last_error = RnsError::Resolution {
            name: qname.to_string(),
        };

        for address in addresses {
            debug!(%address, name = %qname, "sending upstream query");
            match self.upstream.query(*address, qname, qtype).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    debug!(%address, error = %err, "upstream query failed, trying next server");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }

    /// Write the NS records of the authority section to the authority
    /// cache, push their names onto the working stack and cache whatever
    /// glue the additional section shipped, grouped by owner and type.
    async fn learn_delegation(&mut self, response: &Message, nameservers: &mut Vec<LabelString>) {
        let mut zones: HashMap<LabelString, Vec<LabelString>> = HashMap::new();
        let mut min_ttl = u32::MAX;
        for record in &response.authority {
            if let Some(ns_name) = record.rdata.as_nameserver() {
                zones
                    .entry(record.name.clone())
                    .or_default()
                    .push(ns_name.clone());
                min_ttl = min_ttl.min(record.ttl);
            }
        }

        for (zone, zone_nameservers) in zones {
            for ns_name in &zone_nameservers {
                nameservers.push(ns_name.clone());
            }
            self.authority_cache
                .put(zone, zone_nameservers, min_ttl)
                .await;
        }

        let mut glue: HashMap<(LabelString, Type), Vec<RR>> = HashMap::new();
        for record in &response.additional {
            if matches!(
                record.rtype,
                Type::Type(RRType::A) | Type::Type(RRType::AAAA)
            ) {
                glue.entry((record.name.clone(), record.rtype))
                    .or_default()
                    .push(record.clone());
            }
        }
        for ((glue_name, glue_type), records) in glue {
            self.resource_cache.put(glue_name, glue_type, records).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::structs::Header;

    /// Scripted upstream keyed by (server address, name, type). Unknown
    /// queries time out, like an unreachable server.
    #[derive(Default)]
    pub(crate) struct MockUpstream {
        responses: HashMap<(IpAddr, String, Type), Message>,
    }

    impl MockUpstream {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn insert(
            &mut self,
            server: IpAddr,
            qname: &str,
            qtype: Type,
            message: Message,
        ) {
            self.responses.insert(
                (server, LabelString::from(qname).canonical(), qtype),
                message,
            );
        }

        pub(crate) fn insert_for_roots(&mut self, qname: &str, qtype: Type, message: Message) {
            for (_, address) in root::ROOT_NAMESERVERS_IPV4 {
                self.insert(IpAddr::V4(address), qname, qtype, message.clone());
            }
        }
    }

    #[async_trait]
    impl Upstream for MockUpstream {
        async fn query(
            &self,
            server: SocketAddr,
            qname: &LabelString,
            qtype: Type,
        ) -> Result<Message> {
            self.responses
                .get(&(server.ip(), qname.canonical(), qtype))
                .cloned()
                .ok_or(RnsError::Timeout)
        }
    }

    pub(crate) fn answer_message(records: Vec<RR>) -> Message {
        Message {
            header: Header {
                response: true,
                answer_count: records.len() as u16,
                ..Header::default()
            },
            question: vec![],
            answer: records,
            authority: vec![],
            additional: vec![],
        }
    }

    pub(crate) fn delegation_message(authority: Vec<RR>, additional: Vec<RR>) -> Message {
        Message {
            header: Header {
                response: true,
                authority_count: authority.len() as u16,
                additional_count: additional.len() as u16,
                ..Header::default()
            },
            question: vec![],
            answer: vec![],
            authority,
            additional,
        }
    }

    pub(crate) fn a_rr(name: &str, address: Ipv4Addr, ttl: u32) -> RR {
        RR {
            name: LabelString::from(name),
            rtype: Type::Type(RRType::A),
            class: Class::Class(RRClass::IN),
            ttl,
            rdata: RData::A(address),
        }
    }

    pub(crate) fn ns_rr(zone: &str, nameserver: &str, ttl: u32) -> RR {
        RR {
            name: LabelString::from(zone),
            rtype: Type::Type(RRType::NS),
            class: Class::Class(RRClass::IN),
            ttl,
            rdata: RData::NS(LabelString::from(nameserver)),
        }
    }

    pub(crate) fn cname_rr(name: &str, target: &str, ttl: u32) -> RR {
        RR {
            name: LabelString::from(name),
            rtype: Type::Type(RRType::CNAME),
            class: Class::Class(RRClass::IN),
            ttl,
            rdata: RData::CNAME(LabelString::from(target)),
        }
    }
}
