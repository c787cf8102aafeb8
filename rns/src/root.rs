use std::net::Ipv4Addr;

use crate::labelstring::LabelString;

/// The thirteen root letters and their IPv4 addresses. Immutable for the
/// lifetime of the process; every resolution starts here.
pub const ROOT_NAMESERVERS_IPV4: [(&str, Ipv4Addr); 13] = [
    ("a.root-servers.net", Ipv4Addr::new(198, 41, 0, 4)),
    ("b.root-servers.net", Ipv4Addr::new(170, 247, 170, 2)),
    ("c.root-servers.net", Ipv4Addr::new(192, 33, 4, 12)),
    ("d.root-servers.net", Ipv4Addr::new(199, 7, 91, 13)),
    ("e.root-servers.net", Ipv4Addr::new(192, 203, 230, 10)),
    ("f.root-servers.net", Ipv4Addr::new(192, 5, 5, 241)),
    ("g.root-servers.net", Ipv4Addr::new(192, 112, 36, 4)),
    ("h.root-servers.net", Ipv4Addr::new(198, 97, 190, 53)),
    ("i.root-servers.net", Ipv4Addr::new(192, 36, 148, 17)),
    ("j.root-servers.net", Ipv4Addr::new(192, 58, 128, 30)),
    ("k.root-servers.net", Ipv4Addr::new(193, 0, 14, 129)),
    ("l.root-servers.net", Ipv4Addr::new(199, 7, 83, 42)),
    ("m.root-servers.net", Ipv4Addr::new(202, 12, 27, 33)),
];

/// TTL for answers synthesized from the built-in table, matching the root
/// hints file.
pub const ROOT_HINT_TTL: u32 = 3_600_000;

pub fn root_nameserver_names() -> Vec<LabelString> {
    ROOT_NAMESERVERS_IPV4
        .iter()
        .map(|(name, _)| LabelString::from(name))
        .collect()
}

pub fn root_nameserver_ipv4(name: &LabelString) -> Option<Ipv4Addr> {
    let dotted = name.to_string();
    ROOT_NAMESERVERS_IPV4
        .iter()
        .find(|(root_name, _)| dotted.eq_ignore_ascii_case(root_name))
        .map(|(_, address)| *address)
}
