//! PostgreSQL connection strings.
//!
//! Reads libpq URIs (`postgresql://user:pw@host:5432/db?sslmode=require`) and
//! keyword/value strings (`host=x dbname='my db'`), merges overrides and
//! renders keyword/value output the way psycopg's `make_conninfo` does.

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;

use crate::errors::{ConnectorError, Result};

pub const KEY_HOST: &str = "host";
pub const KEY_PORT: &str = "port";
pub const KEY_USER: &str = "user";
pub const KEY_PASSWORD: &str = "password";
pub const KEY_DBNAME: &str = "dbname";

const URI_PREFIXES: [&str; 2] = ["postgresql://", "postgres://"];

/// Connection keywords libpq accepts.
const LIBPQ_KEYWORDS: [&str; 42] = [
    "host",
    "hostaddr",
    "port",
    "dbname",
    "user",
    "password",
    "passfile",
    "require_auth",
    "channel_binding",
    "connect_timeout",
    "client_encoding",
    "options",
    "application_name",
    "fallback_application_name",
    "keepalives",
    "keepalives_idle",
    "keepalives_interval",
    "keepalives_count",
    "tcp_user_timeout",
    "replication",
    "gssencmode",
    "sslmode",
    "requiressl",
    "sslnegotiation",
    "sslcompression",
    "sslcert",
    "sslkey",
    "sslcertmode",
    "sslpassword",
    "sslrootcert",
    "sslcrl",
    "sslcrldir",
    "sslsni",
    "requirepeer",
    "ssl_min_protocol_version",
    "ssl_max_protocol_version",
    "krbsrvname",
    "gsslib",
    "gssdelegation",
    "service",
    "target_session_attrs",
    "load_balance_hosts",
];

fn is_libpq_keyword(key: &str) -> bool {
    LIBPQ_KEYWORDS.contains(&key)
}

/// Ordered keyword/value connection parameters.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnParams {
    entries: Vec<(String, String)>,
}

impl ConnParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(conninfo: &str) -> Result<Self> {
        let trimmed = conninfo.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        if let Some(rest) = URI_PREFIXES.iter().find_map(|p| strip_prefix_ignore_case(trimmed, p)) {
            return parse_uri(rest);
        }
        if let Some((scheme, _)) = trimmed.split_once("://") {
            if !scheme.contains(char::is_whitespace) && !scheme.contains('=') {
                return Err(ConnectorError::conninfo(format!("unsupported URI scheme '{}'", scheme)));
            }
        }
        parse_keyword_value(trimmed)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replace `key` in place, or append it.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Apply `overrides` on top of these parameters.
    pub fn merge(&mut self, overrides: &ConnParams) {
        for (key, value) in overrides.iter() {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keyword/value string including secrets.
    pub fn to_conninfo(&self) -> String {
        self.render(false)
    }

    fn render(&self, redact: bool) -> String {
        self.entries
            .iter()
            .map(|(key, value)| {
                if redact && key == KEY_PASSWORD {
                    format!("{}=********", key)
                } else {
                    format!("{}={}", key, escape_value(value))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for ConnParams {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConnParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = ConnParams::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

/// Redacts `password`.
impl fmt::Display for ConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

impl fmt::Debug for ConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnParams({})", self.render(true))
    }
}

/// Parse `base`, apply `overrides`, render keyword/value output.
pub fn make_conninfo(base: &str, overrides: &ConnParams) -> Result<String> {
    let mut params = ConnParams::parse(base)?;
    params.merge(overrides);
    Ok(params.to_conninfo())
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    value
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &value[prefix.len()..])
}

fn escape_value(value: &str) -> String {
    if value.is_empty() {
        return "''".to_owned();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    if escaped.contains(char::is_whitespace) {
        format!("'{}'", escaped)
    } else {
        escaped
    }
}

fn decode(component: &str, what: &str) -> Result<String> {
    let bytes = component.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let valid = bytes.get(i + 1..i + 3).is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(ConnectorError::conninfo(format!(
                    "invalid percent-encoded token in {}: '{}'",
                    what, component
                )));
            }
        }
    }
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| ConnectorError::conninfo(format!("{} is not valid UTF-8: {}", what, err)))
}

fn parse_uri(rest: &str) -> Result<ConnParams> {
    let mut params = ConnParams::new();

    let netloc_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (netloc, tail) = rest.split_at(netloc_end);

    let hostlist = match netloc.rsplit_once('@') {
        Some((userinfo, hostlist)) => {
            let (user, password) = match userinfo.split_once(':') {
                Some((user, password)) => (user, Some(password)),
                None => (userinfo, None),
            };
            if !user.is_empty() {
                params.set(KEY_USER, decode(user, "user name")?);
            }
            if let Some(password) = password {
                params.set(KEY_PASSWORD, decode(password, "password")?);
            }
            hostlist
        }
        None => netloc,
    };

    let mut hosts = Vec::new();
    let mut ports = Vec::new();
    for spec in hostlist.split(',') {
        let (host, port) = split_host_port(spec)?;
        hosts.push(decode(host, "host")?);
        ports.push(decode(port, "port")?);
    }
    if hosts.iter().any(|h| !h.is_empty()) {
        params.set(KEY_HOST, hosts.join(","));
    }
    if ports.iter().any(|p| !p.is_empty()) {
        params.set(KEY_PORT, ports.join(","));
    }

    let (path, query) = match tail.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (tail, None),
    };
    let dbname = path.strip_prefix('/').unwrap_or(path);
    if !dbname.is_empty() {
        params.set(KEY_DBNAME, decode(dbname, "database name")?);
    }

    for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            ConnectorError::conninfo(format!("missing key/value separator \"=\" in URI query parameter: \"{}\"", pair))
        })?;
        let key = decode(key, "query parameter")?;
        let value = decode(value, "query parameter")?;
        // libpq's JDBC compatibility alias
        if key == "ssl" && value == "true" {
            params.set("sslmode", "require");
        } else if is_libpq_keyword(&key) {
            params.set(key, value);
        } else {
            return Err(ConnectorError::conninfo(format!("invalid URI query parameter: \"{}\"", key)));
        }
    }

    Ok(params)
}

fn split_host_port(spec: &str) -> Result<(&str, &str)> {
    if let Some(bracketed) = spec.strip_prefix('[') {
        let (host, after) = bracketed.split_once(']').ok_or_else(|| {
            ConnectorError::conninfo(format!("unterminated IPv6 host address in \"{}\"", spec))
        })?;
        return match after {
            "" => Ok((host, "")),
            _ => after
                .strip_prefix(':')
                .map(|port| (host, port))
                .ok_or_else(|| ConnectorError::conninfo(format!("unexpected character after IPv6 host in \"{}\"", spec))),
        };
    }
    Ok(spec.split_once(':').unwrap_or((spec, "")))
}

fn parse_keyword_value(input: &str) -> Result<ConnParams> {
    let mut params = ConnParams::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if key.is_empty() {
            return Err(ConnectorError::conninfo("missing keyword before \"=\""));
        }
        if chars.next() != Some('=') {
            return Err(ConnectorError::conninfo(format!("missing \"=\" after \"{}\"", key)));
        }
        if !is_libpq_keyword(&key) {
            return Err(ConnectorError::conninfo(format!("invalid connection option \"{}\"", key)));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            loop {
                match chars.next() {
                    Some('\\') => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    Some('\'') => break,
                    Some(c) => value.push(c),
                    None => {
                        return Err(ConnectorError::conninfo(format!(
                            "unterminated quoted string for \"{}\"",
                            key
                        )))
                    }
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                } else {
                    value.push(c);
                }
            }
        }
        params.set(key, value);
    }

    Ok(params)
}
