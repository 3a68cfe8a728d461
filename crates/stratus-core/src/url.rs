//! URL parsing and composition
//!
//! [`Url`] keeps the components it was built from instead of normalizing
//! them, so a parsed URL prints back the way it came in. Query parameters
//! keep their insertion order and support PHP-style array keys
//! (`key[]=a&key[]=b`), which several cloud APIs still expect.

use crate::{Error, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Value of a single query key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// `key=value`
    Single(String),
    /// `key[]=v1&key[]=v2`
    Multi(Vec<String>),
}

impl QueryValue {
    /// The scalar value, if this is not an array
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(_) => None,
        }
    }

    /// All values in order
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// Insertion-ordered query parameters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    entries: Vec<(String, QueryValue)>,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (without the leading `?`)
    pub fn parse(input: &str) -> Result<Self> {
        let mut query = Self::new();
        let input = input.strip_prefix('?').unwrap_or(input);

        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(raw_key)?;
            let value = decode_component(raw_value)?;

            if let Some(key) = key.strip_suffix("[]") {
                if key.is_empty() {
                    return Err(Error::InvalidArgument(format!("empty query key in '{pair}'")));
                }
                query.push_multi(key, value);
            } else if key.is_empty() {
                return Err(Error::InvalidArgument(format!("empty query key in '{pair}'")));
            } else if query.contains_key(&key) {
                query.push_multi(&key, value);
            } else {
                query.entries.push((key, QueryValue::Single(value)));
            }
        }

        Ok(query)
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a key, replacing any previous value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove a key
    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys and values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn push_multi(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => match existing {
                QueryValue::Multi(values) => values.push(value),
                QueryValue::Single(first) => {
                    let first = std::mem::take(first);
                    *existing = QueryValue::Multi(vec![first, value]);
                }
            },
            None => self
                .entries
                .push((key.to_string(), QueryValue::Multi(vec![value]))),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.insert(key, value);
        }
        query
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.entries {
            let key = urlencoding::encode(key);
            match value {
                QueryValue::Single(v) => {
                    if !first {
                        f.write_str("&")?;
                    }
                    write!(f, "{}={}", key, urlencoding::encode(v))?;
                    first = false;
                }
                QueryValue::Multi(values) => {
                    for v in values {
                        if !first {
                            f.write_str("&")?;
                        }
                        write!(f, "{}[]={}", key, urlencoding::encode(v))?;
                        first = false;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct QueryVisitor;

        impl<'de> Visitor<'de> for QueryVisitor {
            type Value = Query;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a query string or a map of query parameters")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Query, E> {
                Query::parse(value).map_err(E::custom)
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Query, A::Error> {
                let mut query = Query::new();
                while let Some((key, value)) = access.next_entry::<String, QueryValue>()? {
                    query.insert(key, value);
                }
                Ok(query)
            }
        }

        deserializer.deserialize_any(QueryVisitor)
    }
}

/// Structured description of a URL
///
/// `scheme`, `host` and `path` are required when converting into a [`Url`];
/// `path` may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlParts {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub path: Option<String>,
    pub query: Query,
    pub fragment: Option<String>,
}

/// A URL that can be built up incrementally
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Url {
    scheme: Option<String>,
    user: Option<String>,
    password: Option<String>,
    host: String,
    port: Option<u16>,
    segments: Vec<String>,
    query: Query,
    fragment: Option<String>,
}

impl Url {
    /// Parse a URL string
    ///
    /// Scheme-relative input (`//host/path`) is accepted; input without a
    /// host is not.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidArgument("empty URL".to_string()));
        }

        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (input, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Query::parse(query)?),
            None => (rest, Query::new()),
        };

        let (scheme, rest) = if let Some(rest) = rest.strip_prefix("//") {
            (None, rest)
        } else if let Some((scheme, rest)) = rest.split_once("://") {
            validate_scheme(scheme)?;
            (Some(scheme.to_string()), rest)
        } else {
            return Err(Error::InvalidArgument(format!("URL has no host: '{input}'")));
        };

        let (authority, path) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };

        let (user, password, host_port) = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => match userinfo.split_once(':') {
                Some((user, password)) => (
                    Some(user.to_string()),
                    Some(password.to_string()),
                    host_port,
                ),
                None => (Some(userinfo.to_string()), None, host_port),
            },
            None => (None, None, authority),
        };

        let (host, port) = split_host_port(host_port)?;
        if host.is_empty() {
            return Err(Error::InvalidArgument(format!("URL has no host: '{input}'")));
        }

        Ok(Self {
            scheme,
            user,
            password,
            host: host.to_string(),
            port,
            segments: split_path(path),
            query,
            fragment,
        })
    }

    /// Scheme, if the URL is not scheme-relative
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Host name or bracketed IPv6 literal
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// User name from the authority
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Password from the authority
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Path, including its leading `/` when non-empty
    pub fn path(&self) -> String {
        if self.segments.is_empty() {
            return String::new();
        }
        format!("/{}", self.segments.join("/"))
    }

    /// Path segments in order
    pub fn path_segments(&self) -> &[String] {
        &self.segments
    }

    /// Query parameters
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Fragment without the leading `#`
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Replace the query entirely
    pub fn set_query(&mut self, query: Query) {
        self.query = query;
    }

    /// Replace the query with a parsed query string
    pub fn set_query_str(&mut self, query: &str) -> Result<()> {
        self.query = Query::parse(query)?;
        Ok(())
    }

    /// Replace the query from a JSON string or object
    pub fn set_query_value(&mut self, query: &serde_json::Value) -> Result<()> {
        self.query = match query {
            serde_json::Value::String(s) => Query::parse(s)?,
            serde_json::Value::Object(_) => serde_json::from_value(query.clone())
                .map_err(|e| Error::InvalidArgument(format!("invalid query map: {e}")))?,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "query must be a string or a map, got {other}"
                )))
            }
        };
        Ok(())
    }

    /// Merge parameters into the query; existing keys are overwritten
    pub fn add_query<K, V>(&mut self, params: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<QueryValue>,
    {
        for (key, value) in params {
            self.query.insert(key, value);
        }
    }

    /// Append a path segment, inserting the `/` separator
    ///
    /// Leading and trailing slashes are dropped and inner ones split the
    /// input into several segments. Anything else is taken as-is except `?`
    /// and `#`, which are escaped so they stay in the path.
    pub fn add_path(&mut self, segment: &str) {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            return;
        }
        if self.segments.last().is_some_and(String::is_empty) {
            self.segments.pop();
        }
        self.segments.extend(
            segment
                .split('/')
                .map(|s| s.replace('?', "%3F").replace('#', "%23")),
        );
    }

    /// Append exactly one already-encoded path segment
    ///
    /// Nothing is trimmed, so an empty segment yields a doubled or trailing
    /// `/`. Fails on `/`, `?`, `#` or whitespace.
    pub fn push_segment(&mut self, segment: &str) -> Result<()> {
        reject_reserved("path segment", segment, &['/', '?', '#'])?;
        self.segments.push(segment.to_string());
        Ok(())
    }

    /// Copy of this URL with a path segment appended
    pub fn join_path(&self, segment: &str) -> Self {
        let mut url = self.clone();
        url.add_path(segment);
        url
    }

    /// Copy of this URL with `user:password@` removed, for messages and logs
    pub fn without_credentials(&self) -> Self {
        Self {
            user: None,
            password: None,
            ..self.clone()
        }
    }

    /// Structured description of this URL
    pub fn to_parts(&self) -> UrlParts {
        UrlParts {
            scheme: self.scheme.clone(),
            host: Some(self.host.clone()),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            path: Some(self.path()),
            query: self.query.clone(),
            fragment: self.fragment.clone(),
        }
    }
}

impl TryFrom<UrlParts> for Url {
    type Error = Error;

    fn try_from(parts: UrlParts) -> Result<Self> {
        let scheme = parts
            .scheme
            .ok_or_else(|| Error::InvalidArgument("URL parts missing 'scheme'".to_string()))?;
        validate_scheme(&scheme)?;
        let host = parts
            .host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidArgument("URL parts missing 'host'".to_string()))?;
        let path = parts
            .path
            .ok_or_else(|| Error::InvalidArgument("URL parts missing 'path'".to_string()))?;

        // Parts are taken in encoded form; reserved characters would change
        // the meaning of the printed URL
        if let Some(user) = &parts.user {
            reject_reserved("user", user, &[':', '@', '/', '?', '#'])?;
        }
        match (&parts.user, &parts.password) {
            (None, Some(_)) => {
                return Err(Error::InvalidArgument(
                    "URL parts have a password but no user".to_string(),
                ))
            }
            (_, Some(password)) => reject_reserved("password", password, &['@', '/', '?', '#'])?,
            _ => {}
        }
        reject_reserved("host", &host, &['@', '/', '?', '#'])?;
        let bracketed = host.starts_with('[') && host.ends_with(']');
        if !bracketed && host.contains([':', '[', ']']) {
            return Err(Error::InvalidArgument(format!(
                "URL host '{host}' must be a name or a bracketed IPv6 literal"
            )));
        }
        reject_reserved("path", &path, &['?', '#'])?;
        if let Some(fragment) = &parts.fragment {
            reject_reserved("fragment", fragment, &[])?;
        }

        let segments = if path.is_empty() || path.starts_with('/') {
            split_path(&path)
        } else {
            split_path(&format!("/{path}"))
        };

        Ok(Self {
            scheme: Some(scheme),
            user: parts.user,
            password: parts.password,
            host,
            port: parts.port,
            segments,
            query: parts.query,
            fragment: parts.fragment,
        })
    }
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }
        f.write_str("//")?;
        if let Some(user) = &self.user {
            f.write_str(user)?;
            if let Some(password) = &self.password {
                write!(f, ":{password}")?;
            }
            f.write_str("@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path())?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl Serialize for Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Parts(UrlParts),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Url::parse(&text).map_err(de::Error::custom),
            Repr::Parts(parts) => Url::try_from(parts).map_err(de::Error::custom),
        }
    }
}

fn validate_scheme(scheme: &str) -> Result<()> {
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid URL scheme '{scheme}'")))
    }
}

fn reject_reserved(part: &str, value: &str, reserved: &[char]) -> Result<()> {
    match value
        .chars()
        .find(|c| reserved.contains(c) || c.is_whitespace())
    {
        Some(c) => Err(Error::InvalidArgument(format!(
            "URL {part} '{value}' contains unencoded {c:?}"
        ))),
        None => Ok(()),
    }
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<u16>)> {
    // IPv6 literal: [::1]:8080
    let port_sep = if host_port.starts_with('[') {
        let close = host_port.find(']').ok_or_else(|| {
            Error::InvalidArgument(format!("unterminated IPv6 host '{host_port}'"))
        })?;
        match &host_port[close + 1..] {
            "" => None,
            rest if rest.starts_with(':') => Some(close + 1),
            rest => {
                return Err(Error::InvalidArgument(format!(
                    "unexpected '{rest}' after IPv6 host"
                )))
            }
        }
    } else {
        host_port.rfind(':')
    };

    match port_sep {
        Some(index) => {
            let port = &host_port[index + 1..];
            let port = port
                .parse::<u16>()
                .map_err(|_| Error::InvalidArgument(format!("invalid port '{port}'")))?;
            Ok((&host_port[..index], Some(port)))
        }
        None => Ok((host_port, None)),
    }
}

fn split_path(path: &str) -> Vec<String> {
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').map(str::to_string).collect(),
        None => Vec::new(),
    }
}

fn decode_component(raw: &str) -> Result<String> {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .map_err(|e| Error::InvalidArgument(format!("malformed query component '{raw}': {e}")))
}
