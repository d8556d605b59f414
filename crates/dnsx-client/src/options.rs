//! Client options: validation and normalisation into a query plan.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::record::{QClass, RecordType};
use crate::transport::TransportKind;
use crate::wire::Question;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("no domains to query")]
    NoDomains,
    #[error("invalid domain name {0:?}")]
    InvalidDomain(String),
    #[error("unknown record type {0:?}")]
    InvalidType(String),
    #[error("unknown class {0:?}")]
    InvalidClass(String),
    #[error("at most one transport may be selected")]
    ConflictingTransports,
    #[error("the HTTPS transport requires an https:// nameserver URL")]
    HttpsRequiresUrl,
}

/// What to do about EDNS OPT pseudo-records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdnsMode {
    /// Never emit an OPT record.
    Disable,
    /// Emit when needed, keep OPT records out of the rendering.
    #[default]
    Hide,
    /// Emit when needed and render received OPT records.
    Show,
}

impl EdnsMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "disable" => Some(Self::Disable),
            "hide" => Some(Self::Hide),
            "show" => Some(Self::Show),
            _ => None,
        }
    }
}

/// Protocol tweak opt-ins (`-Z`).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Tweaks {
    #[serde(default)]
    pub aa: bool,
    #[serde(default)]
    pub ad: bool,
    #[serde(default)]
    pub cd: bool,
    #[serde(default)]
    pub udp_payload_size: Option<u16>,
}

impl Tweaks {
    /// Apply one tweak token. Unknown tokens are ignored.
    pub fn apply(&mut self, token: &str) {
        match token {
            "aa" | "authoritative" => self.aa = true,
            "ad" | "authentic" => self.ad = true,
            "cd" | "checking-disabled" => self.cd = true,
            _ => {
                if let Some(value) = token.strip_prefix("bufsize=") {
                    if let Ok(size) = value.parse() {
                        self.udp_payload_size = Some(size);
                    }
                }
            }
        }
    }
}

/// Everything a [`crate::Client`] run consumes. Types and classes are kept
/// as raw strings (names or decimal numbers) until validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientOptions {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub nameserver: Option<String>,
    #[serde(default)]
    pub edns: EdnsMode,
    #[serde(default)]
    pub txid: Option<u16>,
    #[serde(default)]
    pub tweaks: Tweaks,
    #[serde(default)]
    pub udp: bool,
    #[serde(default)]
    pub tcp: bool,
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub https: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_timeout_ms() -> u64 {
    5000
}
fn default_retries() -> u32 {
    3
}

impl Default for ClientOptions {
    fn default() -> Self {
        serde_json::from_str("{}").unwrap()
    }
}

/// The validated, expanded form of a run: one question per element of the
/// (domains × types × classes) product, in declaration order.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub questions: Vec<Question>,
    pub kind: TransportKind,
    pub nameserver: Option<String>,
    pub timeout: Duration,
    pub attempts: u32,
    pub txid: Option<u16>,
    pub tweaks: Tweaks,
    pub edns: EdnsMode,
}

pub fn normalise(options: &ClientOptions) -> Result<QueryPlan, OptionsError> {
    if options.domains.is_empty() {
        return Err(OptionsError::NoDomains);
    }
    for domain in &options.domains {
        validate_domain(domain)?;
    }

    let types: Vec<RecordType> = if options.types.is_empty() {
        vec![RecordType::A]
    } else {
        options
            .types
            .iter()
            .map(|t| parse_type(t))
            .collect::<Result<_, _>>()?
    };
    let classes: Vec<QClass> = if options.classes.is_empty() {
        vec![QClass::IN]
    } else {
        options
            .classes
            .iter()
            .map(|c| parse_class(c))
            .collect::<Result<_, _>>()?
    };

    let kind = select_transport(options)?;
    if kind == TransportKind::Https {
        match options.nameserver.as_deref() {
            Some(ns) if ns.starts_with("https://") => {}
            _ => return Err(OptionsError::HttpsRequiresUrl),
        }
    }

    let mut questions = Vec::with_capacity(options.domains.len() * types.len() * classes.len());
    for domain in &options.domains {
        for &qtype in &types {
            for &qclass in &classes {
                questions.push(Question {
                    name: domain.clone(),
                    qtype,
                    qclass,
                });
            }
        }
    }

    Ok(QueryPlan {
        questions,
        kind,
        nameserver: options.nameserver.clone(),
        timeout: Duration::from_millis(options.timeout_ms),
        // zero retries still means one attempt
        attempts: options.retries.max(1),
        txid: options.txid,
        tweaks: options.tweaks,
        edns: options.edns,
    })
}

fn select_transport(options: &ClientOptions) -> Result<TransportKind, OptionsError> {
    let mut kind = None;
    for (flag, candidate) in [
        (options.udp, TransportKind::Udp),
        (options.tcp, TransportKind::Tcp),
        (options.tls, TransportKind::Tls),
        (options.https, TransportKind::Https),
    ] {
        if flag {
            if kind.is_some() {
                return Err(OptionsError::ConflictingTransports);
            }
            kind = Some(candidate);
        }
    }
    Ok(kind.unwrap_or(TransportKind::Udp))
}

/// Parse a record type given as a mnemonic (any case) or a decimal number.
/// Numbers must name one of the known constants.
pub fn parse_type(value: &str) -> Result<RecordType, OptionsError> {
    let value = value.trim();
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        return value
            .parse::<u16>()
            .ok()
            .and_then(RecordType::from_number)
            .ok_or_else(|| OptionsError::InvalidType(value.to_string()));
    }
    RecordType::from_name(&value.to_ascii_uppercase())
        .ok_or_else(|| OptionsError::InvalidType(value.to_string()))
}

pub fn parse_class(value: &str) -> Result<QClass, OptionsError> {
    QClass::from_name(&value.trim().to_ascii_uppercase())
        .ok_or_else(|| OptionsError::InvalidClass(value.to_string()))
}

/// Label rules from RFC 1035: 1..=63 octets of letters/digits/hyphen per
/// label, no leading/trailing/consecutive dots, and the encoded form
/// (length octets plus terminal zero) within 255 octets.
pub fn validate_domain(name: &str) -> Result<(), OptionsError> {
    let invalid = || OptionsError::InvalidDomain(name.to_string());

    if name.is_empty() || name.starts_with('.') || name.ends_with('.') {
        return Err(invalid());
    }

    let mut wire_len = 1usize;
    for label in name.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(invalid());
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(invalid());
        }
        wire_len += 1 + label.len();
    }
    if wire_len > 255 {
        return Err(invalid());
    }
    Ok(())
}
