use std::path::PathBuf;

use clap::Parser;

use dnsx_client::{ClientOptions, EdnsMode, Tweaks};

use crate::config::FileConfig;

/// Record mnemonics recognised when classifying positional arguments.
const POSITIONAL_TYPES: &[&str] = &[
    "A", "AAAA", "NS", "MX", "TXT", "SRV", "PTR", "CNAME", "SOA", "CAA",
];

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// Command-line DNS client
///
/// Queries a recursive resolver over UDP, TCP, DNS-over-TLS or
/// DNS-over-HTTPS and prints the parsed responses.
pub struct Args {
    /// Domains to look up; bare record-type names select types instead
    #[clap(value_parser)]
    pub positional: Vec<String>,

    /// Host to query, can be specified more than once
    #[clap(short = 'q', long = "query", value_parser)]
    pub query: Vec<String>,

    /// Record type to look up, can be specified more than once
    #[clap(short = 't', long = "type", value_parser)]
    pub record_type: Vec<String>,

    /// Nameserver to send the queries to
    #[clap(short = 'n', long, value_parser)]
    pub nameserver: Option<String>,

    /// Query class (IN, CH, HS), can be specified more than once
    #[clap(long, value_parser)]
    pub class: Vec<String>,

    /// EDNS behaviour: disable, hide, or show
    #[clap(long, value_parser)]
    pub edns: Option<String>,

    /// Pin the transaction id instead of randomising it
    #[clap(long, value_parser)]
    pub txid: Option<u16>,

    /// Protocol tweak (aa, ad, cd, bufsize=<n>), can be specified more than
    /// once
    #[clap(short = 'Z', value_name = "TWEAK", value_parser)]
    pub tweak: Vec<String>,

    /// Send the queries over UDP
    #[clap(short = 'U', long, action(clap::ArgAction::SetTrue))]
    pub udp: bool,

    /// Send the queries over TCP
    #[clap(short = 'T', long, action(clap::ArgAction::SetTrue))]
    pub tcp: bool,

    /// Send the queries over DNS-over-TLS
    #[clap(short = 'S', long, action(clap::ArgAction::SetTrue))]
    pub tls: bool,

    /// Send the queries over DNS-over-HTTPS
    #[clap(short = 'H', long, action(clap::ArgAction::SetTrue))]
    pub https: bool,

    /// Print only the answer data, one record per line
    #[clap(short = '1', long, action(clap::ArgAction::SetTrue))]
    pub short: bool,

    /// Print the responses as JSON
    #[clap(short = 'J', long, action(clap::ArgAction::SetTrue))]
    pub json: bool,

    /// Colourise the output: always, auto, or never
    #[clap(long, default_value = "auto", value_parser)]
    pub color: String,

    /// Print TTLs as raw seconds
    #[clap(long, action(clap::ArgAction::SetTrue))]
    pub seconds: bool,

    /// Print how long the lookups took
    #[clap(long, action(clap::ArgAction::SetTrue))]
    pub time: bool,

    /// Per-attempt timeout in milliseconds
    #[clap(long, value_parser)]
    pub timeout: Option<u64>,

    /// Attempts per query
    #[clap(long, value_parser)]
    pub retries: Option<u32>,

    /// Path to a JSON config file
    #[clap(long, value_parser)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[clap(long, action(clap::ArgAction::SetTrue))]
    pub verbose: bool,
}

impl Args {
    /// Fold the command line over the config-file baseline.
    pub fn client_options(&self, file: &FileConfig) -> anyhow::Result<ClientOptions> {
        let (mut domains, mut types) = classify_positional(&self.positional);
        domains.extend(self.query.iter().cloned());
        types.extend(self.record_type.iter().cloned());

        let mut tweaks = Tweaks::default();
        for token in &self.tweak {
            tweaks.apply(token);
        }

        let edns = match self.edns.as_deref().or(file.edns.as_deref()) {
            Some(name) => EdnsMode::from_name(name)
                .ok_or_else(|| anyhow::anyhow!("unknown EDNS setting {:?}", name))?,
            None => EdnsMode::default(),
        };

        let defaults = ClientOptions::default();
        Ok(ClientOptions {
            domains,
            types,
            classes: self.class.clone(),
            nameserver: self.nameserver.clone().or_else(|| file.nameserver.clone()),
            edns,
            txid: self.txid,
            tweaks,
            udp: self.udp,
            tcp: self.tcp,
            tls: self.tls,
            https: self.https,
            timeout_ms: self.timeout.or(file.timeout_ms).unwrap_or(defaults.timeout_ms),
            retries: self.retries.or(file.retries).unwrap_or(defaults.retries),
        })
    }
}

/// Left-to-right: the first token is always a domain; later tokens naming a
/// well-known record type select that type, everything else is a domain.
fn classify_positional(tokens: &[String]) -> (Vec<String>, Vec<String>) {
    let mut domains = Vec::new();
    let mut types = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && POSITIONAL_TYPES.contains(&token.to_ascii_uppercase().as_str()) {
            types.push(token.clone());
        } else {
            domains.push(token.clone());
        }
    }
    (domains, types)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_classify_positional() {
        let (domains, types) =
            classify_positional(&strings(&["example.com", "aaaa", "mail.example.com", "MX"]));
        assert_eq!(domains, strings(&["example.com", "mail.example.com"]));
        assert_eq!(types, strings(&["aaaa", "MX"]));
    }

    #[test]
    fn test_first_positional_is_always_a_domain() {
        let (domains, types) = classify_positional(&strings(&["MX"]));
        assert_eq!(domains, strings(&["MX"]));
        assert!(types.is_empty());
    }

    #[test]
    fn test_options_from_flags() {
        let args = Args::parse_from([
            "dnsx",
            "example.com",
            "-t",
            "TXT",
            "-n",
            "9.9.9.9",
            "-T",
            "-Z",
            "bufsize=1232",
            "-Z",
            "ad",
        ]);
        let options = args.client_options(&FileConfig::default()).unwrap();

        assert_eq!(options.domains, strings(&["example.com"]));
        assert_eq!(options.types, strings(&["TXT"]));
        assert_eq!(options.nameserver.as_deref(), Some("9.9.9.9"));
        assert!(options.tcp);
        assert!(!options.udp);
        assert!(options.tweaks.ad);
        assert_eq!(options.tweaks.udp_payload_size, Some(1232));
        assert_eq!(options.timeout_ms, 5000);
        assert_eq!(options.retries, 3);
    }

    #[test]
    fn test_config_file_fills_gaps() {
        let file = FileConfig {
            nameserver: Some("8.8.8.8".to_string()),
            timeout_ms: Some(750),
            retries: Some(1),
            edns: Some("show".to_string()),
        };
        let args = Args::parse_from(["dnsx", "example.com", "--timeout", "250"]);
        let options = args.client_options(&file).unwrap();

        assert_eq!(options.nameserver.as_deref(), Some("8.8.8.8"));
        assert_eq!(options.timeout_ms, 250); // flag wins
        assert_eq!(options.retries, 1);
        assert_eq!(options.edns, EdnsMode::Show);
    }

    #[test]
    fn test_unknown_edns_setting_is_an_error() {
        let args = Args::parse_from(["dnsx", "example.com", "--edns", "maybe"]);
        assert!(args.client_options(&FileConfig::default()).is_err());
    }
}
