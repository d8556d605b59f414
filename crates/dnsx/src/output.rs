//! Response rendering: dig-style sections, short mode, and JSON.

use std::time::Duration;

use ansi_term::Colour;
use serde_json::json;

use dnsx_client::{Answer, EdnsMode, RData, RecordType, Response};

pub struct RenderOptions {
    pub short: bool,
    pub json: bool,
    pub color: bool,
    pub seconds: bool,
    pub edns: EdnsMode,
}

pub fn print_responses(responses: &[Response], elapsed: Option<Duration>, opts: &RenderOptions) {
    if opts.json {
        println!("{}", json_document(responses, elapsed, opts));
        return;
    }

    for response in responses {
        if opts.short {
            for answer in visible(&response.answers, opts.edns) {
                println!("{}", answer.data);
            }
            continue;
        }

        if response.flags.rcode != 0 {
            println!(";; status: {}", rcode_name(response.flags.rcode));
        }
        print_section("ANSWER", &response.answers, opts);
        print_section("AUTHORITY", &response.authorities, opts);
        print_section("ADDITIONAL", &response.additionals, opts);
    }

    if let Some(elapsed) = elapsed {
        println!(";; query time: {} ms", elapsed.as_millis());
    }
}

fn print_section(heading: &str, records: &[Answer], opts: &RenderOptions) {
    let records = visible(records, opts.edns);
    if records.is_empty() {
        return;
    }

    println!(";; {}", heading);
    for record in records {
        let rtype = record.rtype.to_string();
        let data = record.data.to_string();
        let (rtype, data) = if opts.color {
            (
                Colour::Cyan.paint(rtype).to_string(),
                Colour::Green.paint(data).to_string(),
            )
        } else {
            (rtype, data)
        };
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.name,
            format_ttl(record.ttl, opts.seconds),
            record.class,
            rtype,
            data
        );
    }
}

/// OPT pseudo-records only show up under `--edns show`.
fn visible(records: &[Answer], edns: EdnsMode) -> Vec<&Answer> {
    records
        .iter()
        .filter(|r| edns == EdnsMode::Show || r.rtype != RecordType::OPT)
        .collect()
}

fn json_document(
    responses: &[Response],
    elapsed: Option<Duration>,
    opts: &RenderOptions,
) -> serde_json::Value {
    let mut document = json!({
        "responses": responses
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "flags": {
                        "qr": r.flags.qr,
                        "aa": r.flags.aa,
                        "tc": r.flags.tc,
                        "rd": r.flags.rd,
                        "ra": r.flags.ra,
                        "ad": r.flags.ad,
                        "cd": r.flags.cd,
                    },
                    "status": rcode_name(r.flags.rcode),
                    "answers": section_json(&r.answers, opts),
                    "authorities": section_json(&r.authorities, opts),
                    "additionals": section_json(&r.additionals, opts),
                })
            })
            .collect::<Vec<_>>(),
    });
    if let Some(elapsed) = elapsed {
        document["duration_ms"] = json!(elapsed.as_millis() as u64);
    }
    document
}

fn section_json(records: &[Answer], opts: &RenderOptions) -> Vec<serde_json::Value> {
    visible(records, opts.edns)
        .into_iter()
        .map(record_json)
        .collect()
}

fn record_json(record: &Answer) -> serde_json::Value {
    let mut value = json!({
        "name": record.name,
        "type": record.rtype.to_string(),
        "class": record.class.to_string(),
        "ttl": record.ttl,
        "data": record.data.to_string(),
    });
    match &record.data {
        RData::MX {
            preference,
            exchange,
        } => {
            value["preference"] = json!(preference);
            value["exchange"] = json!(exchange);
        }
        RData::SRV {
            priority,
            weight,
            port,
            target,
        } => {
            value["priority"] = json!(priority);
            value["weight"] = json!(weight);
            value["port"] = json!(port);
            value["target"] = json!(target);
        }
        _ => {}
    }
    value
}

fn rcode_name(rcode: u8) -> String {
    match rcode {
        0 => "NOERROR".to_string(),
        1 => "FORMERR".to_string(),
        2 => "SERVFAIL".to_string(),
        3 => "NXDOMAIN".to_string(),
        4 => "NOTIMP".to_string(),
        5 => "REFUSED".to_string(),
        other => format!("RCODE{}", other),
    }
}

pub fn format_ttl(ttl: u32, raw_seconds: bool) -> String {
    if raw_seconds {
        return ttl.to_string();
    }
    let days = ttl / 86400;
    let hours = (ttl % 86400) / 3600;
    let minutes = (ttl % 3600) / 60;
    let seconds = ttl % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}d", days));
    }
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{}s", seconds));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnsx_client::QClass;

    fn answer(rtype: RecordType, data: RData) -> Answer {
        Answer {
            name: "example.com".to_string(),
            rtype,
            class: QClass::IN,
            ttl: 300,
            data,
        }
    }

    #[test]
    fn test_format_ttl() {
        assert_eq!(format_ttl(0, false), "0s");
        assert_eq!(format_ttl(45, false), "45s");
        assert_eq!(format_ttl(300, false), "5m");
        assert_eq!(format_ttl(3661, false), "1h1m1s");
        assert_eq!(format_ttl(90000, false), "1d1h");
        assert_eq!(format_ttl(300, true), "300");
    }

    #[test]
    fn test_rcode_names() {
        assert_eq!(rcode_name(0), "NOERROR");
        assert_eq!(rcode_name(3), "NXDOMAIN");
        assert_eq!(rcode_name(11), "RCODE11");
    }

    #[test]
    fn test_opt_records_hidden_by_default() {
        let records = vec![
            answer(RecordType::A, RData::A([10, 0, 0, 1].into())),
            answer(RecordType::OPT, RData::Raw(vec![])),
        ];
        assert_eq!(visible(&records, EdnsMode::Hide).len(), 1);
        assert_eq!(visible(&records, EdnsMode::Show).len(), 2);
    }

    #[test]
    fn test_mx_json_has_structured_fields() {
        let record = answer(
            RecordType::MX,
            RData::MX {
                preference: 10,
                exchange: "mail.example.com".to_string(),
            },
        );
        let value = record_json(&record);
        assert_eq!(value["data"], "10 mail.example.com");
        assert_eq!(value["preference"], 10);
        assert_eq!(value["exchange"], "mail.example.com");
    }
}
