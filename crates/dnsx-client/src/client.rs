//! Query orchestration: product expansion, retries with backoff, and the
//! UDP→TCP truncation fallback.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::nameserver;
use crate::options::{self, ClientOptions, EdnsMode, QueryPlan};
use crate::transport::{self, TransportKind};
use crate::wire::{self, EncodeOptions, Question, Response, WireError};

pub struct Client {
    options: ClientOptions,
}

impl Client {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    /// Issue every query of the (domains × types × classes) product, one at
    /// a time, returning responses in product order.
    pub async fn run(&self) -> Result<Vec<Response>, ClientError> {
        let plan = options::normalise(&self.options)?;
        let nameserver = nameserver::resolve(plan.nameserver.as_deref(), plan.kind);
        debug!("querying {} over {}", nameserver, plan.kind);

        let encode_opts = EncodeOptions {
            rd: true,
            aa: plan.tweaks.aa,
            ad: plan.tweaks.ad,
            cd: plan.tweaks.cd,
            udp_payload_size: if plan.edns == EdnsMode::Disable {
                None
            } else {
                plan.tweaks.udp_payload_size
            },
        };

        let mut responses = Vec::with_capacity(plan.questions.len());
        for question in &plan.questions {
            let id = plan.txid.unwrap_or_else(|| rand::rng().random());
            let request = wire::encode_query(question, id, &encode_opts)?;
            let response = query_with_retries(&plan, &nameserver, question, id, &request).await?;
            responses.push(response);
        }

        if responses.is_empty() {
            return Err(ClientError::NoResponses);
        }
        Ok(responses)
    }
}

async fn query_with_retries(
    plan: &QueryPlan,
    nameserver: &str,
    question: &Question,
    id: u16,
    request: &[u8],
) -> Result<Response, ClientError> {
    let mut failures = 0u32;
    loop {
        match attempt_query(plan.kind, nameserver, id, request, plan.timeout).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                failures += 1;
                if failures >= plan.attempts {
                    return Err(e);
                }
                let backoff = Duration::from_millis(1000u64 << (failures - 1).min(20));
                warn!(
                    "query for {} {} failed ({}), retrying in {:?}",
                    question.name, question.qtype, e, backoff
                );
                sleep(backoff).await;
            }
        }
    }
}

async fn attempt_query(
    kind: TransportKind,
    nameserver: &str,
    id: u16,
    request: &[u8],
    deadline: Duration,
) -> Result<Response, ClientError> {
    let payload = transport::exchange(kind, nameserver, request, deadline).await?;
    let response = decode_checked(&payload, id)?;

    // A truncated UDP reply re-issues the identical request bytes over TCP
    // to the same server and takes that response instead.
    if kind == TransportKind::Udp && response.flags.tc {
        debug!("response truncated, retrying over TCP");
        let payload = transport::exchange(TransportKind::Tcp, nameserver, request, deadline).await?;
        return Ok(decode_checked(&payload, id)?);
    }

    Ok(response)
}

fn decode_checked(payload: &[u8], sent_id: u16) -> Result<Response, WireError> {
    let response = wire::decode_response(payload)?;
    if response.id != sent_id {
        return Err(WireError::TxIdMismatch {
            sent: sent_id,
            got: response.id,
        });
    }
    Ok(response)
}
