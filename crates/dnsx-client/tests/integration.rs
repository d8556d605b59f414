//! End-to-end tests against loopback sockets: a scripted UDP/TCP "server"
//! answers the client's queries with hand-built response packets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

use dnsx_client::{Client, ClientError, ClientOptions, RData, WireError};

/// Offset just past the (single) question section of a query packet.
fn question_end(query: &[u8]) -> usize {
    let mut i = 12;
    while query[i] != 0 {
        i += 1 + query[i] as usize;
    }
    i + 1 + 4
}

/// Build a response to `query`: echo id and question, append one A record
/// per address. `truncated` sets the TC bit.
fn answer_response(query: &[u8], truncated: bool, answers: &[[u8; 4]]) -> Vec<u8> {
    let end = question_end(query);
    let mut buf = Vec::new();
    buf.extend_from_slice(&query[0..2]);
    let flags: u16 = if truncated { 0x8380 } else { 0x8180 };
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&query[12..end]);
    for ip in answers {
        buf.extend_from_slice(&[0xC0, 0x0C]);
        buf.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        buf.extend_from_slice(&60u32.to_be_bytes());
        buf.extend_from_slice(&4u16.to_be_bytes());
        buf.extend_from_slice(ip);
    }
    buf
}

fn options_for(addr: &SocketAddr) -> ClientOptions {
    ClientOptions {
        domains: vec!["example.com".to_string()],
        nameserver: Some(format!("127.0.0.1:{}", addr.port())),
        timeout_ms: 2000,
        retries: 1,
        ..ClientOptions::default()
    }
}

#[tokio::test]
async fn test_udp_lookup() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        let (len, src) = server.recv_from(&mut buf).await.unwrap();
        let reply = answer_response(&buf[..len], false, &[[93, 184, 216, 34]]);
        server.send_to(&reply, src).await.unwrap();
    });

    let responses = Client::new(options_for(&addr)).run().await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].answers.len(), 1);
    assert_eq!(responses[0].answers[0].data.to_string(), "93.184.216.34");
}

#[tokio::test]
async fn test_tcp_lookup() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut query = vec![0u8; u16::from_be_bytes(len_buf) as usize];
        stream.read_exact(&mut query).await.unwrap();

        let reply = answer_response(&query, false, &[[198, 51, 100, 7]]);
        stream
            .write_all(&(reply.len() as u16).to_be_bytes())
            .await
            .unwrap();
        stream.write_all(&reply).await.unwrap();
    });

    let mut options = options_for(&addr);
    options.tcp = true;
    let responses = Client::new(options).run().await.unwrap();
    assert_eq!(responses[0].answers[0].data, RData::A([198, 51, 100, 7].into()));
}

#[tokio::test]
async fn test_truncated_udp_falls_back_to_tcp() {
    let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = udp.local_addr().unwrap();
    let tcp = TcpListener::bind(addr).await.unwrap();

    // UDP side: truncated, empty answer section
    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        let (len, src) = udp.recv_from(&mut buf).await.unwrap();
        let reply = answer_response(&buf[..len], true, &[]);
        udp.send_to(&reply, src).await.unwrap();
    });

    // TCP side: the real answer, and it must see the same request bytes
    let tcp_query: Arc<tokio::sync::Mutex<Option<Vec<u8>>>> = Arc::default();
    let seen = tcp_query.clone();
    tokio::spawn(async move {
        let (mut stream, _) = tcp.accept().await.unwrap();
        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut query = vec![0u8; u16::from_be_bytes(len_buf) as usize];
        stream.read_exact(&mut query).await.unwrap();
        *seen.lock().await = Some(query.clone());

        let reply = answer_response(&query, false, &[[203, 0, 113, 9]]);
        stream
            .write_all(&(reply.len() as u16).to_be_bytes())
            .await
            .unwrap();
        stream.write_all(&reply).await.unwrap();
    });

    let mut options = options_for(&addr);
    options.txid = Some(0x4242);
    let responses = Client::new(options).run().await.unwrap();

    // Only the TCP answer surfaces
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].answers.len(), 1);
    assert_eq!(responses[0].answers[0].data.to_string(), "203.0.113.9");
    assert!(!responses[0].flags.tc);

    // The fallback re-issued the identical transaction id
    let query = tcp_query.lock().await.clone().unwrap();
    assert_eq!(u16::from_be_bytes([query[0], query[1]]), 0x4242);
}

#[tokio::test]
async fn test_retry_count_on_silent_server() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let received = Arc::new(AtomicU32::new(0));

    let counter = received.clone();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        loop {
            // swallow every query without answering
            if server.recv_from(&mut buf).await.is_err() {
                break;
            }
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let mut options = options_for(&addr);
    options.timeout_ms = 100;
    options.retries = 2;
    let err = Client::new(options).run().await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(received.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_mismatched_txid_is_rejected() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        let (len, src) = server.recv_from(&mut buf).await.unwrap();
        let mut reply = answer_response(&buf[..len], false, &[[10, 0, 0, 1]]);
        reply[0] ^= 0xFF; // corrupt the transaction id
        server.send_to(&reply, src).await.unwrap();
    });

    let err = Client::new(options_for(&addr)).run().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Wire(WireError::TxIdMismatch { .. })
    ));
}

#[tokio::test]
async fn test_responses_follow_query_order() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        for n in 1u8..=4 {
            let (len, src) = server.recv_from(&mut buf).await.unwrap();
            let reply = answer_response(&buf[..len], false, &[[10, 0, 0, n]]);
            server.send_to(&reply, src).await.unwrap();
        }
    });

    let mut options = options_for(&addr);
    options.domains = vec!["a.example".to_string(), "b.example".to_string()];
    options.types = vec!["A".to_string(), "AAAA".to_string()];
    let responses = Client::new(options).run().await.unwrap();

    assert_eq!(responses.len(), 4);
    for (i, response) in responses.iter().enumerate() {
        assert_eq!(
            response.answers[0].data.to_string(),
            format!("10.0.0.{}", i + 1)
        );
    }
}
