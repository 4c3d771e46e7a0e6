#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::timeout;

use math_rpc::protocol::rpc::{Context, SocketMessageHandler, SocketMessageType};
use math_rpc::service::Calculator;
use math_rpc::tcp::{MathTcpListener, ServerHandle};
use math_rpc::xdr::{self, Serialize};

pub fn test_context() -> Context {
    Context {
        client_addr: "127.0.0.1:1234".to_string(),
        service: Arc::new(Calculator),
    }
}

/// Starts a calculator server on an OS-assigned loopback port.
pub async fn start_server() -> ServerHandle {
    MathTcpListener::bind("127.0.0.1:0", Calculator).await.expect("bind server").spawn()
}

/// Encodes a call header followed by `args`.
pub fn encode_call(call: xdr::rpc::CallBody, xid: u32, args: &impl Serialize) -> Vec<u8> {
    let msg = xdr::rpc::RpcMessage { xid, body: xdr::rpc::MessageBody::Call(call) };
    let mut buf = Vec::new();
    msg.serialize(&mut buf).expect("serialize RpcMessage");
    args.serialize(&mut buf).expect("serialize args");
    buf
}

pub fn math_call(proc: u32) -> xdr::rpc::CallBody {
    xdr::rpc::CallBody {
        rpcvers: xdr::rpc::RPC_VERSION,
        prog: xdr::math::PROGRAM,
        vers: xdr::math::VERSION,
        proc,
        cred: xdr::rpc::OpaqueAuth::default(),
        verf: xdr::rpc::OpaqueAuth::default(),
    }
}

/// Feeds `record` through a fresh message handler as a single last fragment
/// and returns the reply bytes.
pub async fn exchange(record: &[u8]) -> Vec<u8> {
    let (mut handler, mut socksend, mut msgrecv) = SocketMessageHandler::new(&test_context());
    let fragment_header = (1_u32 << 31) | (record.len() as u32);
    socksend.write_all(&fragment_header.to_be_bytes()).await.expect("write fragment header");
    socksend.write_all(record).await.expect("write fragment body");

    handler.read().await.expect("handler read");
    next_reply(&mut msgrecv).await
}

pub async fn next_reply(msgrecv: &mut mpsc::UnboundedReceiver<SocketMessageType>) -> Vec<u8> {
    timeout(Duration::from_secs(1), msgrecv.recv())
        .await
        .expect("response timeout")
        .expect("response channel closed")
        .expect("response error")
}

/// Decodes a reply header and returns it with a cursor positioned at the results.
pub fn decode_reply(reply: Vec<u8>) -> (xdr::rpc::RpcMessage, Cursor<Vec<u8>>) {
    let mut input = Cursor::new(reply);
    let msg = xdr::deserialize::<xdr::rpc::RpcMessage>(&mut input).expect("deserialize reply");
    (msg, input)
}

/// Extracts the accept status of an accepted reply.
pub fn accept_body(msg: &xdr::rpc::RpcMessage) -> xdr::rpc::AcceptBody {
    match &msg.body {
        xdr::rpc::MessageBody::Reply(xdr::rpc::ReplyBody::Accepted(accepted)) => {
            accepted.reply_data.clone()
        }
        other => panic!("expected accepted reply, got {:?}", other),
    }
}
