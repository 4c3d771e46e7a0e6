//! ONC RPC version 2 message envelopes (RFC 5531, section 9).
//!
//! A call carries the program, version and procedure numbers followed by
//! the procedure arguments; a reply carries the call's xid followed either
//! by an accepted status (and, on success, the procedure results) or by a
//! rejection.

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::utils::invalid_data;
use super::{deserialize, Deserialize, DeserializeEnum, Serialize, SerializeEnum};
use super::{DeserializeStruct, SerializeStruct};

/// The only RPC protocol version this crate speaks.
pub const RPC_VERSION: u32 = 2;

/// Why the server refused to authenticate a call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum AuthStat {
    #[default]
    BadCred = 1,
    RejectedCred = 2,
    BadVerf = 3,
    RejectedVerf = 4,
    TooWeak = 5,
}
impl SerializeEnum for AuthStat {}
impl DeserializeEnum for AuthStat {}

/// Authentication flavors defined by RFC 5531. The math service only
/// issues and expects `AuthNull`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum AuthFlavor {
    #[default]
    AuthNull = 0,
    AuthUnix = 1,
    AuthShort = 2,
    AuthDes = 3,
}
impl SerializeEnum for AuthFlavor {}
impl DeserializeEnum for AuthFlavor {}

/// Credentials or verifier: a flavor plus opaque flavor-specific bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpaqueAuth {
    pub flavor: AuthFlavor,
    pub body: Vec<u8>,
}
DeserializeStruct!(OpaqueAuth, flavor, body);
SerializeStruct!(OpaqueAuth, flavor, body);

/// Top-level RPC message. Replies echo the xid of the call they answer.
#[derive(Clone, Debug, Default)]
pub struct RpcMessage {
    pub xid: u32,
    pub body: MessageBody,
}
DeserializeStruct!(RpcMessage, xid, body);
SerializeStruct!(RpcMessage, xid, body);

#[derive(Clone, Debug)]
pub enum MessageBody {
    Call(CallBody),
    Reply(ReplyBody),
}

impl Default for MessageBody {
    fn default() -> MessageBody {
        MessageBody::Call(CallBody::default())
    }
}

impl Serialize for MessageBody {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            MessageBody::Call(call) => {
                0_u32.serialize(dest)?;
                call.serialize(dest)
            }
            MessageBody::Reply(reply) => {
                1_u32.serialize(dest)?;
                reply.serialize(dest)
            }
        }
    }
}

impl Deserialize for MessageBody {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => MessageBody::Call(deserialize(src)?),
            1 => MessageBody::Reply(deserialize(src)?),
            msg_type => {
                return Err(invalid_data(&format!("Invalid message type in rpc message: {msg_type}")))
            }
        };
        Ok(())
    }
}

/// Call header. The procedure arguments follow it on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallBody {
    pub rpcvers: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
}
DeserializeStruct!(CallBody, rpcvers, prog, vers, proc, cred, verf);
SerializeStruct!(CallBody, rpcvers, prog, vers, proc, cred, verf);

#[derive(Clone, Debug)]
pub enum ReplyBody {
    Accepted(AcceptedReply),
    Denied(RejectedReply),
}

impl Default for ReplyBody {
    fn default() -> ReplyBody {
        ReplyBody::Accepted(AcceptedReply::default())
    }
}

impl Serialize for ReplyBody {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            ReplyBody::Accepted(reply) => {
                0_u32.serialize(dest)?;
                reply.serialize(dest)
            }
            ReplyBody::Denied(reply) => {
                1_u32.serialize(dest)?;
                reply.serialize(dest)
            }
        }
    }
}

impl Deserialize for ReplyBody {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => ReplyBody::Accepted(deserialize(src)?),
            1 => ReplyBody::Denied(deserialize(src)?),
            stat => return Err(invalid_data(&format!("Invalid reply status: {stat}"))),
        };
        Ok(())
    }
}

/// Lowest and highest supported versions, sent with version mismatches.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MismatchInfo {
    pub low: u32,
    pub high: u32,
}
DeserializeStruct!(MismatchInfo, low, high);
SerializeStruct!(MismatchInfo, low, high);

/// Reply to a call the server accepted. On `Success` the procedure
/// results follow on the wire.
#[derive(Clone, Debug, Default)]
pub struct AcceptedReply {
    pub verf: OpaqueAuth,
    pub reply_data: AcceptBody,
}
DeserializeStruct!(AcceptedReply, verf, reply_data);
SerializeStruct!(AcceptedReply, verf, reply_data);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AcceptBody {
    #[default]
    Success,
    ProgUnavail,
    ProgMismatch(MismatchInfo),
    ProcUnavail,
    GarbageArgs,
}

impl Serialize for AcceptBody {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            AcceptBody::Success => 0_u32.serialize(dest),
            AcceptBody::ProgUnavail => 1_u32.serialize(dest),
            AcceptBody::ProgMismatch(info) => {
                2_u32.serialize(dest)?;
                info.serialize(dest)
            }
            AcceptBody::ProcUnavail => 3_u32.serialize(dest),
            AcceptBody::GarbageArgs => 4_u32.serialize(dest),
        }
    }
}

impl Deserialize for AcceptBody {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => AcceptBody::Success,
            1 => AcceptBody::ProgUnavail,
            2 => AcceptBody::ProgMismatch(deserialize(src)?),
            3 => AcceptBody::ProcUnavail,
            4 => AcceptBody::GarbageArgs,
            stat => return Err(invalid_data(&format!("Invalid accept stat: {stat}"))),
        };
        Ok(())
    }
}

/// Reply to a call the server refused to process at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectedReply {
    RpcMismatch(MismatchInfo),
    AuthError(AuthStat),
}

impl Default for RejectedReply {
    fn default() -> RejectedReply {
        RejectedReply::AuthError(AuthStat::default())
    }
}

impl Serialize for RejectedReply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            RejectedReply::RpcMismatch(info) => {
                0_u32.serialize(dest)?;
                info.serialize(dest)
            }
            RejectedReply::AuthError(stat) => {
                1_u32.serialize(dest)?;
                stat.serialize(dest)
            }
        }
    }
}

impl Deserialize for RejectedReply {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => RejectedReply::RpcMismatch(deserialize(src)?),
            1 => RejectedReply::AuthError(deserialize(src)?),
            stat => return Err(invalid_data(&format!("Invalid reject stat: {stat}"))),
        };
        Ok(())
    }
}

/// Builds a call header with `AUTH_NULL` credentials.
pub fn call_message(xid: u32, prog: u32, vers: u32, proc: u32) -> RpcMessage {
    let call = CallBody {
        rpcvers: RPC_VERSION,
        prog,
        vers,
        proc,
        cred: OpaqueAuth::default(),
        verf: OpaqueAuth::default(),
    };
    RpcMessage { xid, body: MessageBody::Call(call) }
}

fn accepted_reply_message(xid: u32, reply_data: AcceptBody) -> RpcMessage {
    let reply = ReplyBody::Accepted(AcceptedReply { verf: OpaqueAuth::default(), reply_data });
    RpcMessage { xid, body: MessageBody::Reply(reply) }
}

/// Successful reply header; the procedure results are written after it.
pub fn make_success_reply(xid: u32) -> RpcMessage {
    accepted_reply_message(xid, AcceptBody::Success)
}

pub fn proc_unavail_reply_message(xid: u32) -> RpcMessage {
    accepted_reply_message(xid, AcceptBody::ProcUnavail)
}

pub fn prog_unavail_reply_message(xid: u32) -> RpcMessage {
    accepted_reply_message(xid, AcceptBody::ProgUnavail)
}

pub fn prog_mismatch_reply_message(xid: u32, accepted_ver: u32) -> RpcMessage {
    let info = MismatchInfo { low: accepted_ver, high: accepted_ver };
    accepted_reply_message(xid, AcceptBody::ProgMismatch(info))
}

pub fn garbage_args_reply_message(xid: u32) -> RpcMessage {
    accepted_reply_message(xid, AcceptBody::GarbageArgs)
}

pub fn rpc_vers_mismatch(xid: u32) -> RpcMessage {
    let info = MismatchInfo { low: RPC_VERSION, high: RPC_VERSION };
    let reply = ReplyBody::Denied(RejectedReply::RpcMismatch(info));
    RpcMessage { xid, body: MessageBody::Reply(reply) }
}
