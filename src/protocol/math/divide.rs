//! DIVIDE procedure (procedure 2).
//!
//! A zero divisor is not a protocol error: the call still succeeds at the
//! RPC level and the failure travels inside `DivideResponse::error_message`.

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::protocol::rpc;
use crate::protocol::xdr::{self, deserialize, math, Serialize};

/// Handles `MATHPROC_DIVIDE`
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the [`math::DivideRequest`]
/// * `output` - Output stream for the reply
/// * `context` - Connection context holding the service implementation
pub async fn mathproc_divide(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), anyhow::Error> {
    let args = match deserialize::<math::DivideRequest>(input) {
        Ok(args) => args,
        Err(e) => {
            warn!("mathproc_divide({:?}) undecodable arguments: {}", xid, e);
            xdr::rpc::garbage_args_reply_message(xid).serialize(output)?;
            return Ok(());
        }
    };
    info!("Received divide request from {}: {:?}", context.client_addr, args);

    let res = context.service.divide(args).await;
    debug!(" {:?} --> {:?}", xid, res);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    res.serialize(output)?;
    Ok(())
}
