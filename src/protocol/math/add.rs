//! ADD procedure (procedure 1).

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::protocol::rpc;
use crate::protocol::xdr::{self, deserialize, math, Serialize};

/// Handles `MATHPROC_ADD`
///
/// Decodes an [`math::AddRequest`], logs it, and replies with the
/// [`math::AddResponse`] computed by the context's service. Arguments that
/// do not decode are answered with `GARBAGE_ARGS`.
pub async fn mathproc_add(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), anyhow::Error> {
    let args = match deserialize::<math::AddRequest>(input) {
        Ok(args) => args,
        Err(e) => {
            warn!("mathproc_add({:?}) undecodable arguments: {}", xid, e);
            xdr::rpc::garbage_args_reply_message(xid).serialize(output)?;
            return Ok(());
        }
    };
    info!("Received add request from {}: {:?}", context.client_addr, args);

    let res = context.service.add(args).await;
    debug!(" {:?} --> {:?}", xid, res);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    res.serialize(output)?;
    Ok(())
}
