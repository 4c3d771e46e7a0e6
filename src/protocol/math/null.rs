//! NULL procedure (procedure 0): takes nothing, returns nothing. Clients use
//! it to check that the server is up.

use std::io::Write;

use tracing::debug;

use crate::protocol::xdr::{self, Serialize};

pub fn mathproc_null(xid: u32, output: &mut impl Write) -> Result<(), anyhow::Error> {
    debug!("mathproc_null({:?}) ", xid);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
