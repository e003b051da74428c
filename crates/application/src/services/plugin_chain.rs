//! Compiled plugin chains.
//!
//! A chain is the ordered handler list of one server config. Each handler
//! receives a [`Next`] cursor over the handlers after it, so a plugin only
//! ever sees "the rest of the chain" and never the list itself.

use crate::context::RequestContext;
use crate::errors::PluginError;
use crate::ports::{Handler, ResponseWriter};
use crate::request::Request;
use hickory_proto::op::ResponseCode;
use std::sync::Arc;

/// Cursor over the remaining handlers of a chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Arc<dyn Handler>],
}

impl<'a> Next<'a> {
    pub fn new(handlers: &'a [Arc<dyn Handler>]) -> Self {
        Self { handlers }
    }

    pub fn is_end(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Name of the handler that would run next.
    pub fn peek_name(&self) -> Option<&'a str> {
        self.handlers.first().map(|h| h.name())
    }

    /// Run the next handler. Past the end of the chain this fails with
    /// [`PluginError::NoNextPlugin`], i.e. SERVFAIL.
    pub async fn serve_dns(
        self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
    ) -> Result<ResponseCode, PluginError> {
        let Some((head, rest)) = self.handlers.split_first() else {
            return Err(PluginError::NoNextPlugin);
        };
        head.serve_dns(ctx, w, req, Next::new(rest)).await
    }
}

/// Cursor over the remaining DSO-capable handlers of a chain.
#[derive(Clone, Copy)]
pub struct DsoNext<'a> {
    handlers: &'a [Arc<dyn Handler>],
}

impl<'a> DsoNext<'a> {
    pub fn new(handlers: &'a [Arc<dyn Handler>]) -> Self {
        Self { handlers }
    }

    pub async fn serve_dso(
        self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
    ) -> Result<ResponseCode, PluginError> {
        let mut handlers = self.handlers;
        while let Some((head, rest)) = handlers.split_first() {
            if let Some(dso) = head.as_dso() {
                return dso.serve_dso(ctx, w, req, DsoNext::new(rest)).await;
            }
            handlers = rest;
        }
        Err(PluginError::NoNextPlugin)
    }
}

pub struct PluginChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl PluginChain {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        &self.handlers
    }

    pub async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
    ) -> Result<ResponseCode, PluginError> {
        Next::new(&self.handlers).serve_dns(ctx, w, req).await
    }
}

/// The DSO-capable handlers of a chain, in declaration order.
pub struct DsoChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl DsoChain {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub async fn serve_dso(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
    ) -> Result<ResponseCode, PluginError> {
        DsoNext::new(&self.handlers).serve_dso(ctx, w, req).await
    }
}
