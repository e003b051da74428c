use crate::context::RequestContext;
use crate::errors::PluginError;
use crate::ports::ResponseWriter;
use crate::request::Request;
use crate::services::plugin_chain::{DsoNext, Next};
use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use std::sync::Arc;

/// Extra predicate a server config applies before it accepts a query.
pub type FilterFn = Arc<dyn Fn(&RequestContext, &Request) -> bool + Send + Sync>;

/// A plugin in a chain.
///
/// `next` hands the query to the rest of the chain. Returning a code for
/// which [`client_wrote`](crate::errors::client_wrote) is false asks the
/// server to write the error reply.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: Next<'_>,
    ) -> Result<ResponseCode, PluginError>;

    fn as_dso(&self) -> Option<&dyn DsoHandler> {
        None
    }

    fn as_metadata(&self) -> Option<&dyn MetadataCollector> {
        None
    }

    fn as_view(&self) -> Option<&dyn View> {
        None
    }
}

/// Capability of handling stateful (DSO) messages.
#[async_trait]
pub trait DsoHandler: Send + Sync {
    async fn serve_dso(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: DsoNext<'_>,
    ) -> Result<ResponseCode, PluginError>;
}

/// Capability of adding metadata to the context before dispatch.
pub trait MetadataCollector: Send + Sync {
    fn collect(&self, ctx: &mut RequestContext, req: &Request);
}

/// Capability of restricting a server config to part of its clients.
pub trait View: Send + Sync {
    fn view_name(&self) -> &str;

    fn filter(&self, ctx: &RequestContext, req: &Request) -> bool;
}
