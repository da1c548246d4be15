//! Protobuf/tonic bindings for the ingest service, kept in sync with the
//! `taskrun.v1.ResultSink` service definition by hand.

/// A single opaque document in an ingest batch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Doc {
    /// JSON-serialized record body.
    #[prost(bytes = "vec", tag = "1")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IngestRequest {
    #[prost(message, repeated, tag = "1")]
    pub docs: ::prost::alloc::vec::Vec<Doc>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IngestResponse {}

/// Terminal result payload of one task run.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResultPayload {
    #[prost(uint64, tag = "1")]
    pub run_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeliverResponse {}

/// Client implementations.
pub mod result_sink_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct ResultSinkClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl ResultSinkClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> ResultSinkClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        /// Submit one batch of opaque documents.
        pub async fn ingest(
            &mut self,
            request: impl tonic::IntoRequest<super::IngestRequest>,
        ) -> std::result::Result<tonic::Response<super::IngestResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/taskrun.v1.ResultSink/Ingest");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("taskrun.v1.ResultSink", "Ingest"));
            self.inner.unary(req, path, codec).await
        }

        /// Ship a terminal run result payload.
        pub async fn deliver(
            &mut self,
            request: impl tonic::IntoRequest<super::ResultPayload>,
        ) -> std::result::Result<tonic::Response<super::DeliverResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/taskrun.v1.ResultSink/Deliver");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("taskrun.v1.ResultSink", "Deliver"));
            self.inner.unary(req, path, codec).await
        }
    }
}
