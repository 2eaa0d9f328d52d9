//! Function invoker: the request/response bridge around one function
//!
//! Per request: decode the transport payload into an envelope, enrich its
//! headers, call the function, normalize whatever shape it returned into a
//! response envelope, and turn that into transport bytes.

use crate::drain::{drain, DrainLimits};
use crate::gateway;
use function_context::{
    EnvelopeCodec, FunctionProperties, FunctionReference, FunctionRegistry, InputEnricher,
    JsonCodec, DEFAULT_CONTENT_TYPE,
};
use function_types::{Envelope, FunctionOutput, FunctionResult, Headers, Payload};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;
use uuid::Uuid;

/// Serves one resolved function.
///
/// Immutable after [`FunctionInvoker::start`]; clone it or share it behind an
/// `Arc` to serve concurrent requests.
#[derive(Clone)]
pub struct FunctionInvoker {
    function: FunctionReference,
    enricher: Option<Arc<InputEnricher>>,
    codec: Arc<dyn EnvelopeCodec>,
    limits: DrainLimits,
}

impl FunctionInvoker {
    /// Resolve the configured function and its enrichment rules.
    pub fn start(
        registry: &FunctionRegistry,
        properties: &FunctionProperties,
        limits: DrainLimits,
    ) -> FunctionResult<Self> {
        tracing::info!(definition = %properties.definition, "Locating function");

        let function = registry.lookup(&properties.definition, DEFAULT_CONTENT_TYPE)?;

        let enricher = properties
            .header_mapping_rules(function.definition())
            .map(|rules| InputEnricher::new(&rules))
            .transpose()?
            .map(Arc::new);

        tracing::info!(
            definition = %function.definition(),
            stages = ?function.stage_names(),
            input_type = %function.input_type(),
            output_stream = function.is_output_stream(),
            enriched_headers = ?enricher.as_ref().map(|e| e.fields()),
            "Located function"
        );

        Ok(Self {
            function,
            enricher,
            codec: Arc::new(JsonCodec),
            limits,
        })
    }

    /// Replace the codec used for requests, responses and the conversions
    /// between composed stages
    pub fn with_codec(mut self, codec: Arc<dyn EnvelopeCodec>) -> Self {
        self.function = self.function.with_codec(codec.clone());
        self.codec = codec;
        self
    }

    pub fn function(&self) -> &FunctionReference {
        &self.function
    }

    pub fn limits(&self) -> &DrainLimits {
        &self.limits
    }

    pub fn is_enriched(&self) -> bool {
        self.enricher.is_some()
    }

    /// Handle one request: payload bytes and transport metadata in, response
    /// bytes out.
    pub async fn handle_request(&self, payload: &[u8], metadata: Headers) -> FunctionResult<Vec<u8>> {
        let span = tracing::info_span!(
            "invocation",
            request_id = %Uuid::new_v4(),
            function = %self.function.definition()
        );

        async move {
            let request = self.generate_message(payload, metadata)?;
            let request_headers = request.headers().clone();
            let response = self.apply(request).await?;
            let output = gateway::generate_output(&request_headers, response, self.codec.as_ref())?;

            tracing::debug!(bytes = output.len(), "Response ready");
            Ok(output)
        }
        .instrument(span)
        .await
    }

    /// Handle one request and return the response envelope instead of bytes.
    ///
    /// The envelope's payload is always encoded bytes.
    pub async fn invoke(&self, payload: &[u8], metadata: Headers) -> FunctionResult<Envelope> {
        let request = self.generate_message(payload, metadata)?;
        self.apply(request).await
    }

    /// Read a whole request from `reader`, handle it, and write the response
    /// to `writer`.
    pub async fn handle_stream<R, W>(
        &self,
        mut reader: R,
        mut writer: W,
        metadata: Headers,
    ) -> FunctionResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload).await?;

        let output = self.handle_request(&payload, metadata).await?;

        writer.write_all(&output).await?;
        writer.flush().await?;
        Ok(())
    }

    fn generate_message(&self, payload: &[u8], metadata: Headers) -> FunctionResult<Envelope> {
        tracing::info!(bytes = payload.len(), "Received request");
        tracing::debug!(payload = %String::from_utf8_lossy(payload), "Request payload");

        let request = gateway::generate_message(
            payload,
            metadata,
            self.function.input_type(),
            self.codec.as_ref(),
        )?;

        match &self.enricher {
            Some(enricher) => enricher.enrich(&request),
            None => Ok(request),
        }
    }

    async fn apply(&self, request: Envelope) -> FunctionResult<Envelope> {
        let output = self.function.apply(request).await?;
        tracing::debug!(kind = output.kind(), "Function returned");
        self.build_result(output).await
    }

    /// Normalize a function's output into a response envelope with an
    /// encoded payload
    async fn build_result(&self, output: FunctionOutput) -> FunctionResult<Envelope> {
        match output {
            FunctionOutput::Envelope(envelope) => {
                let (payload, headers) = envelope.into_parts();
                let bytes = match payload {
                    Payload::Bytes(bytes) => bytes,
                    Payload::Value(value) => self.codec.encode(&value)?,
                };
                Ok(Envelope::with_headers(bytes, headers))
            }
            FunctionOutput::Stream(stream) => {
                let value = drain(stream, &self.limits, self.codec.as_ref()).await?;
                Ok(Envelope::new(self.codec.encode(&value)?))
            }
            FunctionOutput::List(values) => {
                Ok(Envelope::new(self.codec.encode(&Value::Array(values))?))
            }
            FunctionOutput::Value(value) => Ok(Envelope::new(self.codec.encode(&value)?)),
        }
    }
}

impl std::fmt::Debug for FunctionInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionInvoker")
            .field("function", &self.function)
            .field("enricher", &self.enricher)
            .field("limits", &self.limits)
            .finish()
    }
}
