//! Derives a [`RequestContext`] from daemon headers and body.

use {
    ebworker_common::SqsdHeader,
    serde_json::{Map, Value},
    tracing::debug,
};

use crate::{DeliveryKind, Error, InboundRequest, RequestContext, Result};

/// Build the context for an already validated delivery.
///
/// A task-name header marks a periodic task and the body is ignored.
/// Otherwise the body must be JSON; the name comes from the attribute
/// header, from our own `{"name", "payload"}` envelope, or from the first
/// record of a provider event.
pub fn extract(request: &InboundRequest) -> Result<RequestContext> {
    let header = |h: SqsdHeader| request.header(h.as_str()).map(str::to_string);

    let (kind, message_name, payload) = if let Some(task) = header(SqsdHeader::TaskName) {
        (DeliveryKind::Periodic, task, Value::Object(Map::new()))
    } else {
        let body = decode_body(&request.body)?;
        classify(header(SqsdHeader::AttrName), body)?
    };

    debug!(kind = %kind, message = %message_name, "extracted delivery");

    Ok(RequestContext {
        kind,
        message_name,
        payload,
        message_id: header(SqsdHeader::MessageId),
        queue: header(SqsdHeader::Queue),
        scheduled_at: header(SqsdHeader::ScheduledAt),
        first_received_at: header(SqsdHeader::FirstReceivedAt),
        receive_count: request
            .header(SqsdHeader::ReceiveCount.as_str())
            .and_then(|v| v.trim().parse().ok()),
        sender_id: header(SqsdHeader::SenderId),
        remote_addr: request.remote_addr,
        user_agent: request.user_agent().unwrap_or_default().to_string(),
    })
}

fn decode_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|source| Error::InvalidPayload { source })
}

fn classify(attr_name: Option<String>, body: Value) -> Result<(DeliveryKind, String, Value)> {
    let (envelope_name, payload) = unwrap_envelope(body);

    if let Some(name) = attr_name.or(envelope_name) {
        return Ok((DeliveryKind::Standard, name, payload));
    }
    match event_name(&payload) {
        Some(name) => Ok((DeliveryKind::Event, name, payload)),
        None => Err(Error::MissingMessageName),
    }
}

/// Splits `{"name": "...", "payload": ...}` into its parts. Any other shape is
/// returned whole.
fn unwrap_envelope(body: Value) -> (Option<String>, Value) {
    match body {
        Value::Object(mut map)
            if map.len() == 2
                && map.contains_key("payload")
                && map.get("name").is_some_and(Value::is_string) =>
        {
            let payload = map.remove("payload").unwrap_or_default();
            let name = map.remove("name").and_then(|v| v.as_str().map(str::to_string));
            (name, payload)
        },
        other => (None, other),
    }
}

/// Name for a provider event: the S3 notification's configuration id, or
/// `eventSource:eventName` of the first record.
fn event_name(payload: &Value) -> Option<String> {
    let record = payload.get("Records")?.as_array()?.first()?;
    if let Some(id) = record
        .pointer("/s3/configurationId")
        .and_then(Value::as_str)
    {
        return Some(id.to_string());
    }
    let source = record.get("eventSource").and_then(Value::as_str)?;
    let name = record.get("eventName").and_then(Value::as_str)?;
    Some(format!("{source}:{name}"))
}
