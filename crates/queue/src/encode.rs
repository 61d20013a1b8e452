//! Wire encoding of buffered messages into provider batch entries.

use std::io;

use {
    ebworker_common::NAME_ATTRIBUTE,
    serde::Serialize,
    serde_json::{
        Map, Value,
        ser::{CharEscape, CompactFormatter, Formatter},
    },
};

use crate::{Message, PushOptions};

/// Most entries the provider accepts in one batch call.
pub const MAX_BATCH_SIZE: usize = 10;

const FIFO_SUFFIX: &str = ".fifo";

/// FIFO queues are recognised by their address suffix.
#[must_use]
pub fn is_fifo(queue_url: &str) -> bool {
    queue_url.ends_with(FIFO_SUFFIX)
}

/// One message as sent inside a batch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    /// Zero-based position inside the chunk.
    pub id: usize,
    pub body: String,
    /// Carried as the `Name` string message attribute.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplication_id: Option<String>,
}

impl BatchEntry {
    /// String message attributes a transport attaches to the entry.
    pub fn attributes(&self) -> [(&'static str, &str); 1] {
        [(NAME_ATTRIBUTE, self.name.as_str())]
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    name: &'a str,
    payload: &'a Map<String, Value>,
}

/// Encode one message for position `index` of a chunk.
pub fn encode_entry(
    index: usize,
    message: &Message,
    options: &PushOptions,
    fifo: bool,
) -> serde_json::Result<BatchEntry> {
    let (delay_seconds, group_id, deduplication_id) = if fifo {
        (
            None,
            Some(message.group_id().to_string()),
            message.deduplication_id().map(str::to_string),
        )
    } else {
        let delay = options.delay.or(message.delay()).unwrap_or_default();
        (Some(delay.seconds()), None, None)
    };

    Ok(BatchEntry {
        id: index,
        body: encode_body(message)?,
        name: message.name().to_string(),
        delay_seconds,
        group_id,
        deduplication_id,
    })
}

/// `{"name":…,"payload":…}` with HTML-significant characters escaped.
pub fn encode_body(message: &Message) -> serde_json::Result<String> {
    let envelope = Envelope {
        name: message.name(),
        payload: message.payload(),
    };
    let mut buf = Vec::with_capacity(64);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
    envelope.serialize(&mut ser)?;
    // The serializer only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Compact JSON that escapes `<`, `>`, `&`, `'` and `"` inside strings as
/// `\u00XX` sequences so bodies are safe to embed in HTML.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003C",
                '>' => "\\u003E",
                '&' => "\\u0026",
                '\'' => "\\u0027",
                _ => continue,
            };
            writer.write_all(&fragment.as_bytes()[start..i])?;
            writer.write_all(escaped.as_bytes())?;
            start = i + 1;
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if matches!(char_escape, CharEscape::Quote) {
            writer.write_all(b"\\u0022")
        } else {
            CompactFormatter.write_char_escape(writer, char_escape)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::Delay, rstest::rstest, serde_json::json};

    fn message(name: &str, payload: Value) -> Message {
        Message::from_serialize(name, &payload).unwrap()
    }

    #[rstest]
    #[case("https://sqs.eu-west-1.amazonaws.com/1/jobs.fifo", true)]
    #[case("https://sqs.eu-west-1.amazonaws.com/1/jobs", false)]
    #[case("https://sqs.eu-west-1.amazonaws.com/1/fifo", false)]
    #[case("", false)]
    fn fifo_detection(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_fifo(url), expected);
    }

    #[test]
    fn body_is_envelope() {
        let body = encode_body(&message("user.created", json!({"id": 1}))).unwrap();
        assert_eq!(body, r#"{"name":"user.created","payload":{"id":1}}"#);
    }

    #[test]
    fn body_escapes_html_characters() {
        let body = encode_body(&message(
            "x",
            json!({"html": "<b>\"Tom\" & 'Jerry'</b>", "path": "a/b"}),
        ))
        .unwrap();
        assert_eq!(
            body,
            r#"{"name":"x","payload":{"html":"\u003Cb\u003E\u0022Tom\u0022 \u0026 \u0027Jerry\u0027\u003C/b\u003E","path":"a/b"}}"#
        );
        let decoded: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded["payload"]["html"], "<b>\"Tom\" & 'Jerry'</b>");
    }

    #[test]
    fn body_keeps_other_escapes() {
        let body = encode_body(&message("x", json!({"s": "a\nb\\c\u{1}"}))).unwrap();
        assert_eq!(body, r#"{"name":"x","payload":{"s":"a\nb\\c\u0001"}}"#);
    }

    #[test]
    fn standard_entry_always_has_delay() {
        let entry = encode_entry(0, &Message::named("a"), &PushOptions::default(), false).unwrap();
        assert_eq!(entry.delay_seconds, Some(0));
        assert_eq!(entry.group_id, None);
        assert_eq!(entry.deduplication_id, None);
    }

    #[test]
    fn push_option_delay_overrides_message_delay() {
        let msg = Message::named("a").with_delay(Delay::new(10).unwrap());
        let entry = encode_entry(0, &msg, &PushOptions::default(), false).unwrap();
        assert_eq!(entry.delay_seconds, Some(10));

        let opts = PushOptions::delayed(Delay::new(20).unwrap());
        let entry = encode_entry(0, &msg, &opts, false).unwrap();
        assert_eq!(entry.delay_seconds, Some(20));
    }

    #[test]
    fn fifo_entry_drops_delay() {
        let msg = Message::named("a")
            .with_delay(Delay::new(10).unwrap())
            .with_deduplication_id("d-1");
        let entry = encode_entry(3, &msg, &PushOptions::default(), true).unwrap();
        assert_eq!(entry.id, 3);
        assert_eq!(entry.delay_seconds, None);
        assert_eq!(entry.group_id.as_deref(), Some(msg.group_id()));
        assert_eq!(entry.deduplication_id.as_deref(), Some("d-1"));
    }

    #[test]
    fn name_travels_as_attribute() {
        let entry = encode_entry(0, &Message::named("user.created"), &PushOptions::default(), false)
            .unwrap();
        assert_eq!(entry.attributes(), [("Name", "user.created")]);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let entry = encode_entry(0, &Message::named("a"), &PushOptions::default(), false).unwrap();
        let wire = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            wire,
            json!({"id": "0", "body": r#"{"name":"a","payload":{}}"#, "name": "a", "delaySeconds": 0})
        );
    }
}
