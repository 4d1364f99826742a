//! Line protocol spoken with the compiled artifact.
//!
//! Requests are tab separated lines (`new`, `set`, `show`); every request is
//! answered by exactly one `ok[\t<payload>]` or `err\t<message>` line. Fields are
//! escaped so tabs and newlines in values cannot break framing.

use crate::model::ParamKind;

/// Escapes `\`, tab, newline and carriage return.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`].
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// A request line (without the trailing newline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Construct an instance of a type, replacing the current one.
    New(String),
    /// Invoke the mutator of `field` with a literal.
    Set {
        /// Schema property name.
        field: String,
        /// Kind of the literal.
        kind: ParamKind,
        /// Literal, as text.
        value: String,
    },
    /// Render the current instance.
    Show,
}

impl Request {
    /// Encodes the request as one protocol line.
    pub fn encode(&self) -> String {
        match self {
            Request::New(name) => format!("new\t{}", escape(name)),
            Request::Set { field, kind, value } => {
                format!("set\t{}\t{}\t{}", escape(field), kind, escape(value))
            }
            Request::Show => "show".to_string(),
        }
    }
}

/// A decoded response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Request succeeded.
    Ok(Option<String>),
    /// Request failed.
    Err(String),
}

impl Response {
    /// Decodes a response line; anything not starting with `ok`/`err` is a protocol
    /// violation.
    pub fn decode(line: &str) -> Result<Self, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (status, payload) = match line.split_once('\t') {
            Some((status, payload)) => (status, Some(unescape(payload))),
            None => (line, None),
        };
        match status {
            "ok" => Ok(Response::Ok(payload)),
            "err" => Ok(Response::Err(payload.unwrap_or_default())),
            _ => Err(format!("unexpected response line '{}'", line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip_with_framing_chars() {
        let raw = "a\tb\\n\nc\r";
        let escaped = escape(raw);
        assert!(!escaped.contains('\t'));
        assert!(!escaped.contains('\n'));
        assert_eq!(unescape(&escaped), raw);
    }

    #[test]
    fn test_request_encoding() {
        assert_eq!(Request::New("models.Employee".into()).encode(), "new\tmodels.Employee");
        assert_eq!(
            Request::Set {
                field: "name".into(),
                kind: ParamKind::String,
                value: "Ma\tnas".into(),
            }
            .encode(),
            "set\tname\tstring\tMa\\tnas"
        );
        assert_eq!(Request::Show.encode(), "show");
    }

    #[test]
    fn test_response_decoding() {
        assert_eq!(Response::decode("ok\n"), Ok(Response::Ok(None)));
        assert_eq!(
            Response::decode("ok\tEmployee { name: \\\"x\\\" }"),
            Ok(Response::Ok(Some("Employee { name: \"x\" }".into())))
        );
        assert_eq!(
            Response::decode("err\tunknown type 'X'"),
            Ok(Response::Err("unknown type 'X'".into()))
        );
        assert!(Response::decode("thread 'main' panicked").is_err());
    }
}
