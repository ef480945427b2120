//! Final encoding of handler output into a wire format.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::EncodeError;
use crate::value::HandlerValue;

/// Output format requested for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `text/html`
    #[default]
    Html,
    /// `application/json`
    Json,
    /// `text/plain`
    Text,
    /// `application/xml`
    Xml,
    /// `text/css`
    Css,
    /// `text/x-irc`
    Irc,
    /// `image/jpeg`
    Jpeg,
    /// `image/gif`
    Gif,
}

impl Format {
    /// Maps a file extension, with or without the leading dot, to a format.
    ///
    /// # Examples
    ///
    /// ```
    /// use invoke_core::Format;
    ///
    /// assert_eq!(Format::from_extension(".json"), Some(Format::Json));
    /// assert_eq!(Format::from_extension("htm"), Some(Format::Html));
    /// assert_eq!(Format::from_extension("exe"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        match ext {
            "jpeg" | "jpg" => Some(Format::Jpeg),
            "gif" => Some(Format::Gif),
            "txt" => Some(Format::Text),
            "html" | "htm" => Some(Format::Html),
            "json" => Some(Format::Json),
            "css" => Some(Format::Css),
            "irc" => Some(Format::Irc),
            "xml" => Some(Format::Xml),
            _ => None,
        }
    }

    /// Maps a mimetype (parameters ignored) to a format.
    pub fn from_mimetype(mimetype: &str) -> Option<Self> {
        let essence = mimetype.split(';').next().unwrap_or("").trim();
        [
            Format::Html,
            Format::Json,
            Format::Text,
            Format::Xml,
            Format::Css,
            Format::Irc,
            Format::Jpeg,
            Format::Gif,
        ]
        .into_iter()
        .find(|f| f.mimetype().eq_ignore_ascii_case(essence))
    }

    /// The mimetype emitted for this format.
    pub fn mimetype(self) -> &'static str {
        match self {
            Format::Html => "text/html",
            Format::Json => "application/json",
            Format::Text => "text/plain",
            Format::Xml => "application/xml",
            Format::Css => "text/css",
            Format::Irc => "text/x-irc",
            Format::Jpeg => "image/jpeg",
            Format::Gif => "image/gif",
        }
    }

    /// Whether [`serialize`] has an encoder for this format.
    pub fn is_encodable(self) -> bool {
        matches!(self, Format::Json | Format::Text | Format::Html)
    }

    /// Whether this is a JSON format.
    pub fn is_json(self) -> bool {
        self.mimetype().contains("json")
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mimetype())
    }
}

/// Escapes `<` and `>` so arbitrary text can be shown inside HTML.
pub fn htmlize(value: impl fmt::Display) -> String {
    value.to_string().replace('<', "&lt;").replace('>', "&gt;")
}

/// Renders items as an HTML unordered list, one escaped `<li>` per item.
///
/// ```
/// use invoke_core::htmlize_list;
///
/// assert_eq!(htmlize_list(["a", "<b>"]), "<ul>\n<li>a</li>\n<li>&lt;b&gt;</li>\n</ul>");
/// ```
pub fn htmlize_list<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let mut out = vec!["<ul>".to_string()];
    for item in items {
        out.push(format!("<li>{}</li>", htmlize(item)));
    }
    out.push("</ul>".to_string());
    out.join("\n")
}

/// Encodes a handler value as JSON text.
///
/// Timestamps become RFC 3339 text and exportable objects are exported first.
///
/// # Errors
///
/// Returns [`EncodeError::Unencodable`] for opaque objects without a
/// serializable form and for non-finite floats.
pub fn jsonify(value: &HandlerValue) -> Result<String, EncodeError> {
    let tree = encode(value)?;
    to_json_text(&tree)
}

/// Encodes a handler value into the given format.
///
/// # Errors
///
/// Returns [`EncodeError::UnsupportedFormat`] when no encoder exists for
/// `format`, or [`EncodeError::Unencodable`] as for [`jsonify`].
pub fn serialize(value: &HandlerValue, format: Format) -> Result<String, EncodeError> {
    ensure_supported(format)?;
    let tree = encode(value)?;
    serialize_value(&tree, format)
}

/// Encodes an already normalized tree into the given format.
///
/// # Errors
///
/// Returns [`EncodeError::UnsupportedFormat`] when no encoder exists for `format`.
pub fn serialize_value(value: &Value, format: Format) -> Result<String, EncodeError> {
    ensure_supported(format)?;
    match format {
        Format::Json => to_json_text(value),
        Format::Text => match value {
            Value::String(s) => Ok(s.clone()),
            other => to_json_text(other),
        },
        _ => match value {
            Value::String(s) => Ok(htmlize(s)),
            Value::Array(items) => {
                let texts = items
                    .iter()
                    .map(display_text)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(htmlize_list(texts))
            }
            other => Ok(htmlize(to_json_text(other)?)),
        },
    }
}

fn ensure_supported(format: Format) -> Result<(), EncodeError> {
    if format.is_encodable() {
        Ok(())
    } else {
        Err(EncodeError::UnsupportedFormat(format.mimetype()))
    }
}

fn display_text(value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => to_json_text(other),
    }
}

fn to_json_text(value: &Value) -> Result<String, EncodeError> {
    serde_json::to_string(value).map_err(|e| EncodeError::Unencodable {
        type_name: "serde_json::Value".to_string(),
        repr: e.to_string(),
    })
}

fn encode(value: &HandlerValue) -> Result<Value, EncodeError> {
    Ok(match value {
        HandlerValue::Null => Value::Null,
        HandlerValue::Bool(b) => Value::Bool(*b),
        HandlerValue::Int(i) => Value::from(*i),
        HandlerValue::UInt(u) => Value::from(*u),
        HandlerValue::Float(f) => {
            Value::Number(Number::from_f64(*f).ok_or_else(|| EncodeError::Unencodable {
                type_name: "f64".to_string(),
                repr: f.to_string(),
            })?)
        }
        HandlerValue::Text(s) => Value::String(s.clone()),
        HandlerValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        HandlerValue::Date(d) => Value::String(d.to_string()),
        HandlerValue::Map(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), encode(v)?);
            }
            Value::Object(out)
        }
        HandlerValue::Seq(items) => {
            Value::Array(items.iter().map(encode).collect::<Result<_, _>>()?)
        }
        HandlerValue::Export(obj) => encode(&HandlerValue::Map(obj.export()))?,
        HandlerValue::Object(obj) => obj.to_json().ok_or_else(|| EncodeError::Unencodable {
            type_name: obj.type_name().to_string(),
            repr: obj.repr(),
        })?,
    })
}
