use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

/// Buffer capacity used when the input length is unknown.
pub const DEFAULT_BUFFER_SIZE: usize = 10 * 1024;

/// Upper bound for the read buffer, whether configured or auto-sized.
pub const MAX_BUFFER_SIZE: usize = 50 * 1024;

/// Line ending written between the lines of a block scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EndOfLine {
    /// `\n`
    Unix,
    /// `\r\n`
    Windows,
}

impl EndOfLine {
    /// The line ending native to the target platform.
    pub const fn platform() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "\n",
            Self::Windows => "\r\n",
        }
    }
}

impl Default for EndOfLine {
    fn default() -> Self {
        Self::platform()
    }
}

/// How the line breaks at the end of a block scalar are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EndingLineBreaks {
    /// Keep every trailing line break.
    KeepAsIs,
    /// Collapse several trailing line breaks into exactly one.
    #[default]
    Normalize,
    /// Remove all trailing line breaks.
    Trim,
}

/// Options that control how a document is read and flattened.
///
/// Every field is optional when loaded from TOML:
///
/// ```toml
/// buffer-size = 4096
/// end-of-line = "unix"
/// ending-line-breaks = "trim"
/// key-delimiter = "__"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
#[schemars(title = "yaml-flat parse options")]
pub struct ParseOptions {
    /// Capacity of the read buffer in bytes.
    ///
    /// The buffer must be larger than the longest line and the longest block
    /// scalar of the document. `0` sizes the buffer from the input length when
    /// it is known, and falls back to 10 KiB otherwise. The capacity never
    /// exceeds 50 KiB.
    #[schemars(title = "Buffer Size")]
    pub buffer_size: usize,

    /// Line ending used between the lines of literal and folded block scalars.
    /// Defaults to the line ending of the platform.
    #[schemars(title = "End of Line")]
    pub end_of_line: EndOfLine,

    /// Treatment of the line breaks at the end of a block scalar.
    #[schemars(title = "Ending Line Breaks")]
    pub ending_line_breaks: EndingLineBreaks,

    /// Separator placed between the segments of a flattened key.
    #[schemars(title = "Key Delimiter")]
    pub key_delimiter: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            buffer_size: 0,
            end_of_line: EndOfLine::platform(),
            ending_line_breaks: EndingLineBreaks::default(),
            key_delimiter: ":".to_string(),
        }
    }
}

impl ParseOptions {
    /// Load options from a TOML document. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or names an unknown
    /// option.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve the read buffer capacity for an input of `len_hint` bytes.
    pub fn buffer_capacity(&self, len_hint: Option<u64>) -> usize {
        let requested = if self.buffer_size > 0 {
            self.buffer_size
        } else {
            match len_hint {
                Some(len) if len > 0 => usize::try_from(len).unwrap_or(MAX_BUFFER_SIZE),
                _ => DEFAULT_BUFFER_SIZE,
            }
        };
        requested.clamp(1, MAX_BUFFER_SIZE)
    }
}

/// Generate the JSON Schema for [`ParseOptions`] as a `serde_json::Value`.
///
/// # Panics
///
/// Panics if the schema cannot be serialized to JSON (should never happen).
pub fn schema() -> Value {
    serde_json::to_value(schema_for!(ParseOptions)).expect("schema serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.buffer_size, 0);
        assert_eq!(options.end_of_line, EndOfLine::platform());
        assert_eq!(options.ending_line_breaks, EndingLineBreaks::Normalize);
        assert_eq!(options.key_delimiter, ":");
    }

    #[test]
    fn auto_size_uses_input_length() {
        let options = ParseOptions::default();
        assert_eq!(options.buffer_capacity(Some(300)), 300);
    }

    #[test]
    fn auto_size_without_length_uses_default() {
        let options = ParseOptions::default();
        assert_eq!(options.buffer_capacity(None), DEFAULT_BUFFER_SIZE);
        assert_eq!(options.buffer_capacity(Some(0)), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn capacity_is_capped() {
        let auto = ParseOptions::default();
        assert_eq!(auto.buffer_capacity(Some(1 << 30)), MAX_BUFFER_SIZE);

        let fixed = ParseOptions {
            buffer_size: 100 * 1024,
            ..ParseOptions::default()
        };
        assert_eq!(fixed.buffer_capacity(Some(10)), MAX_BUFFER_SIZE);
    }

    #[test]
    fn explicit_size_ignores_length() {
        let options = ParseOptions {
            buffer_size: 64,
            ..ParseOptions::default()
        };
        assert_eq!(options.buffer_capacity(Some(4096)), 64);
    }

    #[test]
    fn loads_from_toml() -> anyhow::Result<()> {
        let options = ParseOptions::from_toml_str(
            "buffer-size = 512\nend-of-line = \"windows\"\nending-line-breaks = \"keep-as-is\"\nkey-delimiter = \"__\"\n",
        )?;
        assert_eq!(options.buffer_size, 512);
        assert_eq!(options.end_of_line, EndOfLine::Windows);
        assert_eq!(options.ending_line_breaks, EndingLineBreaks::KeepAsIs);
        assert_eq!(options.key_delimiter, "__");
        Ok(())
    }

    #[test]
    fn empty_toml_keeps_defaults() -> anyhow::Result<()> {
        assert_eq!(ParseOptions::from_toml_str("")?, ParseOptions::default());
        Ok(())
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(ParseOptions::from_toml_str("bogus = true").is_err());
    }

    #[test]
    fn schema_names_every_option() {
        let schema = schema();
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|p| p.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        for key in [
            "buffer-size",
            "end-of-line",
            "ending-line-breaks",
            "key-delimiter",
        ] {
            assert!(properties.iter().any(|p| p == key), "missing {key}");
        }
    }
}
