//! Escaping for rendered output

use std::borrow::Cow;

/// HTML produced by [`crate::render::Document::to_html`].
///
/// There is no public constructor, so a value of this type has always had
/// its text runs escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub(crate) fn from_trusted(html: String) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

/// Drop control characters (escape sequences included) before text reaches
/// a terminal. Tabs become a single space.
pub fn strip_control_chars(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .filter_map(|c| match c {
                '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect(),
    )
}
