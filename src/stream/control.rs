//! First-chunk control prefix recognition.
//!
//! The backend may open a response with a metadata line such as
//! `USER_ID:<value>\n`. The line has no escaping or framing, so a reply whose
//! text genuinely starts with a configured marker and `:` is indistinguishable
//! from a control line. Callers that cannot rule that out should disable
//! recognition with [`ControlPrefix::disabled`].

/// Marker for the backend-assigned user id line.
pub const USER_ID_MARKER: &str = "USER_ID";

/// A recognized control line split off the visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlLine<'a> {
    pub marker: String,
    pub value: String,
    /// Text following the control line's newline.
    pub rest: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPrefix {
    markers: Vec<String>,
}

/// A marker must be non-empty and contain neither `:` nor a line break.
pub fn is_valid_marker(marker: &str) -> bool {
    !marker.is_empty() && !marker.contains([':', '\n', '\r'])
}

impl ControlPrefix {
    /// Markers failing [`is_valid_marker`] are dropped.
    pub fn new<I, M>(markers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| is_valid_marker(m))
                .collect(),
        }
    }

    /// Never recognizes a prefix; the first chunk is always visible text.
    pub fn disabled() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.markers.is_empty()
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Split `text` into a control line and the remaining visible text.
    ///
    /// The control line runs up to the first `\n`; without one, the whole text
    /// is the control line. The value is whatever follows `MARKER:`, trimmed.
    pub fn split<'a>(&self, text: &'a str) -> Option<ControlLine<'a>> {
        let (marker, after) = self.markers.iter().find_map(|m| {
            let after = text.strip_prefix(m.as_str())?.strip_prefix(':')?;
            Some((m, after))
        })?;
        let (value, rest) = match after.find('\n') {
            Some(idx) => (&after[..idx], &after[idx + 1..]),
            None => (after, ""),
        };
        Some(ControlLine {
            marker: marker.clone(),
            value: value.trim().to_string(),
            rest,
        })
    }
}

impl Default for ControlPrefix {
    fn default() -> Self {
        Self::new([USER_ID_MARKER])
    }
}
