//! Slot templates for harness programs
//!
//! A template is program text with `{{name}}` slots. Slots are located once,
//! when the template is loaded, so rendering is a single pass that never
//! rescans substituted text: user code containing `{{cases}}` is inserted
//! verbatim.

use std::ops::Range;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Slots a harness template must contain, in render order of their values
pub const HARNESS_SLOTS: &[&str] = &["code", "cases"];

/// Slots a test case template must contain
pub const CASE_SLOTS: &[&str] = &["args", "expected"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template is missing the `{0}` slot")]
    Missing(&'static str),

    #[error("template slot `{0}` appears {1} times, expected exactly once")]
    Duplicate(&'static str, usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(Range<usize>),
    Slot(usize),
}

/// A parsed template with a fixed set of named slots
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    slots: &'static [&'static str],
}

impl Template {
    /// Parse `source`, requiring every name in `slots` to appear exactly once.
    ///
    /// `{{` sequences that do not spell one of the slots are kept as text.
    pub fn parse(
        source: impl Into<String>,
        slots: &'static [&'static str],
    ) -> Result<Self, TemplateError> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut counts = vec![0usize; slots.len()];
        let mut text_start = 0;
        let mut cursor = 0;

        while let Some(offset) = source[cursor..].find("{{") {
            let open = cursor + offset;
            let inner = &source[open + 2..];
            let matched = slots.iter().enumerate().find(|(_, name)| {
                inner.starts_with(**name) && inner[name.len()..].starts_with("}}")
            });

            match matched {
                Some((index, name)) => {
                    if text_start < open {
                        segments.push(Segment::Text(text_start..open));
                    }
                    segments.push(Segment::Slot(index));
                    counts[index] += 1;
                    cursor = open + 2 + name.len() + 2;
                    text_start = cursor;
                }
                None => cursor = open + 1,
            }
        }

        if text_start < source.len() {
            segments.push(Segment::Text(text_start..source.len()));
        }

        for (index, count) in counts.into_iter().enumerate() {
            match count {
                0 => return Err(TemplateError::Missing(slots[index])),
                1 => {}
                n => return Err(TemplateError::Duplicate(slots[index], n)),
            }
        }

        Ok(Self {
            source,
            segments,
            slots,
        })
    }

    /// The raw template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Slot names, in the order `render` expects their values
    pub fn slots(&self) -> &'static [&'static str] {
        self.slots
    }

    /// Render into `out`. `values[i]` fills the slot named `slots()[i]`.
    pub fn render_into(&self, out: &mut String, values: &[&str]) {
        for segment in &self.segments {
            match segment {
                Segment::Text(range) => out.push_str(&self.source[range.clone()]),
                Segment::Slot(index) => out.push_str(values.get(*index).copied().unwrap_or("")),
            }
        }
    }

    /// Render to a new string
    pub fn render(&self, values: &[&str]) -> String {
        let extra: usize = values.iter().map(|v| v.len()).sum();
        let mut out = String::with_capacity(self.source.len() + extra);
        self.render_into(&mut out, values);
        out
    }
}

macro_rules! slot_template {
    ($(#[$meta:meta])* $name:ident, $slots:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Template);

        impl $name {
            pub fn new(source: impl Into<String>) -> Result<Self, TemplateError> {
                Template::parse(source, $slots).map(Self)
            }

            pub fn template(&self) -> &Template {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = Template;

            fn deref(&self) -> &Template {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(self.0.source())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $name::new(s).map_err(|e| de::Error::custom(format!("invalid template: {e}")))
            }
        }
    };
}

slot_template!(
    /// Whole-program template with `{{code}}` and `{{cases}}` slots
    HarnessTemplate,
    HARNESS_SLOTS
);

slot_template!(
    /// Single test case literal with `{{args}}` and `{{expected}}` slots
    CaseTemplate,
    CASE_SLOTS
);
