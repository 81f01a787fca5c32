//! JSON description of a simulated document
//!
//! ```json
//! {
//!   "key": "sample-book",
//!   "sections": [
//!     { "href": "cover.xhtml", "linear": false, "blocks": [{ "id": "img", "extent": 900 }] },
//!     {
//!       "href": "ch01.xhtml",
//!       "writing_mode": { "direction": "rtl" },
//!       "blocks": [{ "id": "p1", "extent": 1200, "sentinels": 40, "marker": true }]
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::model::{Axis, SectionContent, SectionIndex, WritingMode};

/// Body handed to the surface for sections flagged `malformed`.
const MALFORMED_BODY: &[u8] = b"\x00\x01<not a section>";

/// A whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimDocument {
    /// Stable identity, part of every geometry cache key.
    pub key: String,
    /// Sections in reading order.
    pub sections: Vec<SimSection>,
}

/// One section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimSection {
    /// Document-relative href.
    pub href: String,
    /// Part of the linear reading order.
    #[serde(default = "default_linear")]
    pub linear: bool,
    /// Writing mode reported by the surface.
    #[serde(default)]
    pub writing_mode: WritingMode,
    /// Tracking sections in document order.
    #[serde(default)]
    pub blocks: Vec<SimBlock>,
    /// Hand the surface bytes it cannot interpret.
    #[serde(default)]
    pub malformed: bool,
}

fn default_linear() -> bool {
    true
}

/// One tracking section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimBlock {
    /// Tracking id.
    pub id: String,
    /// Natural extent along the block axis.
    pub extent: f64,
    /// Content sentinels spread evenly through the block.
    #[serde(default)]
    pub sentinels: usize,
    /// Emit a marker sentinel at the block start.
    #[serde(default)]
    pub marker: bool,
    /// The block's own writing axis, when it declares one.
    #[serde(default)]
    pub axis: Option<Axis>,
}

impl SimDocument {
    /// Parse a JSON description.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the text does not describe a document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Document of `sections` linear sections, each holding `blocks` blocks of
    /// `extent` with `sentinels` content sentinels apiece.
    pub fn uniform(
        key: impl Into<String>,
        sections: usize,
        blocks: usize,
        extent: f64,
        sentinels: usize,
    ) -> Self {
        Self {
            key: key.into(),
            sections: (0..sections)
                .map(|s| {
                    let mut section = SimSection::new(format!("s{s:03}.xhtml"));
                    for b in 0..blocks {
                        section = section.with_block(
                            SimBlock::new(format!("s{s}-b{b}"), extent).with_sentinels(sentinels),
                        );
                    }
                    section
                })
                .collect(),
        }
    }
}

impl SimSection {
    /// Empty linear horizontal left-to-right section.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            linear: true,
            writing_mode: WritingMode::HORIZONTAL_LTR,
            blocks: Vec::new(),
            malformed: false,
        }
    }

    /// Append a block.
    pub fn with_block(mut self, block: SimBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Set the writing mode.
    pub fn with_writing_mode(mut self, writing_mode: WritingMode) -> Self {
        self.writing_mode = writing_mode;
        self
    }

    /// Exclude from the linear reading order.
    pub fn non_linear(mut self) -> Self {
        self.linear = false;
        self
    }

    /// Make the surface reject this section.
    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    /// Sum of natural block extents.
    pub fn total_extent(&self) -> f64 {
        self.blocks.iter().map(|b| b.extent).sum()
    }

    /// Content handle as the store would hand it out.
    pub fn to_content(&self, index: SectionIndex) -> SectionContent {
        let body = if self.malformed {
            MALFORMED_BODY.to_vec()
        } else {
            serde_json::to_vec(self).unwrap_or_default()
        };
        SectionContent::new(index, self.href.clone(), body)
    }
}

impl SimBlock {
    /// Block without sentinels.
    pub fn new(id: impl Into<String>, extent: f64) -> Self {
        Self {
            id: id.into(),
            extent,
            sentinels: 0,
            marker: false,
            axis: None,
        }
    }

    /// Set the content sentinel count.
    pub fn with_sentinels(mut self, sentinels: usize) -> Self {
        self.sentinels = sentinels;
        self
    }

    /// Emit a leading marker sentinel.
    pub fn with_marker(mut self) -> Self {
        self.marker = true;
        self
    }

    /// Declare an own writing axis.
    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }
}
