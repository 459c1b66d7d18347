//! Slider frames: one precomputed visual state per threshold.

use serde_json::{json, Value};

use crate::error::{BctoolsError, Result};

/// Which frame a trace belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceOwner {
    /// Visible in every frame.
    Static,
    /// Visible only in the frame with this grid index.
    Frame(usize),
}

/// Per-threshold content computed by a plot before the masks are known.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameContent {
    pub label: String,
    pub title: String,
    /// Replaces the layout annotations when the frame is selected.
    pub annotations: Option<Vec<Value>>,
}

impl FrameContent {
    pub fn new(label: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            title: title.into(),
            annotations: None,
        }
    }

    pub fn with_annotations(mut self, annotations: Vec<Value>) -> Self {
        self.annotations = Some(annotations);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualFrame {
    pub label: String,
    pub visible: Vec<bool>,
    pub title: String,
    pub annotations: Option<Vec<Value>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameSet {
    frames: Vec<VisualFrame>,
}

impl FrameSet {
    /// Masks are `static ∪ own traces` for every frame.
    pub fn build(owners: &[TraceOwner], contents: Vec<FrameContent>) -> Result<Self> {
        if contents.is_empty() {
            return Err(BctoolsError::value("a slider needs at least one frame"));
        }
        if let Some(TraceOwner::Frame(k)) = owners
            .iter()
            .find(|o| matches!(o, TraceOwner::Frame(k) if *k >= contents.len()))
        {
            return Err(BctoolsError::value(format!(
                "trace owned by frame {k} but only {} frames exist",
                contents.len()
            )));
        }
        let frames = contents
            .into_iter()
            .enumerate()
            .map(|(index, content)| VisualFrame {
                visible: owners
                    .iter()
                    .map(|owner| match owner {
                        TraceOwner::Static => true,
                        TraceOwner::Frame(k) => *k == index,
                    })
                    .collect(),
                label: content.label,
                title: content.title,
                annotations: content.annotations,
            })
            .collect();
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[VisualFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn initial(&self) -> &VisualFrame {
        &self.frames[0]
    }

    /// Plotly slider definition; the first frame is active.
    pub fn slider(&self) -> Value {
        let steps: Vec<Value> = self
            .frames
            .iter()
            .map(|frame| {
                let mut relayout = json!({ "title": title_value(&frame.title) });
                if let Some(annotations) = &frame.annotations {
                    relayout["annotations"] = Value::Array(annotations.clone());
                }
                json!({
                    "method": "update",
                    "args": [{ "visible": frame.visible }, relayout],
                    "label": frame.label,
                })
            })
            .collect();
        json!({
            "active": 0,
            "currentvalue": { "prefix": "Threshold: " },
            "pad": { "t": 50 },
            "steps": steps,
        })
    }
}

/// Bold main title followed by a smaller subtitle line.
pub fn compose_title(main: &str, subtitle: &str) -> String {
    format!("<b>{main}</b><br><span style=\"font-size: 13px;\">{subtitle}</span>")
}

pub fn title_value(text: &str) -> Value {
    json!({ "text": text, "y": 0.965, "yanchor": "bottom" })
}
