//! Renderer-neutral figure: an ordered trace list plus layout, serialized in
//! plotly.js JSON and exported as a standalone HTML page.

use std::fs;
use std::path::Path;

use plotly::Layout;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::{BctoolsError, Result};
use crate::plot::frames::{title_value, FrameContent, FrameSet, TraceOwner};

/// A built plot together with the data it returns.
#[derive(Clone, Debug)]
pub struct PlotOutput<T> {
    pub figure: Figure,
    pub data: T,
}

#[derive(Clone, Debug)]
pub struct Figure {
    traces: Vec<Value>,
    owners: Vec<TraceOwner>,
    layout: Map<String, Value>,
    frames: Option<FrameSet>,
    show_display_modebar: bool,
}

fn object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BctoolsError::value(format!(
            "{what} must serialize to a JSON object, got {other}"
        ))),
    }
}

impl Figure {
    pub fn new(layout: Layout, show_display_modebar: bool) -> Result<Self> {
        Ok(Self {
            traces: Vec::new(),
            owners: Vec::new(),
            layout: object(serde_json::to_value(&layout)?, "layout")?,
            frames: None,
            show_display_modebar,
        })
    }

    /// Appends a trace and returns its index.
    pub fn add_trace<T: Serialize + ?Sized>(&mut self, trace: &T, owner: TraceOwner) -> Result<usize> {
        self.add_trace_value(serde_json::to_value(trace)?, owner)
    }

    pub fn add_trace_value(&mut self, trace: Value, owner: TraceOwner) -> Result<usize> {
        let mut trace = object(trace, "trace")?;
        trace.insert(
            "visible".to_string(),
            Value::Bool(matches!(owner, TraceOwner::Static)),
        );
        self.traces.push(Value::Object(trace));
        self.owners.push(owner);
        Ok(self.traces.len() - 1)
    }

    /// Sets a trace attribute that has no typed builder.
    pub fn set_trace_attr(&mut self, index: usize, key: &str, value: Value) {
        if let Some(Value::Object(trace)) = self.traces.get_mut(index) {
            trace.insert(key.to_string(), value);
        }
    }

    pub fn set_layout(&mut self, key: &str, value: Value) {
        self.layout.insert(key.to_string(), value);
    }

    pub fn set_title(&mut self, text: &str) {
        self.set_layout("title", title_value(text));
    }

    pub fn add_annotation(&mut self, annotation: Value) {
        match self.layout.get_mut("annotations") {
            Some(Value::Array(list)) => list.push(annotation),
            _ => {
                self.layout
                    .insert("annotations".to_string(), Value::Array(vec![annotation]));
            }
        }
    }

    /// Builds one frame per content entry, attaches the slider and applies
    /// the first frame as the initial state.
    pub fn attach_frames(&mut self, contents: Vec<FrameContent>) -> Result<()> {
        let frames = FrameSet::build(&self.owners, contents)?;
        let initial = frames.initial().clone();
        for (trace, visible) in self.traces.iter_mut().zip(&initial.visible) {
            if let Value::Object(trace) = trace {
                trace.insert("visible".to_string(), Value::Bool(*visible));
            }
        }
        self.set_title(&initial.title);
        if let Some(annotations) = initial.annotations {
            self.set_layout("annotations", Value::Array(annotations));
        }
        self.set_layout("sliders", json!([frames.slider()]));
        debug!(traces = self.traces.len(), frames = frames.len(), "attached slider");
        self.frames = Some(frames);
        Ok(())
    }

    pub fn traces(&self) -> &[Value] {
        &self.traces
    }

    pub fn owners(&self) -> &[TraceOwner] {
        &self.owners
    }

    pub fn layout(&self) -> &Map<String, Value> {
        &self.layout
    }

    pub fn frames(&self) -> Option<&FrameSet> {
        self.frames.as_ref()
    }

    pub fn to_value(&self) -> Value {
        json!({
            "data": self.traces,
            "layout": self.layout,
            "config": { "displayModeBar": self.show_display_modebar },
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value())?)
    }

    /// Standalone page loading plotly.js from the CDN.
    pub fn to_html(&self) -> Result<String> {
        let data = serde_json::to_string(&self.traces)?;
        let layout = serde_json::to_string(&self.layout)?;
        let config = json!({ "displayModeBar": self.show_display_modebar }).to_string();
        let title = self
            .layout
            .get("title")
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .map(strip_markup)
            .unwrap_or_default();
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="https://cdn.plot.ly/plotly-latest.min.js"></script>
</head>
<body>
<div id="bctools-plot"></div>
<script>
    Plotly.newPlot('bctools-plot', {data}, {layout}, {config});
</script>
</body>
</html>
"#
        ))
    }

    pub fn write_html(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.to_html()?)?;
        info!(path = %path.as_ref().display(), "wrote figure");
        Ok(())
    }
}

/// Text of the first line of a title, without tags.
fn strip_markup(text: &str) -> String {
    let first_line = text.split("<br>").next().unwrap_or_default();
    let mut out = String::with_capacity(first_line.len());
    let mut in_tag = false;
    for c in first_line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Paper-coordinate placement of a table or subplot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Domain {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableSection {
    pub values: Vec<Value>,
}

/// `go.Table` trace. Cell values are column-major.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub header: TableSection,
    pub cells: TableSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
}

impl TableTrace {
    pub fn new(header: Vec<String>, columns: Vec<Vec<Value>>) -> Self {
        Self {
            kind: "table",
            header: TableSection {
                values: header.into_iter().map(Value::String).collect(),
            },
            cells: TableSection {
                values: columns.into_iter().map(Value::Array).collect(),
            },
            domain: None,
        }
    }

    /// A table with no header and no cells.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }
}

/// `go.Heatmap` trace with per-cell text arrays for templates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatmapTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub z: Vec<Vec<f64>>,
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub text: Vec<Vec<Vec<Value>>>,
    pub texttemplate: String,
    pub hovertemplate: String,
    pub name: String,
    pub colorscale: &'static str,
    pub showscale: bool,
    pub xaxis: &'static str,
    pub yaxis: &'static str,
}

/// `go.Violin` trace of one numeric sample grouped by `x`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViolinTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x: Vec<u8>,
    pub y: Vec<f64>,
    pub line: Value,
    pub meanline: Value,
    pub points: bool,
    pub opacity: f64,
    pub scalemode: &'static str,
    pub showlegend: bool,
}

impl ViolinTrace {
    pub fn new(x: Vec<u8>, y: Vec<f64>, line_color: &str) -> Self {
        Self {
            kind: "violin",
            x,
            y,
            line: json!({ "color": line_color }),
            meanline: json!({ "visible": true }),
            points: false,
            opacity: 0.3,
            scalemode: "count",
            showlegend: false,
        }
    }
}
