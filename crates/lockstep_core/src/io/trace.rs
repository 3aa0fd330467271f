use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::entity::{EntityId, FactionId};
use crate::world::RegionId;

/// One observable outcome of a replay, serialized as an NDJSON line.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TraceLine {
    pub seq: u64,
    pub op: &'static str,
    pub value: Option<i64>,
    pub region: Option<RegionId>,
    pub entity: Option<EntityId>,
    pub faction: Option<FactionId>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub suppressed: bool,
    pub note: Option<String>,
}

impl TraceLine {
    pub fn new(seq: u64, op: &'static str) -> Self {
        Self {
            seq,
            op,
            value: None,
            region: None,
            entity: None,
            faction: None,
            suppressed: false,
            note: None,
        }
    }

    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Appends trace lines with a running sequence number.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    lines: Vec<TraceLine>,
}

impl Recorder {
    pub fn record(&mut self, op: &'static str) -> &mut TraceLine {
        let seq = self.lines.len() as u64;
        self.lines.push(TraceLine::new(seq, op));
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    pub fn into_lines(self) -> Vec<TraceLine> {
        self.lines
    }
}

/// Render a full trace as NDJSON.
pub fn to_ndjson(lines: &[TraceLine]) -> serde_json::Result<String> {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.to_ndjson()?);
    }
    Ok(out)
}
