//! Single-pass CSV profiling.
//!
//! Cells are read as text. A cell is missing when it is empty or one of the
//! usual NA tokens (`NA`, `NaN`, `null`, `#N/A`, ...). Column types widen as
//! rows arrive: bool, int64, float64, then object. An integer column with
//! gaps becomes float64 and an entirely missing column is float64.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;

use crate::error::DatasetError;

pub const DEFAULT_ROW_LIMIT: usize = 1_000_000;
pub const GRAPH_SAMPLE_ROWS: usize = 10_000;
/// Columns that identify an account or card holder.
pub const ACCOUNT_COLUMNS: [&str; 4] = ["nameOrig", "nameDest", "cc_num", "CustomerID"];
/// Edges are only drawn for rows carrying this column.
pub const EDGE_WEIGHT_COLUMN: &str = "amount";
pub const TEMPORAL_COLUMNS: [&str; 2] = ["time", "step"];

const NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];
const TRUE_VALUES: [&str; 3] = ["True", "TRUE", "true"];
const FALSE_VALUES: [&str; 3] = ["False", "FALSE", "false"];

pub fn is_na(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int64,
    Float64,
    Bool,
    Object,
}

impl Dtype {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Object => "object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileOptions {
    pub row_limit: usize,
    pub graph_sample_rows: usize,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
            graph_sample_rows: GRAPH_SAMPLE_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudLabel {
    pub column: String,
    /// Share of profiled rows whose label equals 1, in percent.
    pub rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub source_column: String,
    pub target_column: String,
    pub nodes: usize,
    pub edges: usize,
    pub avg_degree: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
    pub has_account_columns: bool,
    pub has_temporal_column: bool,
    pub fraud_label: Option<FraudLabel>,
    pub null_pct: f64,
    pub dtypes: BTreeMap<Dtype, usize>,
    /// `None` when the file lacks the graph or edge weight columns.
    pub graph: Option<GraphStats>,
}

impl DatasetProfile {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn fraud_rate_pct(&self) -> Option<f64> {
        self.fraud_label.as_ref().map(|label| label.rate_pct)
    }
}

/// Source and target columns a transaction graph would be drawn from.
pub fn graph_columns(columns: &[String]) -> (&'static str, &'static str) {
    let has = |name: &str| columns.iter().any(|column| column == name);
    if !ACCOUNT_COLUMNS.iter().any(|name| has(name)) {
        ("sender", "receiver")
    } else if has("nameOrig") {
        ("nameOrig", "nameDest")
    } else {
        ("cc_num", "cc_num")
    }
}

/// First column whose lowercase name mentions `fraud` or `class`.
pub fn fraud_label_column(columns: &[String]) -> Option<usize> {
    columns.iter().position(|column| {
        let lower = column.to_lowercase();
        lower.contains("fraud") || lower.contains("class")
    })
}

pub fn profile_csv(path: &Path, options: &ProfileOptions) -> Result<DatasetProfile, DatasetError> {
    let csv_error = |source: csv::Error| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(DatasetError::NoColumns {
            path: path.to_path_buf(),
        });
    }

    let fraud_index = fraud_label_column(&columns);
    let mut graph = GraphBuilder::for_columns(&columns);
    let mut trackers = vec![TypeTracker::default(); columns.len()];
    let mut rows = 0usize;
    let mut nulls = 0usize;
    let mut fraud_hits = 0usize;

    let mut record = StringRecord::new();
    while rows < options.row_limit && reader.read_record(&mut record).map_err(csv_error)? {
        rows += 1;

        for (index, tracker) in trackers.iter_mut().enumerate() {
            let cell = record.get(index).unwrap_or("");
            if is_na(cell) {
                nulls += 1;
                tracker.has_null = true;
            } else {
                tracker.observe(cell);
            }
        }

        if fraud_index.is_some_and(|index| equals_one(record.get(index).unwrap_or(""))) {
            fraud_hits += 1;
        }

        if rows <= options.graph_sample_rows {
            if let Some(graph) = graph.as_mut() {
                graph.observe(&record);
            }
        }
    }

    let cells = rows * columns.len();
    let mut dtypes = BTreeMap::new();
    for tracker in &trackers {
        *dtypes.entry(tracker.dtype(rows)).or_insert(0) += 1;
    }

    let profile = DatasetProfile {
        path: path.to_path_buf(),
        rows,
        has_account_columns: ACCOUNT_COLUMNS
            .iter()
            .any(|name| columns.iter().any(|column| column == name)),
        has_temporal_column: TEMPORAL_COLUMNS
            .iter()
            .any(|name| columns.iter().any(|column| column == name)),
        fraud_label: fraud_index.map(|index| FraudLabel {
            column: columns[index].clone(),
            rate_pct: percent(fraud_hits, rows),
        }),
        null_pct: percent(nulls, cells),
        dtypes,
        graph: graph.map(GraphBuilder::finish),
        columns,
    };

    tracing::info!(
        component = "profile",
        event = "csv_profiled",
        path = %path.display(),
        rows = profile.rows,
        columns = profile.column_count(),
        graph = profile.graph.is_some(),
    );
    Ok(profile)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn equals_one(cell: &str) -> bool {
    TRUE_VALUES.contains(&cell) || cell.trim().parse::<f64>().is_ok_and(|value| value == 1.0)
}

#[derive(Debug, Clone, Copy, Default)]
struct TypeTracker {
    has_null: bool,
    has_bool: bool,
    has_int: bool,
    has_float: bool,
    has_text: bool,
}

impl TypeTracker {
    fn observe(&mut self, cell: &str) {
        if self.has_text {
            return;
        }
        if TRUE_VALUES.contains(&cell) || FALSE_VALUES.contains(&cell) {
            self.has_bool = true;
        } else if cell.trim().parse::<i64>().is_ok() {
            self.has_int = true;
        } else if cell.trim().parse::<f64>().is_ok() {
            self.has_float = true;
        } else {
            self.has_text = true;
        }
    }

    fn dtype(&self, rows: usize) -> Dtype {
        if self.has_text {
            Dtype::Object
        } else if self.has_bool {
            if self.has_int || self.has_float || self.has_null {
                Dtype::Object
            } else {
                Dtype::Bool
            }
        } else if self.has_float || (self.has_int && self.has_null) {
            Dtype::Float64
        } else if self.has_int {
            Dtype::Int64
        } else if rows == 0 {
            Dtype::Object
        } else {
            // every cell was missing
            Dtype::Float64
        }
    }
}

/// Directed graph with deduplicated edges.
struct GraphBuilder {
    source_column: &'static str,
    target_column: &'static str,
    weight: usize,
    source: usize,
    target: usize,
    nodes: HashSet<String>,
    edges: HashSet<(String, String)>,
}

impl GraphBuilder {
    fn for_columns(columns: &[String]) -> Option<Self> {
        let (source_column, target_column) = graph_columns(columns);
        let index = |name: &str| columns.iter().position(|column| column == name);
        Some(Self {
            source_column,
            target_column,
            weight: index(EDGE_WEIGHT_COLUMN)?,
            source: index(source_column)?,
            target: index(target_column)?,
            nodes: HashSet::new(),
            edges: HashSet::new(),
        })
    }

    fn observe(&mut self, record: &StringRecord) {
        let cell = |index: usize| record.get(index).filter(|cell| !is_na(cell));
        let (Some(_), Some(source), Some(target)) =
            (cell(self.weight), cell(self.source), cell(self.target))
        else {
            return;
        };
        self.nodes.insert(source.to_string());
        self.nodes.insert(target.to_string());
        self.edges.insert((source.to_string(), target.to_string()));
    }

    fn finish(self) -> GraphStats {
        let nodes = self.nodes.len();
        let edges = self.edges.len();
        // Each edge adds one out-degree and one in-degree, self-loops included.
        let avg_degree = if nodes == 0 {
            0.0
        } else {
            (2 * edges) as f64 / nodes as f64
        };
        GraphStats {
            source_column: self.source_column.to_string(),
            target_column: self.target_column.to_string(),
            nodes,
            edges,
            avg_degree,
        }
    }
}
