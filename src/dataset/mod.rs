//! Dataset loading
//!
//! A dataset is a directory holding the sensor coordinates and the recorded
//! sequences of both feet:
//!
//! | Content           | Accepted file names                          |
//! |-------------------|----------------------------------------------|
//! | Left coordinates  | `leftPoints.json`, `L.json`, `left.json`     |
//! | Right coordinates | `rightPoints.json`, `R.json`, `right.json`   |
//! | Left sequence     | `L.csv`                                      |
//! | Right sequence    | `R.csv`                                      |
//!
//! Coordinate files may be a list of `[x, y]` pairs, a list of `{"x", "y"}`
//! objects, or an object wrapping either under `coordinates` or `points`.
//!
//! Sequence files are headerless CSV with one frame per row and one reading
//! per column. The delimiter (comma, semicolon or tab) is detected from the
//! first data line, `#` starts a comment line, and cells that don't parse as
//! numbers read as 0. Rows are padded with zeros or truncated to the side's
//! sensor count, so the loaded frames always match the layout.

use crate::error::{GaitVisError, Result, ResultExt};
use crate::types::{SensorFrame, SensorLayout, SensorPoint, Side};
use serde::Deserialize;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const LEFT_POINT_FILES: [&str; 3] = ["leftPoints.json", "L.json", "left.json"];
const RIGHT_POINT_FILES: [&str; 3] = ["rightPoints.json", "R.json", "right.json"];
const LEFT_SEQUENCE_FILE: &str = "L.csv";
const RIGHT_SEQUENCE_FILE: &str = "R.csv";

/// Files found in a dataset directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFiles {
    pub left_points: Option<PathBuf>,
    pub right_points: Option<PathBuf>,
    pub left_sequence: Option<PathBuf>,
    pub right_sequence: Option<PathBuf>,
}

impl DatasetFiles {
    /// Look for the known file names in `dir`
    ///
    /// # Errors
    ///
    /// [`GaitVisError::Dataset`] if `dir` is not a directory or holds neither
    /// sequence file.
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(GaitVisError::Dataset(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let first_existing = |names: &[&str]| {
            names
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
        };
        let files = Self {
            left_points: first_existing(&LEFT_POINT_FILES),
            right_points: first_existing(&RIGHT_POINT_FILES),
            left_sequence: first_existing(&[LEFT_SEQUENCE_FILE]),
            right_sequence: first_existing(&[RIGHT_SEQUENCE_FILE]),
        };

        if files.left_sequence.is_none() && files.right_sequence.is_none() {
            return Err(GaitVisError::Dataset(format!(
                "no sequence files (L.csv / R.csv) in {}",
                dir.display()
            )));
        }
        Ok(files)
    }

    pub fn points(&self, side: Side) -> Option<&Path> {
        match side {
            Side::Left => self.left_points.as_deref(),
            Side::Right => self.right_points.as_deref(),
        }
    }

    pub fn sequence(&self, side: Side) -> Option<&Path> {
        match side {
            Side::Left => self.left_sequence.as_deref(),
            Side::Right => self.right_sequence.as_deref(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointEntry {
    Pair(Vec<f32>),
    Object {
        #[serde(default)]
        x: f32,
        #[serde(default)]
        y: f32,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointsDocument {
    List(Vec<PointEntry>),
    Wrapped {
        #[serde(alias = "points")]
        coordinates: Vec<PointEntry>,
    },
}

/// Parse sensor coordinates from JSON
pub fn parse_points<R: Read>(reader: R) -> Result<Vec<SensorPoint>> {
    let document: PointsDocument = serde_json::from_reader(reader)?;
    let entries = match document {
        PointsDocument::List(entries) => entries,
        PointsDocument::Wrapped { coordinates } => coordinates,
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let point = match entry {
                PointEntry::Pair(values) if values.len() >= 2 => SensorPoint::new(values[0], values[1]),
                PointEntry::Pair(values) => {
                    return Err(GaitVisError::Parse(format!(
                        "coordinate {} has {} values, expected 2",
                        i,
                        values.len()
                    )))
                }
                PointEntry::Object { x, y } => SensorPoint::new(x, y),
            };
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(GaitVisError::Parse(format!("coordinate {} is out of range", i)));
            }
            Ok(point)
        })
        .collect()
}

/// Load sensor coordinates from a JSON file
pub fn load_points(path: &Path) -> Result<Vec<SensorPoint>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    parse_points(BufReader::new(file)).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pick the delimiter that occurs most often in the first data line
fn detect_delimiter(text: &str) -> u8 {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or("");
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|d| line.bytes().filter(|b| b == d).count())
        .filter(|d| line.as_bytes().contains(d))
        .unwrap_or(b',')
}

fn parse_cell(cell: &str) -> f32 {
    match cell.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parse a headerless sequence; each row becomes exactly `columns` readings
pub fn parse_sequence(text: &str, columns: usize) -> Result<Vec<Vec<f32>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<f32> = record.iter().take(columns).map(parse_cell).collect();
        row.resize(columns, 0.0);
        rows.push(row);
    }
    Ok(rows)
}

/// Load a sequence file, shaping every row to `columns` readings
pub fn load_sequence(path: &Path, columns: usize) -> Result<Vec<SensorFrame>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let rows = parse_sequence(&text, columns)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(SensorFrame::sequence(rows))
}

/// A fully loaded dataset
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub root: PathBuf,
    pub layout: SensorLayout,
    pub left: Vec<SensorFrame>,
    pub right: Vec<SensorFrame>,
}

impl Dataset {
    /// Discover and load every file of the dataset in `dir`
    ///
    /// A side without a coordinate file gets no sensors and no frames.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let files = DatasetFiles::discover(dir)?;
        let mut dataset = Dataset {
            root: dir.to_path_buf(),
            ..Default::default()
        };

        for side in Side::BOTH {
            let coords = match files.points(side) {
                Some(path) => load_points(path)?,
                None => Vec::new(),
            };
            let frames = match (files.sequence(side), coords.is_empty()) {
                (Some(path), false) => load_sequence(path, coords.len())?,
                (Some(path), true) => {
                    tracing::warn!(%side, path = %path.display(), "Sequence without sensor coordinates, side ignored");
                    Vec::new()
                }
                (None, _) => Vec::new(),
            };
            match side {
                Side::Left => {
                    dataset.layout.left = coords;
                    dataset.left = frames;
                }
                Side::Right => {
                    dataset.layout.right = coords;
                    dataset.right = frames;
                }
            }
        }

        if dataset.left.is_empty() && dataset.right.is_empty() {
            return Err(GaitVisError::Dataset(format!(
                "no usable frames in {}",
                dir.display()
            )));
        }

        tracing::info!(
            root = %dir.display(),
            left_sensors = dataset.layout.left.len(),
            right_sensors = dataset.layout.right.len(),
            left_frames = dataset.left.len(),
            right_frames = dataset.right.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Split into the arguments of `PipelineController::set_data`
    pub fn into_parts(self) -> (Vec<SensorFrame>, Vec<SensorFrame>, SensorLayout) {
        (self.left, self.right, self.layout)
    }
}
