use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// One preview row, keyed by column name.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "Increasing"),
            Trend::Decreasing => write!(f, "Decreasing"),
            Trend::Stable => write!(f, "Stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub missing: usize,
}

/// Everything computed for a single numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReport {
    pub name: String,
    pub stats: ColumnStats,
    pub trend: Trend,
    pub outliers: usize,
}

impl ColumnReport {
    pub fn insight(&self) -> String {
        format!(
            "{}: Trend is {}, {} potential outliers detected. Mean value is {}.",
            self.name, self.trend, self.outliers, display_float(self.stats.mean)
        )
    }
}

// Whole numbers keep a trailing ".0" so the sentence reads the same as the JSON value.
fn display_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Column-keyed values that serialize as a JSON object in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap<T>(pub Vec<(String, T)>);

impl<T> FromIterator<(String, T)> for ColumnMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        ColumnMap(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for ColumnMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Output of the statistical pass over one uploaded dataset.
#[derive(Debug, Clone)]
pub struct DatasetAnalysis {
    pub row_count: usize,
    pub preview: Vec<Record>,
    pub columns: Vec<String>,
    pub reports: Vec<ColumnReport>,
}

impl DatasetAnalysis {
    pub fn stats(&self) -> ColumnMap<ColumnStats> {
        self.reports.iter().map(|r| (r.name.clone(), r.stats.clone())).collect()
    }

    pub fn trends(&self) -> ColumnMap<Trend> {
        self.reports.iter().map(|r| (r.name.clone(), r.trend)).collect()
    }

    pub fn outliers(&self) -> ColumnMap<usize> {
        self.reports.iter().map(|r| (r.name.clone(), r.outliers)).collect()
    }

    pub fn insights(&self) -> Vec<String> {
        if self.reports.is_empty() {
            return vec!["No numeric columns detected for analysis.".to_string()];
        }
        self.reports.iter().map(ColumnReport::insight).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub preview: Vec<Record>,
    pub columns: Vec<String>,
    pub stats: ColumnMap<ColumnStats>,
    pub insights: Vec<String>,
    pub llm_summary: Option<String>,
}

impl AnalysisResult {
    pub fn new(analysis: DatasetAnalysis, llm_summary: Option<String>) -> Self {
        let stats = analysis.stats();
        let insights = analysis.insights();
        AnalysisResult {
            preview: analysis.preview,
            columns: analysis.columns,
            stats,
            insights,
            llm_summary,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub context: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub backend: &'static str,
    pub llm: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, mean: f64, trend: Trend, outliers: usize) -> ColumnReport {
        ColumnReport {
            name: name.to_string(),
            stats: ColumnStats { mean, min: 0.0, max: 100.0, missing: 0 },
            trend,
            outliers,
        }
    }

    #[test]
    fn insight_sentence_format() {
        let sentence = report("revenue", 13.2, Trend::Decreasing, 2).insight();
        assert_eq!(
            sentence,
            "revenue: Trend is Decreasing, 2 potential outliers detected. Mean value is 13.2."
        );
    }

    #[test]
    fn no_numeric_columns_yields_single_sentence() {
        let analysis = DatasetAnalysis {
            row_count: 3,
            preview: vec![],
            columns: vec!["name".into()],
            reports: vec![],
        };
        assert_eq!(analysis.insights(), vec!["No numeric columns detected for analysis."]);
    }

    #[test]
    fn whole_means_keep_a_decimal() {
        let sentence = report("a", 3.0, Trend::Increasing, 0).insight();
        assert!(sentence.ends_with("Mean value is 3.0."));
    }

    #[test]
    fn column_map_serializes_in_header_order() {
        let analysis = DatasetAnalysis {
            row_count: 1,
            preview: vec![],
            columns: vec!["z".into(), "a".into()],
            reports: vec![report("z", 1.0, Trend::Stable, 0), report("a", 2.0, Trend::Increasing, 1)],
        };
        let json = serde_json::to_string(&analysis.outliers()).unwrap();
        assert_eq!(json, r#"{"z":0,"a":1}"#);
        let json = serde_json::to_string(&analysis.trends()).unwrap();
        assert_eq!(json, r#"{"z":"Stable","a":"Increasing"}"#);
    }
}
