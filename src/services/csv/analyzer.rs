use polars::prelude::*;
use rayon::prelude::*;
use serde_json::Value;
use super::utils::{any_value_to_json, mean, quantile, round2};
use crate::error::{AppError, ColumnError};
use crate::models::{ColumnReport, ColumnStats, DatasetAnalysis, Record, Trend};

pub const PREVIEW_ROWS: usize = 20;
const TREND_SLICE_DIVISOR: usize = 5;
const IQR_FENCE: f64 = 1.5;

/// Runs the statistical pass over a parsed upload.
///
/// Numeric columns are analyzed independently; a column whose computation
/// fails is logged and left out of the result.
pub fn analyze_dataframe(df: &DataFrame) -> Result<DatasetAnalysis, AppError> {
    let row_count = df.height();
    if row_count == 0 {
        return Err(AppError::EmptyInput);
    }

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let numeric: Vec<&Series> = df
        .get_columns()
        .iter()
        .filter(|series| series.dtype().is_numeric())
        .collect();

    let results: Vec<(String, Result<ColumnReport, ColumnError>)> = numeric
        .par_iter()
        .map(|series| (series.name().to_string(), analyze_series(series)))
        .collect();

    let reports = results
        .into_iter()
        .filter_map(|(name, result)| match result {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(column = %name, error = %e, "Skipping column");
                None
            }
        })
        .collect();

    Ok(DatasetAnalysis {
        row_count,
        preview: preview_records(df, PREVIEW_ROWS),
        columns,
        reports,
    })
}

fn analyze_series(series: &Series) -> Result<ColumnReport, ColumnError> {
    let cast = series
        .cast(&DataType::Float64)
        .map_err(|e| ColumnError::Cast(e.to_string()))?;
    let values: Vec<Option<f64>> = cast
        .f64()
        .map_err(|e| ColumnError::Cast(e.to_string()))?
        .into_iter()
        .collect();

    analyze_values(series.name(), &values)
}

/// Statistics, trend and outlier count for one column's cells in row order.
/// NaN cells count as missing.
pub fn analyze_values(name: &str, values: &[Option<f64>]) -> Result<ColumnReport, ColumnError> {
    let values: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    let values = values.as_slice();

    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return Err(ColumnError::NoValues);
    }
    if present.iter().any(|v| !v.is_finite()) {
        return Err(ColumnError::NonFinite);
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let stats = column_stats(values, &present)?;
    let trend = detect_trend(values);
    let outliers = count_outliers(&present).ok_or(ColumnError::NoValues)?;

    Ok(ColumnReport {
        name: name.to_string(),
        stats,
        trend,
        outliers,
    })
}

fn column_stats(values: &[Option<f64>], sorted: &[f64]) -> Result<ColumnStats, ColumnError> {
    let mean = mean(values).ok_or(ColumnError::NoValues)?;
    let (min, max) = match (sorted.first(), sorted.last()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => return Err(ColumnError::NoValues),
    };

    Ok(ColumnStats {
        mean: round2(mean),
        min: round2(min),
        max: round2(max),
        missing: values.iter().filter(|v| v.is_none()).count(),
    })
}

/// Compares the mean of the first and last fifth of the rows (at least one
/// row each). A slice with no values compares as neither greater nor smaller.
pub fn detect_trend(values: &[Option<f64>]) -> Trend {
    let slice = (values.len() / TREND_SLICE_DIVISOR).max(1).min(values.len());
    let first = mean(&values[..slice]);
    let last = mean(&values[values.len() - slice..]);

    match (first, last) {
        (Some(first), Some(last)) if last > first => Trend::Increasing,
        (Some(first), Some(last)) if last < first => Trend::Decreasing,
        _ => Trend::Stable,
    }
}

/// Number of values strictly outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`.
pub fn count_outliers(sorted: &[f64]) -> Option<usize> {
    let q1 = quantile(sorted, 0.25)?;
    let q3 = quantile(sorted, 0.75)?;
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    Some(sorted.iter().filter(|v| **v < lower || **v > upper).count())
}

fn preview_records(df: &DataFrame, limit: usize) -> Vec<Record> {
    let rows = df.height().min(limit);
    (0..rows)
        .map(|row| {
            df.get_columns()
                .iter()
                .map(|series| {
                    let value = series
                        .get(row)
                        .map(any_value_to_json)
                        .unwrap_or(Value::Null);
                    (series.name().to_string(), value)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::csv::loader::load_csv;
    use bytes::Bytes;
    use serde_json::json;

    fn analyze(csv: &str) -> DatasetAnalysis {
        let df = load_csv(Bytes::from(csv.to_string())).unwrap();
        analyze_dataframe(&df).unwrap()
    }

    fn report<'a>(analysis: &'a DatasetAnalysis, name: &str) -> &'a ColumnReport {
        analysis
            .reports
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no report for {}", name))
    }

    #[test]
    fn small_two_column_scenario() {
        let analysis = analyze("a,b\n1,10\n2,20\n3,30\n4,5\n5,1\n");

        let a = report(&analysis, "a");
        assert_eq!(a.trend, Trend::Increasing);
        assert_eq!(a.stats, ColumnStats { mean: 3.0, min: 1.0, max: 5.0, missing: 0 });

        let b = report(&analysis, "b");
        assert_eq!(b.stats, ColumnStats { mean: 13.2, min: 1.0, max: 30.0, missing: 0 });
        assert_eq!(b.trend, Trend::Decreasing);
        assert_eq!(analysis.columns, vec!["a", "b"]);
        assert_eq!(analysis.insights()[1], "b: Trend is Decreasing, 0 potential outliers detected. Mean value is 13.2.");
    }

    #[test]
    fn every_numeric_column_has_ordered_stats() {
        let analysis = analyze("x,y,name\n3,1.5,a\n9,-2,b\n1,7.25,c\n4,0,d\n");
        assert_eq!(analysis.reports.len(), 2);
        for r in &analysis.reports {
            assert!(r.stats.min <= r.stats.mean && r.stats.mean <= r.stats.max);
        }
        assert_eq!(analysis.columns, vec!["x", "y", "name"]);
    }

    #[test]
    fn missing_cells_are_counted_and_skipped() {
        let analysis = analyze("a,b\n1,\n2,3\n,4\n");
        let a = report(&analysis, "a");
        assert_eq!(a.stats.missing, 1);
        assert_eq!(a.stats.mean, 1.5);
        let b = report(&analysis, "b");
        assert_eq!(b.stats.missing, 1);
        assert_eq!(b.stats.min, 3.0);
    }

    #[test]
    fn null_markers_count_as_missing() {
        let analysis = analyze("a\n1\nNA\n3\n");
        assert_eq!(
            report(&analysis, "a").stats,
            ColumnStats { mean: 2.0, min: 1.0, max: 3.0, missing: 1 }
        );

        let analysis = analyze("a,b\n1,null\nN/A,4\nNULL,6\n");
        assert_eq!(report(&analysis, "a").stats.missing, 2);
        assert_eq!(report(&analysis, "b").stats.missing, 1);
    }

    #[test]
    fn nan_cells_count_as_missing() {
        let analysis = analyze("a\n1\nNaN\n3\n");
        assert_eq!(
            report(&analysis, "a").stats,
            ColumnStats { mean: 2.0, min: 1.0, max: 3.0, missing: 1 }
        );

        let values = [Some(1.0), Some(f64::NAN), Some(3.0)];
        let direct = analyze_values("a", &values).unwrap();
        assert_eq!(direct.stats.missing, 1);
        assert_eq!(direct.stats.mean, 2.0);
    }

    #[test]
    fn missing_cell_in_trend_head_is_skipped() {
        // Ten rows: head is rows 1-2, tail is rows 9-10.
        let analysis = analyze("v\nNA\n2\n5\n5\n5\n5\n5\n5\n3\nNA\n");
        let v = report(&analysis, "v");
        assert_eq!(v.stats.missing, 2);
        assert_eq!(v.trend, Trend::Increasing);

        // A head made only of missing cells compares as neither side.
        let analysis = analyze("v\nNA\n1\n2\n3\n9\n");
        assert_eq!(report(&analysis, "v").trend, Trend::Stable);
    }

    #[test]
    fn text_only_upload_reports_no_numeric_columns() {
        let analysis = analyze("city,country\nOslo,NO\nLima,PE\n");
        assert!(analysis.reports.is_empty());
        assert_eq!(analysis.insights(), vec!["No numeric columns detected for analysis."]);
    }

    #[test]
    fn preview_is_capped_at_twenty_rows() {
        let mut csv = String::from("id,value\n");
        for i in 0..10_000 {
            csv.push_str(&format!("{},{}\n", i, i * 2));
        }
        let analysis = analyze(&csv);
        assert_eq!(analysis.row_count, 10_000);
        assert_eq!(analysis.preview.len(), PREVIEW_ROWS);
        assert_eq!(analysis.preview[0]["id"], json!(0));
        assert_eq!(analysis.preview[19]["value"], json!(38));
    }

    #[test]
    fn preview_keeps_nulls_and_text() {
        let analysis = analyze("a,label\n1,x\n,y\n");
        assert_eq!(analysis.preview[0]["label"], json!("x"));
        assert_eq!(analysis.preview[1]["a"], Value::Null);
    }

    #[test]
    fn trend_compares_first_and_last_fifth() {
        let rising: Vec<Option<f64>> = (1..=10).map(|v| Some(v as f64)).collect();
        assert_eq!(detect_trend(&rising), Trend::Increasing);

        let falling: Vec<Option<f64>> = rising.iter().rev().copied().collect();
        assert_eq!(detect_trend(&falling), Trend::Decreasing);

        // Only the two-row head and tail matter for ten rows.
        let flat_ends = [Some(5.0), Some(5.0), Some(100.0), Some(-3.0), Some(0.0), Some(9.0), Some(1.0), Some(2.0), Some(5.0), Some(5.0)];
        assert_eq!(detect_trend(&flat_ends), Trend::Stable);
    }

    #[test]
    fn single_row_trend_is_stable() {
        assert_eq!(detect_trend(&[Some(4.0)]), Trend::Stable);
    }

    #[test]
    fn empty_slice_trend_is_stable() {
        assert_eq!(detect_trend(&[None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)]), Trend::Stable);
    }

    #[test]
    fn no_values_outside_fences_means_no_outliers() {
        assert_eq!(count_outliers(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(0));
        assert_eq!(count_outliers(&[7.0, 7.0, 7.0]), Some(0));
    }

    #[test]
    fn far_values_are_outliers() {
        assert_eq!(count_outliers(&[1.0, 2.0, 3.0, 4.0, 100.0]), Some(1));
        assert_eq!(count_outliers(&[-100.0, 1.0, 2.0, 3.0, 4.0, 100.0]), Some(2));
    }

    #[test]
    fn all_missing_column_is_a_column_error() {
        assert_eq!(analyze_values("a", &[None, None]), Err(ColumnError::NoValues));
    }

    #[test]
    fn infinite_values_are_a_column_error() {
        assert_eq!(analyze_values("a", &[Some(1.0), Some(f64::INFINITY)]), Err(ColumnError::NonFinite));
    }
}
