//! Backend-agnostic figure description.
//!
//! Rendering backends are out of scope; this module reduces the inference
//! table to the line series, credible bands, and markers a renderer needs.
//! Panel names form a closed set validated at the boundary.

use std::str::FromStr;

use crate::error::ImpactError;
use crate::series::{AnalysisData, TimePoint};
use crate::table::{Column, InferenceTable};

/// The three figure panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Observed response vs counterfactual prediction.
    Original,
    /// Pointwise effect (actual − predicted).
    Pointwise,
    /// Cumulative effect over the post period.
    Cumulative,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Original, Panel::Pointwise, Panel::Cumulative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::Original => "original",
            Panel::Pointwise => "pointwise",
            Panel::Cumulative => "cumulative",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ImpactError> {
        Panel::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| ImpactError::UnknownPanel { name: name.into() })
    }
}

impl FromStr for Panel {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Panel::parse(s)
    }
}

/// Which panels to draw and at what size.
#[derive(Debug, Clone)]
pub struct FigureConfig {
    pub panels: Vec<Panel>,
    /// `(width, height)` in renderer units.
    pub size: (f64, f64),
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            panels: Panel::ALL.to_vec(),
            size: (15.0, 12.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// One labeled line.
#[derive(Debug, Clone)]
pub struct SeriesSpec {
    pub label: &'static str,
    pub style: LineStyle,
    pub points: Vec<(TimePoint, f64)>,
}

/// Shaded credible band between two curves.
#[derive(Debug, Clone)]
pub struct BandSpec {
    pub lower: Vec<(TimePoint, f64)>,
    pub upper: Vec<(TimePoint, f64)>,
}

/// One panel: its series, optional band, and reference lines.
#[derive(Debug, Clone)]
pub struct PanelSpec {
    pub panel: Panel,
    pub series: Vec<SeriesSpec>,
    pub band: Option<BandSpec>,
    pub zero_line: bool,
    /// Vertical marker at the last pre-intervention point.
    pub intervention: TimePoint,
}

/// A complete multi-panel figure description.
#[derive(Debug, Clone)]
pub struct FigureSpec {
    pub size: (f64, f64),
    pub panels: Vec<PanelSpec>,
}

/// Build the figure description for the requested panels.
///
/// `post_start` is the position of the first post-period row in the table.
pub fn build_figure(
    table: &InferenceTable,
    data: &AnalysisData,
    post_start: usize,
    config: &FigureConfig,
) -> Result<FigureSpec, ImpactError> {
    if config.panels.is_empty() {
        return Err(ImpactError::NoPanels);
    }
    if post_start == 0 || post_start >= table.len() {
        return Err(ImpactError::MalformedTable);
    }
    let intervention = table.index()[post_start - 1];

    let panels = config
        .panels
        .iter()
        .map(|panel| match panel {
            Panel::Original => PanelSpec {
                panel: *panel,
                series: vec![
                    SeriesSpec {
                        label: "y",
                        style: LineStyle::Solid,
                        points: observed_points(data, table),
                    },
                    SeriesSpec {
                        label: "Predicted",
                        style: LineStyle::Dashed,
                        points: column_points(table, Column::Preds),
                    },
                ],
                band: Some(band(table, Column::PredsLower, Column::PredsUpper)),
                zero_line: false,
                intervention,
            },
            Panel::Pointwise => PanelSpec {
                panel: *panel,
                series: vec![SeriesSpec {
                    label: "Point Effects",
                    style: LineStyle::Dashed,
                    points: column_points(table, Column::PointEffects),
                }],
                band: Some(band(
                    table,
                    Column::PointEffectsLower,
                    Column::PointEffectsUpper,
                )),
                zero_line: true,
                intervention,
            },
            Panel::Cumulative => PanelSpec {
                panel: *panel,
                series: vec![SeriesSpec {
                    label: "Cumulative Effect",
                    style: LineStyle::Dashed,
                    points: column_points(table, Column::PostCumEffects),
                }],
                band: Some(band(
                    table,
                    Column::PostCumEffectsLower,
                    Column::PostCumEffectsUpper,
                )),
                zero_line: true,
                intervention,
            },
        })
        .collect();

    Ok(FigureSpec {
        size: config.size,
        panels,
    })
}

/// Observed response restricted to the table's index.
fn observed_points(data: &AnalysisData, table: &InferenceTable) -> Vec<(TimePoint, f64)> {
    table
        .index()
        .iter()
        .filter_map(|point| {
            data.position_of(point)
                .map(|position| (*point, data.y()[position]))
        })
        .collect()
}

/// Finite values of one column, keyed by time point. NaN cells (pre-period
/// cumulative rows) are dropped.
fn column_points(table: &InferenceTable, column: Column) -> Vec<(TimePoint, f64)> {
    table
        .index()
        .iter()
        .zip(table.column(column))
        .filter(|(_, v)| !v.is_nan())
        .map(|(point, v)| (*point, *v))
        .collect()
}

fn band(table: &InferenceTable, lower: Column, upper: Column) -> BandSpec {
    BandSpec {
        lower: column_points(table, lower),
        upper: column_points(table, upper),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::TableColumns;

    fn table() -> InferenceTable {
        let len = 4;
        let nan2 = |a: f64, b: f64| vec![f64::NAN, f64::NAN, a, b];
        let columns = TableColumns {
            preds: vec![1.0, 1.1, 2.0, 2.1],
            preds_lower: vec![1.0, 1.1, 1.5, 1.6],
            preds_upper: vec![1.0, 1.1, 2.5, 2.6],
            point_effects: vec![0.0, 0.1, 0.5, 0.4],
            point_effects_lower: vec![0.0, 0.1, 0.0, -0.1],
            point_effects_upper: vec![0.0, 0.1, 1.0, 0.9],
            post_cum_y: nan2(2.5, 5.0),
            post_cum_pred: nan2(2.0, 4.1),
            post_cum_pred_lower: nan2(1.5, 3.1),
            post_cum_pred_upper: nan2(2.5, 5.1),
            post_cum_effects: nan2(0.5, 0.9),
            post_cum_effects_lower: nan2(0.0, -0.1),
            post_cum_effects_upper: nan2(1.0, 1.9),
        };
        let index = (0..len).map(TimePoint::Step).collect();
        InferenceTable::new(index, columns).unwrap()
    }

    fn data() -> AnalysisData {
        AnalysisData::from_steps(vec![1.0, 1.2, 2.5, 2.5], vec![]).unwrap()
    }

    #[test]
    fn unknown_panel_is_invalid_input() {
        let err = Panel::parse("test").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let msg = err.to_string();
        assert_eq!(
            msg,
            "\"test\" is not a valid panel. Valid panels are: \
             \"original\", \"pointwise\", \"cumulative\"."
        );
    }

    #[test]
    fn panel_names_round_trip() {
        for panel in Panel::ALL {
            assert_eq!(Panel::parse(panel.as_str()).unwrap(), panel);
        }
    }

    #[test]
    fn default_figure_has_three_panels() {
        let spec = build_figure(&table(), &data(), 2, &FigureConfig::default()).unwrap();
        assert_eq!(spec.panels.len(), 3);
        assert_eq!(spec.size, (15.0, 12.0));
        assert_eq!(spec.panels[0].panel, Panel::Original);
    }

    #[test]
    fn empty_panel_list_rejected() {
        let config = FigureConfig {
            panels: vec![],
            size: (10.0, 10.0),
        };
        let err = build_figure(&table(), &data(), 2, &config).unwrap_err();
        assert!(matches!(err, ImpactError::NoPanels));
    }

    #[test]
    fn intervention_marker_sits_on_last_pre_point() {
        let spec = build_figure(&table(), &data(), 2, &FigureConfig::default()).unwrap();
        assert_eq!(spec.panels[0].intervention, TimePoint::Step(1));
    }

    #[test]
    fn cumulative_panel_drops_pre_period_nans() {
        let config = FigureConfig {
            panels: vec![Panel::Cumulative],
            size: (10.0, 10.0),
        };
        let spec = build_figure(&table(), &data(), 2, &config).unwrap();
        let series = &spec.panels[0].series[0];
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].0, TimePoint::Step(2));
        assert!(spec.panels[0].zero_line);
    }

    #[test]
    fn original_panel_carries_observed_and_predicted() {
        let config = FigureConfig {
            panels: vec![Panel::Original],
            size: (10.0, 10.0),
        };
        let spec = build_figure(&table(), &data(), 2, &config).unwrap();
        let panel = &spec.panels[0];
        assert_eq!(panel.series.len(), 2);
        assert_eq!(panel.series[0].label, "y");
        assert_eq!(panel.series[0].style, LineStyle::Solid);
        assert_eq!(panel.series[1].label, "Predicted");
        assert!(panel.band.is_some());
        assert!(!panel.zero_line);
    }
}
