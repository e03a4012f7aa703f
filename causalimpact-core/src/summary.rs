//! Numeric summary table and narrative report rendering.
//!
//! Two output modes: a compact average/cumulative table and a full
//! natural-language report. Rounding applies to display only; the stored
//! summary values are untouched.

use std::str::FromStr;

use crate::error::ImpactError;
use crate::lock::Locked;
use crate::table::SummaryTable;

/// The two recognized output modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Report,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Summary => "summary",
            OutputFormat::Report => "report",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ImpactError> {
        match name {
            "summary" => Ok(OutputFormat::Summary),
            "report" => Ok(OutputFormat::Report),
            other => Err(ImpactError::UnknownOutputFormat { name: other.into() }),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::parse(s)
    }
}

/// Renders summaries once `summary_data` and `p_value` have been set.
#[derive(Debug, Clone)]
pub struct Summarizer {
    alpha: f64,
    summary_data: Locked<SummaryTable>,
    p_value: Locked<f64>,
}

impl Summarizer {
    pub fn new(alpha: f64) -> Result<Self, ImpactError> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ImpactError::AlphaOutOfRange { alpha });
        }
        Ok(Self {
            alpha,
            summary_data: Locked::new("summary_data"),
            p_value: Locked::new("p_value"),
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_summary_data(&mut self, table: SummaryTable) -> Result<(), ImpactError> {
        self.summary_data.set(table)
    }

    pub fn set_p_value(&mut self, value: f64) -> Result<(), ImpactError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ImpactError::ProbabilityOutOfRange { value });
        }
        self.p_value.set(value)
    }

    pub fn summary_data(&self) -> Option<&SummaryTable> {
        self.summary_data.get()
    }

    pub fn p_value(&self) -> Option<f64> {
        self.p_value.get().copied()
    }

    /// Render the requested output, rounding displayed numbers to `digits`
    /// decimal places.
    pub fn summary(&self, format: OutputFormat, digits: usize) -> Result<String, ImpactError> {
        let data = self.summary_data.get().ok_or(ImpactError::SummaryNotReady)?;
        let p = self
            .p_value
            .get()
            .copied()
            .ok_or(ImpactError::SummaryNotReady)?;
        match format {
            OutputFormat::Summary => Ok(render_table(data, p, self.alpha, digits)),
            OutputFormat::Report => Ok(render_report(data, p, self.alpha, digits)),
        }
    }
}

fn fmt_num(value: f64, digits: usize) -> String {
    format!("{value:.digits$}")
}

fn fmt_pct(value: f64, digits: usize) -> String {
    format!("{:.digits$}%", value * 100.0)
}

fn ci_label(alpha: f64) -> String {
    format!("{:.0}%", (1.0 - alpha) * 100.0)
}

fn render_table(data: &SummaryTable, p: f64, alpha: f64, digits: usize) -> String {
    let ci = ci_label(alpha);
    let avg = &data.average;
    let cum = &data.cumulative;

    let mut out = String::from("Posterior Inference {Causal Impact}\n");
    let mut line = |label: String, average: String, cumulative: String| {
        out.push_str(&format!("{label:<26}{average:<20}{cumulative}\n"));
    };

    line("".into(), "Average".into(), "Cumulative".into());
    line("Actual".into(), fmt_num(avg.actual, digits), fmt_num(cum.actual, digits));
    line(
        "Predicted".into(),
        fmt_num(avg.predicted, digits),
        fmt_num(cum.predicted, digits),
    );
    line(
        format!("{ci} CI"),
        format!(
            "[{}, {}]",
            fmt_num(avg.predicted_lower, digits),
            fmt_num(avg.predicted_upper, digits)
        ),
        format!(
            "[{}, {}]",
            fmt_num(cum.predicted_lower, digits),
            fmt_num(cum.predicted_upper, digits)
        ),
    );
    line("".into(), "".into(), "".into());
    line(
        "Absolute effect".into(),
        fmt_num(avg.abs_effect, digits),
        fmt_num(cum.abs_effect, digits),
    );
    line(
        format!("{ci} CI"),
        format!(
            "[{}, {}]",
            fmt_num(avg.abs_effect_lower, digits),
            fmt_num(avg.abs_effect_upper, digits)
        ),
        format!(
            "[{}, {}]",
            fmt_num(cum.abs_effect_lower, digits),
            fmt_num(cum.abs_effect_upper, digits)
        ),
    );
    line("".into(), "".into(), "".into());
    line(
        "Relative effect".into(),
        fmt_pct(avg.rel_effect, digits),
        fmt_pct(cum.rel_effect, digits),
    );
    line(
        format!("{ci} CI"),
        format!(
            "[{}, {}]",
            fmt_pct(avg.rel_effect_lower, digits),
            fmt_pct(avg.rel_effect_upper, digits)
        ),
        format!(
            "[{}, {}]",
            fmt_pct(cum.rel_effect_lower, digits),
            fmt_pct(cum.rel_effect_upper, digits)
        ),
    );

    out.push_str(&format!(
        "\nPosterior tail-area probability p: {}\n",
        fmt_num(p, digits.max(2))
    ));
    out.push_str(&format!(
        "Posterior probability of a causal effect: {}\n",
        fmt_pct(1.0 - p, digits.max(2))
    ));
    out
}

fn render_report(data: &SummaryTable, p: f64, alpha: f64, digits: usize) -> String {
    let ci = ci_label(alpha);
    let avg = &data.average;
    let cum = &data.cumulative;
    let positive = avg.rel_effect >= 0.0;
    let significant = p < alpha;

    let mut out = String::from("Analysis report {Causal Impact}\n\n");

    out.push_str(&format!(
        "During the post-intervention period, the response variable had an \
         average value of approx. {}. ",
        fmt_num(avg.actual, digits)
    ));
    out.push_str(&format!(
        "{} the intervention, we would have expected an average response of \
         {}. The {ci} interval of this counterfactual prediction is \
         [{}, {}].\n\n",
        if significant {
            "By contrast, in the absence of"
        } else {
            "In the absence of"
        },
        fmt_num(avg.predicted, digits),
        fmt_num(avg.predicted_lower, digits),
        fmt_num(avg.predicted_upper, digits)
    ));

    out.push_str(&format!(
        "Subtracting this prediction from the observed response yields an \
         estimate of the causal effect the intervention had on the response \
         variable. This effect is {} with a {ci} interval of [{}, {}].\n\n",
        fmt_num(avg.abs_effect, digits),
        fmt_num(avg.abs_effect_lower, digits),
        fmt_num(avg.abs_effect_upper, digits)
    ));

    out.push_str(&format!(
        "Summing up the individual data points during the post-intervention \
         period, the response variable had an overall value of {}. Had the \
         intervention not taken place, we would have expected a sum of {} \
         with a {ci} interval of [{}, {}].\n\n",
        fmt_num(cum.actual, digits),
        fmt_num(cum.predicted, digits),
        fmt_num(cum.predicted_lower, digits),
        fmt_num(cum.predicted_upper, digits)
    ));

    out.push_str(&format!(
        "In relative terms, the response variable showed {} of {}. The {ci} \
         interval of this percentage is [{}, {}].\n\n",
        if positive { "an increase" } else { "a decrease" },
        fmt_pct(avg.rel_effect, digits),
        fmt_pct(avg.rel_effect_lower, digits),
        fmt_pct(avg.rel_effect_upper, digits)
    ));

    let verdict = match (positive, significant) {
        (true, true) => format!(
            "The probability of obtaining this effect by chance is very small \
             (one-sided tail-area probability p = {}). This means the positive \
             effect observed during the intervention period is statistically \
             significant and unlikely to be due to random fluctuations.",
            fmt_num(p, digits.max(2))
        ),
        (true, false) => format!(
            "The apparent increase could be the result of random fluctuations \
             that are unrelated to the intervention (one-sided tail-area \
             probability p = {}). The effect cannot be considered \
             statistically significant and should be interpreted with \
             caution.",
            fmt_num(p, digits.max(2))
        ),
        (false, true) => format!(
            "The probability of obtaining this effect by chance is very small \
             (one-sided tail-area probability p = {}). This means the negative \
             effect observed during the intervention period is statistically \
             significant.",
            fmt_num(p, digits.max(2))
        ),
        (false, false) => format!(
            "The apparent decrease could be the result of random fluctuations \
             that are unrelated to the intervention (one-sided tail-area \
             probability p = {}). The effect cannot be considered \
             statistically significant and should be interpreted with \
             caution.",
            fmt_num(p, digits.max(2))
        ),
    };
    out.push_str(&verdict);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::EffectStats;

    fn sample_table() -> SummaryTable {
        let average = EffectStats {
            actual: 12.0,
            predicted: 10.0,
            predicted_lower: 9.0,
            predicted_upper: 11.0,
            abs_effect: 2.0,
            abs_effect_lower: 1.0,
            abs_effect_upper: 3.0,
            rel_effect: 0.2,
            rel_effect_lower: 0.1,
            rel_effect_upper: 0.3,
        };
        let cumulative = EffectStats {
            actual: 120.0,
            predicted: 100.0,
            predicted_lower: 90.0,
            predicted_upper: 110.0,
            abs_effect: 20.0,
            abs_effect_lower: 10.0,
            abs_effect_upper: 30.0,
            rel_effect: 0.2,
            rel_effect_lower: 0.1,
            rel_effect_upper: 0.3,
        };
        SummaryTable {
            average,
            cumulative,
        }
    }

    fn negative_table() -> SummaryTable {
        let mut table = sample_table();
        table.average.rel_effect = -0.2;
        table.average.abs_effect = -2.0;
        table
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!(OutputFormat::parse("summary").unwrap(), OutputFormat::Summary);
        assert_eq!("report".parse::<OutputFormat>().unwrap(), OutputFormat::Report);
        let err = OutputFormat::parse("test").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("\"summary\""));
        assert!(err.to_string().contains("\"report\""));
    }

    #[test]
    fn summary_before_data_is_a_state_error() {
        let summarizer = Summarizer::new(0.05).unwrap();
        let err = summarizer.summary(OutputFormat::Summary, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn summary_requires_both_fields() {
        let mut summarizer = Summarizer::new(0.05).unwrap();
        summarizer.set_summary_data(sample_table()).unwrap();
        let err = summarizer.summary(OutputFormat::Report, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn inputs_are_write_once() {
        let mut summarizer = Summarizer::new(0.05).unwrap();
        summarizer.set_p_value(0.4).unwrap();
        assert_eq!(
            summarizer.set_p_value(0.4).unwrap_err().kind(),
            ErrorKind::AttributeLocked
        );
        summarizer.set_summary_data(sample_table()).unwrap();
        assert_eq!(
            summarizer.set_summary_data(sample_table()).unwrap_err().kind(),
            ErrorKind::AttributeLocked
        );
    }

    #[test]
    fn table_mode_renders_rows_and_ci() {
        let mut summarizer = Summarizer::new(0.1).unwrap();
        summarizer.set_summary_data(sample_table()).unwrap();
        summarizer.set_p_value(0.459329).unwrap();
        let text = summarizer.summary(OutputFormat::Summary, 1).unwrap();
        assert!(text.contains("Posterior Inference {Causal Impact}"));
        assert!(text.contains("Actual"));
        assert!(text.contains("12.0"));
        assert!(text.contains("120.0"));
        assert!(text.contains("90% CI"));
        assert!(text.contains("20.0%"));
        assert!(text.contains("Posterior tail-area probability p: 0.46"));
    }

    #[test]
    fn digits_change_display_only() {
        let mut summarizer = Summarizer::new(0.05).unwrap();
        summarizer.set_summary_data(sample_table()).unwrap();
        summarizer.set_p_value(0.5).unwrap();
        let short = summarizer.summary(OutputFormat::Summary, 0).unwrap();
        let long = summarizer.summary(OutputFormat::Summary, 4).unwrap();
        assert!(short.contains("\nActual"));
        assert!(long.contains("12.0000"));
        // underlying data untouched
        assert_eq!(summarizer.summary_data().unwrap().average.actual, 12.0);
    }

    #[test]
    fn report_positive_not_significant() {
        let mut summarizer = Summarizer::new(0.1).unwrap();
        summarizer.set_summary_data(sample_table()).unwrap();
        summarizer.set_p_value(0.5).unwrap();
        let text = summarizer.summary(OutputFormat::Report, 1).unwrap();
        assert!(text.contains("an increase"));
        assert!(text.contains("random fluctuations"));
        assert!(!text.contains("statistically significant and unlikely"));
    }

    #[test]
    fn report_positive_significant() {
        let mut summarizer = Summarizer::new(0.1).unwrap();
        summarizer.set_summary_data(sample_table()).unwrap();
        summarizer.set_p_value(0.05).unwrap();
        let text = summarizer.summary(OutputFormat::Report, 1).unwrap();
        assert!(text.contains("an increase"));
        assert!(text.contains("positive effect"));
        assert!(text.contains("statistically significant"));
    }

    #[test]
    fn report_negative_branches() {
        let mut significant = Summarizer::new(0.1).unwrap();
        significant.set_summary_data(negative_table()).unwrap();
        significant.set_p_value(0.05).unwrap();
        let text = significant.summary(OutputFormat::Report, 1).unwrap();
        assert!(text.contains("a decrease"));
        assert!(text.contains("negative effect"));

        let mut inconclusive = Summarizer::new(0.1).unwrap();
        inconclusive.set_summary_data(negative_table()).unwrap();
        inconclusive.set_p_value(0.5).unwrap();
        let text = inconclusive.summary(OutputFormat::Report, 1).unwrap();
        assert!(text.contains("a decrease"));
        assert!(text.contains("random fluctuations"));
    }

    #[test]
    fn crossing_alpha_switches_template() {
        let render = |p: f64| {
            let mut summarizer = Summarizer::new(0.1).unwrap();
            summarizer.set_summary_data(sample_table()).unwrap();
            summarizer.set_p_value(p).unwrap();
            summarizer.summary(OutputFormat::Report, 2).unwrap()
        };
        let below = render(0.099);
        let above = render(0.101);
        assert_ne!(below, above);
        assert!(below.contains("very small"));
        assert!(!above.contains("very small"));
    }

    #[test]
    fn invalid_alpha_rejected() {
        assert!(Summarizer::new(0.0).is_err());
        assert!(Summarizer::new(1.0).is_err());
    }
}
