//! Fixed display data for the dashboard's model-evaluation panels.
//!
//! None of this is computed. The values are illustrative constants that the
//! rendering layer plots as-is; they live here so every consumer sees the
//! same shape (arrays of records with named numeric fields).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskSegment {
    pub name: &'static str,
    /// Share of the customer base, in percent.
    pub value: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub name: &'static str,
    pub importance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationScore {
    pub metric: &'static str,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub tp: u32,
    pub tn: u32,
    pub fp: u32,
    #[serde(rename = "fn")]
    pub fn_: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadlineMetric {
    pub label: &'static str,
    pub value: &'static str,
    /// Period-over-period change, in percent.
    pub trend: f64,
    pub icon: &'static str,
}

pub const ROC_CURVE: [RocPoint; 7] = [
    RocPoint { fpr: 0.0, tpr: 0.0 },
    RocPoint { fpr: 0.1, tpr: 0.4 },
    RocPoint { fpr: 0.2, tpr: 0.65 },
    RocPoint { fpr: 0.3, tpr: 0.8 },
    RocPoint { fpr: 0.5, tpr: 0.92 },
    RocPoint { fpr: 0.8, tpr: 0.98 },
    RocPoint { fpr: 1.0, tpr: 1.0 },
];

pub const RISK_SEGMENTS: [RiskSegment; 4] = [
    RiskSegment { name: "Low Risk", value: 65, color: "#10b981" },
    RiskSegment { name: "Medium Risk", value: 20, color: "#f59e0b" },
    RiskSegment { name: "High Risk", value: 10, color: "#f97316" },
    RiskSegment { name: "Critical", value: 5, color: "#ef4444" },
];

/// Sorted by descending importance.
pub const FEATURE_IMPORTANCE: [FeatureImportance; 6] = [
    FeatureImportance { name: "Tenure", importance: 0.35 },
    FeatureImportance { name: "Contract Type", importance: 0.28 },
    FeatureImportance { name: "Monthly Charges", importance: 0.15 },
    FeatureImportance { name: "Tech Support", importance: 0.10 },
    FeatureImportance { name: "Internet Service", importance: 0.08 },
    FeatureImportance { name: "Payment Method", importance: 0.04 },
];

pub const EVALUATION_SCORES: [EvaluationScore; 4] = [
    EvaluationScore { metric: "Precision", score: 0.82 },
    EvaluationScore { metric: "Recall", score: 0.79 },
    EvaluationScore { metric: "F1-Score", score: 0.84 },
    EvaluationScore { metric: "ROC-AUC", score: 0.92 },
];

pub const CONFUSION_MATRIX: ConfusionMatrix = ConfusionMatrix {
    tp: 895,
    tn: 4120,
    fp: 182,
    fn_: 143,
};

pub const HEADLINE_METRICS: [HeadlineMetric; 4] = [
    HeadlineMetric { label: "F1-Score (XGBoost)", value: "0.84", trend: 2.1, icon: "fa-microchip" },
    HeadlineMetric { label: "ROC-AUC", value: "0.92", trend: 0.5, icon: "fa-chart-area" },
    HeadlineMetric { label: "Avg. Retention ROI", value: "₹12,400", trend: 15.2, icon: "fa-indian-rupee-sign" },
    HeadlineMetric { label: "Identified High-Risk", value: "1,240", trend: -4.3, icon: "fa-user-secret" },
];

/// Everything the evaluation panels plot, in one serializable bundle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConstants {
    pub headline_metrics: &'static [HeadlineMetric],
    pub roc_curve: &'static [RocPoint],
    pub risk_segments: &'static [RiskSegment],
    pub feature_importance: &'static [FeatureImportance],
    pub evaluation_scores: &'static [EvaluationScore],
    pub confusion_matrix: ConfusionMatrix,
}

pub fn dashboard_constants() -> DashboardConstants {
    DashboardConstants {
        headline_metrics: &HEADLINE_METRICS,
        roc_curve: &ROC_CURVE,
        risk_segments: &RISK_SEGMENTS,
        feature_importance: &FEATURE_IMPORTANCE,
        evaluation_scores: &EVALUATION_SCORES,
        confusion_matrix: CONFUSION_MATRIX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_segments_cover_the_whole_base() {
        let total: u32 = RISK_SEGMENTS.iter().map(|s| s.value).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn feature_importance_is_sorted_descending() {
        assert!(
            FEATURE_IMPORTANCE
                .windows(2)
                .all(|w| w[0].importance >= w[1].importance)
        );
    }

    #[test]
    fn roc_curve_is_anchored_and_monotone() {
        assert_eq!(ROC_CURVE[0], RocPoint { fpr: 0.0, tpr: 0.0 });
        assert_eq!(ROC_CURVE[ROC_CURVE.len() - 1], RocPoint { fpr: 1.0, tpr: 1.0 });
        assert!(ROC_CURVE.windows(2).all(|w| w[0].fpr < w[1].fpr && w[0].tpr <= w[1].tpr));
    }

    #[test]
    fn bundle_serializes_with_named_fields() {
        let json = serde_json::to_value(dashboard_constants()).unwrap();
        assert_eq!(json["rocCurve"][1]["tpr"], 0.4);
        assert_eq!(json["confusionMatrix"]["fn"], 143);
        assert_eq!(json["riskSegments"].as_array().map(Vec::len), Some(4));
        assert_eq!(json["evaluationScores"][3]["metric"], "ROC-AUC");
    }
}
