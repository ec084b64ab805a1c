use serde::Serialize;

use crate::database::models::evaluation::Evaluation;

/// Grades are reported on a 0-10 scale regardless of each evaluation's max.
pub const GRADE_SCALE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub evaluations: usize,
    pub graded: usize,
    pub completed: usize,
    pub total_weight: f64,
    pub weighted_average: Option<f64>,
}

pub fn summarize(evaluations: &[Evaluation]) -> GradeSummary {
    let mut weighted_sum = 0.0;
    let mut graded_weight = 0.0;
    let mut graded = 0;

    for evaluation in evaluations {
        if let Some(grade) = evaluation.grade {
            if evaluation.max_grade > 0.0 && evaluation.weight > 0.0 {
                weighted_sum += grade / evaluation.max_grade * GRADE_SCALE * evaluation.weight;
                graded_weight += evaluation.weight;
                graded += 1;
            }
        }
    }

    GradeSummary {
        evaluations: evaluations.len(),
        graded,
        completed: evaluations.iter().filter(|e| e.completed).count(),
        total_weight: evaluations.iter().map(|e| e.weight).sum(),
        weighted_average: (graded_weight > 0.0).then(|| round2(weighted_sum / graded_weight)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn evaluation(grade: Option<f64>, max_grade: f64, weight: f64, completed: bool) -> Evaluation {
        Evaluation {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            discipline_id: Uuid::nil(),
            title: "Exam".to_string(),
            kind: "exam".to_string(),
            grade,
            max_grade,
            weight,
            due_date: None,
            completed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn weighted_average_normalizes_to_ten() {
        let summary = summarize(&[
            evaluation(Some(8.0), 10.0, 2.0, true),
            evaluation(Some(50.0), 100.0, 1.0, true),
            evaluation(None, 10.0, 3.0, false),
        ]);

        // (8 * 2 + 5 * 1) / 3 = 7.0
        assert_eq!(summary.weighted_average, Some(7.0));
        assert_eq!(summary.evaluations, 3);
        assert_eq!(summary.graded, 2);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.total_weight, 6.0);
    }

    #[test]
    fn no_grades_means_no_average() {
        let summary = summarize(&[evaluation(None, 10.0, 1.0, false)]);
        assert_eq!(summary.weighted_average, None);
        assert_eq!(summary.graded, 0);
    }

    #[test]
    fn average_is_rounded() {
        let summary = summarize(&[
            evaluation(Some(7.0), 10.0, 1.0, true),
            evaluation(Some(8.0), 10.0, 1.0, true),
            evaluation(Some(8.0), 10.0, 1.0, true),
        ]);
        assert_eq!(summary.weighted_average, Some(7.67));
    }
}
